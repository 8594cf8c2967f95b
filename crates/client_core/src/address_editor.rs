use shared::domain::DeviceAddress;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Viewing,
    Editing,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("'{0}' is not a valid device address")]
    Invalid(String),
    #[error("address editor is not editing")]
    NotEditing,
}

#[derive(Debug, Clone)]
pub struct AddressEditor {
    committed: DeviceAddress,
    draft: String,
    mode: EditorMode,
}

impl AddressEditor {
    pub fn new(committed: DeviceAddress) -> Self {
        Self {
            draft: committed.as_str().to_string(),
            committed,
            mode: EditorMode::Viewing,
        }
    }

    pub fn committed(&self) -> &DeviceAddress {
        &self.committed
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn begin_edit(&mut self) {
        if self.mode == EditorMode::Viewing {
            self.draft = self.committed.as_str().to_string();
            self.mode = EditorMode::Editing;
        }
    }

    /// Free-form while editing; validation happens on submit.
    pub fn set_draft(&mut self, draft: impl Into<String>) -> Result<(), AddressError> {
        if self.mode != EditorMode::Editing {
            return Err(AddressError::NotEditing);
        }
        self.draft = draft.into();
        Ok(())
    }

    pub fn cancel(&mut self) {
        self.draft = self.committed.as_str().to_string();
        self.mode = EditorMode::Viewing;
    }

    pub fn can_submit(&self) -> bool {
        self.mode == EditorMode::Editing && DeviceAddress::new(self.draft.as_str()).is_submittable()
    }

    /// `Ok(Some(_))` only when the draft is valid and differs from the committed
    /// address, so resubmitting the same address never triggers a refetch.
    pub fn submit(&mut self) -> Result<Option<DeviceAddress>, AddressError> {
        if self.mode != EditorMode::Editing {
            return Err(AddressError::NotEditing);
        }
        let candidate = DeviceAddress::new(self.draft.as_str());
        if !candidate.is_submittable() {
            return Err(AddressError::Invalid(self.draft.clone()));
        }

        self.mode = EditorMode::Viewing;
        if candidate == self.committed {
            return Ok(None);
        }
        self.committed = candidate.clone();
        Ok(Some(candidate))
    }

    pub fn sync(&mut self, committed: &DeviceAddress) {
        self.committed = committed.clone();
        if self.mode == EditorMode::Viewing {
            self.draft = committed.as_str().to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor(address: &str) -> AddressEditor {
        AddressEditor::new(DeviceAddress::new(address))
    }

    #[test]
    fn submit_returns_new_address_and_leaves_edit_mode() {
        let mut editor = editor("192.168.1.42");
        editor.begin_edit();
        editor.set_draft("10.0.0.5").expect("draft");

        assert!(editor.can_submit());
        assert_eq!(
            editor.submit().expect("submit"),
            Some(DeviceAddress::new("10.0.0.5"))
        );
        assert_eq!(editor.mode(), EditorMode::Viewing);
        assert_eq!(editor.committed().as_str(), "10.0.0.5");
    }

    #[test]
    fn resubmitting_the_committed_address_is_a_no_op() {
        let mut editor = editor("10.0.0.5");
        editor.begin_edit();
        assert_eq!(editor.submit().expect("submit"), None);

        editor.begin_edit();
        editor.set_draft("10.0.0.5").expect("draft");
        assert_eq!(editor.submit().expect("submit"), None);
    }

    #[test]
    fn invalid_draft_is_rejected_and_editing_continues() {
        let mut editor = editor("10.0.0.5");
        editor.begin_edit();
        editor.set_draft("10.0.0").expect("draft");

        assert!(!editor.can_submit());
        assert_eq!(
            editor.submit(),
            Err(AddressError::Invalid("10.0.0".to_string()))
        );
        assert_eq!(editor.mode(), EditorMode::Editing);
        assert_eq!(editor.draft(), "10.0.0");
        assert_eq!(editor.committed().as_str(), "10.0.0.5");
    }

    #[test]
    fn drafts_require_edit_mode() {
        let mut editor = editor("10.0.0.5");
        assert_eq!(editor.set_draft("10.0.0.6"), Err(AddressError::NotEditing));
        assert_eq!(editor.submit(), Err(AddressError::NotEditing));
        assert!(!editor.can_submit());
    }

    #[test]
    fn cancel_restores_the_committed_address() {
        let mut editor = editor("10.0.0.5");
        editor.begin_edit();
        editor.set_draft("not an address").expect("draft");
        editor.cancel();

        assert_eq!(editor.mode(), EditorMode::Viewing);
        assert_eq!(editor.draft(), "10.0.0.5");
    }

    #[test]
    fn sync_does_not_clobber_an_open_draft() {
        let mut editor = editor("10.0.0.5");
        editor.sync(&DeviceAddress::new("10.0.0.9"));
        assert_eq!(editor.draft(), "10.0.0.9");

        editor.begin_edit();
        editor.set_draft("10.0.0.1").expect("draft");
        editor.sync(&DeviceAddress::new("10.0.0.2"));
        assert_eq!(editor.draft(), "10.0.0.1");
        assert_eq!(editor.committed().as_str(), "10.0.0.2");
    }
}
