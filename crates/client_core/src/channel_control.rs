use shared::domain::{ChannelIntensity, ChannelName, DeviceAddress};
use thiserror::Error;
use tracing::{debug, warn};

use crate::device_client::{DeviceApi, DeviceClientError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelPhase {
    Idle,
    Dragging,
    Committing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    Unchanged,
    /// Write this value, then report back through [`ChannelControl::finish`].
    Commit(ChannelIntensity),
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Unchanged,
    Committed(ChannelIntensity),
    Reverted {
        to: ChannelIntensity,
        reason: String,
    },
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelControlError {
    #[error("{0} is committing a value; input is disabled")]
    Busy(ChannelName),
    #[error("{0} has no write in flight")]
    NotCommitting(ChannelName),
}

#[derive(Debug, Clone)]
pub struct ChannelControl {
    channel: ChannelName,
    committed: ChannelIntensity,
    displayed: ChannelIntensity,
    phase: ChannelPhase,
    error: Option<String>,
}

impl ChannelControl {
    pub fn new(channel: ChannelName, committed: ChannelIntensity) -> Self {
        Self {
            channel,
            committed,
            displayed: committed,
            phase: ChannelPhase::Idle,
            error: None,
        }
    }

    pub fn channel(&self) -> ChannelName {
        self.channel
    }

    pub fn committed(&self) -> ChannelIntensity {
        self.committed
    }

    pub fn displayed(&self) -> ChannelIntensity {
        self.displayed
    }

    pub fn phase(&self) -> ChannelPhase {
        self.phase
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Disabled while committing.
    pub fn is_interactive(&self) -> bool {
        self.phase != ChannelPhase::Committing
    }

    pub fn percent(&self) -> f32 {
        self.displayed.percent()
    }

    pub fn input(&mut self, value: ChannelIntensity) -> Result<(), ChannelControlError> {
        if self.phase == ChannelPhase::Committing {
            return Err(ChannelControlError::Busy(self.channel));
        }
        self.phase = ChannelPhase::Dragging;
        self.error = None;
        self.displayed = value;
        Ok(())
    }

    pub fn release(&mut self) -> Release {
        match self.phase {
            ChannelPhase::Committing => Release::Busy,
            ChannelPhase::Idle => Release::Unchanged,
            ChannelPhase::Dragging if self.displayed == self.committed => {
                self.phase = ChannelPhase::Idle;
                Release::Unchanged
            }
            ChannelPhase::Dragging => {
                self.phase = ChannelPhase::Committing;
                Release::Commit(self.displayed)
            }
        }
    }

    /// Settles the write started by [`ChannelControl::release`]. `Ok(false)` is
    /// the device answering `success: false` and counts as a failure.
    pub fn finish(
        &mut self,
        result: Result<bool, DeviceClientError>,
    ) -> Result<CommitOutcome, ChannelControlError> {
        if self.phase != ChannelPhase::Committing {
            return Err(ChannelControlError::NotCommitting(self.channel));
        }
        Ok(self.settle(result))
    }

    pub async fn commit(&mut self, device: &dyn DeviceApi, address: &DeviceAddress) -> CommitOutcome {
        let value = match self.release() {
            Release::Commit(value) => value,
            Release::Unchanged => return CommitOutcome::Unchanged,
            Release::Busy => return CommitOutcome::Busy,
        };
        debug!(channel = %self.channel, %value, %address, "writing channel");
        let result = device.write_channel(address, self.channel, value).await;
        self.settle(result)
    }

    /// The authoritative value changed elsewhere. The baseline always follows;
    /// the displayed value only while the user is not interacting.
    pub fn sync_committed(&mut self, value: ChannelIntensity) {
        self.committed = value;
        if self.phase == ChannelPhase::Idle {
            self.displayed = value;
        }
    }

    fn settle(&mut self, result: Result<bool, DeviceClientError>) -> CommitOutcome {
        self.phase = ChannelPhase::Idle;
        let reason = match result {
            Ok(true) => {
                self.committed = self.displayed;
                self.error = None;
                return CommitOutcome::Committed(self.committed);
            }
            Ok(false) => format!(
                "device rejected {} = {}",
                self.channel.label(),
                self.displayed
            ),
            Err(err) => err.to_string(),
        };
        warn!(channel = %self.channel, reason = %reason, "channel write failed; reverting");
        self.displayed = self.committed;
        self.error = Some(reason.clone());
        CommitOutcome::Reverted {
            to: self.committed,
            reason,
        }
    }
}

#[cfg(test)]
#[path = "tests/channel_control_tests.rs"]
mod tests;
