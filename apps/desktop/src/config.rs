use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;
use shared::domain::DEFAULT_DEVICE_ADDRESS;

pub const DEFAULT_CONFIG_FILE: &str = "rshn.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub default_address: String,
    pub request_timeout_ms: u64,
    pub state_database_url: String,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_address: DEFAULT_DEVICE_ADDRESS.into(),
            request_timeout_ms: 5000,
            state_database_url: default_state_database_url(),
            log_filter: "info".into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    default_address: Option<String>,
    request_timeout_ms: Option<u64>,
    state_database_url: Option<String>,
    log: Option<String>,
}

fn default_state_database_url() -> String {
    let path = dirs::data_local_dir()
        .map(|base| base.join("rshn").join("state.db"))
        .unwrap_or_else(|| PathBuf::from("./data/rshn.db"));
    format!("sqlite://{}", path.to_string_lossy().replace('\\', "/"))
}

/// Defaults, then the config file, then `RSHN__*` environment variables.
/// An explicit `path` must exist; the default file is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    if required || path.exists() {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?;
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file.default_address {
        settings.default_address = v;
    }
    if let Some(v) = file.request_timeout_ms {
        settings.request_timeout_ms = v;
    }
    if let Some(v) = file.state_database_url {
        settings.state_database_url = v;
    }
    if let Some(v) = file.log {
        settings.log_filter = v;
    }
    Ok(())
}

fn apply_env(
    settings: &mut Settings,
    var: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = var("RSHN__DEFAULT_ADDRESS") {
        settings.default_address = v;
    }
    if let Some(v) = var("RSHN__REQUEST_TIMEOUT_MS") {
        settings.request_timeout_ms = v
            .parse()
            .with_context(|| format!("RSHN__REQUEST_TIMEOUT_MS must be milliseconds, got '{v}'"))?;
    }
    if let Some(v) = var("RSHN__STATE_DATABASE_URL") {
        settings.state_database_url = v;
    }
    if let Some(v) = var("RSHN__LOG") {
        settings.log_filter = v;
    }
    Ok(())
}
