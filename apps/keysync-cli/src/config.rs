//! Configuration file handling.
//!
//! Settings are read from a YAML file (default `keysync.yaml`) holding the
//! credentials of both services, the key-holder list aliases and the area
//! ids each key-holder should be authorized for.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::{CliError, CliResult};

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize)]
pub struct DirectorySettings {
    pub api_endpoint: String,
    pub api_id: String,
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct AccessSettings {
    pub api_endpoint: String,
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct KeyholderSettings {
    /// List aliases that mark a directory list as a key-holder list.
    pub aliases: BTreeSet<String>,
    /// Role keys a member must hold to stay on the roster (empty = no
    /// role restriction).
    #[serde(default)]
    pub roles: BTreeSet<String>,
    /// Areas each key-holder must be authorized for.
    #[serde(default)]
    pub areas: Vec<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegistrationSettings {
    /// Default cap on registration codes sent per invocation.
    #[serde(default)]
    pub send_limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub directory: DirectorySettings,
    pub access: AccessSettings,
    pub keyholders: KeyholderSettings,
    #[serde(default)]
    pub registration: RegistrationSettings,
}

impl Settings {
    pub fn load(path: &Path) -> CliResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let settings: Settings = serde_yaml::from_str(&raw)
            .map_err(|e| CliError::Config(format!("{}: {e}", path.display())))?;
        if settings.keyholders.aliases.is_empty() {
            return Err(CliError::Config(
                "keyholders.aliases must name at least one list alias".into(),
            ));
        }
        Ok(settings)
    }
}
