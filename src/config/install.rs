use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Limits applied to the install flow.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InstallConfig {
    /// Largest accepted upload body.
    /// TOML: `install.max_upload_bytes`. Default: `52428800` (50 MiB).
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Upper bound for archive extraction.
    /// TOML: `install.extract_timeout_secs`. Default: `60`.
    #[serde(default = "default_extract_timeout_secs")]
    pub extract_timeout_secs: u64,

    /// Upper bound for running one migration script.
    /// TOML: `install.migration_timeout_secs`. Default: `30`.
    #[serde(default = "default_migration_timeout_secs")]
    pub migration_timeout_secs: u64,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
            extract_timeout_secs: default_extract_timeout_secs(),
            migration_timeout_secs: default_migration_timeout_secs(),
        }
    }
}

impl InstallConfig {
    pub fn extract_timeout(&self) -> Duration {
        Duration::from_secs(self.extract_timeout_secs)
    }

    pub fn migration_timeout(&self) -> Duration {
        Duration::from_secs(self.migration_timeout_secs)
    }
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_extract_timeout_secs() -> u64 {
    60
}

fn default_migration_timeout_secs() -> u64 {
    30
}
