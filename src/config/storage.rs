use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// On-disk locations used by the host.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root for everything below unless overridden.
    /// TOML: `storage.data_dir`. Default: `data`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Published package artifacts, laid out as `<slug>/<version>/`.
    /// TOML: `storage.packages_dir`. Default: `<data_dir>/packages`.
    #[serde(default)]
    pub packages_dir: Option<PathBuf>,

    /// Per-module data stores, laid out as `<slug>/data.sqlite`.
    /// TOML: `storage.modules_dir`. Default: `<data_dir>/modules`.
    #[serde(default)]
    pub modules_dir: Option<PathBuf>,

    /// Scratch space for archive extraction.
    /// TOML: `storage.scratch_dir`. Default: `<data_dir>/tmp`.
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            packages_dir: None,
            modules_dir: None,
            scratch_dir: None,
        }
    }
}

/// Storage paths after defaults have been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStorage {
    pub packages_dir: PathBuf,
    pub modules_dir: PathBuf,
    pub scratch_dir: PathBuf,
}

impl StorageConfig {
    pub fn resolve(&self) -> ResolvedStorage {
        ResolvedStorage {
            packages_dir: self
                .packages_dir
                .clone()
                .unwrap_or_else(|| self.data_dir.join("packages")),
            modules_dir: self
                .modules_dir
                .clone()
                .unwrap_or_else(|| self.data_dir.join("modules")),
            scratch_dir: self
                .scratch_dir
                .clone()
                .unwrap_or_else(|| self.data_dir.join("tmp")),
        }
    }

    /// Everything rooted at `data_dir`; handy for tests with a temp directory.
    pub fn rooted_at(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
