mod basic;
mod install;
mod storage;

pub use basic::BasicConfig;
pub use install::InstallConfig;
pub use storage::{ResolvedStorage, StorageConfig};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::LazyLock};

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core server configuration (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Filesystem layout (see `storage` table in config.toml).
    #[serde(default)]
    pub storage: StorageConfig,

    /// Install flow limits (see `install` table in config.toml).
    #[serde(default)]
    pub install: InstallConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "MODHOST_";

impl Config {
    /// Builds a Figment that merges defaults, a config TOML file, then `MODHOST_*` env vars.
    ///
    /// Nested keys use `__`, e.g. `MODHOST_BASIC__LISTEN_PORT=9000`.
    pub fn figment() -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads configuration and validates required fields like `basic.admin_key`.
    pub fn load_validated() -> Self {
        let cfg: Self = Self::figment()
            .extract()
            .unwrap_or_else(|err| panic!("failed to extract configuration: {err}"));
        if cfg.basic.admin_key.trim().is_empty() {
            panic!("basic.admin_key must be set and non-empty");
        }
        cfg
    }

    pub fn storage(&self) -> ResolvedStorage {
        self.storage.resolve()
    }
}

/// Global, lazily-initialized configuration instance.
pub static CONFIG: LazyLock<Config> = LazyLock::new(Config::load_validated);
