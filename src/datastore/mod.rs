//! Per-module embedded SQLite data stores.
//!
//! Each slug owns `<modules_dir>/<slug>/data.sqlite`. Migration scripts are re-run on every
//! install and boot remount, so they must be idempotent (`CREATE TABLE IF NOT EXISTS`, ...).

use crate::error::ModhostError;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const DATA_STORE_FILE: &str = "data.sqlite";

#[derive(Debug, Clone)]
pub struct DataStoreProvisioner {
    modules_dir: PathBuf,
}

impl DataStoreProvisioner {
    pub fn new(modules_dir: impl Into<PathBuf>) -> Self {
        Self {
            modules_dir: modules_dir.into(),
        }
    }

    /// Path of the slug's database file. Creates the slug's storage directory if needed.
    pub async fn db_file_for(&self, slug: &str) -> Result<PathBuf, ModhostError> {
        let dir = self.modules_dir.join(slug);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ModhostError::fs("create module storage dir", &dir, e))?;
        Ok(dir.join(DATA_STORE_FILE))
    }

    /// Runs the whole script as one batch against `db_file`, then closes the connection.
    pub async fn apply_migration(
        &self,
        slug: &str,
        db_file: &Path,
        script_path: &Path,
    ) -> Result<(), ModhostError> {
        let script = tokio::fs::read_to_string(script_path)
            .await
            .map_err(|e| ModhostError::fs("read migration script", script_path, e))?;

        let migration_err = |source: sqlx::Error| ModhostError::Migration {
            slug: slug.to_string(),
            source,
        };

        // Run through a pool so the future stays Send.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(connect_options(db_file))
            .await
            .map_err(migration_err)?;

        let result = sqlx::raw_sql(&script).execute(&pool).await;
        pool.close().await;
        result.map_err(migration_err)?;

        info!(slug, script = %script_path.display(), "migration applied");
        Ok(())
    }

    /// Pool handed to a module backend at mount time.
    pub async fn open(&self, db_file: &Path) -> Result<SqlitePool, sqlx::Error> {
        SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(connect_options(db_file))
            .await
    }
}

fn connect_options(db_file: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(db_file)
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5))
}
