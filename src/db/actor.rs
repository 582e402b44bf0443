use crate::db::models::DbModule;
use crate::db::patch::ModuleUpsert;
use crate::db::schema::SQLITE_INIT;
use crate::error::ModhostError;
use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use serde_json::Value;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::types::Json;
use std::{str::FromStr, time::Duration};
use tracing::{debug, info};

const MODULE_COLUMNS: &str = "id, slug, name, version, module_type, entry_client, manifest, config, enabled, created_at, updated_at";

#[derive(Debug)]
pub enum RegistryMessage {
    /// Create-or-update by slug; replies with the resulting row.
    Upsert(ModuleUpsert, RpcReplyPort<Result<DbModule, ModhostError>>),

    /// Lookup by slug.
    Get(String, RpcReplyPort<Result<DbModule, ModhostError>>),

    /// Every row, ordered by slug.
    List(RpcReplyPort<Result<Vec<DbModule>, ModhostError>>),

    /// Flip the lifecycle flag.
    SetEnabled(String, bool, RpcReplyPort<Result<DbModule, ModhostError>>),

    /// Replace the configuration document wholesale.
    SetConfig(String, Value, RpcReplyPort<Result<DbModule, ModhostError>>),

    /// Remove the row; replies with what was deleted.
    Delete(String, RpcReplyPort<Result<DbModule, ModhostError>>),
}

/// Cloneable handle to the registry actor.
#[derive(Clone)]
pub struct RegistryHandle {
    actor: ActorRef<RegistryMessage>,
}

impl RegistryHandle {
    pub async fn upsert(&self, upsert: ModuleUpsert) -> Result<DbModule, ModhostError> {
        ractor::call!(self.actor, RegistryMessage::Upsert, upsert)
            .map_err(|e| ModhostError::RactorError(format!("Registry Upsert RPC failed: {e}")))?
    }

    pub async fn get(&self, slug: &str) -> Result<DbModule, ModhostError> {
        ractor::call!(self.actor, RegistryMessage::Get, slug.to_string())
            .map_err(|e| ModhostError::RactorError(format!("Registry Get RPC failed: {e}")))?
    }

    pub async fn list(&self) -> Result<Vec<DbModule>, ModhostError> {
        ractor::call!(self.actor, RegistryMessage::List)
            .map_err(|e| ModhostError::RactorError(format!("Registry List RPC failed: {e}")))?
    }

    pub async fn set_enabled(&self, slug: &str, enabled: bool) -> Result<DbModule, ModhostError> {
        ractor::call!(
            self.actor,
            RegistryMessage::SetEnabled,
            slug.to_string(),
            enabled
        )
        .map_err(|e| ModhostError::RactorError(format!("Registry SetEnabled RPC failed: {e}")))?
    }

    pub async fn set_config(&self, slug: &str, config: Value) -> Result<DbModule, ModhostError> {
        ractor::call!(
            self.actor,
            RegistryMessage::SetConfig,
            slug.to_string(),
            config
        )
        .map_err(|e| ModhostError::RactorError(format!("Registry SetConfig RPC failed: {e}")))?
    }

    pub async fn delete(&self, slug: &str) -> Result<DbModule, ModhostError> {
        ractor::call!(self.actor, RegistryMessage::Delete, slug.to_string())
            .map_err(|e| ModhostError::RactorError(format!("Registry Delete RPC failed: {e}")))?
    }
}

struct RegistryState {
    pool: SqlitePool,
}

struct RegistryActor;

#[ractor::async_trait]
impl Actor for RegistryActor {
    type Msg = RegistryMessage;
    type State = RegistryState;
    type Arguments = String;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        database_url: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let connect_opts = SqliteConnectOptions::from_str(database_url.as_str())
            .map_err(|e| ActorProcessingErr::from(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .connect_with(connect_opts)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db connect failed: {e}")))?;

        apply_schema(&pool)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db schema init failed: {e}")))?;

        info!("RegistryActor initialized");
        Ok(RegistryState { pool })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            RegistryMessage::Upsert(upsert, reply) => {
                let res = self.upsert(&state.pool, upsert).await;
                let _ = reply.send(res);
            }
            RegistryMessage::Get(slug, reply) => {
                let res = self.get(&state.pool, &slug).await;
                let _ = reply.send(res);
            }
            RegistryMessage::List(reply) => {
                let res = self.list(&state.pool).await;
                let _ = reply.send(res);
            }
            RegistryMessage::SetEnabled(slug, enabled, reply) => {
                let res = self.set_enabled(&state.pool, &slug, enabled).await;
                let _ = reply.send(res);
            }
            RegistryMessage::SetConfig(slug, config, reply) => {
                let res = self.set_config(&state.pool, &slug, config).await;
                let _ = reply.send(res);
            }
            RegistryMessage::Delete(slug, reply) => {
                let res = self.delete(&state.pool, &slug).await;
                let _ = reply.send(res);
            }
        }
        Ok(())
    }
}

impl RegistryActor {
    async fn upsert(&self, pool: &SqlitePool, u: ModuleUpsert) -> Result<DbModule, ModhostError> {
        let now = Utc::now();
        let sql = format!(
            r#"
        INSERT INTO modules (
            slug, name, version, module_type, entry_client, manifest, config, enabled, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, '{{}}', 1, ?, ?)
        ON CONFLICT(slug) DO UPDATE SET
            name = excluded.name,
            version = excluded.version,
            module_type = excluded.module_type,
            entry_client = excluded.entry_client,
            manifest = excluded.manifest,
            updated_at = excluded.updated_at
        RETURNING {MODULE_COLUMNS}
        "#
        );

        let row = sqlx::query_as::<_, DbModule>(&sql)
            .bind(&u.slug)
            .bind(&u.name)
            .bind(&u.version)
            .bind(&u.module_type)
            .bind(&u.entry_client)
            .bind(Json(&u.manifest))
            .bind(now)
            .bind(now)
            .fetch_one(pool)
            .await?;

        debug!(slug = %row.slug, id = row.id, version = %row.version, "registry upsert applied");
        Ok(row)
    }

    async fn get(&self, pool: &SqlitePool, slug: &str) -> Result<DbModule, ModhostError> {
        let sql = format!("SELECT {MODULE_COLUMNS} FROM modules WHERE slug = ?");
        sqlx::query_as::<_, DbModule>(&sql)
            .bind(slug)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ModhostError::NotFound(slug.to_string()))
    }

    async fn list(&self, pool: &SqlitePool) -> Result<Vec<DbModule>, ModhostError> {
        let sql = format!("SELECT {MODULE_COLUMNS} FROM modules ORDER BY slug");
        let rows = sqlx::query_as::<_, DbModule>(&sql).fetch_all(pool).await?;
        Ok(rows)
    }

    async fn set_enabled(
        &self,
        pool: &SqlitePool,
        slug: &str,
        enabled: bool,
    ) -> Result<DbModule, ModhostError> {
        let sql = format!(
            "UPDATE modules SET enabled = ?, updated_at = ? WHERE slug = ? RETURNING {MODULE_COLUMNS}"
        );
        sqlx::query_as::<_, DbModule>(&sql)
            .bind(enabled)
            .bind(Utc::now())
            .bind(slug)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ModhostError::NotFound(slug.to_string()))
    }

    async fn set_config(
        &self,
        pool: &SqlitePool,
        slug: &str,
        config: Value,
    ) -> Result<DbModule, ModhostError> {
        let sql = format!(
            "UPDATE modules SET config = ?, updated_at = ? WHERE slug = ? RETURNING {MODULE_COLUMNS}"
        );
        sqlx::query_as::<_, DbModule>(&sql)
            .bind(Json(config))
            .bind(Utc::now())
            .bind(slug)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ModhostError::NotFound(slug.to_string()))
    }

    async fn delete(&self, pool: &SqlitePool, slug: &str) -> Result<DbModule, ModhostError> {
        let sql = format!("DELETE FROM modules WHERE slug = ? RETURNING {MODULE_COLUMNS}");
        sqlx::query_as::<_, DbModule>(&sql)
            .bind(slug)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ModhostError::NotFound(slug.to_string()))
    }
}

/// Spawn the registry actor and return a cloneable handle.
pub async fn spawn(database_url: &str) -> Result<RegistryHandle, ModhostError> {
    let (actor, _jh) = Actor::spawn(None, RegistryActor, database_url.to_string())
        .await
        .map_err(|e| ModhostError::RactorError(format!("failed to spawn RegistryActor: {e}")))?;

    Ok(RegistryHandle { actor })
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), ModhostError> {
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}
