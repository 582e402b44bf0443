use super::registrar::RouteRegistrar;
use crate::db::RegistryHandle;
use crate::error::ModhostError;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::SqlitePool;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Server-side half of a module.
///
/// Backends run in-process with full host privileges. The only structured way to expose
/// HTTP handlers is through the [`RouteRegistrar`]; everything registered there ends up
/// under `ctx.prefix`.
#[async_trait]
pub trait ModuleBackend: Send + Sync {
    async fn mount(&self, routes: &mut RouteRegistrar, ctx: &MountContext) -> Result<(), BoxError>;
}

/// What a backend receives when it is mounted.
#[derive(Clone)]
pub struct MountContext {
    pub slug: String,
    /// `/mod/<slug>`
    pub prefix: String,
    /// Open pool on the module's own data store.
    pub db: SqlitePool,
    pub host: HostHandle,
}

/// Host capabilities exposed to module backends.
#[derive(Clone)]
pub struct HostHandle {
    registry: RegistryHandle,
}

impl HostHandle {
    pub fn new(registry: RegistryHandle) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    /// Current admin-supplied configuration document of `slug`.
    pub async fn module_config(&self, slug: &str) -> Result<Value, ModhostError> {
        Ok(self.registry.get(slug).await?.config.0)
    }
}
