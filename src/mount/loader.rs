use super::backend::{BoxError, ModuleBackend};
use super::panic_message;
use crate::error::ModhostError;
use ahash::AHashMap;
use serde::Deserialize;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Arc;

/// Turns a backend entry file into something mountable.
pub trait BackendLoader: Send + Sync {
    /// `Ok(None)` means the entry loaded fine but exports no mount function.
    fn load(&self, slug: &str, entry: &Path) -> Result<Option<Arc<dyn ModuleBackend>>, ModhostError>;
}

pub type BackendFactory = Arc<dyn Fn() -> Result<Arc<dyn ModuleBackend>, BoxError> + Send + Sync>;

/// Backends linked into the host binary, addressable by export name.
#[derive(Clone, Default)]
pub struct BackendCatalog {
    factories: AHashMap<String, BackendFactory>,
}

impl BackendCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory. It runs on every load, like module-level initialization.
    #[must_use]
    pub fn register<F>(mut self, export: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn ModuleBackend>, BoxError> + Send + Sync + 'static,
    {
        self.factories.insert(export.into(), Arc::new(factory));
        self
    }

    /// Registers an already constructed backend instance.
    #[must_use]
    pub fn with_backend(self, export: impl Into<String>, backend: Arc<dyn ModuleBackend>) -> Self {
        self.register(export, move || Ok(backend.clone()))
    }

    pub fn get(&self, export: &str) -> Option<&BackendFactory> {
        self.factories.get(export)
    }

    pub fn exports(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Contents of a backend entry file: `{"export": "<name in the catalog>"}`.
#[derive(Debug, Deserialize)]
struct EntryDescriptor {
    #[serde(default)]
    export: Option<String>,
}

/// Resolves entry descriptors against a [`BackendCatalog`].
pub struct LinkedBackendLoader {
    catalog: BackendCatalog,
}

impl LinkedBackendLoader {
    pub fn new(catalog: BackendCatalog) -> Self {
        Self { catalog }
    }
}

impl BackendLoader for LinkedBackendLoader {
    fn load(&self, slug: &str, entry: &Path) -> Result<Option<Arc<dyn ModuleBackend>>, ModhostError> {
        let load_err = |message: String| ModhostError::Load {
            slug: slug.to_string(),
            message,
        };

        let raw = std::fs::read(entry)
            .map_err(|e| load_err(format!("entry file {} unreadable: {e}", entry.display())))?;
        let descriptor: EntryDescriptor = serde_json::from_slice(&raw).map_err(|e| {
            load_err(format!("entry file {} is not a valid descriptor: {e}", entry.display()))
        })?;

        let Some(export) = descriptor
            .export
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
        else {
            return Ok(None);
        };

        let factory = self
            .catalog
            .get(&export)
            .ok_or_else(|| load_err(format!("no linked backend exports {export:?}")))?;

        match catch_unwind(AssertUnwindSafe(|| (**factory)())) {
            Ok(Ok(backend)) => Ok(Some(backend)),
            Ok(Err(e)) => Err(load_err(format!(
                "backend {export:?} failed to initialize: {e}"
            ))),
            Err(panic) => Err(load_err(format!(
                "backend {export:?} panicked during initialization: {}",
                panic_message(panic.as_ref())
            ))),
        }
    }
}
