//! Lifecycle controller: install, enable/disable, config, uninstall and boot remount.
//!
//! Install is not transactional. A migration or mount failure is reported to the caller while
//! the published artifact and the upserted registry row stay in place; a later successful
//! install of the same slug converges the state.

mod locks;

pub use locks::SlugLocks;

use crate::config::{InstallConfig, ResolvedStorage};
use crate::datastore::DataStoreProvisioner;
use crate::db::{DbModule, ModuleUpsert, RegistryHandle};
use crate::error::ModhostError;
use crate::mount::{BackendLoader, BackendMounter, HostHandle, MountOutcome, MountedRoutes};
use crate::store::{self, PackageStore, resolve_client_entry, resolve_package_path};
use crate::utils::logging::{violations_line, with_pretty_json_debug};
use modhost_manifest::{Manifest, ValidationError, Violation};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Outcome of [`LifecycleController::remount_all`].
#[derive(Debug, Default, Clone, Serialize)]
pub struct RemountReport {
    pub mounted: Vec<String>,
    pub inert: Vec<String>,
    pub failed: Vec<RemountFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemountFailure {
    pub slug: String,
    pub error: String,
}

#[derive(Clone)]
pub struct LifecycleController {
    registry: RegistryHandle,
    store: PackageStore,
    datastore: DataStoreProvisioner,
    mounter: BackendMounter,
    locks: SlugLocks,
    extract_timeout: Duration,
    migration_timeout: Duration,
}

impl LifecycleController {
    pub fn new(
        registry: RegistryHandle,
        storage: &ResolvedStorage,
        install: &InstallConfig,
        loader: Arc<dyn BackendLoader>,
    ) -> Self {
        let store = PackageStore::new(storage.packages_dir.clone(), storage.scratch_dir.clone());
        let datastore = DataStoreProvisioner::new(storage.modules_dir.clone());
        let mounter = BackendMounter::new(
            loader,
            MountedRoutes::new(),
            HostHandle::new(registry.clone()),
            datastore.clone(),
        );
        Self {
            registry,
            store,
            datastore,
            mounter,
            locks: SlugLocks::new(),
            extract_timeout: install.extract_timeout(),
            migration_timeout: install.migration_timeout(),
        }
    }

    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    pub fn routes(&self) -> &MountedRoutes {
        self.mounter.routes()
    }

    pub fn packages_dir(&self) -> &Path {
        self.store.packages_dir()
    }

    pub async fn list(&self) -> Result<Vec<DbModule>, ModhostError> {
        self.registry.list().await
    }

    pub async fn get(&self, slug: &str) -> Result<DbModule, ModhostError> {
        self.registry.get(slug).await
    }

    /// Full install flow for one uploaded `.tar.gz`. Returns the registry row.
    pub async fn install(&self, archive: Vec<u8>) -> Result<DbModule, ModhostError> {
        let scratch = self.store.scratch()?;
        self.extract(archive, scratch.path()).await?;

        let (package_root, validated) = self
            .store
            .read_manifest(scratch.path())
            .and_then(|(root, validated)| {
                check_package_paths(&root, &validated.manifest)?;
                Ok((root, validated))
            })
            .inspect_err(|e| {
                if let ModhostError::Validation(v) = e {
                    warn!(violations = %violations_line(&v.violations), "manifest rejected");
                }
            })?;

        let manifest = &validated.manifest;
        let slug = manifest.slug.as_str();
        let version = manifest.version.as_str();
        with_pretty_json_debug(&validated.document, |pretty| {
            debug!(slug, version, manifest = %pretty, "manifest validated");
        });
        info!(slug, version, module_type = %manifest.module_type, "installing module");

        let _guard = self.locks.acquire(slug).await;

        let artifact_dir = self.publish(&package_root, slug, version).await?;
        let entry_client = resolve_client_entry(manifest, slug, version);

        let previous_version = match self.registry.get(slug).await {
            Ok(row) => Some(row.version),
            Err(ModhostError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };
        let row = self
            .registry
            .upsert(ModuleUpsert::from_validated(&validated, entry_client))
            .await?;
        debug!(slug, id = row.id, "registry row upserted");

        if let Some(previous) = previous_version.filter(|v| v != version) {
            info!(slug, previous = %previous, current = version, "dropping previous artifact");
            self.remove_artifact(slug, &previous).await;
        }

        let db_file = self.datastore.db_file_for(slug).await?;
        if let Some(script) = manifest.backend_migrations() {
            let script_path = migration_path(&artifact_dir, script)?;
            self.migrate(slug, &db_file, &script_path).await?;
        }

        match self
            .mounter
            .mount(slug, manifest.backend.as_ref(), &artifact_dir, &db_file)
            .await?
        {
            MountOutcome::Mounted { .. } => {}
            MountOutcome::NoBackend | MountOutcome::Inert => {
                if self.mounter.unmount(slug) {
                    info!(slug, "routes of the previous install dropped");
                }
            }
        }

        info!(slug, version, id = row.id, "module installed");
        Ok(row)
    }

    /// Flag flip only. Mounted routes stay as they are.
    pub async fn set_enabled(&self, slug: &str, enabled: bool) -> Result<DbModule, ModhostError> {
        let row = self.registry.set_enabled(slug, enabled).await?;
        info!(slug, enabled, "module state changed");
        Ok(row)
    }

    /// Removes the row, the mounted routes and the artifact. Cleanup failures are only logged.
    pub async fn uninstall(&self, slug: &str) -> Result<DbModule, ModhostError> {
        let _guard = self.locks.acquire(slug).await;

        let row = self.registry.delete(slug).await?;
        if self.mounter.unmount(slug) {
            debug!(slug, "backend routes unmounted");
        }
        self.remove_artifact(slug, &row.version).await;

        info!(slug, version = %row.version, "module uninstalled");
        Ok(row)
    }

    /// Current config document and the manifest's `configSchema` (if any).
    pub async fn get_config(&self, slug: &str) -> Result<(Value, Option<Value>), ModhostError> {
        let row = self.registry.get(slug).await?;
        let schema = row.config_schema().cloned();
        Ok((row.config.0, schema))
    }

    /// Replaces the config document wholesale. The value is not checked against `configSchema`.
    pub async fn set_config(&self, slug: &str, config: Value) -> Result<Value, ModhostError> {
        let row = self.registry.set_config(slug, config).await?;
        info!(slug, "module config replaced");
        Ok(row.config.0)
    }

    /// Re-drives provisioning, migration and mount for every module that ships backend code.
    ///
    /// One module failing never stops the others, and nothing here returns an error.
    pub async fn remount_all(&self) -> RemountReport {
        let mut report = RemountReport::default();

        let rows = match self.registry.list().await {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, "boot remount skipped: registry unavailable");
                return report;
            }
        };

        for row in rows {
            let slug = row.slug.clone();
            let Some(manifest) = row.parsed_manifest() else {
                error!(slug = %slug, "stored manifest no longer parses; skipping remount");
                report.failed.push(RemountFailure {
                    slug,
                    error: "stored manifest no longer parses".to_string(),
                });
                continue;
            };
            if manifest.backend_entry().is_none() {
                continue;
            }

            let _guard = self.locks.acquire(&slug).await;
            match self.remount_one(&row, &manifest).await {
                Ok(MountOutcome::Mounted { routes }) => {
                    info!(slug = %slug, routes, "module remounted");
                    report.mounted.push(slug);
                }
                Ok(MountOutcome::Inert) => report.inert.push(slug),
                Ok(MountOutcome::NoBackend) => {}
                Err(e) => {
                    error!(
                        slug = %slug,
                        code = e.code(),
                        error = %e,
                        "boot remount failed; continuing with remaining modules"
                    );
                    report.failed.push(RemountFailure {
                        slug,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            mounted = report.mounted.len(),
            inert = report.inert.len(),
            failed = report.failed.len(),
            "boot remount finished"
        );
        report
    }

    async fn remount_one(
        &self,
        row: &DbModule,
        manifest: &Manifest,
    ) -> Result<MountOutcome, ModhostError> {
        let package_dir = self.store.artifact_dir(&row.slug, &row.version);
        let db_file = self.datastore.db_file_for(&row.slug).await?;
        if let Some(script) = manifest.backend_migrations() {
            let script_path = migration_path(&package_dir, script)?;
            self.migrate(&row.slug, &db_file, &script_path).await?;
        }
        self.mounter
            .mount(&row.slug, manifest.backend.as_ref(), &package_dir, &db_file)
            .await
    }

    async fn extract(&self, archive: Vec<u8>, dest: &Path) -> Result<(), ModhostError> {
        let dest = dest.to_path_buf();
        let job = tokio::task::spawn_blocking(move || store::extract(&archive, &dest));
        // On expiry the blocking task keeps writing into the scratch dir until it finishes.
        match tokio::time::timeout(self.extract_timeout, job).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(ModhostError::Archive(format!(
                "extraction task failed: {join}"
            ))),
            Err(_) => Err(ModhostError::Timeout("archive extraction")),
        }
    }

    async fn publish(&self, src: &Path, slug: &str, version: &str) -> Result<PathBuf, ModhostError> {
        let store = self.store.clone();
        let dest = store.artifact_dir(slug, version);
        let (src, slug, version) = (src.to_path_buf(), slug.to_string(), version.to_string());
        tokio::task::spawn_blocking(move || store.publish(&src, &slug, &version))
            .await
            .map_err(|e| ModhostError::fs("publish artifact", dest, std::io::Error::other(e)))?
    }

    async fn migrate(&self, slug: &str, db_file: &Path, script: &Path) -> Result<(), ModhostError> {
        tokio::time::timeout(
            self.migration_timeout,
            self.datastore.apply_migration(slug, db_file, script),
        )
        .await
        .unwrap_or(Err(ModhostError::Timeout("migration")))
    }

    async fn remove_artifact(&self, slug: &str, version: &str) {
        let store = self.store.clone();
        let (slug, version) = (slug.to_string(), version.to_string());
        if let Err(e) = tokio::task::spawn_blocking(move || store.remove(&slug, &version)).await {
            warn!(error = %e, "artifact cleanup task failed");
        }
    }
}

/// Backend paths must stay inside the package; checked before anything is written.
fn check_package_paths(root: &Path, manifest: &Manifest) -> Result<(), ValidationError> {
    let declared = [
        ("/backend/entry", manifest.backend_entry()),
        ("/backend/migrations", manifest.backend_migrations()),
    ];
    let violations: Vec<Violation> = declared
        .into_iter()
        .filter_map(|(pointer, rel)| {
            let rel = rel?;
            resolve_package_path(root, rel).is_none().then(|| {
                Violation::new(
                    pointer,
                    format!("{rel:?} must be a relative path inside the package"),
                )
            })
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { violations })
    }
}

fn migration_path(package_dir: &Path, script: &str) -> Result<PathBuf, ModhostError> {
    resolve_package_path(package_dir, script).ok_or_else(|| {
        ModhostError::fs(
            "resolve migration script",
            package_dir.join(script),
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "migration path points outside the package",
            ),
        )
    })
}
