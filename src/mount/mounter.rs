use super::backend::{HostHandle, MountContext};
use super::loader::BackendLoader;
use super::registrar::{MountedRoutes, RouteRegistrar};
use super::{mount_prefix, panic_message};
use crate::datastore::DataStoreProvisioner;
use crate::error::ModhostError;
use crate::store::resolve_package_path;
use futures::FutureExt;
use modhost_manifest::BackendSpec;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    /// Manifest declares no backend entry.
    NoBackend,
    /// Entry loaded but exports no mount function.
    Inert,
    Mounted { routes: usize },
}

/// Loads backend entries and swaps their routes into the live table.
#[derive(Clone)]
pub struct BackendMounter {
    loader: Arc<dyn BackendLoader>,
    routes: MountedRoutes,
    host: HostHandle,
    datastore: DataStoreProvisioner,
}

impl BackendMounter {
    pub fn new(
        loader: Arc<dyn BackendLoader>,
        routes: MountedRoutes,
        host: HostHandle,
        datastore: DataStoreProvisioner,
    ) -> Self {
        Self {
            loader,
            routes,
            host,
            datastore,
        }
    }

    pub fn routes(&self) -> &MountedRoutes {
        &self.routes
    }

    pub async fn mount(
        &self,
        slug: &str,
        backend: Option<&BackendSpec>,
        package_dir: &Path,
        db_file: &Path,
    ) -> Result<MountOutcome, ModhostError> {
        let Some(entry) = backend.and_then(BackendSpec::entry) else {
            return Ok(MountOutcome::NoBackend);
        };

        let entry_path =
            resolve_package_path(package_dir, entry).ok_or_else(|| ModhostError::Load {
                slug: slug.to_string(),
                message: format!("entry path {entry:?} points outside the package"),
            })?;

        let Some(module) = self.loader.load(slug, &entry_path)? else {
            warn!(
                slug,
                entry, "backend entry exports no mount function; module is inert server-side"
            );
            return Ok(MountOutcome::Inert);
        };

        let mount_err = |message: String| ModhostError::Mount {
            slug: slug.to_string(),
            message,
        };

        let db = self
            .datastore
            .open(db_file)
            .await
            .map_err(|e| mount_err(format!("failed to open module data store: {e}")))?;

        let prefix = mount_prefix(slug);
        let ctx = MountContext {
            slug: slug.to_string(),
            prefix: prefix.clone(),
            db,
            host: self.host.clone(),
        };
        let mut registrar = RouteRegistrar::new(prefix.clone());

        match AssertUnwindSafe(module.mount(&mut registrar, &ctx))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(mount_err(e.to_string())),
            Err(panic) => {
                return Err(mount_err(format!(
                    "mount function panicked: {}",
                    panic_message(panic.as_ref())
                )));
            }
        }

        let registered = registrar.registered();
        // axum panics on conflicting or malformed paths when the set is assembled.
        let router = std::panic::catch_unwind(AssertUnwindSafe(|| registrar.into_router()))
            .map_err(|panic| {
                mount_err(format!(
                    "invalid route set: {}",
                    panic_message(panic.as_ref())
                ))
            })?;

        match router {
            Some(router) => self.routes.install(slug, router),
            None => {
                self.routes.remove(slug);
            }
        }

        info!(slug, prefix = %prefix, routes = registered, "backend mounted");
        Ok(MountOutcome::Mounted { routes: registered })
    }

    pub fn unmount(&self, slug: &str) -> bool {
        self.routes.remove(slug)
    }
}
