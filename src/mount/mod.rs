//! Backend mounting: the capability boundary between the host and module server code.
//!
//! - `backend.rs`: the `ModuleBackend` contract and what it is handed
//! - `registrar.rs`: route collection and the live per-slug route table
//! - `loader.rs`: entry-file resolution into backends
//! - `mounter.rs`: load + mount + swap into the table

pub mod builtin;

mod backend;
mod loader;
mod mounter;
mod registrar;

pub use backend::{BoxError, HostHandle, ModuleBackend, MountContext};
pub use loader::{BackendCatalog, BackendFactory, BackendLoader, LinkedBackendLoader};
pub use mounter::{BackendMounter, MountOutcome};
pub use registrar::{MountedRoutes, RouteRegistrar};

use std::any::Any;

/// Root of every module route namespace.
pub const MOUNT_ROOT: &str = "/mod";

pub fn mount_prefix(slug: &str) -> String {
    format!("{MOUNT_ROOT}/{slug}")
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
