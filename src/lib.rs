pub mod config;
pub mod datastore;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod mount;
pub mod server;
pub mod store;

pub(crate) mod utils;

pub use error::ModhostError;
pub use lifecycle::{LifecycleController, RemountReport};
