//! Registry database: models and schema for persistent module metadata.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `actor.rs`: the actor that owns the pool, plus its cloneable handle

pub mod actor;
pub mod models;
pub mod patch;
pub mod schema;

pub use models::DbModule;
pub use patch::ModuleUpsert;
pub use schema::SQLITE_INIT;

pub use actor::{RegistryHandle, spawn};
