//! Module package manifest: typed view plus schema validation.
//!
//! Pure data layer shared by the host and its tests. Nothing in here touches disk.

mod manifest;
mod schema;
mod validate;

pub use manifest::{BackendSpec, Manifest, ModuleType, ValidatedManifest};
pub use schema::MANIFEST_SCHEMA;
pub use validate::{ValidationError, Violation, validate, validate_bytes};

/// Allowed characters of a module slug (`^[a-z0-9-]+$`).
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}
