#![allow(dead_code)]

use flate2::{Compression, write::GzEncoder};
use modhost::LifecycleController;
use modhost::config::{InstallConfig, ResolvedStorage, StorageConfig};
use modhost::mount::{BackendCatalog, LinkedBackendLoader, builtin::builtin_catalog};
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;

pub const BOUNDARY: &str = "modhost-test-boundary";

/// A host wired against a throwaway data directory.
pub struct TestHost {
    pub dir: TempDir,
    pub storage: ResolvedStorage,
    pub database_url: String,
    pub controller: LifecycleController,
}

impl TestHost {
    pub async fn new() -> Self {
        Self::with_catalog(builtin_catalog()).await
    }

    pub async fn with_catalog(catalog: BackendCatalog) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = StorageConfig::rooted_at(dir.path()).resolve();
        let database_url = format!("sqlite:{}", dir.path().join("registry.sqlite").display());
        let controller = controller_for(&database_url, &storage, catalog).await;
        Self {
            dir,
            storage,
            database_url,
            controller,
        }
    }

    /// A second controller over the same registry and storage, like a host restart.
    pub async fn restart(&self, catalog: BackendCatalog) -> LifecycleController {
        controller_for(&self.database_url, &self.storage, catalog).await
    }
}

async fn controller_for(
    database_url: &str,
    storage: &ResolvedStorage,
    catalog: BackendCatalog,
) -> LifecycleController {
    let registry = modhost::db::spawn(database_url)
        .await
        .expect("registry actor failed to start");
    LifecycleController::new(
        registry,
        storage,
        &InstallConfig::default(),
        Arc::new(LinkedBackendLoader::new(catalog)),
    )
}

pub fn manifest(slug: &str, version: &str) -> Value {
    json!({
        "name": format!("Module {slug}"),
        "slug": slug,
        "version": version,
        "type": "ui",
        "entryClient": "./client.js",
    })
}

/// Backend manifest pointing at `server.json` and `migrations.sql` in the package.
pub fn backend_manifest(slug: &str, version: &str) -> Value {
    json!({
        "name": format!("Module {slug}"),
        "slug": slug,
        "version": version,
        "type": "full",
        "entryClient": "./client.js",
        "backend": { "entry": "./server.json", "migrations": "./migrations.sql" },
        "configSchema": { "type": "object", "properties": { "greeting": { "type": "string" } } },
    })
}

pub const IDEMPOTENT_MIGRATION: &str =
    "CREATE TABLE IF NOT EXISTS notes (id INTEGER PRIMARY KEY, body TEXT NOT NULL);";

/// Gzipped tarball with `files` placed under `package/`.
pub fn tarball(files: &[(&str, &[u8])]) -> Vec<u8> {
    let gz = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(gz);
    for (path, body) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("package/{path}"), *body)
            .expect("append tar entry");
    }
    builder
        .into_inner()
        .expect("finish tar")
        .finish()
        .expect("finish gzip")
}

pub fn ui_package(slug: &str, version: &str, client_js: &str) -> Vec<u8> {
    let manifest = manifest(slug, version).to_string();
    tarball(&[
        ("manifest.json", manifest.as_bytes()),
        ("client.js", client_js.as_bytes()),
    ])
}

pub fn backend_package(slug: &str, version: &str, export: &str, migration: &str) -> Vec<u8> {
    let manifest = backend_manifest(slug, version).to_string();
    let entry = json!({ "export": export }).to_string();
    tarball(&[
        ("manifest.json", manifest.as_bytes()),
        ("client.js", &b"export default {};"[..]),
        ("server.json", entry.as_bytes()),
        ("migrations.sql", migration.as_bytes()),
    ])
}

/// `multipart/form-data` body with one file field named `field`.
pub fn multipart_body(field: &str, filename: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/gzip\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

/// Gzipped tarball whose `package/manifest.json` is a symlink to `target`.
pub fn symlinked_manifest_tarball(target: &std::path::Path) -> Vec<u8> {
    let gz = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(gz);
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Symlink);
    header.set_size(0);
    header.set_mode(0o777);
    builder
        .append_link(&mut header, "package/manifest.json", target)
        .expect("append symlink entry");
    builder
        .into_inner()
        .expect("finish tar")
        .finish()
        .expect("finish gzip")
}
