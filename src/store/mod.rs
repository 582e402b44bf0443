//! Package store: scratch extraction, versioned artifact publishing and cleanup.
//!
//! Artifacts live at `<packages_dir>/<slug>/<version>/` and are served to browsers under
//! [`PACKAGES_ROUTE`].

mod archive;

pub use archive::{extract, manifest_path, package_root};

use crate::error::ModhostError;
use modhost_manifest::{Manifest, ValidatedManifest, ValidationError};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// URL prefix under which artifact directories are served.
pub const PACKAGES_ROUTE: &str = "/packages";

#[derive(Debug, Clone)]
pub struct PackageStore {
    packages_dir: PathBuf,
    scratch_dir: PathBuf,
}

impl PackageStore {
    pub fn new(packages_dir: impl Into<PathBuf>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            packages_dir: packages_dir.into(),
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn packages_dir(&self) -> &Path {
        &self.packages_dir
    }

    pub fn artifact_dir(&self, slug: &str, version: &str) -> PathBuf {
        self.packages_dir.join(slug).join(version)
    }

    /// Fresh, uniquely named scratch directory; removed when the guard drops.
    pub fn scratch(&self) -> Result<TempDir, ModhostError> {
        fs::create_dir_all(&self.scratch_dir)
            .map_err(|e| ModhostError::fs("create scratch root", &self.scratch_dir, e))?;
        tempfile::Builder::new()
            .prefix("upload-")
            .tempdir_in(&self.scratch_dir)
            .map_err(|e| ModhostError::fs("create scratch dir", &self.scratch_dir, e))
    }

    /// Locates and validates `manifest.json` inside an extracted upload.
    ///
    /// Returns the package root together with the validated manifest.
    pub fn read_manifest(
        &self,
        extracted: &Path,
    ) -> Result<(PathBuf, ValidatedManifest), ModhostError> {
        let root = package_root(extracted).ok_or_else(|| {
            ValidationError::single("", "manifest.json not found at the package root")
        })?;
        let path = manifest_path(&root);
        let raw = fs::read(&path).map_err(|e| ModhostError::fs("read manifest", &path, e))?;
        let validated = modhost_manifest::validate_bytes(&raw)?;
        Ok((root, validated))
    }

    /// Copies `src` to `(slug, version)`, replacing whatever was there.
    pub fn publish(&self, src: &Path, slug: &str, version: &str) -> Result<PathBuf, ModhostError> {
        let dest = self.artifact_dir(slug, version);
        if dest.exists() {
            fs::remove_dir_all(&dest)
                .map_err(|e| ModhostError::fs("clear previous artifact", &dest, e))?;
        }
        copy_dir_recursive(src, &dest)?;
        debug!(slug, version, path = %dest.display(), "artifact published");
        Ok(dest)
    }

    /// Best-effort delete of `(slug, version)`; the slug directory goes too once empty.
    pub fn remove(&self, slug: &str, version: &str) {
        if !modhost_manifest::is_valid_slug(slug) {
            warn!(slug, "refusing to remove artifact for malformed slug");
            return;
        }
        let dir = self.artifact_dir(slug, version);
        if let Err(e) = fs::remove_dir_all(&dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(slug, version, path = %dir.display(), error = %e, "artifact cleanup failed");
            }
        }
        // Fails while other versions remain, which is fine.
        let _ = fs::remove_dir(self.packages_dir.join(slug));
    }
}

/// Rewrites a package-relative `entryClient` (`./x.js`) to `/packages/<slug>/<version>/x.js`.
///
/// Anything not starting with `./` is returned unchanged.
pub fn resolve_client_entry(manifest: &Manifest, slug: &str, version: &str) -> Option<String> {
    let entry = manifest.entry_client.as_deref()?;
    match entry.strip_prefix("./") {
        Some(rel) => Some(format!("{PACKAGES_ROUTE}/{slug}/{version}/{rel}")),
        None => Some(entry.to_string()),
    }
}

/// Joins a package-relative path (`./server.json`, `sql/init.sql`) onto `base`.
///
/// `None` for absolute paths or anything with `..`, so a manifest can't point outside its package.
pub fn resolve_package_path(base: &Path, rel: &str) -> Option<PathBuf> {
    let rel = Path::new(rel.trim());
    let mut out = base.to_path_buf();
    let mut pushed = false;
    for component in rel.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => {
                out.push(part);
                pushed = true;
            }
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    pushed.then_some(out)
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<(), ModhostError> {
    fs::create_dir_all(dest).map_err(|e| ModhostError::fs("create artifact dir", dest, e))?;
    let entries = fs::read_dir(src).map_err(|e| ModhostError::fs("read package dir", src, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| ModhostError::fs("read package dir", src, e))?;
        let from = entry.path();
        let to = dest.join(entry.file_name());
        let file_type = entry
            .file_type()
            .map_err(|e| ModhostError::fs("stat package entry", &from, e))?;

        if file_type.is_dir() {
            copy_dir_recursive(&from, &to)?;
        } else if file_type.is_file() {
            fs::copy(&from, &to).map_err(|e| ModhostError::fs("copy package file", &from, e))?;
        } else {
            debug!(path = %from.display(), "skipping non-regular package entry");
        }
    }
    Ok(())
}
