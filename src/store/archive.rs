use crate::error::ModhostError;
use flate2::read::GzDecoder;
use std::path::{Path, PathBuf};
use tar::Archive;

const MANIFEST_FILE: &str = "manifest.json";

/// Unpacks a `.tar.gz` upload into `dest`.
///
/// Symlink and hardlink entries fail the whole upload. Entries whose paths would land outside
/// `dest` are skipped by the unpacker.
pub fn extract(archive: &[u8], dest: &Path) -> Result<(), ModhostError> {
    let archive_err = |e: std::io::Error| ModhostError::Archive(format!("failed to unpack upload: {e}"));

    let mut tar = Archive::new(GzDecoder::new(archive));
    tar.set_preserve_permissions(false);
    for entry in tar.entries().map_err(archive_err)? {
        let mut entry = entry.map_err(archive_err)?;
        let kind = entry.header().entry_type();
        if kind.is_symlink() || kind.is_hard_link() {
            let path = entry
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "<unreadable path>".to_string());
            return Err(ModhostError::Archive(format!(
                "link entry {path} is not allowed in a package"
            )));
        }
        entry.unpack_in(dest).map_err(archive_err)?;
    }
    Ok(())
}

/// Directory holding `manifest.json`: the extraction root, or its only subdirectory
/// (archives packed as `package/...`). The manifest must be a regular file, not a link.
pub fn package_root(extracted: &Path) -> Option<PathBuf> {
    if is_regular_file(&extracted.join(MANIFEST_FILE)) {
        return Some(extracted.to_path_buf());
    }

    let mut dirs = std::fs::read_dir(extracted)
        .ok()?
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()));

    let only = dirs.next()?;
    if dirs.next().is_some() {
        return None;
    }
    let nested = only.path();
    is_regular_file(&nested.join(MANIFEST_FILE)).then_some(nested)
}

fn is_regular_file(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_file())
}

pub fn manifest_path(root: &Path) -> PathBuf {
    root.join(MANIFEST_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Compression, write::GzEncoder};

    fn tarball(prefix: &str, files: &[(&str, &str)]) -> Vec<u8> {
        let gz = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(gz);
        for (path, body) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, format!("{prefix}{path}"), body.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn extracts_and_finds_root_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = tarball("", &[("manifest.json", "{}"), ("client.js", "x")]);

        extract(&bytes, dir.path()).unwrap();
        assert_eq!(package_root(dir.path()), Some(dir.path().to_path_buf()));
        assert!(dir.path().join("client.js").is_file());
    }

    #[test]
    fn finds_manifest_inside_single_top_level_dir() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = tarball("package/", &[("manifest.json", "{}")]);

        extract(&bytes, dir.path()).unwrap();
        assert_eq!(package_root(dir.path()), Some(dir.path().join("package")));
    }

    #[test]
    fn missing_manifest_has_no_root() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = tarball("", &[("readme.txt", "hi")]);

        extract(&bytes, dir.path()).unwrap();
        assert_eq!(package_root(dir.path()), None);
    }

    #[test]
    fn link_entries_fail_the_upload() {
        let gz = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(gz);
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Symlink);
        header.set_size(0);
        header.set_mode(0o777);
        builder
            .append_link(&mut header, "package/manifest.json", "/etc/passwd")
            .unwrap();
        let bytes = builder.into_inner().unwrap().finish().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let err = extract(&bytes, dir.path()).unwrap_err();
        assert!(matches!(err, ModhostError::Archive(_)), "got {err:?}");
        assert!(!dir.path().join("package/manifest.json").exists());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_manifest_is_not_a_package_root() {
        let outside = tempfile::tempdir().unwrap();
        let target = outside.path().join("outside.json");
        std::fs::write(&target, "{}").unwrap();

        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("package")).unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("package/manifest.json")).unwrap();

        assert_eq!(package_root(dir.path()), None);
    }

    #[test]
    fn garbage_upload_is_an_archive_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract(b"definitely not a tarball", dir.path()).unwrap_err();
        assert!(matches!(err, ModhostError::Archive(_)), "got {err:?}");
    }
}
