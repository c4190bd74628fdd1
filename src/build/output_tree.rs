//! Output tree management.
//!
//! Every build starts from an empty target directory: whatever a previous run
//! left behind is deleted first. There is no rollback, a failed run leaves
//! the tree as far as it got.

use std::fs::{self, File, FileTimes};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error while preparing or writing the output tree.
#[derive(Debug, Error)]
pub enum OutputError {
    /// The target directory would wipe or feed back into the sources
    #[error("Output directory '{}' overlaps the asset root '{}'", target.display(), asset_root.display())]
    OverlapsAssetRoot { target: PathBuf, asset_root: PathBuf },
    /// A filesystem operation failed
    #[error("Failed to {action} '{}': {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl OutputError {
    pub(crate) fn io<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> Self + 'a {
        move |source| OutputError::Io { action, path: path.to_path_buf(), source }
    }
}

/// Make a path absolute and lexically normalized without touching the
/// filesystem, so paths that do not exist yet can still be compared.
fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map(|cwd| cwd.join(path)).unwrap_or_else(|_| path.to_path_buf())
    };

    let mut result = PathBuf::new();
    for component in absolute.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                result.pop();
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

/// Resolve the longest existing ancestor through the filesystem and append
/// the rest lexically.
fn comparable(path: &Path) -> PathBuf {
    let normalized = normalize(path);
    let mut existing = normalized.as_path();
    let mut rest = Vec::new();
    loop {
        if let Ok(canonical) = fs::canonicalize(existing) {
            return rest.iter().rev().fold(canonical, |acc, name| acc.join(name));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return normalized,
        }
    }
}

/// Check that wiping the target directory cannot touch the asset root.
pub fn check_overlap(target_dir: &Path, asset_root: &Path) -> Result<(), OutputError> {
    let target = comparable(target_dir);
    let root = comparable(asset_root);
    if target.starts_with(&root) || root.starts_with(&target) {
        return Err(OutputError::OverlapsAssetRoot {
            target: target_dir.to_path_buf(),
            asset_root: asset_root.to_path_buf(),
        });
    }
    Ok(())
}

/// Delete the target directory if it exists and create it again, empty.
pub fn prepare_output_dir(target_dir: &Path, asset_root: &Path) -> Result<(), OutputError> {
    check_overlap(target_dir, asset_root)?;

    if target_dir.exists() {
        if target_dir.is_dir() {
            fs::remove_dir_all(target_dir).map_err(OutputError::io("remove", target_dir))?;
        } else {
            fs::remove_file(target_dir).map_err(OutputError::io("remove", target_dir))?;
        }
    }
    fs::create_dir_all(target_dir).map_err(OutputError::io("create directory", target_dir))
}

/// Create all missing parent directories of an output file.
pub fn ensure_parent(path: &Path) -> Result<(), OutputError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(OutputError::io("create directory", parent))
        }
        _ => Ok(()),
    }
}

/// Create an output file, replacing any existing one.
pub fn create_output_file(path: &Path) -> Result<File, OutputError> {
    ensure_parent(path)?;
    File::create(path).map_err(OutputError::io("create", path))
}

/// Copy a file byte for byte, keeping its permissions and timestamps.
///
/// Permissions are applied last so a read-only source still yields a
/// complete copy with its timestamps set.
///
/// Returns the number of bytes copied.
pub fn copy_verbatim(source: &Path, destination: &Path) -> Result<u64, OutputError> {
    ensure_parent(destination)?;
    let metadata = fs::metadata(source).map_err(OutputError::io("read metadata of", source))?;

    let mut input = File::open(source).map_err(OutputError::io("open", source))?;
    let mut output = File::create(destination).map_err(OutputError::io("create", destination))?;
    let bytes = io::copy(&mut input, &mut output).map_err(OutputError::io("copy", source))?;

    let mut times = FileTimes::new();
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    if let Ok(modified) = metadata.modified() {
        times = times.set_modified(modified);
    }
    output.set_times(times).map_err(OutputError::io("set timestamps of", destination))?;
    drop(output);

    fs::set_permissions(destination, metadata.permissions())
        .map_err(OutputError::io("set permissions of", destination))?;

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        ensure_parent(&path).unwrap();
        File::create(&path).unwrap().write_all(content).unwrap();
        path
    }

    #[test]
    fn test_prepare_creates_missing_dir() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("art");
        fs::create_dir(&root).unwrap();
        let target = temp.path().join("out/nested/assets");

        prepare_output_dir(&target, &root).unwrap();
        assert!(target.is_dir());
    }

    #[test]
    fn test_prepare_wipes_existing_content() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("art");
        fs::create_dir(&root).unwrap();
        let target = temp.path().join("out");
        create_test_file(&target, "stale/old.bin", b"old");

        prepare_output_dir(&target, &root).unwrap();
        assert!(target.is_dir());
        assert_eq!(fs::read_dir(&target).unwrap().count(), 0);
    }

    #[test]
    fn test_prepare_replaces_plain_file() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("art");
        fs::create_dir(&root).unwrap();
        let target = create_test_file(temp.path(), "out", b"not a dir");

        prepare_output_dir(&target, &root).unwrap();
        assert!(target.is_dir());
    }

    #[test]
    fn test_overlap_rejected() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("art");
        create_test_file(&root, "maps/a.tmx", b"map");

        for target in [root.clone(), root.join("build"), temp.path().to_path_buf()] {
            let err = prepare_output_dir(&target, &root).unwrap_err();
            assert!(matches!(err, OutputError::OverlapsAssetRoot { .. }));
        }
        assert!(root.join("maps/a.tmx").exists());
    }

    #[test]
    fn test_overlap_through_dot_components() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("art");
        fs::create_dir(&root).unwrap();

        let sneaky = temp.path().join("out/../art/build");
        assert!(check_overlap(&sneaky, &root).is_err());
        assert!(check_overlap(&temp.path().join("art-build"), &root).is_ok());
    }

    #[test]
    fn test_create_output_file_makes_parents() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("maps/deep/a.bin");
        create_output_file(&path).unwrap().write_all(b"x").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"x");
    }

    #[test]
    fn test_copy_verbatim_bytes_and_mtime() {
        let temp = TempDir::new().unwrap();
        let source = create_test_file(temp.path(), "src/droid.png", &[0x89, b'P', b'N', b'G', 0, 1, 2]);
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_500_000_000);
        File::options()
            .write(true)
            .open(&source)
            .unwrap()
            .set_times(FileTimes::new().set_modified(mtime))
            .unwrap();

        let destination = temp.path().join("out/sprites/droid.png");
        let copied = copy_verbatim(&source, &destination).unwrap();

        assert_eq!(copied, 7);
        assert_eq!(fs::read(&destination).unwrap(), fs::read(&source).unwrap());
        assert_eq!(fs::metadata(&destination).unwrap().modified().unwrap(), mtime);
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_verbatim_read_only_source() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let source = create_test_file(temp.path(), "gui/panel.png", b"panel");
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        File::options().write(true).open(&source).unwrap().set_times(FileTimes::new().set_modified(mtime)).unwrap();
        fs::set_permissions(&source, fs::Permissions::from_mode(0o444)).unwrap();

        let destination = temp.path().join("out/gui/panel.png");
        copy_verbatim(&source, &destination).unwrap();

        let metadata = fs::metadata(&destination).unwrap();
        assert_eq!(fs::read(&destination).unwrap(), b"panel");
        assert_eq!(metadata.permissions().mode() & 0o777, 0o444);
        assert_eq!(metadata.modified().unwrap(), mtime);
    }

    #[test]
    fn test_copy_verbatim_missing_source() {
        let temp = TempDir::new().unwrap();
        let err = copy_verbatim(&temp.path().join("missing.png"), &temp.path().join("out.png")).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read metadata of"));
        assert!(err.to_string().contains("missing.png"));
    }
}
