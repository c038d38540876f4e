//! Filesystem helpers shared by the pipeline stages.

use crate::error::{BenchError, BenchErrorKind};
use std::{fs::File, path::Path};
use tempfile::NamedTempFile;

/// Creates `dir` and its parents. An already existing directory is not an error.
pub fn ensure_dir(dir: &Path) -> Result<(), BenchError> {
    std::fs::create_dir_all(dir).map_err(|source| {
        BenchErrorKind::CreateDir {
            path: dir.to_path_buf(),
            source,
        }
        .into()
    })
}

/// Directory holding `path`, for creating sibling temporary files.
fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

/// Copies `source` to `target` unless `target` already exists.
///
/// The data goes to a temporary file next to `target` that is renamed into place
/// once complete, so an interrupted copy never leaves a truncated `target` behind.
/// Returns `true` if a copy was made.
pub fn copy_if_missing(source: &Path, target: &Path) -> Result<bool, BenchError> {
    if target.exists() {
        return Ok(false);
    }
    let mut reader = File::open(source).map_err(|e| BenchError::io(source, e))?;
    let mut partial =
        NamedTempFile::new_in(parent_dir(target)).map_err(|e| BenchError::io(target, e))?;
    std::io::copy(&mut reader, partial.as_file_mut()).map_err(|e| BenchError::io(source, e))?;
    partial
        .persist(target)
        .map_err(|e| BenchError::io(target, e.error))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_if_missing_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.mtx");
        let dst = dir.path().join("dst.mtx");
        std::fs::write(&src, "new").unwrap();
        std::fs::write(&dst, "old").unwrap();

        assert!(!copy_if_missing(&src, &dst).unwrap());
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "old");
    }

    #[test]
    fn test_copy_if_missing_reports_absent_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = copy_if_missing(&dir.path().join("gone.mtx"), &dir.path().join("dst.mtx"))
            .unwrap_err();
        assert!(matches!(err.kind(), BenchErrorKind::Io { .. }));
    }

    #[test]
    fn test_failed_copy_leaves_no_target() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        std::fs::create_dir(&out).unwrap();
        // Opening a directory succeeds but reading from it fails mid-copy.
        let unreadable = dir.path().join("not-a-file");
        std::fs::create_dir(&unreadable).unwrap();
        let target = out.join("nos4.mtx");

        let err = copy_if_missing(&unreadable, &target).unwrap_err();
        assert!(matches!(err.kind(), BenchErrorKind::Io { .. }));
        assert!(!target.exists());
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn test_copy_if_missing_writes_complete_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.mtx");
        let contents = "%%MatrixMarket matrix coordinate real symmetric\n".repeat(1000);
        std::fs::write(&src, &contents).unwrap();
        let dst = dir.path().join("dst.mtx");

        assert!(copy_if_missing(&src, &dst).unwrap());
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), contents);
    }

    #[test]
    fn test_ensure_dir_accepts_existing() {
        let dir = tempfile::tempdir().unwrap();
        ensure_dir(dir.path()).unwrap();
        ensure_dir(&dir.path().join("a/b")).unwrap();
        assert!(dir.path().join("a/b").is_dir());
    }
}
