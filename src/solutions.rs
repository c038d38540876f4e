//! Attaches precomputed solutions from a local archive to a collection.
//!
//! The archive is a gzip-compressed tarball of `<name>_SPD_x.mtx` files. Its entries
//! are unpacked, flattened, into a `solutions/` directory; every file found there is
//! then matched to a descriptor through [`matrix_name`]. A missing archive is an
//! expected state: the collection is returned untouched and the unresolved matrices
//! are reported by the caller.

use crate::{
    error::{BenchError, BenchErrorKind},
    matrix::{MatrixCollection, matrix_name},
    utils::fs::ensure_dir,
};
use flate2::read::GzDecoder;
use std::{
    collections::HashMap,
    fs::File,
    path::{Path, PathBuf},
};

/// Default file name of the solutions archive, relative to the working directory.
pub const SOLUTIONS_ARCHIVE: &str = "solutions.tar.gz";

/// Default extraction directory, relative to the working directory.
pub const SOLUTIONS_DIR: &str = "solutions";

/// Unpacks `archive` into `solutions_dir` and returns `collection` with every
/// matching descriptor marked as solved.
///
/// Descriptors without a matching file keep their current `sol_file` and `has_sol`.
/// When two files canonicalize to the same name, the first in lexical order wins.
pub fn add_solutions(
    archive: &Path,
    solutions_dir: &Path,
    collection: MatrixCollection,
) -> Result<MatrixCollection, BenchError> {
    if !archive.exists() {
        log::info!("No solutions archive at {archive:?}; solutions must come from elsewhere.");
        return Ok(collection);
    }

    let extracted = unpack_flat(archive, solutions_dir)?;
    log::info!("Extracted {extracted} file(s) from {archive:?} into {solutions_dir:?}");

    let found = solution_files(solutions_dir)?;
    let mut resolved = 0;
    let collection = collection
        .into_iter()
        .map(|mut m| {
            if let Some(path) = found.get(&m.name) {
                m.sol_file = Some(path.clone());
                m.has_sol = true;
                resolved += 1;
            }
            m
        })
        .collect::<MatrixCollection>();
    log::info!("Resolved solutions for {resolved} of {} matrices.", collection.len());
    Ok(collection)
}

/// Unpacks every regular file of a `.tar.gz` archive directly into `dir`.
fn unpack_flat(archive: &Path, dir: &Path) -> Result<usize, BenchError> {
    ensure_dir(dir)?;
    let to_archive_err = |source: std::io::Error| BenchErrorKind::Archive {
        path: archive.to_path_buf(),
        source,
    };

    let file = File::open(archive).map_err(to_archive_err)?;
    let mut tarball = tar::Archive::new(GzDecoder::new(file));
    let mut count = 0;
    for entry in tarball.entries().map_err(to_archive_err)? {
        let mut entry = entry.map_err(to_archive_err)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry.path().map_err(to_archive_err)?;
        let Some(file_name) = path.file_name().map(|f| f.to_os_string()) else {
            continue;
        };
        entry.unpack(dir.join(file_name)).map_err(to_archive_err)?;
        count += 1;
    }
    Ok(count)
}

/// Maps canonical matrix names to the solution files present in `dir`.
fn solution_files(dir: &Path) -> Result<HashMap<String, PathBuf>, BenchError> {
    let pattern = format!(
        "{}/*",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    let paths = glob::glob(&pattern)
        .map_err(|e| BenchError::io(dir, std::io::Error::other(e.to_string())))?;

    let mut found: HashMap<String, PathBuf> = HashMap::new();
    for path in paths {
        let path = match path {
            Ok(p) if p.is_file() => p,
            Ok(_) => continue,
            Err(e) => {
                log::warn!("Skipping unreadable entry in {dir:?}: {e}");
                continue;
            }
        };
        let Some(file_name) = path.file_name().and_then(|f| f.to_str()) else {
            continue;
        };
        let name = matrix_name(file_name);
        if let Some(first) = found.get(&name) {
            log::info!("Solution {path:?} ignored; '{name}' already resolved by {first:?}.");
            continue;
        }
        found.insert(name, path);
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::MatrixDescriptor;

    #[test]
    fn test_missing_archive_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let collection: MatrixCollection = vec![
            MatrixDescriptor::new("nos4").with_sol_file("old/nos4_sol.mtx"),
            MatrixDescriptor::new("bcsstk01"),
        ]
        .into_iter()
        .collect();
        let out = add_solutions(
            &dir.path().join(SOLUTIONS_ARCHIVE),
            &dir.path().join(SOLUTIONS_DIR),
            collection.clone(),
        )
        .unwrap();
        assert_eq!(out, collection);
        assert!(!dir.path().join(SOLUTIONS_DIR).exists());
    }

    #[test]
    fn test_duplicate_canonical_names_first_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("nos4"), "first").unwrap();
        std::fs::write(dir.path().join("nos4_SPD_x.mtx"), "second").unwrap();
        let found = solution_files(dir.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found["nos4"], dir.path().join("nos4"));
    }
}
