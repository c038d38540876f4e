//! The remote matrix repository client.
//!
//! The rest of the pipeline only sees the [`MatrixSource`] trait: given a canonical
//! name, return the local paths of the system matrix and right-hand side. The
//! concrete [`SuiteSparseSource`] serves them from an on-disk cache and falls back
//! to downloading the Matrix Market tarball from the SuiteSparse collection
//! (formerly the University of Florida collection).

use crate::{
    error::{BenchError, BenchErrorKind},
    matrix::{MatrixCollection, MatrixDescriptor},
    utils::{fs::ensure_dir, name_list::MatrixEntry},
};
use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use std::{
    collections::HashMap,
    io::Read,
    path::{Path, PathBuf},
    time::Duration,
};
use tempfile::NamedTempFile;

/// Default address of the SuiteSparse matrix collection.
pub const DEFAULT_BASE_URL: &str = "https://sparse.tamu.edu";

/// Upper bound for establishing a connection. Transfers themselves are not
/// time-limited, since the largest tarballs take minutes to stream.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Local files obtained for one matrix. A field is `None` when the source
/// could not supply that piece.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedMatrix {
    pub file: Option<PathBuf>,
    pub rhs_file: Option<PathBuf>,
}

/// Capability to materialize a matrix and its right-hand side on local disk.
pub trait MatrixSource {
    /// Returns whatever local files are available for `name`, downloading them if needed.
    ///
    /// An `Err` means the source was unreachable or the name is unknown; a partially
    /// filled [`FetchedMatrix`] means the source has the matrix but not every piece.
    fn fetch(&self, name: &str) -> Result<FetchedMatrix, BenchError>;
}

/// A [`MatrixSource`] backed by the SuiteSparse HTTP endpoint and a local cache.
///
/// Cached files live at `<cache_dir>/<name>/<name>.mtx` and `<cache_dir>/<name>/<name>_b.mtx`,
/// the same layout the upstream tarballs unpack to.
pub struct SuiteSparseSource {
    base_url: String,
    cache_dir: PathBuf,
    entries: Vec<MatrixEntry>,
    groups: HashMap<String, String>,
    client: Client,
}

impl SuiteSparseSource {
    /// Creates a source for the listed matrices. Entries without a group can only
    /// be served from the cache.
    pub fn new(
        base_url: impl Into<String>,
        cache_dir: impl Into<PathBuf>,
        entries: Vec<MatrixEntry>,
    ) -> Result<Self, BenchError> {
        let groups = entries
            .iter()
            .filter_map(|e| e.group.clone().map(|g| (e.name.clone(), g)))
            .collect();
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(None)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache_dir: cache_dir.into(),
            entries,
            groups,
            client,
        })
    }

    /// Returns one descriptor per listed symmetric positive definite system with a
    /// known right-hand side, in list order, with any cached files already attached.
    pub fn spd_linear_systems(&self) -> MatrixCollection {
        self.entries
            .iter()
            .map(|entry| {
                let cached = self.cached(&entry.name);
                MatrixDescriptor {
                    file: cached.file,
                    rhs_file: cached.rhs_file,
                    ..MatrixDescriptor::new(entry.name.clone())
                }
            })
            .collect()
    }

    fn matrix_dir(&self, name: &str) -> PathBuf {
        self.cache_dir.join(name)
    }

    fn cached(&self, name: &str) -> FetchedMatrix {
        let dir = self.matrix_dir(name);
        let existing = |p: PathBuf| p.is_file().then_some(p);
        FetchedMatrix {
            file: existing(dir.join(format!("{name}.mtx"))),
            rhs_file: existing(dir.join(format!("{name}_b.mtx"))),
        }
    }

    fn download(&self, name: &str, group: &str) -> Result<(), BenchError> {
        let url = format!("{}/MM/{}/{}.tar.gz", self.base_url, group, name);
        log::info!("Downloading {url}");
        let response = self.client.get(&url).send()?.error_for_status()?;

        let dir = self.matrix_dir(name);
        ensure_dir(&dir)?;
        let unpacked = unpack_system_files(response, name, &dir).map_err(|e| {
            BenchErrorKind::Fetch {
                name: name.to_string(),
                reason: format!("could not unpack tarball from {url}: {e}"),
            }
        })?;
        log::debug!("Unpacked {unpacked} file(s) for '{name}' into {dir:?}");
        Ok(())
    }
}

impl MatrixSource for SuiteSparseSource {
    fn fetch(&self, name: &str) -> Result<FetchedMatrix, BenchError> {
        let cached = self.cached(name);
        if cached.file.is_some() && cached.rhs_file.is_some() {
            log::debug!("Using cached system for '{name}'.");
            return Ok(cached);
        }
        let group = self.groups.get(name).ok_or_else(|| BenchErrorKind::Fetch {
            name: name.to_string(),
            reason: "not cached and no collection group is known".to_string(),
        })?;
        self.download(name, group)?;
        Ok(self.cached(name))
    }
}

/// Extracts `<name>.mtx` and `<name>_b.mtx` from a gzip-compressed tarball stream into `dir`.
///
/// Other entries (auxiliary vectors, coordinates) are skipped. Each file is written
/// to a temporary sibling and renamed once complete, so a truncated stream never
/// leaves a partial file under its final name. Returns the number of files written.
fn unpack_system_files(tarball: impl Read, name: &str, dir: &Path) -> std::io::Result<usize> {
    let wanted = [format!("{name}.mtx"), format!("{name}_b.mtx")];
    let mut archive = tar::Archive::new(GzDecoder::new(tarball));
    let mut unpacked = 0;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let file_name = match entry.path()?.file_name().and_then(|f| f.to_str()) {
            Some(f) => f.to_string(),
            None => continue,
        };
        if wanted.contains(&file_name) {
            let mut partial = NamedTempFile::new_in(dir)?;
            std::io::copy(&mut entry, partial.as_file_mut())?;
            partial.persist(dir.join(&file_name))?;
            unpacked += 1;
        }
    }
    Ok(unpacked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Compression, write::GzEncoder};

    fn tarball(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (path, contents) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *contents).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    /// Poorly compressible bytes, so that cutting the gzip stream cuts the payload.
    fn noise(len: usize) -> Vec<u8> {
        let mut state: u32 = 0x2545_f491;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 24) as u8
            })
            .collect()
    }

    #[test]
    fn test_unpack_keeps_only_system_files() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = tarball(&[
            ("nos4/nos4.mtx", b"A".as_slice()),
            ("nos4/nos4_b.mtx", b"b".as_slice()),
            ("nos4/nos4_coord.mtx", b"xy".as_slice()),
        ]);
        let n = unpack_system_files(bytes.as_slice(), "nos4", dir.path()).unwrap();
        assert_eq!(n, 2);
        assert!(dir.path().join("nos4.mtx").is_file());
        assert!(dir.path().join("nos4_b.mtx").is_file());
        assert!(!dir.path().join("nos4_coord.mtx").exists());
    }

    #[test]
    fn test_truncated_tarball_is_refetched_not_cached() {
        let cache = tempfile::tempdir().unwrap();
        let dir = cache.path().join("nos4");
        std::fs::create_dir_all(&dir).unwrap();
        let rhs = noise(200_000);
        let bytes = tarball(&[
            ("nos4/nos4.mtx", b"A".as_slice()),
            ("nos4/nos4_b.mtx", rhs.as_slice()),
        ]);
        let truncated = &bytes[..bytes.len() / 2];

        assert!(unpack_system_files(truncated, "nos4", &dir).is_err());
        assert!(!dir.join("nos4_b.mtx").exists());
        let leftovers: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert!(
            leftovers.iter().all(|f| f == "nos4.mtx"),
            "unexpected files {leftovers:?}"
        );

        // The incomplete system is downloaded again; the unroutable address makes that fail.
        let entries = vec![MatrixEntry {
            group: Some("HB".to_string()),
            name: "nos4".to_string(),
        }];
        let source = SuiteSparseSource::new("http://127.0.0.1:9", cache.path(), entries).unwrap();
        assert!(source.fetch("nos4").is_err());
    }

    #[test]
    fn test_cache_hit_needs_no_network() {
        let cache = tempfile::tempdir().unwrap();
        let dir = cache.path().join("nos4");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("nos4.mtx"), "A").unwrap();
        std::fs::write(dir.join("nos4_b.mtx"), "b").unwrap();

        // Unroutable base URL: any network access would fail the fetch.
        let entries = vec![MatrixEntry {
            group: None,
            name: "nos4".to_string(),
        }];
        let source = SuiteSparseSource::new("http://127.0.0.1:9", cache.path(), entries).unwrap();
        let fetched = source.fetch("nos4").unwrap();
        assert_eq!(fetched.file, Some(dir.join("nos4.mtx")));
        assert_eq!(fetched.rhs_file, Some(dir.join("nos4_b.mtx")));

        let systems = source.spd_linear_systems();
        assert_eq!(systems.names(), vec!["nos4"]);
        assert_eq!(systems.get("nos4").unwrap().file, Some(dir.join("nos4.mtx")));
    }

    #[test]
    fn test_uncached_without_group_is_a_fetch_error() {
        let cache = tempfile::tempdir().unwrap();
        let source = SuiteSparseSource::new(DEFAULT_BASE_URL, cache.path(), Vec::new()).unwrap();
        let err = source.fetch("nos4").unwrap_err();
        assert!(matches!(err.kind(), BenchErrorKind::Fetch { .. }));
    }
}
