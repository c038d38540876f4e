//! This module groups every linear system of a collection into one flat benchmark
//! directory:
//!
//! ```text
//! benchmark_data/
//!   <name>.mtx       system matrix A
//!   <name>_b.mtx     right-hand side b
//!   <name>_sol.mtx   expected solution x
//! ```
//!
//! Materialization is idempotent. A target file that already exists is never copied
//! again, so re-running after an interruption only fills in the missing pieces. A
//! matrix whose files cannot be copied is reported and left out of the returned
//! collection; it does not stop the remaining matrices.

use crate::{
    error::{BenchError, BenchErrorKind},
    fetch::MatrixSource,
    matrix::{FetchFailure, MatrixCollection, MatrixDescriptor},
    utils::fs::{copy_if_missing, ensure_dir},
};
use std::path::{Path, PathBuf};

/// Default name of the benchmark directory, relative to the working directory.
pub const BENCHMARK_DIR: &str = "benchmark_data";

/// The canonical on-disk layout of a benchmark directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkLayout {
    root: PathBuf,
}

impl BenchmarkLayout {
    /// A layout rooted at `root`, usually `<work_dir>/benchmark_data`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<name>.mtx`
    pub fn matrix_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.mtx"))
    }

    /// `<root>/<name>_b.mtx`
    pub fn rhs_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}_b.mtx"))
    }

    /// `<root>/<name>_sol.mtx`
    pub fn sol_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}_sol.mtx"))
    }

    /// Fills unset file fields from files already present in the benchmark directory.
    ///
    /// A materialized solution counts as a solution source, so `has_sol` is set with it.
    pub fn adopt_cached(&self, collection: MatrixCollection) -> MatrixCollection {
        let existing = |p: PathBuf| p.is_file().then_some(p);
        collection
            .into_iter()
            .map(|mut m| {
                if m.file.is_none() {
                    m.file = existing(self.matrix_path(&m.name));
                }
                if m.rhs_file.is_none() {
                    m.rhs_file = existing(self.rhs_path(&m.name));
                }
                if m.sol_file.is_none() {
                    if let Some(sol) = existing(self.sol_path(&m.name)) {
                        m.sol_file = Some(sol);
                        m.has_sol = true;
                    }
                }
                m
            })
            .collect()
    }
}

/// One matrix that could not be materialized.
#[derive(Debug)]
pub struct MaterializeFailure {
    pub name: String,
    pub error: BenchError,
}

/// The result of [`make_benchmark`].
#[derive(Debug, Default)]
pub struct Materialized {
    /// The materialized descriptors, with every file field pointing into the benchmark directory.
    pub collection: MatrixCollection,
    /// Number of files copied by this run.
    pub copied: usize,
    /// Matrices the source could not fully supply.
    pub fetch_failures: Vec<FetchFailure>,
    /// Matrices left out because one of their files could not be copied.
    pub failures: Vec<MaterializeFailure>,
}

/// Ensures every system of `collection` is cached locally, then copies it into `layout`.
///
/// Only descriptors missing one of their three files are handed to `source`. The
/// returned collection reads from the benchmark directory, never from the cache.
///
/// # Errors
/// Fails only when the benchmark directory itself cannot be created. Per-matrix
/// problems are reported in [`Materialized::failures`].
pub fn make_benchmark<S>(
    collection: MatrixCollection,
    source: &S,
    layout: &BenchmarkLayout,
) -> Result<Materialized, BenchError>
where
    S: MatrixSource + ?Sized,
{
    let collection = layout.adopt_cached(collection);

    let mut not_cached = collection.select(|m| !m.is_complete());
    let (collection, fetch_failures) = if not_cached.is_empty() {
        log::info!("All systems are cached, will not re-fetch.");
        (collection, Vec::new())
    } else {
        log::info!("Fetching {} system(s) that are not cached.", not_cached.len());
        let failures = not_cached.download(source);
        (collection.merged(not_cached), failures)
    };

    ensure_dir(layout.root())?;

    let mut out = Materialized {
        fetch_failures,
        ..Materialized::default()
    };
    for m in collection {
        let name = m.name.clone();
        match materialize_one(m, layout) {
            Ok((descriptor, copied)) => {
                out.copied += copied;
                out.collection.push(descriptor);
            }
            Err(error) => {
                log::error!("Could not materialize '{name}': {error}");
                out.failures.push(MaterializeFailure { name, error });
            }
        }
    }
    log::info!(
        "Benchmark directory {:?} holds {} system(s); {} file(s) copied.",
        layout.root(),
        out.collection.len(),
        out.copied
    );
    Ok(out)
}

/// Copies the missing pieces of one system and repoints its fields at the layout.
fn materialize_one(
    m: MatrixDescriptor,
    layout: &BenchmarkLayout,
) -> Result<(MatrixDescriptor, usize), BenchError> {
    let targets = [
        ("matrix", &m.file, layout.matrix_path(&m.name)),
        ("right-hand side", &m.rhs_file, layout.rhs_path(&m.name)),
        ("solution", &m.sol_file, layout.sol_path(&m.name)),
    ];

    let mut copied = 0;
    for (role, source, target) in &targets {
        if target.exists() {
            continue;
        }
        let source = source.as_ref().ok_or_else(|| BenchErrorKind::MissingSource {
            name: m.name.clone(),
            role: *role,
        })?;
        if copy_if_missing(source, target)? {
            log::debug!("Copied {source:?} -> {target:?}");
            copied += 1;
        }
    }

    let [(_, _, file), (_, _, rhs_file), (_, _, sol_file)] = targets;
    Ok((
        MatrixDescriptor {
            name: m.name.clone(),
            file: Some(file),
            rhs_file: Some(rhs_file),
            sol_file: Some(sol_file),
            has_sol: true,
        },
        copied,
    ))
}
