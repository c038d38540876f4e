//! Resolved configuration of a benchmark run.
//!
//! Every location the pipeline touches is derived from one explicit working
//! directory instead of the process's current directory, so a run can be pointed
//! anywhere and tests can use scratch directories.

use crate::{
    benchmark::{BENCHMARK_DIR, BenchmarkLayout},
    fetch::DEFAULT_BASE_URL,
    runner::{LogPolicy, RunnerOptions, SolverSpec, default_solvers},
    solutions::{SOLUTIONS_ARCHIVE, SOLUTIONS_DIR},
};
use std::{path::PathBuf, time::Duration};

/// Default name of the refetch list, relative to the working directory.
pub const NAME_LIST: &str = "uof_matrix_names.txt";

/// Default number of systems handed to the solvers.
pub const DEFAULT_LIMIT: usize = 3;

/// Every setting of one benchmark run.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Root of every relative location, and the solvers' current directory.
    pub work_dir: PathBuf,
    /// Archive of precomputed solutions.
    pub archive: PathBuf,
    /// List of matrices to fetch.
    pub name_list: PathBuf,
    /// Download cache for system matrices and right-hand sides.
    pub cache_dir: PathBuf,
    /// Address of the SuiteSparse collection.
    pub base_url: String,
    pub solvers: Vec<SolverSpec>,
    /// Number of materialized systems to run the solvers on.
    pub limit: usize,
    pub timeout: Option<Duration>,
    pub log_policy: LogPolicy,
}

impl BenchConfig {
    /// Default configuration rooted at `work_dir`.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.into();
        Self {
            archive: work_dir.join(SOLUTIONS_ARCHIVE),
            name_list: work_dir.join(NAME_LIST),
            cache_dir: work_dir.join("uof_cache"),
            base_url: DEFAULT_BASE_URL.to_string(),
            solvers: default_solvers(),
            limit: DEFAULT_LIMIT,
            timeout: None,
            log_policy: LogPolicy::default(),
            work_dir,
        }
    }

    /// Where the solutions archive is unpacked.
    pub fn solutions_dir(&self) -> PathBuf {
        self.work_dir.join(SOLUTIONS_DIR)
    }

    /// Layout of `<work_dir>/benchmark_data`.
    pub fn layout(&self) -> BenchmarkLayout {
        BenchmarkLayout::new(self.work_dir.join(BENCHMARK_DIR))
    }

    /// Runner options sharing this configuration's working directory.
    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions {
            work_dir: self.work_dir.clone(),
            timeout: self.timeout,
            log_policy: self.log_policy,
        }
    }
}
