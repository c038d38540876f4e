//! Runs external solvers over a materialized benchmark and collects their metrics.
//!
//! A solver is invoked once per system as
//! `<solver> -mat <A> -rhs <b> -lhs <x>` with the working directory as its current
//! directory. During that single run it writes one JSON log per internal
//! configuration, `sol.<configuration>.mtx.log`, which is parsed into a
//! [`ResultRow`] labelled `<family>:<configuration>`.

use crate::{
    error::{BenchError, BenchErrorKind},
    matrix::{MatrixCollection, MatrixDescriptor},
    report::{ResultRow, SolverMetrics},
};
use std::{
    path::{Path, PathBuf},
    process::{Command, Stdio},
    str::FromStr,
    time::Duration,
};
use wait_timeout::ChildExt;

/// An external solver executable and the configurations it logs on every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverSpec {
    /// Label prefix in the report, e.g. `CG`.
    pub family: String,
    /// Solver executable. A relative path is resolved against the runner's
    /// working directory, not the process's current directory.
    pub path: PathBuf,
    /// Configuration names, e.g. the preconditioners `ilu` and `upc`.
    pub configurations: Vec<String>,
}

impl SolverSpec {
    /// Creates a spec; see [`SolverSpec::path`] for how `path` is resolved.
    pub fn new(
        family: impl Into<String>,
        path: impl Into<PathBuf>,
        configurations: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            family: family.into(),
            path: path.into(),
            configurations: configurations.into_iter().map(Into::into).collect(),
        }
    }

    /// File name of the log written for `configuration`.
    pub fn log_file_name(configuration: &str) -> String {
        format!("sol.{configuration}.mtx.log")
    }

    /// Report label of one configuration, `<family>:<configuration>`.
    pub fn label(&self, configuration: &str) -> String {
        format!("{}:{}", self.family, configuration)
    }
}

/// The conjugate gradient solver, two levels above the working directory in `build/`.
pub fn default_solvers() -> Vec<SolverSpec> {
    vec![SolverSpec::new("CG", "../../build/spam", ["ilu", "upc"])]
}

impl FromStr for SolverSpec {
    type Err = BenchError;

    /// Parses `FAMILY=PATH:cfg1,cfg2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |why: &str| BenchErrorKind::InvalidSolverSpec(format!("'{s}': {why}"));
        let (family, rest) = s
            .split_once('=')
            .ok_or_else(|| invalid("expected FAMILY=PATH:CONFIGS"))?;
        let (path, configs) = rest
            .rsplit_once(':')
            .ok_or_else(|| invalid("missing ':' before the configuration list"))?;
        let configurations: Vec<&str> = configs
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect();
        if family.trim().is_empty() || path.is_empty() || configurations.is_empty() {
            return Err(invalid("family, path and at least one configuration are required").into());
        }
        Ok(SolverSpec::new(family.trim(), path, configurations))
    }
}

/// What to do when a configuration's log is missing or malformed after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogPolicy {
    /// Record a failure for that matrix and configuration and keep going.
    #[default]
    Skip,
    /// Stop the whole benchmark with the log error.
    Abort,
}

/// How solvers are run: where, for how long, and how strictly their logs are read.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Current directory of every solver process; its logs are read from here.
    pub work_dir: PathBuf,
    /// Kill a solver run after this long. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub log_policy: LogPolicy,
}

impl RunnerOptions {
    /// Options for `work_dir` with no timeout and the default [`LogPolicy`].
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            timeout: None,
            log_policy: LogPolicy::default(),
        }
    }
}

/// A (matrix, solver) combination that produced no row.
#[derive(Debug)]
pub struct RunFailure {
    pub matrix: String,
    /// Solver label, `<family>` or `<family>:<configuration>`.
    pub solver: String,
    pub error: BenchError,
}

/// The result of [`run_benchmark`].
#[derive(Debug, Default)]
pub struct BenchmarkOutcome {
    /// One row per successful (matrix, configuration), in iteration order.
    pub rows: Vec<ResultRow>,
    /// Solver paths, as configured, that did not exist.
    pub skipped_solvers: Vec<PathBuf>,
    pub failures: Vec<RunFailure>,
}

/// Runs every solver on every system of `collection`.
///
/// # Errors
/// Returns an error when stale logs cannot be removed, or when a log is missing or
/// malformed and `options.log_policy` is [`LogPolicy::Abort`]. A missing solver
/// executable is never an error; it is listed in [`BenchmarkOutcome::skipped_solvers`].
pub fn run_benchmark(
    collection: &MatrixCollection,
    solvers: &[SolverSpec],
    options: &RunnerOptions,
) -> Result<BenchmarkOutcome, BenchError> {
    let mut outcome = BenchmarkOutcome::default();

    for spec in solvers {
        let resolved = options.work_dir.join(&spec.path);
        if !resolved.exists() {
            log::error!("Missing solver {resolved:?}; skipping it.");
            outcome.skipped_solvers.push(spec.path.clone());
            continue;
        }
        let solver = std::path::absolute(&resolved).map_err(|e| BenchError::io(&resolved, e))?;

        for m in collection {
            log::info!("Running {} on '{}'...", spec.family, m.name);
            for configuration in &spec.configurations {
                remove_stale_log(&log_path(options, configuration))?;
            }

            if let Err(error) = invoke(&solver, m, options) {
                log::error!("{} failed on '{}': {}", spec.family, m.name, error);
                outcome.failures.push(RunFailure {
                    matrix: m.name.clone(),
                    solver: spec.family.clone(),
                    error,
                });
                continue;
            }

            for configuration in &spec.configurations {
                let label = spec.label(configuration);
                match read_metrics(&log_path(options, configuration)) {
                    Ok(metrics) => outcome.rows.push(ResultRow::new(metrics, &m.name, label)),
                    Err(error) if options.log_policy == LogPolicy::Abort => return Err(error),
                    Err(error) => {
                        log::warn!("No result for {label} on '{}': {error}", m.name);
                        outcome.failures.push(RunFailure {
                            matrix: m.name.clone(),
                            solver: label,
                            error,
                        });
                    }
                }
            }
        }
    }

    Ok(outcome)
}

fn log_path(options: &RunnerOptions, configuration: &str) -> PathBuf {
    options
        .work_dir
        .join(SolverSpec::log_file_name(configuration))
}

/// Deletes a log left behind by an earlier run so it cannot be attributed to the next matrix.
fn remove_stale_log(path: &Path) -> Result<(), BenchError> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(BenchError::io(path, e)),
        _ => Ok(()),
    }
}

/// Runs one solver process to completion on one system.
fn invoke(solver: &Path, m: &MatrixDescriptor, options: &RunnerOptions) -> Result<(), BenchError> {
    let input = |role: &'static str, p: &Option<PathBuf>| -> Result<PathBuf, BenchError> {
        let p = p.as_ref().ok_or_else(|| BenchErrorKind::MissingSource {
            name: m.name.clone(),
            role,
        })?;
        std::path::absolute(p).map_err(|e| BenchError::io(p, e))
    };
    let mat = input("matrix", &m.file)?;
    let rhs = input("right-hand side", &m.rhs_file)?;
    let lhs = input("solution", &m.sol_file)?;

    let spawn_err = |source| BenchErrorKind::SolverSpawn {
        solver: solver.to_path_buf(),
        source,
    };
    let mut child = Command::new(solver)
        .arg("-mat")
        .arg(&mat)
        .arg("-rhs")
        .arg(&rhs)
        .arg("-lhs")
        .arg(&lhs)
        .current_dir(&options.work_dir)
        .stdout(Stdio::null())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(spawn_err)?;

    let status = match options.timeout {
        Some(timeout) => match child.wait_timeout(timeout).map_err(spawn_err)? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(BenchErrorKind::SolverTimeout {
                    solver: solver.to_path_buf(),
                    matrix: m.name.clone(),
                    seconds: timeout.as_secs(),
                }
                .into());
            }
        },
        None => child.wait().map_err(spawn_err)?,
    };

    if !status.success() {
        log::warn!(
            "Solver {solver:?} exited with {status} on '{}'; reading its logs anyway.",
            m.name
        );
    }
    Ok(())
}

/// Parses one configuration's JSON log.
fn read_metrics(path: &Path) -> Result<SolverMetrics, BenchError> {
    if !path.is_file() {
        return Err(BenchErrorKind::LogMissing {
            path: path.to_path_buf(),
        }
        .into());
    }
    let text = std::fs::read_to_string(path).map_err(|e| BenchError::io(path, e))?;
    serde_json::from_str(&text).map_err(|source| {
        BenchErrorKind::LogParse {
            path: path.to_path_buf(),
            source,
        }
        .into()
    })
}
