//! This module defines the custom error types for the library.
//!
//! All conditions that abort a pipeline stage are centralized in a single enum,
//! [`BenchErrorKind`], wrapped by the public [`BenchError`]. Conditions the
//! pipeline recovers from (a missing solution, an absent solver, one matrix
//! failing to copy) are not errors; they are collected into the outcome structs
//! of the stage that observed them.
//!
//! Using the [`thiserror`] crate allows us to create idiomatic error types with minimal
//! boilerplate. [`std::io::Error`] and [`reqwest::Error`] do not implement `PartialEq`,
//! so errors are compared through [`BenchError::kind`] and pattern matching.
use std::path::PathBuf;
use thiserror::Error;

/// Represents all possible errors that can abort a benchmark stage.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct BenchError(#[from] BenchErrorKind);

impl BenchError {
    /// Returns the distinct kind of this error.
    pub fn kind(&self) -> &BenchErrorKind {
        &self.0
    }
}

/// The distinct kinds of errors.
#[derive(Error, Debug)]
pub enum BenchErrorKind {
    /// A filesystem operation on `path` failed.
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A directory required by the benchmark layout could not be created.
    #[error("Failed to create directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A descriptor has no source file for one of its roles (matrix, rhs, solution).
    #[error("Matrix '{name}' has no {role} file to copy")]
    MissingSource { name: String, role: &'static str },

    /// A gzip-compressed tar archive could not be read or unpacked.
    #[error("Failed to unpack archive {path:?}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The remote repository could not supply a matrix.
    #[error("Failed to fetch matrix '{name}': {reason}")]
    Fetch { name: String, reason: String },

    /// Wraps a transport error from the HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The solver executable exists but could not be started.
    #[error("Failed to execute solver {solver:?}: {source}")]
    SolverSpawn {
        solver: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The solver did not finish within the configured timeout and was killed.
    #[error("Solver {solver:?} timed out after {seconds}s on matrix '{matrix}'")]
    SolverTimeout {
        solver: PathBuf,
        matrix: String,
        seconds: u64,
    },

    /// The solver finished but the expected log file is not there.
    #[error("Solver log {path:?} was not written")]
    LogMissing { path: PathBuf },

    /// The solver log exists but is not a valid metrics record.
    #[error("Failed to parse solver log {path:?}: {source}")]
    LogParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A solver specification string could not be parsed.
    #[error("Invalid solver specification: {0}")]
    InvalidSolverSpec(String),
}

impl BenchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BenchErrorKind::Io {
            path: path.into(),
            source,
        }
        .into()
    }
}

impl From<reqwest::Error> for BenchError {
    fn from(err: reqwest::Error) -> Self {
        BenchErrorKind::Http(err).into()
    }
}

// Unit tests to ensure error messages are formatted correctly.
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_source_message() {
        let error = BenchError(BenchErrorKind::MissingSource {
            name: "bcsstk14".to_string(),
            role: "solution",
        });
        assert_eq!(
            error.to_string(),
            "Matrix 'bcsstk14' has no solution file to copy"
        );
    }

    #[test]
    fn test_timeout_message() {
        let error = BenchError(BenchErrorKind::SolverTimeout {
            solver: PathBuf::from("build/spam"),
            matrix: "nos4".to_string(),
            seconds: 30,
        });
        assert_eq!(
            error.to_string(),
            "Solver \"build/spam\" timed out after 30s on matrix 'nos4'"
        );
    }

    #[test]
    fn test_log_missing_message() {
        let error = BenchError(BenchErrorKind::LogMissing {
            path: PathBuf::from("sol.ilu.mtx.log"),
        });
        assert_eq!(
            error.to_string(),
            "Solver log \"sol.ilu.mtx.log\" was not written"
        );
    }

    #[test]
    fn test_kind_is_exposed() {
        let error = BenchError::io(
            "benchmark_data",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(error.kind(), BenchErrorKind::Io { .. }));
        assert_eq!(error.to_string(), "I/O error on \"benchmark_data\": denied");
    }
}
