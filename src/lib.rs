//! Benchmark preparation and orchestration for sparse linear-system solvers.
//!
//! This crate assembles a collection of sparse linear systems `Ax = b` together with
//! their expected solutions, materializes them into a flat benchmark directory, runs
//! external solver executables on every system and tabulates the metrics the solvers
//! log. It does no numerics itself and never parses Matrix Market contents; files
//! are only located, fetched, copied and handed to the solver.
//!
//! ## Pipeline
//!
//! Each stage consumes a [`MatrixCollection`] and returns the next one:
//!
//! 1. **Fetch** ([`fetch`]): a [`MatrixSource`] provides the initial systems and
//!    downloads missing matrices and right-hand sides.
//! 2. **Resolve** ([`add_solutions`]): expected solutions are attached from a
//!    `solutions.tar.gz` archive, when one exists.
//! 3. **Materialize** ([`make_benchmark`]): every system is copied into
//!    `benchmark_data/` as `<name>.mtx`, `<name>_b.mtx` and `<name>_sol.mtx`,
//!    skipping files that are already there.
//! 4. **Run** ([`run_benchmark`]): every solver is invoked once per system and its
//!    per-configuration JSON logs become [`ResultRow`]s.
//! 5. **Report** ([`report`]): rows are rendered as a table, optionally exported to CSV.
//!
//! ## Example
//!
//! ```no_run
//! use spark_bench::{BenchConfig, add_solutions, make_benchmark, run_benchmark};
//! use spark_bench::fetch::SuiteSparseSource;
//! use spark_bench::utils::name_list::load_name_list;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = BenchConfig::new(".");
//! let source = SuiteSparseSource::new(
//!     config.base_url.clone(),
//!     config.cache_dir.clone(),
//!     load_name_list(&config.name_list)?,
//! )?;
//!
//! let systems = add_solutions(&config.archive, &config.solutions_dir(), source.spd_linear_systems())?;
//! let materialized = make_benchmark(systems.select(|m| m.has_sol), &source, &config.layout())?;
//! let outcome = run_benchmark(
//!     &materialized.collection.head(config.limit),
//!     &config.solvers,
//!     &config.runner_options(),
//! )?;
//! println!("{} rows", outcome.rows.len());
//! # Ok(())
//! # }
//! ```
//!
//! All stages are sequential and every download and copy first checks whether its
//! target already exists, so an interrupted run can simply be started again.

pub mod benchmark;
pub mod config;
pub mod error;
pub mod fetch;
pub mod matrix;
pub mod report;
pub mod runner;
pub mod solutions;
pub mod utils;

// Re-export the pipeline entry points for convenient access.
pub use benchmark::{BenchmarkLayout, Materialized, make_benchmark};
pub use config::BenchConfig;
pub use error::{BenchError, BenchErrorKind};
pub use fetch::MatrixSource;
pub use matrix::{MatrixCollection, MatrixDescriptor, matrix_name};
pub use report::{ResultRow, RunReport, render_table};
pub use runner::{BenchmarkOutcome, LogPolicy, RunnerOptions, SolverSpec, run_benchmark};
pub use solutions::add_solutions;
