//! Sets up and runs the sparse linear-system benchmark.
//!
//! The systems `A` and `b` come from the SuiteSparse collection, listed one per line
//! in a name list (`uof_matrix_names.txt` by default). Expected solutions come from a
//! `solutions.tar.gz` archive of previously computed results; systems without one
//! are reported and left out. Everything is grouped under `benchmark_data/`:
//!
//! ```text
//! benchmark_data/
//!   Matrix.mtx
//!   Matrix_b.mtx
//!   Matrix_sol.mtx
//! ```
//!
//! Downloads and copies are cached, so re-running only fetches what is missing.
//! Finally each configured solver is run on the first `--limit` systems and the
//! metrics from its logs are printed as a table.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use spark_bench::{
    BenchConfig, LogPolicy, RunReport, SolverSpec, add_solutions,
    config::{DEFAULT_LIMIT, NAME_LIST},
    fetch::{DEFAULT_BASE_URL, SuiteSparseSource},
    make_benchmark,
    report::write_csv,
    run_benchmark,
    utils::name_list::load_name_list,
};
use std::{path::PathBuf, time::Duration};

/// Command-line interface for the benchmark setup and runner.
#[derive(Parser, Debug)]
#[clap(
    name = "setup-benchmark",
    about = "Fetches SPD linear systems, groups them into benchmark_data/ and runs solvers on them."
)]
struct BenchArgs {
    /// Directory holding the archive, the cache, benchmark_data/ and the solver logs.
    #[clap(long, value_name = "PATH", default_value = ".")]
    work_dir: PathBuf,

    /// Archive of precomputed solutions, relative to the working directory.
    #[clap(long, value_name = "PATH", default_value = "solutions.tar.gz")]
    archive: PathBuf,

    /// List of matrices to fetch, one per line, relative to the working directory.
    #[clap(short = 'f', long = "names", value_name = "PATH", default_value = NAME_LIST)]
    names: PathBuf,

    /// Download cache for matrices and right-hand sides. Defaults to <work-dir>/uof_cache.
    #[clap(long, value_name = "PATH")]
    cache_dir: Option<PathBuf>,

    /// Base address of the matrix collection.
    #[clap(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Solver to run, as FAMILY=PATH:CONFIG[,CONFIG...]. A relative PATH is resolved
    /// against the working directory. May be repeated.
    #[clap(long = "solver", value_name = "SPEC")]
    solvers: Vec<SolverSpec>,

    /// Number of benchmark systems to run the solvers on.
    #[clap(long, default_value_t = DEFAULT_LIMIT)]
    limit: usize,

    /// Kill a solver run that takes longer than this many seconds.
    #[clap(long)]
    timeout_secs: Option<u64>,

    /// Abort when a solver log is missing or malformed instead of skipping it.
    #[clap(long)]
    strict_logs: bool,

    /// Also write the result rows to this CSV file.
    #[clap(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// Enable debug logging.
    #[clap(long)]
    verbose: bool,
}

impl BenchArgs {
    fn into_config(self) -> BenchConfig {
        let mut config = BenchConfig::new(&self.work_dir);
        config.archive = self.work_dir.join(&self.archive);
        config.name_list = self.work_dir.join(&self.names);
        if let Some(cache_dir) = self.cache_dir {
            config.cache_dir = cache_dir;
        }
        config.base_url = self.base_url;
        if !self.solvers.is_empty() {
            config.solvers = self.solvers;
        }
        config.limit = self.limit;
        config.timeout = self.timeout_secs.map(Duration::from_secs);
        if self.strict_logs {
            config.log_policy = LogPolicy::Abort;
        }
        config
    }
}

fn main() -> Result<()> {
    let args = BenchArgs::parse();
    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logger: {}", e))?;

    let csv_path = args.csv.clone();
    let config = args.into_config();
    log::info!("Starting benchmark setup with configuration: {:?}", &config);

    let entries = load_name_list(&config.name_list)
        .with_context(|| format!("Failed to read matrix name list {:?}", &config.name_list))?;
    let source = SuiteSparseSource::new(config.base_url.clone(), config.cache_dir.clone(), entries)
        .context("Failed to set up the matrix collection client")?;

    // Already materialized files count as cached, solutions included.
    let systems = config.layout().adopt_cached(source.spd_linear_systems());
    let systems = add_solutions(&config.archive, &config.solutions_dir(), systems)
        .context("Failed to add solutions from archive")?;

    let without_solutions = systems.select(|m| !m.has_sol);
    if !without_solutions.is_empty() {
        log::warn!(
            "{} system(s) do not have solutions:\n{}",
            without_solutions.len(),
            without_solutions
        );
    }
    let with_solutions = systems.select(|m| m.has_sol);

    let materialized = make_benchmark(with_solutions, &source, &config.layout())
        .context("Failed to create the benchmark directory")?;

    let selected = materialized.collection.head(config.limit);
    let outcome = run_benchmark(&selected, &config.solvers, &config.runner_options())
        .context("Benchmark run aborted")?;

    if let Some(path) = &csv_path {
        write_csv(path, &outcome.rows)
            .with_context(|| format!("Failed to write results to {path:?}"))?;
        log::info!("Results saved to {path:?}.");
    }

    let failures = materialized
        .fetch_failures
        .iter()
        .map(|f| format!("{}: fetch: {}", f.name, f.reason))
        .chain(
            materialized
                .failures
                .iter()
                .map(|f| format!("{}: materialize: {}", f.name, f.error)),
        )
        .chain(
            outcome
                .failures
                .iter()
                .map(|f| format!("{} [{}]: {}", f.matrix, f.solver, f.error)),
        )
        .collect();

    let report = RunReport {
        without_solutions: without_solutions
            .iter()
            .map(|m| m.name.clone())
            .collect(),
        skipped_solvers: outcome.skipped_solvers,
        failures,
        rows: outcome.rows,
    };
    print!("{report}");

    Ok(())
}
