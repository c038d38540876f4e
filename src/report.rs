//! Result rows and their presentation.
//!
//! Every solver log becomes one [`ResultRow`]. Rows are rendered as a plain text
//! table by [`render_table`], exported with [`write_csv`], and embedded in the
//! final [`RunReport`] together with everything that was skipped along the way.

use serde::{Deserialize, Serialize};
use std::{
    fmt,
    path::{Path, PathBuf},
};

/// Keys every solver log must provide, in report column order.
pub const METRIC_FIELDS: [&str; 6] = [
    "estimated error",
    "solve took",
    "setup took",
    "error",
    "iterations",
    "bench repetitions",
];

/// Column headers of the result table: the metrics, then the row identity.
pub fn report_headers() -> Vec<&'static str> {
    METRIC_FIELDS
        .iter()
        .copied()
        .chain(["matrix", "solver"])
        .collect()
}

/// Metrics reported by one solver configuration for one system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverMetrics {
    #[serde(rename = "estimated error")]
    pub estimated_error: f64,
    #[serde(rename = "solve took")]
    pub solve_took: f64,
    #[serde(rename = "setup took")]
    pub setup_took: f64,
    pub error: f64,
    pub iterations: u64,
    #[serde(rename = "bench repetitions")]
    pub bench_repetitions: u64,
}

/// One line of the result table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    #[serde(rename = "estimated error")]
    pub estimated_error: f64,
    #[serde(rename = "solve took")]
    pub solve_took: f64,
    #[serde(rename = "setup took")]
    pub setup_took: f64,
    pub error: f64,
    pub iterations: u64,
    #[serde(rename = "bench repetitions")]
    pub bench_repetitions: u64,
    pub matrix: String,
    /// `<family>:<configuration>`, e.g. `CG:ilu`.
    pub solver: String,
}

impl ResultRow {
    /// Labels `metrics` with the matrix and solver they belong to.
    pub fn new(metrics: SolverMetrics, matrix: impl Into<String>, solver: impl Into<String>) -> Self {
        Self {
            estimated_error: metrics.estimated_error,
            solve_took: metrics.solve_took,
            setup_took: metrics.setup_took,
            error: metrics.error,
            iterations: metrics.iterations,
            bench_repetitions: metrics.bench_repetitions,
            matrix: matrix.into(),
            solver: solver.into(),
        }
    }

    /// Formats the row in [`report_headers`] order.
    pub fn cells(&self) -> Vec<String> {
        vec![
            format_number(self.estimated_error),
            format_number(self.solve_took),
            format_number(self.setup_took),
            format_number(self.error),
            self.iterations.to_string(),
            self.bench_repetitions.to_string(),
            self.matrix.clone(),
            self.solver.clone(),
        ]
    }
}

/// Short numeric form: fixed point in a readable range, scientific otherwise.
fn format_number(v: f64) -> String {
    let magnitude = v.abs();
    if v == 0.0 || (1e-3..1e6).contains(&magnitude) {
        let fixed = format!("{v:.6}");
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        format!("{v:.4e}")
    }
}

fn cell(row: &[String], c: usize) -> &str {
    row.get(c).map(String::as_str).unwrap_or("")
}

/// Renders `rows` under `headers` as a space-aligned table.
///
/// Columns whose cells are all numeric are right-aligned. An empty row set
/// renders the header and separator lines only.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let columns = headers.len();

    let widths: Vec<usize> = (0..columns)
        .map(|c| {
            rows.iter()
                .map(|r| cell(r, c).chars().count())
                .chain(std::iter::once(headers[c].chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();
    let numeric: Vec<bool> = (0..columns)
        .map(|c| !rows.is_empty() && rows.iter().all(|r| cell(r, c).parse::<f64>().is_ok()))
        .collect();

    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .enumerate()
            .map(|(c, text)| {
                if numeric[c] {
                    format!("{text:>width$}", width = widths[c])
                } else {
                    format!("{text:<width$}", width = widths[c])
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = Vec::with_capacity(rows.len() + 2);
    out.push(line(headers.to_vec()));
    out.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        out.push(line((0..columns).map(|c| cell(row, c)).collect()));
    }
    out.join("\n")
}

/// Writes `rows` to a CSV file with [`report_headers`] as the header line.
pub fn write_csv(path: impl AsRef<Path>, rows: &[ResultRow]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    if rows.is_empty() {
        writer.write_record(report_headers())?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Everything the operator sees at the end of a benchmark run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Matrices dropped because no solution was found for them.
    pub without_solutions: Vec<String>,
    /// Solver executables that were not found on disk.
    pub skipped_solvers: Vec<PathBuf>,
    /// Per-matrix problems from fetching, materializing and running.
    pub failures: Vec<String>,
    pub rows: Vec<ResultRow>,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.without_solutions.is_empty() {
            writeln!(
                f,
                "Warning! {} system(s) do not have solutions:",
                self.without_solutions.len()
            )?;
            for name in &self.without_solutions {
                writeln!(f, "  {name}")?;
            }
        }
        for solver in &self.skipped_solvers {
            writeln!(f, "Error! Missing solver {}", solver.display())?;
        }
        if !self.failures.is_empty() {
            writeln!(f, "Failures:")?;
            for failure in &self.failures {
                writeln!(f, "  {failure}")?;
            }
        }
        let rows: Vec<Vec<String>> = self.rows.iter().map(ResultRow::cells).collect();
        writeln!(f, "{}", render_table(&report_headers(), &rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(matrix: &str, solver: &str) -> ResultRow {
        ResultRow::new(
            SolverMetrics {
                estimated_error: 1.5e-9,
                solve_took: 12.5,
                setup_took: 0.25,
                error: 0.0,
                iterations: 42,
                bench_repetitions: 3,
            },
            matrix,
            solver,
        )
    }

    #[test]
    fn test_empty_table_has_header_only() {
        let table = render_table(&["a", "bb"], &[]);
        assert_eq!(table, "a  bb\n-  --");
    }

    #[test]
    fn test_numeric_columns_are_right_aligned() {
        let rows = vec![
            vec!["1".to_string(), "nos4".to_string()],
            vec!["100".to_string(), "x".to_string()],
        ];
        let table = render_table(&["n", "matrix"], &rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "  n  matrix");
        assert_eq!(lines[1], "---  ------");
        assert_eq!(lines[2], "  1  nos4");
        assert_eq!(lines[3], "100  x");
    }

    #[test]
    fn test_row_cells_follow_headers() {
        let cells = row("nos4", "CG:ilu").cells();
        assert_eq!(cells.len(), report_headers().len());
        assert_eq!(cells[0], "1.5000e-9");
        assert_eq!(cells[1], "12.5");
        assert_eq!(cells[3], "0");
        assert_eq!(cells[4], "42");
        assert_eq!(&cells[6..], &["nos4".to_string(), "CG:ilu".to_string()]);
    }

    #[test]
    fn test_metrics_parse_from_solver_json() {
        let json = r#"{"estimated error": 1e-10, "solve took": 3.5, "setup took": 1.0,
                       "error": 2e-9, "iterations": 17, "bench repetitions": 5, "extra": "ignored"}"#;
        let metrics: SolverMetrics = serde_json::from_str(json).unwrap();
        assert_eq!(metrics.iterations, 17);
        assert_eq!(metrics.bench_repetitions, 5);
        assert_eq!(metrics.solve_took, 3.5);
    }

    #[test]
    fn test_csv_export_uses_report_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        write_csv(&path, &[row("nos4", "CG:upc")]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(report_headers().join(",").as_str()));
        assert!(lines.next().unwrap().ends_with(",nos4,CG:upc"));
    }

    #[test]
    fn test_report_lists_skipped_items() {
        let report = RunReport {
            without_solutions: vec!["bcsstk01".to_string()],
            skipped_solvers: vec![PathBuf::from("../../build/spam")],
            failures: vec![],
            rows: vec![row("nos4", "CG:ilu")],
        };
        let text = report.to_string();
        assert!(text.contains("Warning! 1 system(s) do not have solutions:\n  bcsstk01"));
        assert!(text.contains("Error! Missing solver ../../build/spam"));
        assert!(text.contains("CG:ilu"));
    }
}
