//! This module provides a loader for matrix name lists.
//!
//! A name list is a plain text file with one matrix per line, used to refetch
//! a benchmark. A line is either a bare file name (`nos4_SPD_x.mtx`, `nos4.mtx`,
//! `nos4`) or is qualified with its SuiteSparse group (`HB/nos4`). Blank lines and
//! lines starting with `#` are ignored.

use crate::matrix::matrix_name;
use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};
use thiserror::Error;

/// Represents all possible errors that can occur while loading a name list.
#[derive(Error, Debug)]
pub enum NameListError {
    /// Wraps a standard I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Occurs when a line has more than one `/` separator.
    #[error("Format error on line {line}: expected 'Group/Name' or 'Name', found '{text}'")]
    Malformed { line: usize, text: String },
}

/// One matrix listed in a name list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixEntry {
    /// SuiteSparse group, needed to build the download URL.
    pub group: Option<String>,
    /// Canonical matrix name.
    pub name: String,
}

/// Parses a single non-comment line into an entry.
fn parse_line(line_no: usize, text: &str) -> Result<MatrixEntry, NameListError> {
    let malformed = || NameListError::Malformed {
        line: line_no,
        text: text.to_string(),
    };
    let parts: Vec<&str> = text.split('/').collect();
    let (group, raw) = match parts.as_slice() {
        [raw] => (None, *raw),
        [group, raw] if !group.is_empty() => (Some(group.to_string()), *raw),
        _ => return Err(malformed()),
    };
    let name = matrix_name(raw);
    let name = name.strip_suffix(".mtx").unwrap_or(&name).to_string();
    if name.is_empty() {
        return Err(malformed());
    }
    Ok(MatrixEntry { group, name })
}

/// Reads a name list from any buffered reader.
pub fn parse_name_list(reader: impl BufRead) -> Result<Vec<MatrixEntry>, NameListError> {
    let mut entries: Vec<MatrixEntry> = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        let entry = parse_line(i + 1, text)?;
        if entries.iter().any(|e| e.name == entry.name) {
            log::debug!("Name list repeats '{}' on line {}.", entry.name, i + 1);
            continue;
        }
        entries.push(entry);
    }
    Ok(entries)
}

/// Loads the name list stored at `path`.
pub fn load_name_list(path: impl AsRef<Path>) -> Result<Vec<MatrixEntry>, NameListError> {
    let file = File::open(path)?;
    parse_name_list(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_plain_and_grouped_lines() {
        let text = "# SPD systems with a rhs\nHB/nos4\n\nbcsstk14_SPD_x.mtx\nmesh1e1.mtx\n";
        let entries = parse_name_list(text.as_bytes()).unwrap();
        assert_eq!(
            entries,
            vec![
                MatrixEntry {
                    group: Some("HB".to_string()),
                    name: "nos4".to_string()
                },
                MatrixEntry {
                    group: None,
                    name: "bcsstk14".to_string()
                },
                MatrixEntry {
                    group: None,
                    name: "mesh1e1".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_repeated_names_keep_first() {
        let entries = parse_name_list("HB/nos4\nnos4_SPD_x.mtx\n".as_bytes()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].group.as_deref(), Some("HB"));
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let err = parse_name_list("nos4\nHB/x/y\n".as_bytes()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Format error on line 2: expected 'Group/Name' or 'Name', found 'HB/x/y'"
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_name_list("/nonexistent/uof_matrix_names.txt").unwrap_err();
        assert!(matches!(err, NameListError::Io(_)));
    }
}
