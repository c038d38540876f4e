//! Common utilities for input lists and file handling.
//!
//! - **`name_list`**: Parses the plain text list of matrices used to refetch a
//!   benchmark, one matrix per line, optionally qualified by its collection group.
//!
//! - **`fs`**: Idempotent directory creation and copy-if-missing, the two
//!   filesystem primitives that make every stage safe to re-run.

pub mod fs;
pub mod name_list;
