//! This module defines the benchmark's unit of work, the matrix descriptor, and
//! the ordered collection that every pipeline stage consumes and returns.
//!
//! A [`MatrixDescriptor`] carries the identity of one linear system `Ax = b` and the
//! local paths of its three files: the system matrix `A`, the right-hand side `b`
//! and the expected solution `x`. Paths start out unset and are filled in as the
//! pipeline discovers or downloads the files.
//!
//! A [`MatrixCollection`] keeps descriptors in insertion order with unique names.
//! Selection and truncation produce new collections; only [`MatrixCollection::download`]
//! updates descriptors in place, and [`MatrixCollection::merged`] threads the
//! result of work done on a sub-collection back into the full one.

use crate::fetch::MatrixSource;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

/// Suffix of the files in a precomputed-solutions archive, e.g. `nos4_SPD_x.mtx`.
pub const SOLUTION_SUFFIX: &str = "_SPD_x.mtx";

/// Derives the canonical matrix name from a raw file name.
///
/// Solution files are named `<name>_SPD_x.mtx`; stripping the suffix yields the
/// name shared with the system matrix. Names without the suffix are returned
/// unchanged, so applying the function twice is the same as applying it once.
pub fn matrix_name(file_name: &str) -> String {
    file_name.replace(SOLUTION_SUFFIX, "")
}

/// Identity and local file locations of one benchmark linear system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixDescriptor {
    /// Canonical name, unique within a collection.
    pub name: String,
    /// Locally cached system matrix, unset until downloaded.
    pub file: Option<PathBuf>,
    /// Locally cached right-hand side, unset until downloaded.
    pub rhs_file: Option<PathBuf>,
    /// Locally cached expected solution, unset until resolved.
    pub sol_file: Option<PathBuf>,
    /// Set once a solution source has been found.
    pub has_sol: bool,
}

impl MatrixDescriptor {
    /// Creates a descriptor with no files attached.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: None,
            rhs_file: None,
            sol_file: None,
            has_sol: false,
        }
    }

    /// Attaches the system matrix `A`.
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Attaches the right-hand side `b`.
    pub fn with_rhs_file(mut self, rhs_file: impl Into<PathBuf>) -> Self {
        self.rhs_file = Some(rhs_file.into());
        self
    }

    /// Attaches a solution file and marks the descriptor as solved.
    pub fn with_sol_file(mut self, sol_file: impl Into<PathBuf>) -> Self {
        self.sol_file = Some(sol_file.into());
        self.has_sol = true;
        self
    }

    /// True when all three file fields are set.
    pub fn is_complete(&self) -> bool {
        self.file.is_some() && self.rhs_file.is_some() && self.sol_file.is_some()
    }
}

impl fmt::Display for MatrixDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = |p: &Option<PathBuf>| if p.is_some() { "x" } else { "-" };
        write!(
            f,
            "{} [A:{} b:{} x:{}]",
            self.name,
            mark(&self.file),
            mark(&self.rhs_file),
            mark(&self.sol_file)
        )
    }
}

/// A name that the remote source could not fully supply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub name: String,
    /// Source error, or a note that a piece of the system was unavailable.
    pub reason: String,
}

/// An ordered set of descriptors with unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatrixCollection {
    matrices: Vec<MatrixDescriptor>,
}

impl MatrixCollection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a descriptor unless one with the same name is already present.
    ///
    /// Returns `false` when the descriptor was dropped as a duplicate.
    pub fn push(&mut self, descriptor: MatrixDescriptor) -> bool {
        if self.get(&descriptor.name).is_some() {
            log::debug!("Ignoring duplicate matrix '{}'.", descriptor.name);
            return false;
        }
        self.matrices.push(descriptor);
        true
    }

    /// Looks up a descriptor by canonical name.
    pub fn get(&self, name: &str) -> Option<&MatrixDescriptor> {
        self.matrices.iter().find(|m| m.name == name)
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, MatrixDescriptor> {
        self.matrices.iter()
    }

    /// Names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.matrices.iter().map(|m| m.name.as_str()).collect()
    }

    /// Returns the descriptors for which `predicate` holds, in their original order.
    pub fn select<P>(&self, predicate: P) -> MatrixCollection
    where
        P: Fn(&MatrixDescriptor) -> bool,
    {
        self.matrices
            .iter()
            .filter(|m| predicate(*m))
            .cloned()
            .collect()
    }

    /// Returns the first `n` descriptors, or the whole collection if it is shorter.
    pub fn head(&self, n: usize) -> MatrixCollection {
        self.matrices.iter().take(n).cloned().collect()
    }

    /// Replaces descriptors by name with their counterparts in `updates`.
    ///
    /// Descriptors in `updates` that are not part of `self` are ignored, so the
    /// result always has the same names, in the same order, as `self`.
    pub fn merged(mut self, updates: MatrixCollection) -> MatrixCollection {
        for update in updates {
            if let Some(slot) = self.matrices.iter_mut().find(|m| m.name == update.name) {
                *slot = update;
            }
        }
        self
    }

    /// Fetches the system matrix and right-hand side of every descriptor that lacks them.
    ///
    /// Fields the source cannot supply stay unset; each such matrix is reported
    /// in the returned list rather than raised as an error.
    pub fn download<S>(&mut self, source: &S) -> Vec<FetchFailure>
    where
        S: MatrixSource + ?Sized,
    {
        let mut failures = Vec::new();
        for m in self
            .matrices
            .iter_mut()
            .filter(|m| m.file.is_none() || m.rhs_file.is_none())
        {
            log::info!("Fetching matrix '{}'...", m.name);
            match source.fetch(&m.name) {
                Ok(fetched) => {
                    if m.file.is_none() {
                        m.file = fetched.file;
                    }
                    if m.rhs_file.is_none() {
                        m.rhs_file = fetched.rhs_file;
                    }
                    if m.file.is_none() || m.rhs_file.is_none() {
                        log::warn!("Source has no complete system for '{}'.", m.name);
                        failures.push(FetchFailure {
                            name: m.name.clone(),
                            reason: "matrix or right-hand side not available".to_string(),
                        });
                    }
                }
                Err(e) => {
                    log::warn!("Could not fetch '{}': {}", m.name, e);
                    failures.push(FetchFailure {
                        name: m.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        failures
    }
}

impl FromIterator<MatrixDescriptor> for MatrixCollection {
    fn from_iter<I: IntoIterator<Item = MatrixDescriptor>>(iter: I) -> Self {
        let mut collection = MatrixCollection::new();
        let mut seen = HashSet::new();
        for descriptor in iter {
            if seen.insert(descriptor.name.clone()) {
                collection.matrices.push(descriptor);
            } else {
                log::debug!("Ignoring duplicate matrix '{}'.", descriptor.name);
            }
        }
        collection
    }
}

impl IntoIterator for MatrixCollection {
    type Item = MatrixDescriptor;
    type IntoIter = std::vec::IntoIter<MatrixDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.matrices.into_iter()
    }
}

impl<'a> IntoIterator for &'a MatrixCollection {
    type Item = &'a MatrixDescriptor;
    type IntoIter = std::slice::Iter<'a, MatrixDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.matrices.iter()
    }
}

impl fmt::Display for MatrixCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.matrices {
            writeln!(f, "  {m}")?;
        }
        Ok(())
    }
}
