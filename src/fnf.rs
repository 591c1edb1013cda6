//! Flat normal forms: CNF and DNF formulas as owned literal sets.

use std::fmt;
use std::path::Path;

use log::info;

use crate::dimacs::{self, ClauseSink};
use crate::error::{self, Result};
use crate::lit::Lit;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FnfKind {
    /// Conjunction of clauses.
    Cnf,
    /// Disjunction of terms.
    Dnf,
}

impl fmt::Display for FnfKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FnfKind::Cnf => write!(f, "cnf"),
            FnfKind::Dnf => write!(f, "dnf"),
        }
    }
}

/// A formula in flat normal form.
///
/// `var_count` is the larger of the header count and the largest variable
/// actually used, so every literal is within range.
#[derive(Debug, Clone)]
pub struct Fnf {
    pub kind: FnfKind,
    pub var_count: usize,
    pub litsets: Vec<Vec<Lit>>,
}

impl Fnf {
    pub fn new(kind: FnfKind) -> Self {
        Self {
            kind,
            var_count: 0,
            litsets: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.litsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.litsets.is_empty()
    }

    /// Parses DIMACS text. The `p` line only supplies a lower bound on the variable count.
    pub fn parse(kind: FnfKind, data: &[u8]) -> Result<Self> {
        let mut fnf = Self::new(kind);
        if let Some((vars, _)) = dimacs::header(data) {
            fnf.var_count = vars;
        }
        // Collecting never conflicts.
        dimacs::parse(data, &mut fnf)?;
        Ok(fnf)
    }
}

impl ClauseSink for Fnf {
    fn add_clause(&mut self, lits: &[Lit]) -> bool {
        if let Some(max) = lits.iter().map(|l| l.var().index() + 1).max() {
            self.var_count = self.var_count.max(max);
        }
        self.litsets.push(lits.to_vec());
        true
    }

    fn simplify(&mut self) -> bool {
        true
    }
}

fn read(path: &Path, kind: FnfKind) -> Result<Fnf> {
    let data = dimacs::read_input(error::open(path)?)?;
    let fnf = Fnf::parse(kind, &data)?;
    info!(
        "read {} with {} vars and {} litsets",
        path.display(),
        fnf.var_count,
        fnf.len()
    );
    Ok(fnf)
}

pub fn read_cnf(path: impl AsRef<Path>) -> Result<Fnf> {
    read(path.as_ref(), FnfKind::Cnf)
}

pub fn read_dnf(path: impl AsRef<Path>) -> Result<Fnf> {
    read(path.as_ref(), FnfKind::Dnf)
}
