//! # cnf2dd: compiling CNF formulas into decision diagrams
//!
//! This crate turns propositional formulas in DIMACS format into two kinds of
//! decision diagrams:
//!
//! - **OBDDs by AllSAT**: the [`solver`] enumerates every model of a CNF and
//!   assembles the solutions into an ordered binary decision diagram
//!   ([`obdd`]) while it searches. Finished subproblems are cached by a key
//!   derived from the variable cut, so equal subproblems share one node. The
//!   result can be written out and [reduced][reduce] to a canonical ROBDD.
//! - **SDDs by bottom-up compilation**: the [`sdd`] engine conjoins clauses
//!   (or disjoins terms) under a vtree, and supports model counting,
//!   cardinality minimization, vtree search and the libsdd file formats.
//!
//! ## Quick Start
//!
//! ```rust
//! use cnf2dd::fnf::{Fnf, FnfKind};
//! use cnf2dd::sdd::{SddManager, Vtree, VtreeType};
//!
//! // (x1 | x2) & (!x1 | x3)
//! let cnf = Fnf::parse(FnfKind::Cnf, b"p cnf 3 2\n1 2 0\n-1 3 0\n").unwrap();
//!
//! let mut manager = SddManager::new(Vtree::new(cnf.var_count, VtreeType::Balanced));
//! let f = manager.compile(&cnf).unwrap();
//! assert_eq!(manager.model_count(f), num_bigint::BigUint::from(4u32));
//! ```
//!
//! ## Core Components
//!
//! - **[`dimacs`]**: streaming DIMACS reader feeding any [`ClauseSink`][crate::dimacs::ClauseSink].
//! - **[`solver`]**: the all-solutions search and its runtime [`SolverConfig`][crate::solver::SolverConfig].
//! - **[`cnf2obdd`]** and **[`compiler`]**: the pipelines behind the two executables.
//! - **[`interrupt`]**: SIGINT-driven cooperative cancellation.
//! - **[`bench`]**: the benchmark driver that runs both executables and compares their timings.

pub mod bench;
pub mod bitset;
pub mod cnf2obdd;
pub mod compiler;
pub mod dimacs;
pub mod error;
pub mod fnf;
pub mod interrupt;
pub mod lit;
pub mod obdd;
pub mod reduce;
pub mod sdd;
pub mod solver;
pub mod stats;
