//! The AllSAT pipeline behind the `cnf2obdd` executable.
//!
//! One run parses a DIMACS file into a [`Solver`], enumerates every solution
//! into an OBDD, reports the search statistics, optionally writes the diagram
//! out, and finally reduces it when the subproblem caches were never refreshed.
//!
//! Human-readable output goes to the `err` writer and a single JSON line with
//! the total time goes to `out`, so both can be captured in tests.

use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use log::info;
use serde_json::json;

use crate::dimacs::{self, Outcome};
use crate::error::{self, Result};
use crate::interrupt::Interrupt;
use crate::reduce::reduce;
use crate::solver::{CacheKind, Solver, SolverConfig, Status};
use crate::stats;

/// Inputs of one run.
#[derive(Debug, Clone)]
pub struct Options {
    pub input: PathBuf,
    /// Receives the OBDD decomposition, if given.
    pub output: Option<PathBuf>,
    pub config: SolverConfig,
}

impl Options {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            config: SolverConfig::default(),
        }
    }
}

/// How a run ended, for the process exit status.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Exit {
    /// Search finished or was interrupted.
    Done,
    /// A contradiction was found while loading; nothing was searched.
    TrivialUnsat,
}

impl Exit {
    pub fn code(self) -> u8 {
        match self {
            Exit::Done => 0,
            Exit::TrivialUnsat => 20,
        }
    }
}

pub fn usage(program: &str) -> String {
    format!(
        "Usage:\t{} [options] input-file [output-file]\n\
         -n<int>\tmaximum number of obdd nodes added between refreshes: if exceeded, \
         the subproblem caches are flushed (obdd nodes are kept)\n",
        program
    )
}

/// Runs the whole pipeline.
///
/// Unopenable files and parse errors are returned as errors. Interruption is
/// not an error: the partial statistics are reported between banners.
pub fn run<E: Write, O: Write>(options: &Options, interrupt: Interrupt<'_>, err: &mut E, out: &mut O) -> Result<Exit> {
    let mut solver = Solver::new(options.config.clone());

    let input = error::open(&options.input)?;
    let mut output = match &options.output {
        Some(path) => Some(BufWriter::new(error::create(path)?)),
        None => None,
    };

    let data = dimacs::read_input(input)?;
    info!("read {} bytes from {}", data.len(), options.input.display());
    if dimacs::parse(&data, &mut solver)? == Outcome::Conflict {
        writeln!(err, "Trivial problem")?;
        writeln!(err, "UNSATISFIABLE")?;
        return Ok(Exit::TrivialUnsat);
    }
    drop(data);

    solver.set_verbosity(0);
    let status = solver.solve(interrupt);
    info!("search finished: {:?}", status);
    let interrupted = status == Status::Interrupted || interrupt.is_set();

    writeln!(err, "input             : {}", options.input.display())?;
    writeln!(err, "variables         : {:>12}", solver.num_vars())?;
    match solver.config().cache {
        CacheKind::Cutset => writeln!(err, "cutwidth          : {:>12}", solver.width())?,
        CacheKind::Separator => writeln!(err, "pathwidth         : {:>12}", solver.width())?,
    }
    let elapsed = solver.stats().elapsed();
    if interrupted {
        writeln!(err)?;
        writeln!(err, "*** INTERRUPTED ***")?;
        stats::report(err, solver.stats(), solver.config(), elapsed, true)?;
        writeln!(err)?;
        writeln!(err, "*** INTERRUPTED ***")?;
    } else {
        stats::report(err, solver.stats(), solver.config(), elapsed, false)?;
    }

    writeln!(out, "{}", json!({ "time": solver.stats().elapsed().as_secs_f64() }))?;

    if let Some(w) = output.as_mut() {
        solver.obdd().decompose(w, solver.num_vars(), solver.root())?;
        w.flush()?;
        info!("diagram written to {:?}", options.output);
    }

    // Reduction is reported only for runs that never refreshed the caches.
    if solver.stats().refreshes == 0 {
        let start = Instant::now();
        let reduced = reduce(solver.obdd(), solver.root());
        writeln!(err, "cpu time (reduce) : {:>12.2} sec", start.elapsed().as_secs_f64())?;
        writeln!(err, "|bdd|             : {:>12}", reduced.size())?;
    }

    Ok(Exit::Done)
}
