//! Run counters and the human-readable statistics report.

use std::fmt;
use std::io::{self, Write};
use std::time::{Duration, Instant};

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

use crate::solver::config::{CountingMode, Enumeration, SolverConfig};

/// Number of solutions found so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolutionCount {
    Exact(BigUint),
    /// Saturates at `u64::MAX` and raises `overflow` instead of wrapping.
    Bounded { value: u64, overflow: bool },
}

impl SolutionCount {
    pub fn zero(mode: CountingMode) -> Self {
        match mode {
            CountingMode::Exact => SolutionCount::Exact(BigUint::zero()),
            CountingMode::Bounded => SolutionCount::Bounded {
                value: 0,
                overflow: false,
            },
        }
    }

    pub fn add(&mut self, amount: &BigUint) {
        match self {
            SolutionCount::Exact(value) => *value += amount,
            SolutionCount::Bounded { value, overflow } => {
                match amount.to_u64().and_then(|a| value.checked_add(a)) {
                    Some(sum) => *value = sum,
                    None => {
                        *value = u64::MAX;
                        *overflow = true;
                    }
                }
            }
        }
    }

    /// Whether the bounded counter saturated.
    pub fn overflowed(&self) -> bool {
        matches!(self, SolutionCount::Bounded { overflow: true, .. })
    }

    pub fn to_biguint(&self) -> BigUint {
        match self {
            SolutionCount::Exact(value) => value.clone(),
            SolutionCount::Bounded { value, .. } => BigUint::from(*value),
        }
    }
}

impl fmt::Display for SolutionCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolutionCount::Exact(value) => write!(f, "{}", value),
            SolutionCount::Bounded { value, .. } => write!(f, "{:>12}", value),
        }
    }
}

/// Counters accumulated by the solver during one run.
///
/// Every counter only ever grows.
#[derive(Debug, Clone)]
pub struct RunStats {
    pub starts: u64,
    pub conflicts: u64,
    pub decisions: u64,
    pub propagations: u64,
    pub inspects: u64,
    /// Learnt clause literals after minimization.
    pub tot_literals: u64,
    /// Learnt clause literals before minimization.
    pub max_literals: u64,
    pub cache_hits: u64,
    pub cache_lookups: u64,
    pub refreshes: u64,
    pub obdd_size: u64,
    pub solutions: SolutionCount,
    /// Timing anchor.
    pub clk: Instant,
}

impl RunStats {
    pub fn new(mode: CountingMode) -> Self {
        Self {
            starts: 0,
            conflicts: 0,
            decisions: 0,
            propagations: 0,
            inspects: 0,
            tot_literals: 0,
            max_literals: 0,
            cache_hits: 0,
            cache_lookups: 0,
            refreshes: 0,
            obdd_size: 0,
            solutions: SolutionCount::zero(mode),
            clk: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.clk.elapsed()
    }

    /// Percentage of conflict literals removed by minimization.
    pub fn deleted_percent(&self) -> f64 {
        if self.max_literals == 0 {
            0.0
        } else {
            (self.max_literals - self.tot_literals) as f64 * 100.0 / self.max_literals as f64
        }
    }
}

fn rate(count: u64, secs: f64) -> f64 {
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}

/// Writes the statistics block.
///
/// A `+` after the solution count marks it as a lower bound: the run was
/// interrupted, or the bounded counter overflowed.
pub fn report<W: Write>(
    w: &mut W,
    stats: &RunStats,
    config: &SolverConfig,
    elapsed: Duration,
    interrupted: bool,
) -> io::Result<()> {
    let secs = elapsed.as_secs_f64();
    writeln!(w, "restarts          : {:>12}", stats.starts)?;
    for (name, count) in [
        ("conflicts         ", stats.conflicts),
        ("decisions         ", stats.decisions),
        ("propagations      ", stats.propagations),
        ("inspects          ", stats.inspects),
    ] {
        writeln!(w, "{}: {:>12}           ({:>9.0} / sec      )", name, count, rate(count, secs))?;
    }
    writeln!(
        w,
        "conflict literals : {:>12}           ({:>9.2} % deleted  )",
        stats.tot_literals,
        stats.deleted_percent()
    )?;
    writeln!(w, "cpu time (solve)  : {:>12.2} sec", secs)?;

    writeln!(w, "refreshes         : {:>12}", stats.refreshes)?;
    writeln!(w, "|obdd|            : {:>12}", stats.obdd_size)?;
    writeln!(w, "cache hits        : {:>12}", stats.cache_hits)?;
    writeln!(w, "cache lookup      : {:>12}", stats.cache_lookups)?;
    writeln!(w, "cache type        : {}", config.cache)?;
    // Subproblems are cached on every return.
    writeln!(w, "cache frequency   : original")?;

    writeln!(w, "minisat_all type  : {}", config.enumeration)?;
    if config.enumeration == Enumeration::NonBlocking {
        writeln!(w, "backtrack method  : {}", config.backtrack)?;
        writeln!(w, "1UIP              : {}", config.uip)?;
    }

    let gmp = match stats.solutions {
        SolutionCount::Exact(_) => "enabled",
        SolutionCount::Bounded { .. } => "disabled",
    };
    writeln!(w, "gmp               : {}", gmp)?;
    let suffix = if interrupted || stats.solutions.overflowed() {
        "+"
    } else {
        ""
    };
    writeln!(w, "SAT (full)        : {}{}", stats.solutions, suffix)?;
    Ok(())
}
