//! Solver configuration, chosen once at startup.

use std::fmt;
use std::str::FromStr;

/// How search states are keyed in the subproblem cache.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum CacheKind {
    /// Which clauses crossing the current cut are still unsatisfied.
    #[default]
    Cutset,
    /// Values of the already-assigned variables that still share clauses with the rest.
    Separator,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Enumeration {
    /// Find one model, block it with a clause, restart.
    Blocking,
    /// Explore both branches of every decision, building the diagram bottom-up.
    #[default]
    NonBlocking,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Backtrack {
    /// Chronological backtracking.
    Bt,
    /// Learn a clause from each conflict.
    Bj,
    /// Skip sibling branches that cannot influence the refutation.
    Cbj,
    #[default]
    BjCbj,
}

/// How the first unique implication point is located during analysis.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Uip {
    /// Learn the negated decisions.
    Dlevel,
    /// Resolve back to the first UIP of the conflict level, then minimize.
    #[default]
    Sublevel,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum CountingMode {
    /// Arbitrary precision.
    #[default]
    Exact,
    /// 64-bit saturating.
    Bounded,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SolverConfig {
    pub cache: CacheKind,
    pub enumeration: Enumeration,
    pub backtrack: Backtrack,
    pub uip: Uip,
    pub counting: CountingMode,
    /// Nodes added to the diagram after which the subproblem caches are cleared.
    ///
    /// Only the caches are refreshed; every emitted node stays in the diagram.
    pub max_nodes: Option<usize>,
    pub verbosity: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            cache: CacheKind::default(),
            enumeration: Enumeration::default(),
            backtrack: Backtrack::default(),
            uip: Uip::default(),
            counting: CountingMode::default(),
            max_nodes: None,
            verbosity: 0,
        }
    }
}

macro_rules! named_enum {
    ($ty:ty, $what:literal, { $($variant:ident => $name:literal $(| $alias:literal)*),+ $(,)? }) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let name = match self {
                    $(<$ty>::$variant => $name,)+
                };
                f.write_str(name)
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($name $(| $alias)* => Ok(<$ty>::$variant),)+
                    _ => Err(format!("unknown {}: '{}'", $what, s)),
                }
            }
        }
    };
}

named_enum!(CacheKind, "cache type", {
    Cutset => "cutset",
    Separator => "separator",
});

named_enum!(Enumeration, "enumeration mode", {
    Blocking => "blocking",
    NonBlocking => "non-blocking" | "nonblocking",
});

named_enum!(Backtrack, "backtrack method", {
    Bt => "bt",
    Bj => "bj",
    Cbj => "cbj",
    BjCbj => "bj+cbj" | "bj-cbj",
});

named_enum!(Uip, "1UIP variant", {
    Dlevel => "dlevel",
    Sublevel => "sublevel",
});

named_enum!(CountingMode, "counting mode", {
    Exact => "exact",
    Bounded => "bounded",
});

impl Backtrack {
    pub fn learns(self) -> bool {
        matches!(self, Backtrack::Bj | Backtrack::BjCbj)
    }

    pub fn skips(self) -> bool {
        matches!(self, Backtrack::Cbj | Backtrack::BjCbj)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = SolverConfig::default();
        assert_eq!(config.backtrack, Backtrack::BjCbj);
        assert_eq!(config.uip, Uip::Sublevel);
        assert_eq!(config.verbosity, 0);
        assert_eq!(config.max_nodes, None);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("bj-cbj".parse::<Backtrack>(), Ok(Backtrack::BjCbj));
        assert_eq!("BJ+CBJ".parse::<Backtrack>(), Ok(Backtrack::BjCbj));
        assert_eq!("separator".parse::<CacheKind>(), Ok(CacheKind::Separator));
        assert_eq!("non-blocking".parse::<Enumeration>(), Ok(Enumeration::NonBlocking));
        assert!("sideways".parse::<Uip>().is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for b in [Backtrack::Bt, Backtrack::Bj, Backtrack::Cbj, Backtrack::BjCbj] {
            assert_eq!(b.to_string().parse::<Backtrack>(), Ok(b));
        }
    }
}
