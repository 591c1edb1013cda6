//! Cut structure of the variable order, used to key the subproblem cache.
//!
//! At level `i` the variables `0..i` are assigned and `i..n` are open. Only
//! clauses spanning both sides make the open part depend on the assigned part,
//! so a key built from them identifies the residual formula.

use crate::bitset::BitSet;

use super::config::CacheKind;
use super::{ClauseRef, Solver};

#[derive(Debug, Clone)]
pub(super) struct Cut {
    kind: CacheKind,
    /// Per level: crossing clauses (cutset) or separator variables (separator).
    members: Vec<Vec<usize>>,
}

impl Cut {
    pub(super) fn new(solver: &Solver) -> Self {
        let kind = solver.config.cache;
        let n = solver.num_vars();
        let mut members = vec![Vec::new(); n + 1];

        let spans = solver
            .clauses
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.learnt)
            .filter_map(|(cref, c)| {
                let lo = c.lits.iter().map(|l| l.var().index()).min()?;
                let hi = c.lits.iter().map(|l| l.var().index()).max()?;
                Some((cref, lo, hi))
            });

        match kind {
            CacheKind::Cutset => {
                for (cref, lo, hi) in spans {
                    for level in members.iter_mut().take(hi + 1).skip(lo + 1) {
                        level.push(cref);
                    }
                }
            }
            CacheKind::Separator => {
                // Furthest variable each variable shares a clause with.
                let mut reach: Vec<usize> = (0..n).collect();
                for (cref, _, hi) in spans {
                    for lit in &solver.clauses[cref].lits {
                        let v = lit.var().index();
                        reach[v] = reach[v].max(hi);
                    }
                }
                for (v, &r) in reach.iter().enumerate() {
                    for level in members.iter_mut().take(r + 1).skip(v + 1) {
                        level.push(v);
                    }
                }
            }
        }

        Self { kind, members }
    }

    pub(super) fn width(&self) -> usize {
        self.members.iter().map(|m| m.len()).max().unwrap_or(0)
    }

    pub(super) fn kind(&self) -> CacheKind {
        self.kind
    }
}

impl Solver {
    /// Cache key of the current state at `level`.
    pub(super) fn cut_key(&self, cut: &Cut, level: usize) -> BitSet {
        let members = &cut.members[level];
        let mut key = BitSet::new(members.len());
        match cut.kind {
            CacheKind::Cutset => {
                for (j, &cref) in members.iter().enumerate() {
                    if !self.satisfied_below(cref, level) {
                        key.insert(j);
                    }
                }
            }
            CacheKind::Separator => {
                for (j, &v) in members.iter().enumerate() {
                    if self.assigns[v] == Some(true) {
                        key.insert(j);
                    }
                }
            }
        }
        key
    }

    /// Whether a literal over a variable below `level` satisfies the clause.
    fn satisfied_below(&self, cref: ClauseRef, level: usize) -> bool {
        self.clauses[cref]
            .lits
            .iter()
            .any(|&l| l.var().index() < level && self.value(l) == Some(true))
    }
}
