//! All-solutions search that emits an OBDD while it runs.
//!
//! The solver is a small DPLL engine with unit propagation over occurrence lists
//! and conflict analysis. Variables are decided in their natural order, which is
//! also the order of the emitted diagram, so every finished subproblem becomes a
//! diagram node on the way back up.
//!
//! Two enumeration strategies are available (see [`Enumeration`]):
//!
//! - **non-blocking**: both branches of every decision are explored; subproblems
//!   are cached by a key derived from the variable cut (see [`CacheKind`]), and
//!   refuted branches may be skipped by conflict-directed backjumping.
//! - **blocking**: models are found one at a time by conflict-driven search and
//!   excluded with blocking clauses; the diagram is assembled from the models.

pub mod config;
mod cut;
mod search;

use log::debug;

use crate::bitset::BitSet;
use crate::dimacs::ClauseSink;
use crate::interrupt::Interrupt;
use crate::lit::{Lit, Var};
use crate::obdd::{NodeId, Obdd};
use crate::stats::RunStats;

pub use self::config::{Backtrack, CacheKind, CountingMode, Enumeration, SolverConfig, Uip};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Status {
    Satisfiable,
    Unsatisfiable,
    /// Stopped early: the diagram holds a subset of the solutions.
    Interrupted,
}

type ClauseRef = usize;

#[derive(Debug, Clone)]
struct Clause {
    lits: Vec<Lit>,
    learnt: bool,
}

pub struct Solver {
    config: SolverConfig,
    clauses: Vec<Clause>,
    /// Clauses containing each literal, indexed by [`Lit::code`].
    occurs: Vec<Vec<ClauseRef>>,
    assigns: Vec<Option<bool>>,
    level: Vec<usize>,
    reason: Vec<Option<ClauseRef>>,
    trail: Vec<Lit>,
    trail_lim: Vec<usize>,
    qhead: usize,
    seen: Vec<bool>,
    /// False once a top-level contradiction has been found.
    ok: bool,
    obdd: Obdd,
    root: NodeId,
    width: usize,
    stats: RunStats,
}

impl Solver {
    pub fn new(config: SolverConfig) -> Self {
        let stats = RunStats::new(config.counting);
        Self {
            config,
            clauses: Vec::new(),
            occurs: Vec::new(),
            assigns: Vec::new(),
            level: Vec::new(),
            reason: Vec::new(),
            trail: Vec::new(),
            trail_lim: Vec::new(),
            qhead: 0,
            seen: Vec::new(),
            ok: true,
            obdd: Obdd::new(),
            root: NodeId::FALSE,
            width: 0,
            stats,
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn set_verbosity(&mut self, verbosity: u32) {
        self.config.verbosity = verbosity;
    }

    /// Number of variables: the largest variable mentioned so far.
    pub fn num_vars(&self) -> usize {
        self.assigns.len()
    }

    pub fn num_clauses(&self) -> usize {
        self.clauses.iter().filter(|c| !c.learnt).count()
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn obdd(&self) -> &Obdd {
        &self.obdd
    }

    /// Root of the diagram built by the last [`solve`](Self::solve).
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Largest cut (cutset cache) or separator (separator cache) over all levels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Enumerates all solutions into the diagram.
    ///
    /// Polls `interrupt` at every search node. When it fires, the search unwinds
    /// and the diagram keeps whatever was completed.
    pub fn solve(&mut self, interrupt: Interrupt<'_>) -> Status {
        if !self.ok {
            self.root = NodeId::FALSE;
            return Status::Unsatisfiable;
        }
        debug!(
            "solving {} variables, {} clauses ({} / {} / {} / {})",
            self.num_vars(),
            self.num_clauses(),
            self.config.enumeration,
            self.config.cache,
            self.config.backtrack,
            self.config.uip
        );

        let complete = match self.config.enumeration {
            Enumeration::NonBlocking => self.enumerate_non_blocking(interrupt),
            Enumeration::Blocking => self.enumerate_blocking(interrupt),
        };
        self.stats.obdd_size = self.obdd.len() as u64;

        if !complete {
            Status::Interrupted
        } else if self.root == NodeId::FALSE {
            Status::Unsatisfiable
        } else {
            Status::Satisfiable
        }
    }

    fn ensure_vars(&mut self, n: usize) {
        if n > self.assigns.len() {
            self.assigns.resize(n, None);
            self.level.resize(n, 0);
            self.reason.resize(n, None);
            self.seen.resize(n, false);
            self.occurs.resize(2 * n, Vec::new());
        }
    }

    fn value(&self, lit: Lit) -> Option<bool> {
        self.assigns[lit.var().index()].map(|v| v == lit.is_positive())
    }

    fn value_var(&self, var: Var) -> Option<bool> {
        self.assigns[var.index()]
    }

    fn decision_level(&self) -> usize {
        self.trail_lim.len()
    }

    /// The decision literal that opened `level` (1-based).
    fn decision_at(&self, level: usize) -> Lit {
        self.trail[self.trail_lim[level - 1]]
    }

    fn enqueue(&mut self, lit: Lit, reason: Option<ClauseRef>) {
        let v = lit.var().index();
        debug_assert!(self.assigns[v].is_none());
        self.assigns[v] = Some(lit.is_positive());
        self.level[v] = self.decision_level();
        self.reason[v] = reason;
        self.trail.push(lit);
    }

    fn decide(&mut self, lit: Lit) {
        self.stats.decisions += 1;
        self.trail_lim.push(self.trail.len());
        self.enqueue(lit, None);
    }

    fn cancel_until(&mut self, level: usize) {
        if self.decision_level() <= level {
            return;
        }
        let lim = self.trail_lim[level];
        for lit in self.trail.drain(lim..) {
            let v = lit.var().index();
            self.assigns[v] = None;
            self.reason[v] = None;
        }
        self.trail_lim.truncate(level);
        self.qhead = self.trail.len();
    }

    fn attach(&mut self, lits: Vec<Lit>, learnt: bool) -> ClauseRef {
        let cref = self.clauses.len();
        for lit in &lits {
            self.occurs[lit.code()].push(cref);
        }
        self.clauses.push(Clause { lits, learnt });
        cref
    }

    /// Unit propagation. Returns the falsified clause on conflict.
    fn propagate(&mut self) -> Option<ClauseRef> {
        while self.qhead < self.trail.len() {
            let p = self.trail[self.qhead];
            self.qhead += 1;
            self.stats.propagations += 1;

            let falsified = (!p).code();
            for k in 0..self.occurs[falsified].len() {
                let cref = self.occurs[falsified][k];
                self.stats.inspects += 1;

                let mut unassigned = None;
                let mut open = 0;
                let mut satisfied = false;
                for &lit in &self.clauses[cref].lits {
                    match self.value(lit) {
                        Some(true) => {
                            satisfied = true;
                            break;
                        }
                        Some(false) => {}
                        None => {
                            open += 1;
                            unassigned = Some(lit);
                        }
                    }
                }
                if satisfied {
                    continue;
                }
                match (open, unassigned) {
                    (0, _) => {
                        self.stats.conflicts += 1;
                        self.qhead = self.trail.len();
                        return Some(cref);
                    }
                    (1, Some(unit)) => self.enqueue(unit, Some(cref)),
                    _ => {}
                }
            }
        }
        None
    }

    /// Decision levels whose decisions the conflict depends on.
    fn culprit_levels(&mut self, confl: ClauseRef) -> BitSet {
        let mut levels = BitSet::new(self.decision_level() + 1);
        let mut touched = Vec::new();
        let mut stack: Vec<usize> = self.clauses[confl].lits.iter().map(|l| l.var().index()).collect();

        while let Some(v) = stack.pop() {
            if self.seen[v] {
                continue;
            }
            self.seen[v] = true;
            touched.push(v);
            if self.level[v] == 0 {
                continue;
            }
            match self.reason[v] {
                None => {
                    levels.insert(self.level[v]);
                }
                Some(r) => stack.extend(
                    self.clauses[r]
                        .lits
                        .iter()
                        .map(|l| l.var().index())
                        .filter(|&u| u != v),
                ),
            }
        }

        for v in touched {
            self.seen[v] = false;
        }
        levels
    }

    /// Derives a clause from the conflict. The literal of the highest level comes first.
    fn analyze(&mut self, confl: ClauseRef, culprits: &BitSet) -> Vec<Lit> {
        let learnt = match self.config.uip {
            Uip::Dlevel => {
                let mut learnt: Vec<Lit> = culprits.iter().map(|d| !self.decision_at(d)).collect();
                learnt.reverse();
                self.stats.max_literals += learnt.len() as u64;
                learnt
            }
            Uip::Sublevel => self.analyze_first_uip(confl),
        };
        self.stats.tot_literals += learnt.len() as u64;
        learnt
    }

    /// First-UIP analysis followed by local minimization.
    fn analyze_first_uip(&mut self, confl: ClauseRef) -> Vec<Lit> {
        let current = self.decision_level();
        let mut learnt = Vec::new();
        let mut path = 0usize;
        let mut index = self.trail.len();
        let mut cref = confl;
        let mut expanded: Option<Var> = None;

        let uip = loop {
            for k in 0..self.clauses[cref].lits.len() {
                let q = self.clauses[cref].lits[k];
                let v = q.var().index();
                if Some(q.var()) == expanded || self.seen[v] || self.level[v] == 0 {
                    continue;
                }
                self.seen[v] = true;
                if self.level[v] >= current {
                    path += 1;
                } else {
                    learnt.push(q);
                }
            }

            // Next marked literal of the conflict level, walking the trail backwards.
            let lit = loop {
                index -= 1;
                let lit = self.trail[index];
                if self.seen[lit.var().index()] {
                    break lit;
                }
            };
            self.seen[lit.var().index()] = false;
            path -= 1;
            if path == 0 {
                break lit;
            }
            match self.reason[lit.var().index()] {
                Some(r) => {
                    cref = r;
                    expanded = Some(lit.var());
                }
                None => break lit,
            }
        };

        self.stats.max_literals += learnt.len() as u64 + 1;

        let minimized: Vec<Lit> = learnt.iter().copied().filter(|&q| !self.is_redundant(q)).collect();
        for q in &learnt {
            self.seen[q.var().index()] = false;
        }

        let mut result = Vec::with_capacity(minimized.len() + 1);
        result.push(!uip);
        result.extend(minimized);
        result
    }

    /// A learnt literal is redundant when its reason is subsumed by the clause.
    fn is_redundant(&self, q: Lit) -> bool {
        match self.reason[q.var().index()] {
            None => false,
            Some(r) => self.clauses[r].lits.iter().all(|l| {
                let u = l.var().index();
                l.var() == q.var() || self.seen[u] || self.level[u] == 0
            }),
        }
    }

    /// Records the conflict and returns its culprit levels.
    fn on_conflict(&mut self, confl: ClauseRef) -> BitSet {
        let culprits = self.culprit_levels(confl);
        if self.config.backtrack.learns() {
            let learnt = self.analyze(confl, &culprits);
            if !learnt.is_empty() {
                self.attach(learnt, true);
            }
        }
        culprits
    }
}

impl ClauseSink for Solver {
    fn add_clause(&mut self, lits: &[Lit]) -> bool {
        if !self.ok {
            return false;
        }
        debug_assert_eq!(self.decision_level(), 0);
        if let Some(max) = lits.iter().map(|l| l.var().index()).max() {
            self.ensure_vars(max + 1);
        }

        let mut lits = lits.to_vec();
        lits.sort();
        lits.dedup();
        // Complementary literals are adjacent after sorting by code.
        if lits.windows(2).any(|w| w[0] == !w[1]) {
            return true;
        }
        if lits.iter().any(|&l| self.value(l) == Some(true)) {
            return true;
        }
        lits.retain(|&l| self.value(l).is_none());

        match lits.len() {
            0 => {
                self.ok = false;
            }
            1 => {
                self.enqueue(lits[0], None);
                if self.propagate().is_some() {
                    self.ok = false;
                }
            }
            _ => {
                self.attach(lits, false);
            }
        }
        self.ok
    }

    fn simplify(&mut self) -> bool {
        if self.ok && self.propagate().is_some() {
            self.ok = false;
        }
        self.ok
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use num_bigint::BigUint;
    use test_log::test;

    use super::*;
    use crate::dimacs::{self, Outcome};

    fn load(text: &str, config: SolverConfig) -> Solver {
        let mut solver = Solver::new(config);
        let outcome = dimacs::parse(text.as_bytes(), &mut solver).unwrap();
        assert_eq!(outcome, Outcome::Ok);
        solver
    }

    fn brute_force(clauses: &[Vec<i32>], n: usize) -> BigUint {
        let mut count = 0u64;
        for bits in 0..(1u64 << n) {
            let holds = clauses.iter().all(|c| {
                c.iter().any(|&l| {
                    let value = bits >> (l.unsigned_abs() - 1) & 1 == 1;
                    value == (l > 0)
                })
            });
            if holds {
                count += 1;
            }
        }
        BigUint::from(count)
    }

    fn to_text(clauses: &[Vec<i32>], n: usize) -> String {
        let mut text = format!("p cnf {} {}\n", n, clauses.len());
        for c in clauses {
            for l in c {
                text.push_str(&format!("{} ", l));
            }
            text.push_str("0\n");
        }
        text
    }

    /// Small deterministic pseudo-random 3-CNF instances.
    fn random_cnf(seed: u64, n: usize, m: usize) -> Vec<Vec<i32>> {
        let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let mut next = move || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 33) as usize
        };
        (0..m)
            .map(|_| {
                (0..3)
                    .map(|_| {
                        let v = (next() % n + 1) as i32;
                        if next() % 2 == 0 {
                            v
                        } else {
                            -v
                        }
                    })
                    .collect()
            })
            .collect()
    }

    fn all_configs() -> Vec<SolverConfig> {
        let mut configs = Vec::new();
        for cache in [CacheKind::Cutset, CacheKind::Separator] {
            for backtrack in [Backtrack::Bt, Backtrack::Bj, Backtrack::Cbj, Backtrack::BjCbj] {
                for uip in [Uip::Dlevel, Uip::Sublevel] {
                    configs.push(SolverConfig {
                        cache,
                        backtrack,
                        uip,
                        ..Default::default()
                    });
                }
            }
        }
        for uip in [Uip::Dlevel, Uip::Sublevel] {
            configs.push(SolverConfig {
                enumeration: Enumeration::Blocking,
                uip,
                ..Default::default()
            });
        }
        configs
    }

    #[test]
    fn test_add_clause_level_zero() {
        let mut solver = Solver::new(SolverConfig::default());
        assert!(solver.add_clause(&[Lit::from_dimacs(1), Lit::from_dimacs(-1)]));
        assert_eq!(solver.num_clauses(), 0);
        assert!(solver.add_clause(&[Lit::from_dimacs(2)]));
        assert_eq!(solver.value(Lit::from_dimacs(2)), Some(true));
        assert!(!solver.add_clause(&[Lit::from_dimacs(-2)]));
        assert!(!solver.simplify());
    }

    #[test]
    fn test_empty_clause_conflicts() {
        let mut solver = Solver::new(SolverConfig::default());
        assert!(!solver.add_clause(&[]));
    }

    #[test]
    fn test_units_propagate() {
        let mut solver = Solver::new(SolverConfig::default());
        assert!(solver.add_clause(&[Lit::from_dimacs(-1), Lit::from_dimacs(2)]));
        assert!(solver.add_clause(&[Lit::from_dimacs(1)]));
        assert_eq!(solver.value(Lit::from_dimacs(2)), Some(true));
    }

    #[test]
    fn test_empty_formula_is_valid() {
        let flag = AtomicBool::new(false);
        let mut solver = load("p cnf 0 0\n", SolverConfig::default());
        assert_eq!(solver.solve(Interrupt::new(&flag)), Status::Satisfiable);
        assert_eq!(solver.root(), NodeId::TRUE);
        assert_eq!(solver.stats().solutions.to_biguint(), BigUint::from(1u32));
    }

    #[test]
    fn test_counts_match_brute_force() {
        let flag = AtomicBool::new(false);
        for seed in 0..12u64 {
            let n = 6 + (seed as usize % 3);
            let clauses = random_cnf(seed, n, 3 * n);
            let expected = brute_force(&clauses, n);
            let text = to_text(&clauses, n);
            for config in all_configs() {
                let mut solver = Solver::new(config.clone());
                if dimacs::parse(text.as_bytes(), &mut solver).unwrap() == Outcome::Conflict {
                    assert_eq!(expected, BigUint::from(0u32));
                    continue;
                }
                if solver.num_vars() < n {
                    continue;
                }
                let status = solver.solve(Interrupt::new(&flag));
                assert_ne!(status, Status::Interrupted);
                let counted = solver.stats().solutions.to_biguint();
                assert_eq!(counted, expected, "seed {} with {:?}", seed, config);
                assert_eq!(solver.obdd().model_count(solver.root(), n), expected);
            }
        }
    }

    #[test]
    fn test_unsat_after_search() {
        // Pigeonhole: 3 pigeons, 2 holes. Not refuted by propagation alone.
        let text = "1 2 0\n3 4 0\n5 6 0\n-1 -3 0\n-1 -5 0\n-3 -5 0\n-2 -4 0\n-2 -6 0\n-4 -6 0\n";
        let flag = AtomicBool::new(false);
        for config in all_configs() {
            let mut solver = load(text, config);
            assert_eq!(solver.solve(Interrupt::new(&flag)), Status::Unsatisfiable);
            assert_eq!(solver.root(), NodeId::FALSE);
        }
    }

    #[test]
    fn test_interrupt_before_solve() {
        let flag = AtomicBool::new(true);
        let mut solver = load("1 2 0\n-1 3 0\n", SolverConfig::default());
        assert_eq!(solver.solve(Interrupt::new(&flag)), Status::Interrupted);
        assert_eq!(solver.stats().decisions, 0);
    }

    /// Follows one path to TRUE, preferring `hi` or `lo`, and fills the skipped variables with `fill`.
    fn path_model(obdd: &Obdd, root: NodeId, n: usize, prefer_hi: bool, fill: bool) -> Vec<bool> {
        let mut assignment = vec![fill; n];
        let mut current = root;
        while !current.is_terminal() {
            let node = *obdd.node(current);
            let hi = if prefer_hi { node.hi != NodeId::FALSE } else { node.lo == NodeId::FALSE };
            assignment[node.var.index()] = hi;
            current = if hi { node.hi } else { node.lo };
        }
        assert_eq!(current, NodeId::TRUE);
        assignment
    }

    #[test]
    fn test_interrupt_during_search() {
        let n = 200;
        let clauses = random_cnf(11, n, n);
        let text = to_text(&clauses, n);
        let configs = [
            SolverConfig::default(),
            SolverConfig {
                counting: CountingMode::Bounded,
                cache: CacheKind::Separator,
                ..Default::default()
            },
            SolverConfig {
                enumeration: Enumeration::Blocking,
                ..Default::default()
            },
        ];
        for config in configs {
            let flag = AtomicBool::new(false);
            let mut solver = load(&text, config.clone());
            let status = std::thread::scope(|scope| {
                scope.spawn(|| {
                    std::thread::sleep(std::time::Duration::from_millis(50));
                    Interrupt::new(&flag).set();
                });
                solver.solve(Interrupt::new(&flag))
            });
            assert_eq!(status, Status::Interrupted, "{:?}", config);

            let num_vars = solver.num_vars();
            let partial = solver.obdd().model_count(solver.root(), num_vars);
            if !solver.stats().solutions.overflowed() {
                assert_eq!(solver.stats().solutions.to_biguint(), partial, "{:?}", config);
            }
            assert!(partial <= BigUint::from(1u32) << num_vars);

            // Whatever was kept is a subset of the real models.
            if solver.root() != NodeId::FALSE {
                for (prefer_hi, fill) in [(true, false), (false, true), (true, true), (false, false)] {
                    let model = path_model(solver.obdd(), solver.root(), num_vars, prefer_hi, fill);
                    let satisfied = clauses.iter().all(|c| {
                        c.iter()
                            .any(|&l| model[l.unsigned_abs() as usize - 1] == (l > 0))
                    });
                    assert!(satisfied, "{:?}", config);
                }
            }
        }
    }

    #[test]
    fn test_learning_counts_literals() {
        let text = "1 2 0\n3 4 0\n5 6 0\n-1 -3 0\n-1 -5 0\n-3 -5 0\n-2 -4 0\n-2 -6 0\n-4 -6 0\n";
        let flag = AtomicBool::new(false);
        let mut solver = load(text, SolverConfig::default());
        solver.solve(Interrupt::new(&flag));
        let stats = solver.stats();
        assert!(stats.conflicts > 0);
        assert!(stats.tot_literals > 0);
        assert!(stats.tot_literals <= stats.max_literals);
    }

    #[test]
    fn test_bt_learns_nothing() {
        let text = "1 2 0\n-1 -2 0\n1 -2 0\n";
        let flag = AtomicBool::new(false);
        let mut solver = load(
            text,
            SolverConfig {
                backtrack: Backtrack::Bt,
                ..Default::default()
            },
        );
        solver.solve(Interrupt::new(&flag));
        assert_eq!(solver.stats().tot_literals, 0);
        assert!(solver.clauses.iter().all(|c| !c.learnt));
    }

    #[test]
    fn test_refresh_clears_caches() {
        let clauses = random_cnf(7, 10, 20);
        let expected = brute_force(&clauses, 10);
        let flag = AtomicBool::new(false);
        let mut solver = Solver::new(SolverConfig {
            max_nodes: Some(2),
            ..Default::default()
        });
        let outcome = dimacs::parse(to_text(&clauses, 10).as_bytes(), &mut solver).unwrap();
        if outcome == Outcome::Ok && solver.num_vars() == 10 && expected > BigUint::from(4u32) {
            solver.solve(Interrupt::new(&flag));
            assert!(solver.stats().refreshes > 0);
            assert_eq!(solver.stats().solutions.to_biguint(), expected);
            // Refreshing only drops cache entries: the diagram stays complete.
            assert_eq!(solver.obdd().model_count(solver.root(), 10), expected);
        }
    }

    #[test]
    fn test_cache_is_used() {
        // Independent pairs: every level sees the same residual problem.
        let text = "1 2 0\n3 4 0\n5 6 0\n7 8 0\n";
        let flag = AtomicBool::new(false);
        let mut solver = load(text, SolverConfig::default());
        solver.solve(Interrupt::new(&flag));
        assert!(solver.stats().cache_hits > 0);
        assert_eq!(solver.stats().solutions.to_biguint(), BigUint::from(81u32));
        assert_eq!(solver.width(), 1);
    }
}
