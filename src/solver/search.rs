//! The two enumeration strategies.

use std::collections::HashMap;

use log::{debug, info};
use num_bigint::BigUint;
use num_traits::One;

use super::cut::Cut;
use super::Solver;
use crate::bitset::BitSet;
use crate::dimacs::ClauseSink;
use crate::interrupt::Interrupt;
use crate::lit::{Lit, Var};
use crate::obdd::{NodeId, Obdd};

/// Result of a subproblem in the non-blocking search.
enum Outcome {
    /// A diagram node other than FALSE.
    Node(NodeId),
    /// No solutions. The set holds the decision levels the refutation depends on.
    Refuted(BitSet),
}

struct Search<'a> {
    cut: Cut,
    /// Subproblem cache per variable level.
    cache: Vec<HashMap<BitSet, NodeId>>,
    interrupt: Interrupt<'a>,
    incomplete: bool,
    /// Diagram size at the last refresh.
    mark: usize,
}

impl Search<'_> {
    fn clear_cache(&mut self) {
        for table in &mut self.cache {
            table.clear();
        }
    }
}

impl Solver {
    /// Returns false if interrupted.
    pub(super) fn enumerate_non_blocking(&mut self, interrupt: Interrupt<'_>) -> bool {
        self.stats.starts += 1;
        let cut = Cut::new(self);
        self.width = cut.width();
        debug!("{:?} width {}", cut.kind(), self.width);

        let mut search = Search {
            cut,
            cache: vec![HashMap::new(); self.num_vars() + 1],
            interrupt,
            incomplete: false,
            mark: 0,
        };
        self.root = match self.build(0, &mut search) {
            Outcome::Node(node) => node,
            Outcome::Refuted(_) => NodeId::FALSE,
        };
        let count = self.obdd.model_count(self.root, self.num_vars());
        self.stats.solutions.add(&count);
        !search.incomplete
    }

    /// Every level up to the current one, for refutations whose origin is unknown.
    fn all_levels(&self) -> BitSet {
        BitSet::full(self.decision_level() + 1)
    }

    /// Builds the diagram of the subproblem where variables `0..i` are assigned.
    fn build(&mut self, i: usize, search: &mut Search<'_>) -> Outcome {
        if search.interrupt.is_set() {
            search.incomplete = true;
            return Outcome::Refuted(self.all_levels());
        }
        if i == self.num_vars() {
            return Outcome::Node(NodeId::TRUE);
        }

        let key = if i > 0 {
            let key = self.cut_key(&search.cut, i);
            self.stats.cache_lookups += 1;
            if let Some(&node) = search.cache[i].get(&key) {
                self.stats.cache_hits += 1;
                return if node == NodeId::FALSE {
                    Outcome::Refuted(self.all_levels())
                } else {
                    Outcome::Node(node)
                };
            }
            Some(key)
        } else {
            None
        };

        let var = Var::new(i as u32);
        let outcome = match self.value_var(var) {
            Some(value) => match self.build(i + 1, search) {
                Outcome::Node(child) => {
                    let (lo, hi) = if value { (NodeId::FALSE, child) } else { (child, NodeId::FALSE) };
                    Outcome::Node(self.emit(search, var, lo, hi))
                }
                refuted => refuted,
            },
            None => self.branch(i, var, search),
        };

        if let Some(key) = key {
            if !search.incomplete {
                let node = match &outcome {
                    Outcome::Node(node) => *node,
                    Outcome::Refuted(_) => NodeId::FALSE,
                };
                search.cache[i].insert(key, node);
            }
        }
        outcome
    }

    /// Decides `var` both ways and joins the results.
    fn branch(&mut self, i: usize, var: Var, search: &mut Search<'_>) -> Outcome {
        let level = self.decision_level() + 1;
        let mut children = [NodeId::FALSE; 2];
        let mut culprits = BitSet::new(level + 1);

        for (k, positive) in [false, true].into_iter().enumerate() {
            self.decide(Lit::new(var, positive));
            let outcome = match self.propagate() {
                Some(confl) => Outcome::Refuted(self.on_conflict(confl)),
                None => self.build(i + 1, search),
            };
            self.cancel_until(level - 1);

            match outcome {
                Outcome::Node(node) => children[k] = node,
                Outcome::Refuted(levels) => {
                    if k == 0 && self.config.backtrack.skips() && !levels.contains(level) {
                        // The refutation holds under either value of `var`.
                        return Outcome::Refuted(levels);
                    }
                    culprits.union_with(&levels);
                }
            }
        }

        culprits.remove(level);
        match self.emit(search, var, children[0], children[1]) {
            NodeId::FALSE => Outcome::Refuted(culprits),
            node => Outcome::Node(node),
        }
    }

    /// Adds a node, refreshing the caches when the diagram grew past the threshold.
    fn emit(&mut self, search: &mut Search<'_>, var: Var, lo: NodeId, hi: NodeId) -> NodeId {
        let node = self.obdd.mk(var, lo, hi);
        if let Some(max) = self.config.max_nodes {
            if self.obdd.len() - search.mark > max {
                search.clear_cache();
                search.mark = self.obdd.len();
                self.stats.refreshes += 1;
                if self.config.verbosity > 0 {
                    info!("refresh #{} at {} nodes", self.stats.refreshes, self.obdd.len());
                }
            }
        }
        node
    }

    /// Returns false if interrupted.
    pub(super) fn enumerate_blocking(&mut self, interrupt: Interrupt<'_>) -> bool {
        // Widths are still reported, even though the cache is unused here.
        self.width = Cut::new(self).width();

        let n = self.num_vars();
        let mut models = ModelTrie::default();
        let mut complete = true;
        loop {
            self.stats.starts += 1;
            match self.next_model(interrupt) {
                Found::Interrupted => {
                    complete = false;
                    break;
                }
                Found::Exhausted => break,
                Found::Model(model) => {
                    models.insert(&model);
                    self.stats.solutions.add(&BigUint::one());
                    if self.config.verbosity > 0 {
                        info!("model #{}", self.stats.solutions);
                    }

                    let blocking: Vec<Lit> = (1..=self.decision_level()).map(|d| !self.decision_at(d)).collect();
                    self.cancel_until(0);
                    if blocking.is_empty() || !self.add_clause(&blocking) {
                        break;
                    }
                }
            }
        }
        self.cancel_until(0);
        self.root = models.to_obdd(&mut self.obdd, n);
        complete
    }

    /// Conflict-driven search for a model that satisfies all current clauses.
    ///
    /// On success the trail still holds the model, so its decisions can be blocked.
    fn next_model(&mut self, interrupt: Interrupt<'_>) -> Found {
        if !self.ok {
            return Found::Exhausted;
        }
        loop {
            if let Some(confl) = self.propagate() {
                if self.decision_level() == 0 {
                    self.ok = false;
                    return Found::Exhausted;
                }
                let culprits = self.culprit_levels(confl);
                if culprits.is_empty() {
                    // No decision is involved: the remaining clauses are contradictory.
                    self.ok = false;
                    return Found::Exhausted;
                }
                let learnt = self.analyze(confl, &culprits);
                self.backjump_and_assert(learnt);
                continue;
            }

            if interrupt.is_set() {
                return Found::Interrupted;
            }
            match (0..self.num_vars()).find(|&v| self.assigns[v].is_none()) {
                Some(v) => self.decide(Var::new(v as u32).neg()),
                None => {
                    return Found::Model(self.assigns.iter().map(|a| *a == Some(true)).collect());
                }
            }
        }
    }

    fn backjump_and_assert(&mut self, learnt: Vec<Lit>) {
        let level_of = |s: &Solver, l: &Lit| s.level[l.var().index()];
        let top = level_of(self, &learnt[0]);
        let second = learnt[1..].iter().map(|l| level_of(self, l)).max().unwrap_or(0);

        if second < top {
            self.cancel_until(second);
            let asserting = learnt[0];
            let cref = self.attach(learnt, true);
            self.enqueue(asserting, Some(cref));
        } else {
            // Several literals share the top level: nothing is asserted.
            self.cancel_until(top.saturating_sub(1));
            self.attach(learnt, true);
        }
    }
}

enum Found {
    Model(Vec<bool>),
    Exhausted,
    Interrupted,
}

/// Prefix tree over full assignments in variable order.
#[derive(Debug, Default)]
struct ModelTrie {
    /// `children[k][b]` is the child of node `k` on value `b`; 0 means absent.
    children: Vec<[usize; 2]>,
}

impl ModelTrie {
    fn insert(&mut self, model: &[bool]) {
        if self.children.is_empty() {
            self.children.push([0, 0]);
        }
        let mut node = 0;
        for &value in model {
            let b = value as usize;
            if self.children[node][b] == 0 {
                self.children.push([0, 0]);
                self.children[node][b] = self.children.len() - 1;
            }
            node = self.children[node][b];
        }
    }

    fn to_obdd(&self, obdd: &mut Obdd, num_vars: usize) -> NodeId {
        if self.children.is_empty() {
            return NodeId::FALSE;
        }
        self.emit(obdd, 0, 0, num_vars)
    }

    fn emit(&self, obdd: &mut Obdd, node: usize, depth: usize, num_vars: usize) -> NodeId {
        if depth == num_vars {
            return NodeId::TRUE;
        }
        let [lo, hi] = self.children[node];
        let lo = if lo == 0 { NodeId::FALSE } else { self.emit(obdd, lo, depth + 1, num_vars) };
        let hi = if hi == 0 { NodeId::FALSE } else { self.emit(obdd, hi, depth + 1, num_vars) };
        obdd.mk(Var::new(depth as u32), lo, hi)
    }
}
