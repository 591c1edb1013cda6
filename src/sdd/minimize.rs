//! Minimum-cardinality models.
//!
//! The cardinality of a model is its number of positive literals. Variables a
//! node does not mention are free, so they cost nothing and are set false in
//! every minimum-cardinality model.

use std::collections::HashMap;

use log::debug;

use super::manager::SddManager;
use super::node::{Sdd, SddId};
use super::vtree::VtreeId;

impl SddManager {
    /// Smallest number of positive literals in a model of `f`, or `None` if `f` is unsatisfiable.
    pub fn minimum_cardinality(&self, f: SddId) -> Option<usize> {
        self.cardinality(f, &mut HashMap::new())
    }

    fn cardinality(&self, f: SddId, memo: &mut HashMap<SddId, Option<usize>>) -> Option<usize> {
        if f.is_false() {
            return None;
        }
        if f.is_true() {
            return Some(0);
        }
        if let Some(&card) = memo.get(&f) {
            return card;
        }
        let card = match self.node(f) {
            Sdd::Literal(lit) => Some(lit.is_positive() as usize),
            Sdd::Decision { elements, .. } => elements
                .iter()
                .filter_map(|e| Some(self.cardinality(e.prime, memo)? + self.cardinality(e.sub, memo)?))
                .min(),
            Sdd::False => None,
            Sdd::True => Some(0),
        };
        memo.insert(f, card);
        card
    }

    /// The minimum-cardinality models of `f` over all manager variables.
    ///
    /// Every variable outside the support of a chosen model is forced false.
    pub fn minimize_cardinality(&self, f: SddId) -> SddId {
        let mut memo = Memo::default();
        let result = self.minimize_under(f, self.vtree.root(), &mut memo);
        debug!(
            "minimized cardinality to {:?} with {} nodes",
            self.minimum_cardinality(result),
            self.count(result)
        );
        result
    }

    /// Minimum models of `f` over the variables of `vtree`, which contains `f`'s vtree.
    fn minimize_under(&self, f: SddId, vtree: VtreeId, memo: &mut Memo) -> SddId {
        if f.is_false() {
            return SddId::FALSE;
        }
        if f.is_true() {
            return self.negative_cube(vtree, None);
        }
        let own = self.node_vtree(f);
        let local = self.minimize_local(f, memo);
        if own == vtree {
            local
        } else {
            self.and(local, self.negative_cube(vtree, Some(own)))
        }
    }

    fn minimize_local(&self, f: SddId, memo: &mut Memo) -> SddId {
        if let Some(&g) = memo.minimized.get(&f) {
            return g;
        }
        let g = match self.node(f) {
            Sdd::Decision { vtree, elements } => {
                let (left, right) = self.vtree.children(vtree);
                let best = self.cardinality(f, &mut memo.cardinality);
                let mut result = SddId::FALSE;
                for e in &elements {
                    let card = self
                        .cardinality(e.prime, &mut memo.cardinality)
                        .zip(self.cardinality(e.sub, &mut memo.cardinality))
                        .map(|(p, s)| p + s);
                    if card.is_none() || card != best {
                        continue;
                    }
                    let prime = self.minimize_under(e.prime, left, memo);
                    let sub = self.minimize_under(e.sub, right, memo);
                    result = self.or(result, self.and(prime, sub));
                }
                result
            }
            // A literal is its own only model on its leaf.
            _ => f,
        };
        memo.minimized.insert(f, g);
        g
    }

    /// Conjunction of negative literals over the variables of `vtree` outside `except`.
    fn negative_cube(&self, vtree: VtreeId, except: Option<VtreeId>) -> SddId {
        let skip = except.map(|e| self.vtree.variables_under(e)).unwrap_or_default();
        let lits: Vec<_> = self
            .vtree
            .variables_under(vtree)
            .into_iter()
            .filter(|v| !skip.contains(v))
            .map(|v| v.neg())
            .collect();
        self.cube(&lits)
    }
}

#[derive(Default)]
struct Memo {
    cardinality: HashMap<SddId, Option<usize>>,
    minimized: HashMap<SddId, SddId>,
}
