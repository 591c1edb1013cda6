//! The SDD manager: owns the vtree and every node.
//!
//! ```text
//! nodes: Vec<Sdd>         [0] ⊥  [1] ⊤  [2] +x1  [3] -x1  [4] +x2 ...
//! negations: Vec<Option>  cached ¬f for each node
//! unique: HashMap         (vtree, elements) → SddId
//! apply_cache: HashMap    (op, f, g) → SddId
//! ```
//!
//! Operations take `&self`; the tables live behind `RefCell`s. Only vtree
//! search needs `&mut self`, because it replaces the whole node store.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::{self, Write};

use log::debug;
use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::compiler::CompilerOptions;
use crate::lit::{Lit, Var};

use super::node::{Element, Sdd, SddId};
use super::vtree::{Vtree, VtreeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Op {
    And,
    Or,
}

impl Op {
    /// The absorbing constant.
    fn zero(self) -> SddId {
        match self {
            Op::And => SddId::FALSE,
            Op::Or => SddId::TRUE,
        }
    }

    /// The neutral constant.
    fn one(self) -> SddId {
        match self {
            Op::And => SddId::TRUE,
            Op::Or => SddId::FALSE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    op: Op,
    a: SddId,
    b: SddId,
}

impl CacheKey {
    fn new(op: Op, a: SddId, b: SddId) -> Self {
        // Both operations are commutative.
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        Self { op, a, b }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct UniqueKey {
    vtree: VtreeId,
    elements: Vec<Element>,
}

/// Manager settings taken from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ManagerOptions {
    /// Run a limited vtree search after this many compiled litsets (0 disables).
    pub(crate) search_interval: usize,
    pub(crate) verbose: bool,
}

pub struct SddManager {
    pub(super) vtree: Vtree,
    nodes: RefCell<Vec<Sdd>>,
    negations: RefCell<Vec<Option<SddId>>>,
    unique: RefCell<HashMap<UniqueKey, SddId>>,
    /// `(positive, negative)` literal node of each variable.
    literals: Vec<(SddId, SddId)>,
    apply_cache: RefCell<HashMap<CacheKey, SddId>>,
    apply_calls: Cell<usize>,
    cache_hits: Cell<usize>,
    pub(super) options: ManagerOptions,
    /// Roots kept valid across vtree search; see [`SddManager::pin`].
    pub(super) pins: Vec<SddId>,
}

impl SddManager {
    /// Creates a manager over the variables of `vtree`, taking ownership of it.
    pub fn new(vtree: Vtree) -> Self {
        let num_vars = vtree.num_vars();
        let mut mgr = Self {
            vtree,
            nodes: RefCell::new(vec![Sdd::False, Sdd::True]),
            negations: RefCell::new(vec![Some(SddId::TRUE), Some(SddId::FALSE)]),
            unique: RefCell::new(HashMap::new()),
            literals: Vec::with_capacity(num_vars),
            apply_cache: RefCell::new(HashMap::new()),
            apply_calls: Cell::new(0),
            cache_hits: Cell::new(0),
            options: ManagerOptions::default(),
            pins: Vec::new(),
        };
        for v in 0..num_vars as u32 {
            let var = Var::new(v);
            let pos = mgr.add_node(Sdd::Literal(var.pos()));
            let neg = mgr.add_node(Sdd::Literal(var.neg()));
            mgr.set_negation(pos, neg);
            mgr.set_negation(neg, pos);
            mgr.literals.push((pos, neg));
        }
        mgr
    }

    pub fn set_options(&mut self, options: &CompilerOptions) {
        self.options = ManagerOptions {
            search_interval: options.vtree_search_interval,
            verbose: options.verbose,
        };
    }

    #[inline]
    pub fn num_vars(&self) -> usize {
        self.vtree.num_vars()
    }

    #[inline]
    pub fn vtree(&self) -> &Vtree {
        &self.vtree
    }

    /// Number of nodes ever allocated, terminals included.
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn node(&self, id: SddId) -> Sdd {
        self.nodes.borrow()[id.index()].clone()
    }

    /// # Panics
    ///
    /// Panics if the variable is not in the vtree.
    pub fn literal(&self, lit: Lit) -> SddId {
        let index = lit.var().index();
        assert!(index < self.num_vars(), "Invalid variable: {}", lit.var());
        let (pos, neg) = self.literals[index];
        if lit.is_positive() {
            pos
        } else {
            neg
        }
    }

    fn add_node(&self, node: Sdd) -> SddId {
        let mut nodes = self.nodes.borrow_mut();
        let id = SddId::new(nodes.len() as u32);
        nodes.push(node);
        self.negations.borrow_mut().push(None);
        id
    }

    fn set_negation(&self, f: SddId, neg: SddId) {
        self.negations.borrow_mut()[f.index()] = Some(neg);
    }

    fn cached_negation(&self, f: SddId) -> Option<SddId> {
        self.negations.borrow()[f.index()]
    }

    pub fn negate(&self, f: SddId) -> SddId {
        if let Some(neg) = self.cached_negation(f) {
            return neg;
        }
        let neg = match self.node(f) {
            Sdd::False => SddId::TRUE,
            Sdd::True => SddId::FALSE,
            Sdd::Literal(lit) => self.literal(!lit),
            Sdd::Decision { vtree, elements } => {
                // Primes partition TRUE, so negating the subs negates the node.
                let elements = elements
                    .iter()
                    .map(|e| Element::new(e.prime, self.negate(e.sub)))
                    .collect();
                self.make_decision(vtree, elements)
            }
        };
        self.set_negation(f, neg);
        self.set_negation(neg, f);
        neg
    }

    pub fn and(&self, f: SddId, g: SddId) -> SddId {
        self.apply(f, g, Op::And)
    }

    pub fn or(&self, f: SddId, g: SddId) -> SddId {
        self.apply(f, g, Op::Or)
    }

    /// Disjunction of literals.
    pub fn clause(&self, lits: &[Lit]) -> SddId {
        lits.iter().fold(SddId::FALSE, |acc, &l| self.or(acc, self.literal(l)))
    }

    /// Conjunction of literals.
    pub fn cube(&self, lits: &[Lit]) -> SddId {
        lits.iter().fold(SddId::TRUE, |acc, &l| self.and(acc, self.literal(l)))
    }

    fn apply(&self, f: SddId, g: SddId, op: Op) -> SddId {
        self.apply_calls.set(self.apply_calls.get() + 1);

        if f == g {
            return f;
        }
        if self.cached_negation(f) == Some(g) {
            return op.zero();
        }
        if f == op.zero() || g == op.zero() {
            return op.zero();
        }
        if f == op.one() {
            return g;
        }
        if g == op.one() {
            return f;
        }

        let key = CacheKey::new(op, f, g);
        if let Some(&result) = self.apply_cache.borrow().get(&key) {
            self.cache_hits.set(self.cache_hits.get() + 1);
            return result;
        }

        let vf = self.node_vtree(f);
        let vg = self.node_vtree(g);
        let (f, g, vf, vg) = if self.vtree.position(vf) <= self.vtree.position(vg) {
            (f, g, vf, vg)
        } else {
            (g, f, vg, vf)
        };

        let result = if vf == vg {
            self.apply_equal(f, g, vf, op)
        } else {
            let lca = self.vtree.lca(vf, vg);
            if lca == vg {
                // f lies in the left subtree of g's vtree.
                self.apply_left(f, g, vg, op)
            } else if lca == vf {
                // g lies in the right subtree of f's vtree.
                self.apply_right(f, g, vf, op)
            } else {
                self.apply_incomparable(f, g, lca, op)
            }
        };

        self.apply_cache.borrow_mut().insert(key, result);
        result
    }

    fn apply_equal(&self, f: SddId, g: SddId, vtree: VtreeId, op: Op) -> SddId {
        let ef = self.get_elements(f, vtree);
        let eg = self.get_elements(g, vtree);
        let mut elements = Vec::new();
        for a in &ef {
            for b in &eg {
                let prime = self.and(a.prime, b.prime);
                if prime.is_false() {
                    continue;
                }
                elements.push(Element::new(prime, self.apply(a.sub, b.sub, op)));
            }
        }
        self.build(vtree, elements)
    }

    fn apply_left(&self, f: SddId, g: SddId, vtree: VtreeId, op: Op) -> SddId {
        let eg = self.get_elements(g, vtree);
        let not_f = self.negate(f);
        // AND: (¬f, ⊥) plus (p ∧ f, s). OR: (f, ⊤) plus (p ∧ ¬f, s).
        let (inside, outside) = match op {
            Op::And => (f, not_f),
            Op::Or => (not_f, f),
        };
        let mut elements = vec![Element::new(outside, op.zero())];
        for e in &eg {
            let prime = self.and(e.prime, inside);
            if !prime.is_false() {
                elements.push(Element::new(prime, e.sub));
            }
        }
        self.build(vtree, elements)
    }

    fn apply_right(&self, f: SddId, g: SddId, vtree: VtreeId, op: Op) -> SddId {
        let elements = self
            .get_elements(f, vtree)
            .iter()
            .map(|e| Element::new(e.prime, self.apply(e.sub, g, op)))
            .collect();
        self.build(vtree, elements)
    }

    fn apply_incomparable(&self, f: SddId, g: SddId, lca: VtreeId, op: Op) -> SddId {
        let not_f = self.negate(f);
        let elements = match op {
            Op::And => vec![Element::new(f, g), Element::new(not_f, SddId::FALSE)],
            Op::Or => vec![Element::new(f, SddId::TRUE), Element::new(not_f, g)],
        };
        self.build(lca, elements)
    }

    /// Elements of `f` as a partition for `vtree`, which is `f`'s vtree or an ancestor of it.
    fn get_elements(&self, f: SddId, vtree: VtreeId) -> Vec<Element> {
        if f.is_true() {
            return vec![Element::new(SddId::TRUE, SddId::TRUE)];
        }
        if f.is_false() {
            return vec![Element::new(SddId::TRUE, SddId::FALSE)];
        }
        if let Sdd::Decision { vtree: own, elements } = self.node(f) {
            if own == vtree {
                return elements;
            }
        }
        if self.vtree.is_in_left_subtree(self.node_vtree(f), vtree) {
            vec![Element::new(f, SddId::TRUE), Element::new(self.negate(f), SddId::FALSE)]
        } else {
            vec![Element::new(SddId::TRUE, f)]
        }
    }

    /// Compresses and trims `elements` into a node for `vtree`.
    ///
    /// * elements sharing a sub are merged by disjoining their primes;
    /// * `{(⊤, s)}` becomes `s`;
    /// * `{(p, ⊤), (¬p, ⊥)}` becomes `p`.
    fn build(&self, vtree: VtreeId, elements: Vec<Element>) -> SddId {
        let mut by_sub: HashMap<SddId, SddId> = HashMap::new();
        let mut order = Vec::new();
        for e in elements {
            match by_sub.get(&e.sub) {
                Some(&prime) => {
                    by_sub.insert(e.sub, self.or(prime, e.prime));
                }
                None => {
                    by_sub.insert(e.sub, e.prime);
                    order.push(e.sub);
                }
            }
        }
        let mut compressed: Vec<Element> = order
            .into_iter()
            .map(|sub| Element::new(by_sub[&sub], sub))
            .filter(|e| !e.prime.is_false())
            .collect();

        match compressed.as_slice() {
            [] => return SddId::FALSE,
            [single] => return single.sub,
            [a, b] if a.sub.is_true() && b.sub.is_false() => return a.prime,
            [a, b] if a.sub.is_false() && b.sub.is_true() => return b.prime,
            _ => {}
        }
        compressed.sort();
        self.make_decision(vtree, compressed)
    }

    fn make_decision(&self, vtree: VtreeId, elements: Vec<Element>) -> SddId {
        let key = UniqueKey { vtree, elements };
        if let Some(&id) = self.unique.borrow().get(&key) {
            return id;
        }
        let id = self.add_node(Sdd::Decision {
            vtree,
            elements: key.elements.clone(),
        });
        self.unique.borrow_mut().insert(key, id);
        id
    }

    /// Vtree node `f` is normalized for; the root for constants.
    pub fn node_vtree(&self, f: SddId) -> VtreeId {
        match self.node(f) {
            Sdd::Literal(lit) => self.vtree.var_vtree(lit.var()),
            Sdd::Decision { vtree, .. } => vtree,
            Sdd::True | Sdd::False => self.vtree.root(),
        }
    }

    pub fn eval(&self, f: SddId, assignment: &[bool]) -> bool {
        match self.node(f) {
            Sdd::False => false,
            Sdd::True => true,
            Sdd::Literal(lit) => assignment[lit.var().index()] == lit.is_positive(),
            Sdd::Decision { elements, .. } => elements
                .iter()
                .find(|e| self.eval(e.prime, assignment))
                .is_some_and(|e| self.eval(e.sub, assignment)),
        }
    }

    /// Number of assignments to all manager variables that satisfy `f`.
    pub fn model_count(&self, f: SddId) -> BigUint {
        let mut memo = HashMap::new();
        self.count_under(f, self.vtree.root(), &mut memo)
    }

    /// Models of `f` over the variables of `vtree`, which contains `f`'s vtree.
    fn count_under(&self, f: SddId, vtree: VtreeId, memo: &mut HashMap<SddId, BigUint>) -> BigUint {
        let total = self.vtree.var_count(vtree);
        if f.is_false() {
            return BigUint::zero();
        }
        if f.is_true() {
            return BigUint::one() << total;
        }
        let gap = total - self.vtree.var_count(self.node_vtree(f));
        self.count_local(f, memo) << gap
    }

    fn count_local(&self, f: SddId, memo: &mut HashMap<SddId, BigUint>) -> BigUint {
        if let Some(count) = memo.get(&f) {
            return count.clone();
        }
        let count = match self.node(f) {
            Sdd::False => BigUint::zero(),
            Sdd::True | Sdd::Literal(_) => BigUint::one(),
            Sdd::Decision { vtree, elements } => {
                let (left, right) = self.vtree.children(vtree);
                elements
                    .iter()
                    .filter(|e| !e.sub.is_false())
                    .map(|e| self.count_under(e.prime, left, memo) * self.count_under(e.sub, right, memo))
                    .sum()
            }
        };
        memo.insert(f, count.clone());
        count
    }

    /// Decision nodes reachable from `roots`, each once.
    pub(super) fn decisions(&self, roots: &[SddId]) -> Vec<SddId> {
        let mut seen = HashSet::new();
        let mut stack: Vec<SddId> = roots.to_vec();
        let mut result = Vec::new();
        while let Some(f) = stack.pop() {
            if f.is_constant() || !seen.insert(f) {
                continue;
            }
            let node = self.node(f);
            if node.is_decision() {
                result.push(f);
                for e in node.elements() {
                    stack.push(e.prime);
                    stack.push(e.sub);
                }
            }
        }
        result
    }

    /// Total number of elements in the decision nodes of `f`.
    pub fn size(&self, f: SddId) -> usize {
        self.shared_size(&[f])
    }

    /// Like [`size`](Self::size), counting shared nodes once.
    pub fn shared_size(&self, roots: &[SddId]) -> usize {
        self.decisions(roots).iter().map(|&d| self.node(d).elements().len()).sum()
    }

    /// Number of decision nodes of `f`.
    pub fn count(&self, f: SddId) -> usize {
        self.decisions(&[f]).len()
    }

    /// Writes a summary of the manager state.
    pub fn print<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let live = self.decisions(&self.pins);
        writeln!(w, "\nmanager")?;
        writeln!(w, " vars                   : {}", self.num_vars())?;
        writeln!(w, " vtree nodes            : {}", self.vtree.num_nodes())?;
        writeln!(w, " vtree                  : {}", self.vtree)?;
        writeln!(w, " allocated nodes        : {}", self.num_nodes())?;
        writeln!(w, " decision nodes         : {}", self.unique.borrow().len())?;
        writeln!(w, " pinned roots           : {} ({} nodes)", self.pins.len(), live.len())?;
        writeln!(w, " apply calls            : {}", self.apply_calls.get())?;
        writeln!(w, " apply cache hits       : {}", self.cache_hits.get())?;
        Ok(())
    }

    /// Drops the operation cache.
    pub fn clear_caches(&self) {
        let n = self.apply_cache.borrow().len();
        self.apply_cache.borrow_mut().clear();
        debug!("cleared {} cached results", n);
    }
}

impl fmt::Debug for SddManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SddManager")
            .field("num_vars", &self.num_vars())
            .field("num_nodes", &self.num_nodes())
            .field("vtree", &self.vtree.to_string())
            .finish()
    }
}
