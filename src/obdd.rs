//! Output diagram of the all-solutions search.
//!
//! Nodes are appended as the search finishes subproblems, so children always
//! have smaller ids than their parents. The store is not hash-consed: the same
//! function may appear under several ids until [`reduce`](crate::reduce) runs.
//!
//! Variables follow the natural order: a node labelled `x_i` only points to
//! nodes labelled with larger variables or to terminals.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};

use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::lit::Var;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub const FALSE: Self = Self(0);
    pub const TRUE: Self = Self(1);

    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn is_terminal(self) -> bool {
        self.0 <= 1
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::FALSE => write!(f, "F"),
            Self::TRUE => write!(f, "T"),
            _ => write!(f, "@{}", self.0),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Node {
    pub var: Var,
    pub lo: NodeId,
    pub hi: NodeId,
}

#[derive(Debug, Clone)]
pub struct Obdd {
    /// Slots 0 and 1 hold placeholders for the terminals.
    nodes: Vec<Node>,
}

impl Default for Obdd {
    fn default() -> Self {
        Self::new()
    }
}

impl Obdd {
    pub fn new() -> Self {
        let terminal = Node {
            var: Var::new(u32::MAX),
            lo: NodeId::FALSE,
            hi: NodeId::FALSE,
        };
        Self {
            nodes: vec![terminal, terminal],
        }
    }

    /// Number of non-terminal nodes ever created.
    pub fn len(&self) -> usize {
        self.nodes.len() - 2
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Creates a node, skipping it when both branches agree.
    pub fn mk(&mut self, var: Var, lo: NodeId, hi: NodeId) -> NodeId {
        if lo == hi {
            return lo;
        }
        debug_assert!(lo.is_terminal() || self.var(lo) > var);
        debug_assert!(hi.is_terminal() || self.var(hi) > var);
        let id = NodeId::new(self.nodes.len() as u32);
        self.nodes.push(Node { var, lo, hi });
        id
    }

    /// # Panics
    ///
    /// Panics on a terminal.
    pub fn node(&self, id: NodeId) -> &Node {
        assert!(!id.is_terminal(), "Terminals carry no node");
        &self.nodes[id.index()]
    }

    pub fn var(&self, id: NodeId) -> Var {
        self.node(id).var
    }

    /// Level of `id` in an order over `num_vars` variables; terminals sit at `num_vars`.
    fn level(&self, id: NodeId, num_vars: usize) -> usize {
        if id.is_terminal() {
            num_vars
        } else {
            self.var(id).index()
        }
    }

    /// Nodes reachable from `root`, children before parents.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![root];
        let mut result = Vec::new();
        while let Some(id) = stack.pop() {
            if id.is_terminal() || seen[id.index()] {
                continue;
            }
            seen[id.index()] = true;
            result.push(id);
            let node = self.node(id);
            stack.push(node.lo);
            stack.push(node.hi);
        }
        // Ids grow from children to parents.
        result.sort();
        result
    }

    pub fn size(&self, root: NodeId) -> usize {
        self.descendants(root).len()
    }

    pub fn eval(&self, root: NodeId, assignment: &[bool]) -> bool {
        let mut current = root;
        while !current.is_terminal() {
            let node = self.node(current);
            current = if assignment[node.var.index()] { node.hi } else { node.lo };
        }
        current == NodeId::TRUE
    }

    /// Number of assignments to `num_vars` variables that reach TRUE.
    pub fn model_count(&self, root: NodeId, num_vars: usize) -> BigUint {
        let mut counts: HashMap<NodeId, BigUint> = HashMap::new();
        counts.insert(NodeId::FALSE, BigUint::zero());
        counts.insert(NodeId::TRUE, BigUint::one());
        for id in self.descendants(root) {
            let node = *self.node(id);
            let level = node.var.index();
            let branch = |child: NodeId| -> BigUint {
                let gap = self.level(child, num_vars) - level - 1;
                &counts[&child] << gap
            };
            let count = branch(node.lo) + branch(node.hi);
            counts.insert(id, count);
        }
        &counts[&root] << self.level(root, num_vars)
    }

    /// Writes the diagram reachable from `root` as text.
    ///
    /// ```text
    /// c <comment>
    /// obdd <variables> <nodes> <root>
    /// <id> <variable> <lo> <hi>
    /// ```
    ///
    /// Variables are written 1-based. Ids `0` and `1` denote FALSE and TRUE.
    /// Node lines are ordered so that children precede their parents.
    pub fn decompose<W: Write>(&self, w: &mut W, num_vars: usize, root: NodeId) -> io::Result<()> {
        let nodes = self.descendants(root);
        writeln!(w, "c obdd produced by all-solutions search")?;
        writeln!(w, "obdd {} {} {}", num_vars, nodes.len(), root.0)?;
        for id in nodes {
            let node = self.node(id);
            writeln!(w, "{} {} {} {}", id.0, node.var.to_dimacs(), node.lo.0, node.hi.0)?;
        }
        w.flush()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn x(i: u32) -> Var {
        Var::new(i)
    }

    #[test]
    fn test_mk_skips_redundant() {
        let mut obdd = Obdd::new();
        assert_eq!(obdd.mk(x(0), NodeId::TRUE, NodeId::TRUE), NodeId::TRUE);
        assert!(obdd.is_empty());
        let n = obdd.mk(x(0), NodeId::FALSE, NodeId::TRUE);
        assert_eq!(obdd.len(), 1);
        assert!(obdd.eval(n, &[true]));
        assert!(!obdd.eval(n, &[false]));
    }

    #[test]
    fn test_model_count_with_gaps() {
        // x2 over three variables: 4 models.
        let mut obdd = Obdd::new();
        let n = obdd.mk(x(1), NodeId::FALSE, NodeId::TRUE);
        assert_eq!(obdd.model_count(n, 3), BigUint::from(4u32));
        assert_eq!(obdd.model_count(NodeId::TRUE, 3), BigUint::from(8u32));
        assert_eq!(obdd.model_count(NodeId::FALSE, 3), BigUint::zero());

        // x1 & x3: 2 models over three variables.
        let c = obdd.mk(x(2), NodeId::FALSE, NodeId::TRUE);
        let r = obdd.mk(x(0), NodeId::FALSE, c);
        assert_eq!(obdd.model_count(r, 3), BigUint::from(2u32));
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut obdd = Obdd::new();
        let a = obdd.mk(x(1), NodeId::FALSE, NodeId::TRUE);
        let b = obdd.mk(x(1), NodeId::FALSE, NodeId::TRUE);
        assert_ne!(a, b);
        let r = obdd.mk(x(0), a, b);
        assert_eq!(obdd.size(r), 3);
        assert_eq!(obdd.model_count(r, 2), BigUint::from(2u32));
    }

    #[test]
    fn test_decompose() {
        let mut obdd = Obdd::new();
        let c = obdd.mk(x(1), NodeId::TRUE, NodeId::FALSE);
        let r = obdd.mk(x(0), c, NodeId::TRUE);
        let mut out = Vec::new();
        obdd.decompose(&mut out, 2, r).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "obdd 2 2 3");
        assert_eq!(lines[2], "2 2 1 0");
        assert_eq!(lines[3], "3 1 2 1");
    }
}
