//! Variable trees.
//!
//! A vtree is a full binary tree whose leaves are the variables. It fixes how
//! SDD nodes decompose: a decision node normalized for an internal vtree node
//! has primes over the left subtree and subs over the right subtree.
//!
//! For variables {x₁, x₂, x₃, x₄}, the balanced vtree is:
//!
//! ```text
//!        (3)
//!        / \
//!       /   \
//!     (1)   (5)
//!     / \   / \
//!    x₁ x₂ x₃ x₄
//! ```
//!
//! Node labels above are in-order positions, which is also how nodes are
//! numbered in vtree files.

use std::collections::HashSet;
use std::fmt::{self, Display};
use std::str::FromStr;

use crate::lit::Var;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VtreeId(u32);

impl VtreeId {
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for VtreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VtreeNode {
    Leaf { var: Var },
    Internal { left: VtreeId, right: VtreeId },
}

impl VtreeNode {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, VtreeNode::Leaf { .. })
    }
}

/// Shape of an initial vtree.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum VtreeType {
    /// Left-linear: every right child is a leaf.
    Left,
    /// Right-linear: every left child is a leaf.
    Right,
    /// Alternates between right-linear and left-linear steps.
    Vertical,
    #[default]
    Balanced,
}

impl Display for VtreeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VtreeType::Left => "left",
            VtreeType::Right => "right",
            VtreeType::Vertical => "vertical",
            VtreeType::Balanced => "balanced",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for VtreeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(VtreeType::Left),
            "right" => Ok(VtreeType::Right),
            "vertical" => Ok(VtreeType::Vertical),
            "balanced" => Ok(VtreeType::Balanced),
            _ => Err(format!("unknown vtree type '{}' (expected left, right, vertical or balanced)", s)),
        }
    }
}

/// A local restructuring of the vtree around one internal node.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum VtreeMove {
    /// `(a, b)` becomes `(b, a)`.
    Swap,
    /// `((a, b), c)` becomes `(a, (b, c))`.
    RotateRight,
    /// `(a, (b, c))` becomes `((a, b), c)`.
    RotateLeft,
}

impl VtreeMove {
    pub const ALL: [VtreeMove; 3] = [VtreeMove::Swap, VtreeMove::RotateRight, VtreeMove::RotateLeft];
}

/// Nested form used to rebuild a vtree after a move.
#[derive(Debug, Clone)]
enum Shape {
    Leaf(Var),
    Node(Box<Shape>, Box<Shape>),
}

/// Nodes are stored children-first, so the root is always the last node.
#[derive(Debug, Clone)]
pub struct Vtree {
    nodes: Vec<VtreeNode>,
    parents: Vec<Option<VtreeId>>,
    root: VtreeId,
    num_vars: usize,
    /// Leaf of each variable.
    var_to_vtree: Vec<VtreeId>,
    /// In-order position of each node.
    positions: Vec<u32>,
    /// Node at each in-order position.
    by_position: Vec<VtreeId>,
    /// First in-order position inside each subtree.
    starts: Vec<u32>,
    /// Number of variables below each node.
    var_counts: Vec<usize>,
}

impl Vtree {
    /// Builds a vtree of the given shape over variables `0..num_vars`, in natural order.
    ///
    /// # Panics
    ///
    /// Panics if `num_vars` is zero.
    pub fn new(num_vars: usize, kind: VtreeType) -> Self {
        assert!(num_vars > 0, "Must have at least one variable");
        let vars: Vec<Var> = (0..num_vars as u32).map(Var::new).collect();
        let shape = match kind {
            VtreeType::Left => Self::left_linear(&vars),
            VtreeType::Right => Self::right_linear(&vars),
            VtreeType::Vertical => Self::vertical(&vars, true),
            VtreeType::Balanced => Self::balanced(&vars),
        };
        Self::from_shape(&shape)
    }

    fn balanced(vars: &[Var]) -> Shape {
        if vars.len() == 1 {
            return Shape::Leaf(vars[0]);
        }
        let mid = vars.len() / 2;
        Shape::Node(Box::new(Self::balanced(&vars[..mid])), Box::new(Self::balanced(&vars[mid..])))
    }

    fn right_linear(vars: &[Var]) -> Shape {
        let mut shape = Shape::Leaf(vars[vars.len() - 1]);
        for &v in vars[..vars.len() - 1].iter().rev() {
            shape = Shape::Node(Box::new(Shape::Leaf(v)), Box::new(shape));
        }
        shape
    }

    fn left_linear(vars: &[Var]) -> Shape {
        let mut shape = Shape::Leaf(vars[0]);
        for &v in &vars[1..] {
            shape = Shape::Node(Box::new(shape), Box::new(Shape::Leaf(v)));
        }
        shape
    }

    fn vertical(vars: &[Var], split_first: bool) -> Shape {
        match vars {
            [v] => Shape::Leaf(*v),
            [first, rest @ ..] if split_first => {
                Shape::Node(Box::new(Shape::Leaf(*first)), Box::new(Self::vertical(rest, false)))
            }
            [rest @ .., last] => Shape::Node(Box::new(Self::vertical(rest, true)), Box::new(Shape::Leaf(*last))),
            [] => unreachable!("vertical vtree over no variables"),
        }
    }

    fn from_shape(shape: &Shape) -> Self {
        let mut nodes = Vec::new();
        fn build(shape: &Shape, nodes: &mut Vec<VtreeNode>) -> VtreeId {
            let node = match shape {
                Shape::Leaf(var) => VtreeNode::Leaf { var: *var },
                Shape::Node(l, r) => {
                    let left = build(l, nodes);
                    let right = build(r, nodes);
                    VtreeNode::Internal { left, right }
                }
            };
            nodes.push(node);
            VtreeId::new(nodes.len() as u32 - 1)
        }
        build(shape, &mut nodes);
        Self::from_nodes(nodes)
    }

    fn to_shape(&self, id: VtreeId) -> Shape {
        match *self.node(id) {
            VtreeNode::Leaf { var } => Shape::Leaf(var),
            VtreeNode::Internal { left, right } => {
                Shape::Node(Box::new(self.to_shape(left)), Box::new(self.to_shape(right)))
            }
        }
    }

    /// Builds the derived tables from a children-first node list.
    ///
    /// The caller guarantees the list forms one full binary tree whose leaves
    /// are exactly the variables `0..n` for some `n`.
    pub(crate) fn from_nodes(nodes: Vec<VtreeNode>) -> Self {
        let root = VtreeId::new(nodes.len() as u32 - 1);
        let mut parents = vec![None; nodes.len()];
        let mut var_counts = vec![0; nodes.len()];
        let mut num_vars = 0;
        for (i, node) in nodes.iter().enumerate() {
            match *node {
                VtreeNode::Leaf { var } => {
                    var_counts[i] = 1;
                    num_vars = num_vars.max(var.index() + 1);
                }
                VtreeNode::Internal { left, right } => {
                    parents[left.index()] = Some(VtreeId::new(i as u32));
                    parents[right.index()] = Some(VtreeId::new(i as u32));
                    var_counts[i] = var_counts[left.index()] + var_counts[right.index()];
                }
            }
        }

        let mut var_to_vtree = vec![root; num_vars];
        for (i, node) in nodes.iter().enumerate() {
            if let VtreeNode::Leaf { var } = *node {
                var_to_vtree[var.index()] = VtreeId::new(i as u32);
            }
        }

        let mut vtree = Self {
            nodes,
            parents,
            root,
            num_vars,
            var_to_vtree,
            positions: Vec::new(),
            by_position: Vec::new(),
            starts: Vec::new(),
            var_counts,
        };
        vtree.compute_positions();
        vtree
    }

    fn compute_positions(&mut self) {
        self.positions = vec![0; self.nodes.len()];
        self.by_position = Vec::with_capacity(self.nodes.len());
        // Iterative in-order traversal.
        let mut stack = Vec::new();
        let mut current = Some(self.root);
        while current.is_some() || !stack.is_empty() {
            while let Some(id) = current {
                stack.push(id);
                current = match self.nodes[id.index()] {
                    VtreeNode::Internal { left, .. } => Some(left),
                    VtreeNode::Leaf { .. } => None,
                };
            }
            if let Some(id) = stack.pop() {
                self.positions[id.index()] = self.by_position.len() as u32;
                self.by_position.push(id);
                current = match self.nodes[id.index()] {
                    VtreeNode::Internal { right, .. } => Some(right),
                    VtreeNode::Leaf { .. } => None,
                };
            }
        }

        self.starts = vec![0; self.nodes.len()];
        for i in 0..self.nodes.len() {
            self.starts[i] = match self.nodes[i] {
                VtreeNode::Leaf { .. } => self.positions[i],
                VtreeNode::Internal { left, .. } => self.starts[left.index()],
            };
        }
    }

    /// In-order positions covered by the subtree at `id`.
    fn span(&self, id: VtreeId) -> std::ops::RangeInclusive<u32> {
        let start = self.starts[id.index()];
        start..=start + 2 * (self.var_count(id) as u32 - 1)
    }

    #[inline]
    pub fn root(&self) -> VtreeId {
        self.root
    }

    #[inline]
    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn node(&self, id: VtreeId) -> &VtreeNode {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn parent(&self, id: VtreeId) -> Option<VtreeId> {
        self.parents[id.index()]
    }

    /// In-order position. Nodes in a left subtree come before their ancestor,
    /// which comes before its right subtree.
    #[inline]
    pub fn position(&self, id: VtreeId) -> u32 {
        self.positions[id.index()]
    }

    #[inline]
    pub fn at_position(&self, position: u32) -> VtreeId {
        self.by_position[position as usize]
    }

    #[inline]
    pub fn var_vtree(&self, var: Var) -> VtreeId {
        self.var_to_vtree[var.index()]
    }

    #[inline]
    pub fn var_count(&self, id: VtreeId) -> usize {
        self.var_counts[id.index()]
    }

    #[inline]
    pub fn is_leaf(&self, id: VtreeId) -> bool {
        self.node(id).is_leaf()
    }

    /// # Panics
    ///
    /// Panics if the node is a leaf.
    pub fn children(&self, id: VtreeId) -> (VtreeId, VtreeId) {
        match *self.node(id) {
            VtreeNode::Internal { left, right } => (left, right),
            VtreeNode::Leaf { .. } => panic!("Node {} is not internal", id),
        }
    }

    pub fn left(&self, id: VtreeId) -> VtreeId {
        self.children(id).0
    }

    pub fn right(&self, id: VtreeId) -> VtreeId {
        self.children(id).1
    }

    /// Variables below `id`, left to right.
    pub fn variables_under(&self, id: VtreeId) -> Vec<Var> {
        self.span(id)
            .map(|p| self.at_position(p))
            .filter_map(|v| match *self.node(v) {
                VtreeNode::Leaf { var } => Some(var),
                VtreeNode::Internal { .. } => None,
            })
            .collect()
    }

    pub fn lca(&self, a: VtreeId, b: VtreeId) -> VtreeId {
        let mut ancestors = HashSet::new();
        let mut current = Some(a);
        while let Some(id) = current {
            ancestors.insert(id);
            current = self.parent(id);
        }
        let mut current = Some(b);
        while let Some(id) = current {
            if ancestors.contains(&id) {
                return id;
            }
            current = self.parent(id);
        }
        self.root
    }

    pub fn is_ancestor(&self, ancestor: VtreeId, descendant: VtreeId) -> bool {
        self.span(ancestor).contains(&self.position(descendant))
    }

    pub fn is_in_left_subtree(&self, a: VtreeId, ancestor: VtreeId) -> bool {
        match *self.node(ancestor) {
            VtreeNode::Internal { left, .. } => self.is_ancestor(left, a),
            VtreeNode::Leaf { .. } => false,
        }
    }

    /// The vtree after applying `mv` at `id`, or `None` when the move does not apply there.
    pub fn with_move(&self, id: VtreeId, mv: VtreeMove) -> Option<Vtree> {
        let (left, right) = match *self.node(id) {
            VtreeNode::Internal { left, right } => (left, right),
            VtreeNode::Leaf { .. } => return None,
        };
        let replacement = match mv {
            VtreeMove::Swap => Shape::Node(Box::new(self.to_shape(right)), Box::new(self.to_shape(left))),
            VtreeMove::RotateRight => {
                let (a, b) = match *self.node(left) {
                    VtreeNode::Internal { left, right } => (left, right),
                    VtreeNode::Leaf { .. } => return None,
                };
                Shape::Node(
                    Box::new(self.to_shape(a)),
                    Box::new(Shape::Node(Box::new(self.to_shape(b)), Box::new(self.to_shape(right)))),
                )
            }
            VtreeMove::RotateLeft => {
                let (b, c) = match *self.node(right) {
                    VtreeNode::Internal { left, right } => (left, right),
                    VtreeNode::Leaf { .. } => return None,
                };
                Shape::Node(
                    Box::new(Shape::Node(Box::new(self.to_shape(left)), Box::new(self.to_shape(b)))),
                    Box::new(self.to_shape(c)),
                )
            }
        };
        Some(Self::from_shape(&self.replace(self.root, id, &replacement)))
    }

    fn replace(&self, current: VtreeId, target: VtreeId, replacement: &Shape) -> Shape {
        if current == target {
            return replacement.clone();
        }
        match *self.node(current) {
            VtreeNode::Leaf { var } => Shape::Leaf(var),
            VtreeNode::Internal { left, right } => Shape::Node(
                Box::new(self.replace(left, target, replacement)),
                Box::new(self.replace(right, target, replacement)),
            ),
        }
    }
}

impl Display for Vtree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn go(vtree: &Vtree, id: VtreeId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match *vtree.node(id) {
                VtreeNode::Leaf { var } => write!(f, "{}", var),
                VtreeNode::Internal { left, right } => {
                    write!(f, "(")?;
                    go(vtree, left, f)?;
                    write!(f, " ")?;
                    go(vtree, right, f)?;
                    write!(f, ")")
                }
            }
        }
        go(self, self.root, f)
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
    fn test_balanced() {
        let vtree = Vtree::new(4, VtreeType::Balanced);
        assert_eq!(vtree.num_vars(), 4);
        assert_eq!(vtree.num_nodes(), 7);
        assert_eq!(vtree.to_string(), "((x1 x2) (x3 x4))");
        assert_eq!(vtree.position(vtree.root()), 3);
        assert_eq!(vtree.var_count(vtree.root()), 4);
    }

    #[test]
    fn test_linear_shapes() {
        assert_eq!(Vtree::new(3, VtreeType::Right).to_string(), "(x1 (x2 x3))");
        assert_eq!(Vtree::new(3, VtreeType::Left).to_string(), "((x1 x2) x3)");
        assert_eq!(Vtree::new(4, VtreeType::Vertical).to_string(), "(x1 ((x2 x3) x4))");
        assert_eq!(Vtree::new(1, VtreeType::Vertical).to_string(), "x1");
    }

    #[test]
    fn test_type_from_str() {
        assert_eq!("vertical".parse::<VtreeType>().unwrap(), VtreeType::Vertical);
        assert_eq!(VtreeType::default().to_string(), "balanced");
        assert!("random".parse::<VtreeType>().is_err());
    }

    #[test]
    fn test_variables_under() {
        let vtree = Vtree::new(4, VtreeType::Balanced);
        assert_eq!(vtree.variables_under(vtree.root()), vec![x(0), x(1), x(2), x(3)]);
        let right = vtree.right(vtree.root());
        assert_eq!(vtree.variables_under(right), vec![x(2), x(3)]);
    }

    #[test]
    fn test_lca_and_ancestry() {
        let vtree = Vtree::new(4, VtreeType::Balanced);
        let v1 = vtree.var_vtree(x(0));
        let v2 = vtree.var_vtree(x(1));
        let v3 = vtree.var_vtree(x(2));
        let lca12 = vtree.lca(v1, v2);
        assert_eq!(lca12, vtree.left(vtree.root()));
        assert_eq!(vtree.lca(v1, v3), vtree.root());
        assert!(vtree.is_ancestor(vtree.root(), v3));
        assert!(!vtree.is_ancestor(lca12, v3));
        assert!(vtree.is_in_left_subtree(v2, vtree.root()));
        assert!(!vtree.is_in_left_subtree(v3, vtree.root()));
    }

    #[test]
    fn test_parents() {
        let vtree = Vtree::new(2, VtreeType::Balanced);
        let root = vtree.root();
        assert!(vtree.parent(root).is_none());
        let (left, right) = vtree.children(root);
        assert_eq!(vtree.parent(left), Some(root));
        assert_eq!(vtree.parent(right), Some(root));
    }

    #[test]
    fn test_moves() {
        let vtree = Vtree::new(3, VtreeType::Left);
        let root = vtree.root();
        let rotated = vtree.with_move(root, VtreeMove::RotateRight).unwrap();
        assert_eq!(rotated.to_string(), "(x1 (x2 x3))");
        assert!(vtree.with_move(root, VtreeMove::RotateLeft).is_none());
        let back = rotated.with_move(rotated.root(), VtreeMove::RotateLeft).unwrap();
        assert_eq!(back.to_string(), vtree.to_string());
        let swapped = vtree.with_move(root, VtreeMove::Swap).unwrap();
        assert_eq!(swapped.to_string(), "(x3 (x1 x2))");
        assert!(vtree.with_move(vtree.var_vtree(x(0)), VtreeMove::Swap).is_none());
    }
}
