//! Canonical reduction of a search diagram.
//!
//! Merges isomorphic subgraphs through a unique table and drops redundant
//! tests, yielding the ROBDD of the same function under the same order.

use std::collections::HashMap;

use log::debug;

use crate::lit::Var;
use crate::obdd::{NodeId, Obdd};

/// A reduced diagram, stored separately from the source.
#[derive(Debug, Clone)]
pub struct Reduced {
    pub obdd: Obdd,
    pub root: NodeId,
}

impl Reduced {
    /// Number of non-terminal nodes.
    pub fn size(&self) -> usize {
        self.obdd.size(self.root)
    }
}

pub fn reduce(source: &Obdd, root: NodeId) -> Reduced {
    let mut obdd = Obdd::new();
    let mut unique: HashMap<(Var, NodeId, NodeId), NodeId> = HashMap::new();
    let mut mapping: HashMap<NodeId, NodeId> = HashMap::new();
    mapping.insert(NodeId::FALSE, NodeId::FALSE);
    mapping.insert(NodeId::TRUE, NodeId::TRUE);

    for id in source.descendants(root) {
        let node = source.node(id);
        let lo = mapping[&node.lo];
        let hi = mapping[&node.hi];
        let new = if lo == hi {
            lo
        } else {
            *unique
                .entry((node.var, lo, hi))
                .or_insert_with(|| obdd.mk(node.var, lo, hi))
        };
        mapping.insert(id, new);
    }

    debug!("reduced {} nodes to {}", source.size(root), obdd.len());
    Reduced {
        obdd,
        root: mapping[&root],
    }
}
