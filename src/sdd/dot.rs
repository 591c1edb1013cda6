//! Graphviz DOT export for SDDs and vtrees.
//!
//! Render with `dot -Tpdf file.dot -o file.pdf`.
//!
//! Decision nodes are circles labelled with the position of their vtree node.
//! Each element is a two-cell record `[prime|sub]`; terminals and literals are
//! printed inside the cells, and other children get an edge from their cell.

use std::collections::HashSet;
use std::io::{self, Write};
use std::path::Path;

use crate::error::{self, Result};

use super::manager::SddManager;
use super::node::{Sdd, SddId};
use super::vtree::{Vtree, VtreeNode};

impl SddManager {
    /// Text shown inside a cell, or `None` if the child is a decision node.
    fn cell_label(&self, f: SddId) -> Option<String> {
        match self.node(f) {
            Sdd::False => Some("⊥".to_string()),
            Sdd::True => Some("⊤".to_string()),
            Sdd::Literal(lit) if lit.is_positive() => Some(lit.var().to_string()),
            Sdd::Literal(lit) => Some(format!("¬{}", lit.var())),
            Sdd::Decision { .. } => None,
        }
    }

    pub fn to_dot<W: Write>(&self, f: SddId, w: &mut W) -> io::Result<()> {
        writeln!(w, "digraph sdd {{")?;
        writeln!(w, "  overlap=false;")?;

        if let Some(label) = self.cell_label(f) {
            writeln!(w, "  n{} [label=\"{}\", shape=box];", f.index(), label)?;
            writeln!(w, "}}")?;
            return w.flush();
        }

        let mut seen = HashSet::new();
        let mut stack = vec![f];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let Sdd::Decision { vtree, elements } = self.node(id) else {
                continue;
            };
            writeln!(
                w,
                "  n{} [label=\"{}\", shape=circle, style=bold];",
                id.index(),
                self.vtree.position(vtree)
            )?;
            for (k, e) in elements.iter().enumerate() {
                let prime = self.cell_label(e.prime);
                let sub = self.cell_label(e.sub);
                writeln!(
                    w,
                    "  e{}_{} [label=\"<p>{}|<s>{}\", shape=record, height=.25];",
                    id.index(),
                    k,
                    prime.as_deref().unwrap_or(" "),
                    sub.as_deref().unwrap_or(" ")
                )?;
                writeln!(w, "  n{} -> e{}_{} [arrowsize=.50];", id.index(), id.index(), k)?;
                if prime.is_none() {
                    writeln!(w, "  e{}_{}:p:c -> n{} [arrowsize=.50, tailclip=false];", id.index(), k, e.prime.index())?;
                    stack.push(e.prime);
                }
                if sub.is_none() {
                    writeln!(w, "  e{}_{}:s:c -> n{} [arrowsize=.50, tailclip=false];", id.index(), k, e.sub.index())?;
                    stack.push(e.sub);
                }
            }
        }
        writeln!(w, "}}")?;
        w.flush()
    }

    pub fn save_as_dot(&self, f: SddId, path: impl AsRef<Path>) -> Result<()> {
        let mut file = io::BufWriter::new(error::create(path.as_ref())?);
        self.to_dot(f, &mut file)?;
        Ok(())
    }
}

impl Vtree {
    pub fn to_dot<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "digraph vtree {{")?;
        writeln!(w, "  overlap=false;")?;
        for position in 0..self.num_nodes() as u32 {
            let id = self.at_position(position);
            match *self.node(id) {
                VtreeNode::Leaf { var } => {
                    writeln!(w, "  n{} [label=\"{}\", shape=plaintext];", position, var)?;
                }
                VtreeNode::Internal { left, right } => {
                    writeln!(w, "  n{} [label=\"{}\", shape=point];", position, position)?;
                    writeln!(w, "  n{} -> n{} [arrowhead=none];", position, self.position(left))?;
                    writeln!(w, "  n{} -> n{} [arrowhead=none];", position, self.position(right))?;
                }
            }
        }
        writeln!(w, "}}")?;
        w.flush()
    }

    pub fn save_as_dot(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = io::BufWriter::new(error::create(path.as_ref())?);
        self.to_dot(&mut file)?;
        Ok(())
    }
}
