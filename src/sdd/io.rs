//! Reading and writing vtrees and SDDs in the libsdd text formats.
//!
//! # Vtree files
//!
//! ```text
//! vtree <node_count>
//! L <id> <var>           # leaf node with variable
//! I <id> <left> <right>  # internal node with children
//! ```
//!
//! # SDD files
//!
//! ```text
//! sdd <node_count>
//! F <id>
//! T <id>
//! L <id> <vtree_id> <literal>
//! D <id> <vtree_id> <size> {<prime> <sub>}*
//! ```
//!
//! In both formats nodes appear bottom-up, lines starting with `c` are
//! comments, vtree ids are in-order positions and variables are 1-based.

use std::collections::{HashMap, HashSet};
use std::io::{self, Read, Write};
use std::path::Path;

use crate::error::{self, Error, Result};
use crate::lit::{Lit, Var};

use super::manager::SddManager;
use super::node::{Sdd, SddId};
use super::vtree::{Vtree, VtreeId, VtreeNode};

fn read_to_string(path: &Path) -> Result<String> {
    let mut text = String::new();
    error::open(path)?.read_to_string(&mut text)?;
    Ok(text)
}

/// Non-comment lines with their 1-based line numbers.
fn content_lines<'a>(text: &'a str) -> impl Iterator<Item = (usize, Vec<&'a str>)> + 'a {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.split_whitespace().collect::<Vec<_>>()))
        .filter(|(_, parts)| !parts.is_empty() && parts[0] != "c")
}

fn field<T: std::str::FromStr>(parts: &[&str], index: usize, line: usize, what: &str) -> Result<T> {
    parts
        .get(index)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::format(line, format!("invalid {}", what)))
}

/// Reads the `<keyword> <count>` header.
fn header<'a>(
    lines: &mut impl Iterator<Item = (usize, Vec<&'a str>)>,
    keyword: &str,
) -> Result<usize> {
    let (line, parts) = lines
        .next()
        .ok_or_else(|| Error::format(0, format!("missing '{}' header", keyword)))?;
    if parts.len() != 2 || parts[0] != keyword {
        return Err(Error::format(line, format!("expected '{} <count>'", keyword)));
    }
    field(&parts, 1, line, "node count")
}

// ─── Vtree ───

impl Vtree {
    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "c ids of vtree nodes start at 0")?;
        writeln!(w, "c ids of variables start at 1")?;
        writeln!(w, "c vtree nodes appear bottom-up, children before parents")?;
        writeln!(w, "c")?;
        writeln!(w, "c file syntax:")?;
        writeln!(w, "c vtree number-of-nodes-in-vtree")?;
        writeln!(w, "c L id-of-leaf-vtree-node id-of-variable")?;
        writeln!(w, "c I id-of-internal-vtree-node id-of-left-child id-of-right-child")?;
        writeln!(w, "c")?;
        writeln!(w, "vtree {}", self.num_nodes())?;
        // Ids grow from children to parents.
        for i in 0..self.num_nodes() {
            let id = VtreeId::new(i as u32);
            match *self.node(id) {
                VtreeNode::Leaf { var } => writeln!(w, "L {} {}", self.position(id), var.to_dimacs())?,
                VtreeNode::Internal { left, right } => writeln!(
                    w,
                    "I {} {} {}",
                    self.position(id),
                    self.position(left),
                    self.position(right)
                )?,
            }
        }
        w.flush()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = io::BufWriter::new(error::create(path.as_ref())?);
        self.write(&mut file)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Self::parse(&read_to_string(path)?).map_err(|e| e.in_file(path))
    }

    /// Parses a vtree file, checking that it describes one tree over variables `1..=n`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = content_lines(text);
        let count = header(&mut lines, "vtree")?;
        if count == 0 {
            return Err(Error::format(0, "vtree has no nodes"));
        }

        let mut nodes = Vec::new();
        let mut index_of: HashMap<u32, VtreeId> = HashMap::new();
        let mut used = Vec::new();
        let mut vars = HashSet::new();
        let mut last_line = 0;

        for (line, parts) in lines {
            last_line = line;
            let file_id: u32 = field(&parts, 1, line, "node id")?;
            let node = match parts[0] {
                "L" => {
                    let var: u32 = field(&parts, 2, line, "variable")?;
                    if var == 0 || !vars.insert(var) {
                        return Err(Error::format(line, format!("bad or repeated variable {}", var)));
                    }
                    VtreeNode::Leaf { var: Var::new(var - 1) }
                }
                "I" => {
                    let mut child = |k: usize| -> Result<VtreeId> {
                        let file_child: u32 = field(&parts, k, line, "child id")?;
                        let id = *index_of
                            .get(&file_child)
                            .ok_or_else(|| Error::format(line, format!("unknown child {}", file_child)))?;
                        if std::mem::replace(&mut used[id.index()], true) {
                            return Err(Error::format(line, format!("child {} has two parents", file_child)));
                        }
                        Ok(id)
                    };
                    let left = child(2)?;
                    let right = child(3)?;
                    VtreeNode::Internal { left, right }
                }
                other => return Err(Error::format(line, format!("unknown node type '{}'", other))),
            };
            let id = VtreeId::new(nodes.len() as u32);
            if index_of.insert(file_id, id).is_some() {
                return Err(Error::format(line, format!("duplicate node id {}", file_id)));
            }
            nodes.push(node);
            used.push(false);
        }

        if nodes.len() != count {
            return Err(Error::format(last_line, format!("expected {} nodes, found {}", count, nodes.len())));
        }
        if used[..count - 1].iter().any(|&u| !u) {
            return Err(Error::format(last_line, "vtree is not a single tree"));
        }
        if (1..=vars.len() as u32).any(|v| !vars.contains(&v)) {
            return Err(Error::format(last_line, "variables are not numbered 1..n"));
        }
        Ok(Vtree::from_nodes(nodes))
    }
}

// ─── SDD ───

impl SddManager {
    pub fn write_sdd<W: Write>(&self, f: SddId, w: &mut W) -> io::Result<()> {
        writeln!(w, "c ids of sdd nodes start at 0")?;
        writeln!(w, "c sdd nodes appear bottom-up, children before parents")?;
        writeln!(w, "c")?;
        writeln!(w, "c file syntax:")?;
        writeln!(w, "c sdd count-of-sdd-nodes")?;
        writeln!(w, "c F id-of-false-sdd-node")?;
        writeln!(w, "c T id-of-true-sdd-node")?;
        writeln!(w, "c L id-of-literal-sdd-node id-of-vtree literal")?;
        writeln!(
            w,
            "c D id-of-decomposition-sdd-node id-of-vtree number-of-elements {{id-of-prime id-of-sub}}*"
        )?;
        writeln!(w, "c")?;

        let mut ids: HashMap<SddId, usize> = HashMap::new();
        let mut lines = Vec::new();
        self.collect_lines(f, &mut ids, &mut lines);
        writeln!(w, "sdd {}", lines.len())?;
        for line in lines {
            writeln!(w, "{}", line)?;
        }
        w.flush()
    }

    fn collect_lines(&self, f: SddId, ids: &mut HashMap<SddId, usize>, lines: &mut Vec<String>) -> usize {
        if let Some(&id) = ids.get(&f) {
            return id;
        }
        let line = match self.node(f) {
            Sdd::False => format!("F {}", lines.len()),
            Sdd::True => format!("T {}", lines.len()),
            Sdd::Literal(lit) => {
                let vtree = self.vtree.var_vtree(lit.var());
                format!("L {} {} {}", lines.len(), self.vtree.position(vtree), lit.to_dimacs())
            }
            Sdd::Decision { vtree, elements } => {
                let children: Vec<(usize, usize)> = elements
                    .iter()
                    .map(|e| (self.collect_lines(e.prime, ids, lines), self.collect_lines(e.sub, ids, lines)))
                    .collect();
                let mut line = format!("D {} {} {}", lines.len(), self.vtree.position(vtree), children.len());
                for (p, s) in children {
                    line.push_str(&format!(" {} {}", p, s));
                }
                line
            }
        };
        let id = lines.len();
        lines.push(line);
        ids.insert(f, id);
        id
    }

    pub fn save(&self, f: SddId, path: impl AsRef<Path>) -> Result<()> {
        let mut file = io::BufWriter::new(error::create(path.as_ref())?);
        self.write_sdd(f, &mut file)?;
        Ok(())
    }

    /// Reads an SDD file into this manager, returning its root.
    ///
    /// Nodes are rebuilt with apply, so the file may come from a different vtree.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<SddId> {
        let path = path.as_ref();
        self.parse_sdd(&read_to_string(path)?).map_err(|e| e.in_file(path))
    }

    pub fn parse_sdd(&self, text: &str) -> Result<SddId> {
        let mut lines = content_lines(text);
        let count = header(&mut lines, "sdd")?;

        let mut nodes: HashMap<usize, SddId> = HashMap::new();
        let mut root = None;
        let mut seen = 0;
        let mut last_line = 0;
        for (line, parts) in lines {
            last_line = line;
            let id: usize = field(&parts, 1, line, "node id")?;
            let node = match parts[0] {
                "F" => SddId::FALSE,
                "T" => SddId::TRUE,
                "L" => {
                    let value: i32 = field(&parts, 3, line, "literal")?;
                    if value == 0 || value.unsigned_abs() as usize > self.num_vars() {
                        return Err(Error::format(line, format!("literal {} out of range", value)));
                    }
                    self.literal(Lit::from_dimacs(value))
                }
                "D" => {
                    let size: usize = field(&parts, 3, line, "element count")?;
                    let mut result = SddId::FALSE;
                    for k in 0..size {
                        let child = |index: usize| -> Result<SddId> {
                            let child: usize = field(&parts, index, line, "child id")?;
                            nodes
                                .get(&child)
                                .copied()
                                .ok_or_else(|| Error::format(line, format!("unknown node {}", child)))
                        };
                        let prime = child(4 + 2 * k)?;
                        let sub = child(5 + 2 * k)?;
                        result = self.or(result, self.and(prime, sub));
                    }
                    result
                }
                other => return Err(Error::format(line, format!("unknown node type '{}'", other))),
            };
            nodes.insert(id, node);
            root = Some(node);
            seen += 1;
        }

        if seen != count {
            return Err(Error::format(last_line, format!("expected {} nodes, found {}", count, seen)));
        }
        root.ok_or_else(|| Error::format(last_line, "sdd has no nodes"))
    }
}

/// Largest variable mentioned by the SDD file at `path`.
pub fn sdd_var_count(path: impl AsRef<Path>) -> Result<usize> {
    let path = path.as_ref();
    let text = read_to_string(path)?;
    let mut max = 0;
    for (line, parts) in content_lines(&text) {
        if parts[0] == "L" {
            let value: i32 = field(&parts, 3, line, "literal").map_err(|e| e.in_file(path))?;
            max = max.max(value.unsigned_abs() as usize);
        }
    }
    Ok(max)
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;
    use test_log::test;

    use super::super::manager::tests::lit;
    use super::super::vtree::VtreeType;
    use super::*;

    #[test]
    fn test_vtree_round_trip() {
        for kind in [VtreeType::Left, VtreeType::Right, VtreeType::Vertical, VtreeType::Balanced] {
            let vtree = Vtree::new(5, kind);
            let mut out = Vec::new();
            vtree.write(&mut out).unwrap();
            let back = Vtree::parse(std::str::from_utf8(&out).unwrap()).unwrap();
            assert_eq!(back.to_string(), vtree.to_string());
            assert_eq!(back.num_vars(), 5);
        }
    }

    #[test]
    fn test_vtree_written_bottom_up() {
        let mut out = Vec::new();
        Vtree::new(2, VtreeType::Balanced).write(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let body: Vec<&str> = text.lines().filter(|l| !l.starts_with('c')).collect();
        assert_eq!(body, vec!["vtree 3", "L 0 1", "L 2 2", "I 1 0 2"]);
    }

    #[test]
    fn test_malformed_vtrees() {
        assert!(matches!(Vtree::parse("vtree 1\nL 0 0\n"), Err(Error::Format { .. })));
        assert!(matches!(Vtree::parse("vtree 3\nL 0 1\nL 2 2\nI 1 0 5\n"), Err(Error::Format { .. })));
        assert!(matches!(Vtree::parse("vtree 3\nL 0 1\nL 2 3\nI 1 0 2\n"), Err(Error::Format { .. })));
        assert!(matches!(Vtree::parse("vtree 2\nL 0 1\nL 1 2\n"), Err(Error::Format { .. })));
        assert!(matches!(Vtree::parse("tree 1\nL 0 1\n"), Err(Error::Format { line: 1, .. })));
    }

    #[test]
    fn test_huge_node_count_rejected() {
        let err = Vtree::parse("vtree 4611686018427387903\nL 0 1\n").unwrap_err();
        assert!(matches!(err, Error::Format { line: 2, .. }));
        let mgr = SddManager::new(Vtree::new(1, VtreeType::Balanced));
        let err = mgr.parse_sdd("sdd 18446744073709551615\nT 0\n").unwrap_err();
        assert!(matches!(err, Error::Format { line: 2, .. }));
    }

    #[test]
    fn test_load_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let vtree_path = dir.path().join("broken.vtree");
        let sdd_path = dir.path().join("broken.sdd");
        std::fs::write(&vtree_path, "vtree 1\nX 0 1\n").unwrap();
        std::fs::write(&sdd_path, "sdd 1\nL 0 0 x\n").unwrap();

        let err = Vtree::load(&vtree_path).unwrap_err();
        assert!(matches!(err, Error::Format { line: 2, .. }));
        assert!(err.to_string().starts_with(&format!("{}: line 2", vtree_path.display())));

        let mgr = SddManager::new(Vtree::new(2, VtreeType::Balanced));
        let err = mgr.load(&sdd_path).unwrap_err();
        assert!(err.to_string().contains("broken.sdd: line 2"));
        let err = sdd_var_count(&sdd_path).unwrap_err();
        assert!(err.to_string().contains("broken.sdd: line 2"));
    }

    #[test]
    fn test_sdd_round_trip() {
        let mgr = SddManager::new(Vtree::new(4, VtreeType::Balanced));
        let f = mgr.or(mgr.cube(&[lit(1), lit(-3)]), mgr.cube(&[lit(2), lit(4)]));
        let mut out = Vec::new();
        mgr.write_sdd(f, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let back = mgr.parse_sdd(&text).unwrap();
        assert_eq!(back, f);

        // Loading under another vtree keeps the function.
        let other = SddManager::new(Vtree::new(4, VtreeType::Right));
        let g = other.parse_sdd(&text).unwrap();
        assert_eq!(other.model_count(g), mgr.model_count(f));
    }

    #[test]
    fn test_sdd_constants() {
        let mgr = SddManager::new(Vtree::new(1, VtreeType::Balanced));
        for f in [SddId::TRUE, SddId::FALSE] {
            let mut out = Vec::new();
            mgr.write_sdd(f, &mut out).unwrap();
            assert_eq!(mgr.parse_sdd(std::str::from_utf8(&out).unwrap()).unwrap(), f);
        }
    }

    #[test]
    fn test_sdd_literal_out_of_range() {
        let mgr = SddManager::new(Vtree::new(2, VtreeType::Balanced));
        let err = mgr.parse_sdd("sdd 1\nL 0 0 3\n").unwrap_err();
        assert!(matches!(err, Error::Format { line: 2, .. }));
    }

    #[test]
    fn test_file_helpers() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = SddManager::new(Vtree::new(3, VtreeType::Vertical));
        let f = mgr.clause(&[lit(-1), lit(3)]);
        let sdd_path = dir.path().join("f.sdd");
        let vtree_path = dir.path().join("f.vtree");
        mgr.save(f, &sdd_path).unwrap();
        mgr.vtree().save(&vtree_path).unwrap();

        assert_eq!(sdd_var_count(&sdd_path).unwrap(), 3);
        let vtree = Vtree::load(&vtree_path).unwrap();
        let other = SddManager::new(vtree);
        let g = other.load(&sdd_path).unwrap();
        assert_eq!(other.model_count(g), BigUint::from(6u32));
    }
}
