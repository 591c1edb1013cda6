//! The SDD pipeline behind the `sdd` executable.
//!
//! A run acquires a formula (CNF or DNF) or a saved SDD, builds or loads the
//! vtree, compiles or reads the node, reports its metrics, optionally
//! minimizes cardinality and searches for a better vtree, and exports the
//! requested artifacts. Progress and metrics go to `err`; the only thing
//! written to `out` is the compilation time as one JSON line.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::info;
use serde_json::json;

use crate::error::{Error, Result};
use crate::fnf::{self, Fnf, FnfKind};
use crate::sdd::{sdd_var_count, SddId, SddManager, Vtree, VtreeType};

#[derive(Debug, Clone, Default)]
pub struct CompilerOptions {
    pub cnf: Option<PathBuf>,
    pub dnf: Option<PathBuf>,
    /// Precompiled SDD to load instead of compiling.
    pub sdd: Option<PathBuf>,
    pub vtree: Option<PathBuf>,
    /// Shape of the initial vtree when no vtree file is given.
    pub vtree_type: VtreeType,
    pub minimize_cardinality: bool,
    /// Run the limited vtree search once the node is built.
    pub post_search: bool,
    /// Search the vtree after every this many litsets while compiling; 0 disables.
    pub vtree_search_interval: usize,
    pub output_sdd: Option<PathBuf>,
    pub output_sdd_dot: Option<PathBuf>,
    pub output_vtree: Option<PathBuf>,
    pub output_vtree_dot: Option<PathBuf>,
    pub verbose: bool,
}

impl CompilerOptions {
    /// Checks that exactly one input source is set.
    pub fn validate(&self) -> Result<()> {
        let sources = [&self.cnf, &self.dnf, &self.sdd].iter().filter(|s| s.is_some()).count();
        match sources {
            1 => Ok(()),
            0 => Err(Error::InvalidInput("one of cnf, dnf or sdd input is required".to_string())),
            _ => Err(Error::InvalidInput("cnf, dnf and sdd inputs are mutually exclusive".to_string())),
        }
    }
}

/// Runs the whole pipeline.
pub fn run<E: Write, O: Write>(options: &CompilerOptions, err: &mut E, out: &mut O) -> Result<()> {
    options.validate()?;

    let fnf = read_formula(options, err)?;
    let vtree = initial_vtree(options, fnf.as_ref(), err)?;

    write!(err, "\ncreating manager...")?;
    let mut manager = SddManager::new(vtree);
    manager.set_options(options);

    let mut node = match (&fnf, &options.sdd) {
        (Some(fnf), _) => {
            write!(err, "\ncompiling...")?;
            let start = Instant::now();
            let node = manager.compile(fnf)?;
            let secs = start.elapsed().as_secs_f64();
            writeln!(err, "\n\ncompilation time        : {:.3} sec", secs)?;
            writeln!(out, "{}", json!({ "compilation_time": secs }))?;
            node
        }
        (None, Some(path)) => {
            write!(err, "\nreading sdd from file...")?;
            let start = Instant::now();
            let node = manager.load(path)?;
            writeln!(err, "\n\nread time               : {:.3} sec", start.elapsed().as_secs_f64())?;
            node
        }
        (None, None) => return Err(Error::InvalidInput("no input to compile or load".to_string())),
    };

    print_node(err, &manager, node)?;
    if options.verbose {
        manager.print(err)?;
    }

    if options.minimize_cardinality {
        write!(err, "\nminimizing cardinality...")?;
        let start = Instant::now();
        node = manager.minimize_cardinality(node);
        let secs = start.elapsed().as_secs_f64();
        let min_card = match manager.minimum_cardinality(node) {
            Some(card) => card.to_string(),
            None => "-".to_string(),
        };
        writeln!(err)?;
        print_node(err, &manager, node)?;
        writeln!(err, " min cardinality        : {}   {:.3} sec", min_card, secs)?;
    }

    if options.post_search {
        writeln!(err, "\ndynamic vtree (post compilation)")?;
        writeln!(err, " sdd initial size       : {}", pretty(manager.size(node)))?;
        let start = Instant::now();
        {
            let mut pinned = manager.pin(node);
            pinned.minimize_vtree_limited();
            node = pinned.node();
        }
        writeln!(err)?;
        writeln!(err, " dynamic vtree time     : {:.3} sec", start.elapsed().as_secs_f64())?;
        print_node(err, &manager, node)?;
        if options.verbose {
            manager.print(err)?;
        }
    }

    export(options, &manager, node, err)?;

    write!(err, "freeing...")?;
    drop(fnf);
    drop(manager);
    writeln!(err, "done")?;
    Ok(())
}

fn read_formula<E: Write>(options: &CompilerOptions, err: &mut E) -> Result<Option<Fnf>> {
    let (kind, path) = match (&options.cnf, &options.dnf) {
        (Some(path), _) => (FnfKind::Cnf, path),
        (None, Some(path)) => (FnfKind::Dnf, path),
        (None, None) => return Ok(None),
    };
    write!(err, "\nreading {}...", kind)?;
    let fnf = match kind {
        FnfKind::Cnf => fnf::read_cnf(path)?,
        FnfKind::Dnf => fnf::read_dnf(path)?,
    };
    let noun = match kind {
        FnfKind::Cnf => "clauses",
        FnfKind::Dnf => "terms",
    };
    write!(err, "vars={} {}={}", fnf.var_count, noun, fnf.len())?;
    Ok(Some(fnf))
}

fn initial_vtree<E: Write>(options: &CompilerOptions, fnf: Option<&Fnf>, err: &mut E) -> Result<Vtree> {
    if let Some(path) = &options.vtree {
        write!(err, "\nreading initial vtree...")?;
        return Vtree::load(path);
    }
    let var_count = match (fnf, &options.sdd) {
        (Some(fnf), _) => fnf.var_count,
        (None, Some(path)) => sdd_var_count(path)?,
        (None, None) => 0,
    };
    write!(err, "\ncreating initial vtree ({})...", options.vtree_type)?;
    // A vtree needs at least one leaf, even for a formula without variables.
    Ok(Vtree::new(var_count.max(1), options.vtree_type))
}

fn export<E: Write>(options: &CompilerOptions, manager: &SddManager, node: SddId, err: &mut E) -> Result<()> {
    if let Some(path) = &options.output_sdd {
        write!(err, "saving compiled sdd ...")?;
        manager.save(node, path)?;
        writeln!(err, "done")?;
    }
    if let Some(path) = &options.output_sdd_dot {
        write!(err, "saving compiled sdd (dot)...")?;
        manager.save_as_dot(node, path)?;
        writeln!(err, "done")?;
    }
    if let Some(path) = &options.output_vtree {
        write!(err, "saving vtree...")?;
        manager.vtree().save(path)?;
        writeln!(err, "done")?;
    }
    if let Some(path) = &options.output_vtree_dot {
        write!(err, "saving vtree (dot)...")?;
        manager.vtree().save_as_dot(path)?;
        writeln!(err, "done")?;
    }
    log_exports(options);
    Ok(())
}

fn log_exports(options: &CompilerOptions) {
    let written: Vec<&Path> = [
        &options.output_sdd,
        &options.output_sdd_dot,
        &options.output_vtree,
        &options.output_vtree_dot,
    ]
    .into_iter()
    .filter_map(|p| p.as_deref())
    .collect();
    if !written.is_empty() {
        info!("exported {:?}", written);
    }
}

fn print_node<E: Write>(err: &mut E, manager: &SddManager, node: SddId) -> Result<()> {
    writeln!(err, " sdd size               : {} ", pretty(manager.size(node)))?;
    writeln!(err, " sdd node count         : {} ", pretty(manager.count(node)))?;
    let start = Instant::now();
    let count = manager.model_count(node);
    writeln!(
        err,
        " sdd model count        : {}    {:.3} sec",
        pretty(count),
        start.elapsed().as_secs_f64()
    )?;
    Ok(())
}

/// Formats a count with comma-separated thousands.
fn pretty(value: impl ToString) -> String {
    let digits = value.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}
