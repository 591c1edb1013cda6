//! Bottom-up compilation of flat normal forms.

use log::{debug, info};

use crate::error::{Error, Result};
use crate::fnf::{Fnf, FnfKind};

use super::manager::SddManager;
use super::node::SddId;

impl SddManager {
    /// Compiles `fnf` by folding its litsets into one node.
    ///
    /// Clauses are conjoined (CNF) and terms are disjoined (DNF). When a
    /// search interval is set, the accumulated node is pinned and a limited
    /// vtree search runs after every that many litsets.
    pub fn compile(&mut self, fnf: &Fnf) -> Result<SddId> {
        if fnf.var_count > self.num_vars() {
            return Err(Error::InvalidInput(format!(
                "formula has {} variables but the vtree only {}",
                fnf.var_count,
                self.num_vars()
            )));
        }

        let interval = self.options.search_interval;
        let mut acc = match fnf.kind {
            FnfKind::Cnf => SddId::TRUE,
            FnfKind::Dnf => SddId::FALSE,
        };
        for (i, litset) in fnf.litsets.iter().enumerate() {
            acc = match fnf.kind {
                FnfKind::Cnf => self.and(acc, self.clause(litset)),
                FnfKind::Dnf => self.or(acc, self.cube(litset)),
            };
            if acc.is_constant() && acc != fnf_identity(fnf.kind) {
                // Absorbed: no later litset can change the result.
                debug!("compilation settled after {} litsets", i + 1);
                break;
            }
            if interval > 0 && (i + 1) % interval == 0 && i + 1 < fnf.len() {
                let mut pinned = self.pin(acc);
                pinned.minimize_vtree_limited();
                acc = pinned.node();
                if pinned.options.verbose {
                    info!("litset {}: size {} after vtree search", i + 1, pinned.size(acc));
                }
            }
        }
        Ok(acc)
    }
}

fn fnf_identity(kind: FnfKind) -> SddId {
    match kind {
        FnfKind::Cnf => SddId::TRUE,
        FnfKind::Dnf => SddId::FALSE,
    }
}
