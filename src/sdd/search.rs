//! Limited vtree search.
//!
//! The search tries local moves (child swaps and rotations) at every internal
//! vtree node. Each candidate vtree gets a fresh manager into which the pinned
//! roots are recompiled, and the candidate is kept when the shared size of the
//! roots shrinks. A candidate is abandoned as soon as it allocates more than
//! [`GROWTH_LIMIT`] times the nodes of the current layout.
//!
//! The node store is always rebuilt, so only pinned roots survive the search.
//! Every other [`SddId`] becomes invalid.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use log::{debug, info};

use super::manager::SddManager;
use super::node::{Sdd, SddId};
use super::vtree::{Vtree, VtreeMove};

/// Candidates may allocate at most this many times the nodes of the current layout.
const GROWTH_LIMIT: usize = 2;

/// Upper bound on sweeps over the vtree.
const MAX_PASSES: usize = 3;

/// A root kept valid while the manager is borrowed mutably.
///
/// The pin is released when the guard drops. Read the (possibly relocated)
/// root back with [`Pinned::node`].
pub struct Pinned<'a> {
    manager: &'a mut SddManager,
    slot: usize,
}

impl SddManager {
    pub fn pin(&mut self, f: SddId) -> Pinned<'_> {
        self.pins.push(f);
        let slot = self.pins.len() - 1;
        Pinned { manager: self, slot }
    }

    /// Searches for a vtree under which the pinned roots are smaller.
    ///
    /// Unpinned nodes are invalidated.
    pub fn minimize_vtree_limited(&mut self) {
        let roots = self.pins.clone();
        let Some((baseline, mut current)) = self.rebuild(self.vtree.clone(), &roots, usize::MAX) else {
            return;
        };
        let mut manager = baseline;
        let mut best = manager.shared_size(&current);
        let initial = best;

        for pass in 0..MAX_PASSES {
            let mut improved = false;
            for position in 0..manager.vtree.num_nodes() as u32 {
                let id = manager.vtree.at_position(position);
                for mv in VtreeMove::ALL {
                    let Some(vtree) = manager.vtree.with_move(id, mv) else {
                        continue;
                    };
                    let limit = GROWTH_LIMIT * manager.num_nodes();
                    let Some((candidate, roots)) = manager.rebuild(vtree, &current, limit) else {
                        continue;
                    };
                    let size = candidate.shared_size(&roots);
                    if size < best {
                        debug!("{:?} at position {}: size {} -> {}", mv, position, best, size);
                        best = size;
                        manager = candidate;
                        current = roots;
                        improved = true;
                        // Positions changed with the vtree.
                        break;
                    }
                }
            }
            debug!("vtree search pass {}: size {}", pass + 1, best);
            if !improved {
                break;
            }
        }

        if self.options.verbose {
            info!("vtree search: size {} -> {}", initial, best);
        }
        let options = self.options;
        *self = manager;
        self.options = options;
        self.pins = current;
    }

    /// Recompiles `roots` into a fresh manager over `vtree`.
    ///
    /// Returns `None` once the new manager holds more than `limit` nodes.
    fn rebuild(&self, vtree: Vtree, roots: &[SddId], limit: usize) -> Option<(SddManager, Vec<SddId>)> {
        let target = SddManager::new(vtree);
        let mut memo = HashMap::new();
        let mut moved = Vec::with_capacity(roots.len());
        for &root in roots {
            moved.push(self.transfer(root, &target, &mut memo, limit)?);
        }
        Some((target, moved))
    }

    fn transfer(
        &self,
        f: SddId,
        target: &SddManager,
        memo: &mut HashMap<SddId, SddId>,
        limit: usize,
    ) -> Option<SddId> {
        if f.is_constant() {
            return Some(f);
        }
        if let Some(&g) = memo.get(&f) {
            return Some(g);
        }
        let g = match self.node(f) {
            Sdd::Literal(lit) => target.literal(lit),
            Sdd::Decision { elements, .. } => {
                let mut result = SddId::FALSE;
                for e in &elements {
                    let prime = self.transfer(e.prime, target, memo, limit)?;
                    let sub = self.transfer(e.sub, target, memo, limit)?;
                    result = target.or(result, target.and(prime, sub));
                    if target.num_nodes() > limit {
                        return None;
                    }
                }
                result
            }
            Sdd::False | Sdd::True => f,
        };
        memo.insert(f, g);
        Some(g)
    }
}

impl Pinned<'_> {
    /// The pinned root, as relocated by any search since pinning.
    pub fn node(&self) -> SddId {
        self.manager.pins[self.slot]
    }
}

impl Deref for Pinned<'_> {
    type Target = SddManager;

    fn deref(&self) -> &SddManager {
        self.manager
    }
}

impl DerefMut for Pinned<'_> {
    fn deref_mut(&mut self) -> &mut SddManager {
        self.manager
    }
}

impl Drop for Pinned<'_> {
    fn drop(&mut self) {
        self.manager.pins.truncate(self.slot);
    }
}
