//! Sentential decision diagrams.
//!
//! An [`SddManager`] owns a [`Vtree`] and every node built over it. Formulas
//! are compiled bottom-up with apply; the result can be counted, restricted to
//! its minimum-cardinality models, relaid under a better vtree, and exported in
//! the libsdd text formats or as DOT.

mod compile;
mod dot;
mod io;
mod manager;
mod minimize;
mod node;
mod search;
pub mod vtree;

pub use io::sdd_var_count;
pub use manager::SddManager;
pub use node::{Element, Sdd, SddId};
pub use search::Pinned;
pub use vtree::{Vtree, VtreeId, VtreeMove, VtreeNode, VtreeType};
