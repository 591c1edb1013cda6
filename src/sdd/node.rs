//! SDD node representation.
//!
//! A node is a terminal, a literal, or a decision node: a disjunction of
//! `(prime, sub)` elements whose primes partition TRUE. Decision nodes are kept
//! compressed (no two elements share a sub) and trimmed, and the manager's
//! unique table makes equal functions share one id.

use std::fmt::{self, Display};

use crate::lit::Lit;

use super::vtree::VtreeId;

/// Negation is not free for SDDs, so there are no complement edges and
/// each function has its own id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SddId(u32);

impl SddId {
    pub const FALSE: Self = Self(0);
    pub const TRUE: Self = Self(1);

    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn is_false(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_true(self) -> bool {
        self.0 == 1
    }

    #[inline]
    pub const fn is_constant(self) -> bool {
        self.0 <= 1
    }
}

impl Display for SddId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::FALSE => write!(f, "⊥"),
            Self::TRUE => write!(f, "⊤"),
            _ => write!(f, "n{}", self.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Element {
    pub prime: SddId,
    pub sub: SddId,
}

impl Element {
    #[inline]
    pub const fn new(prime: SddId, sub: SddId) -> Self {
        Self { prime, sub }
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.prime, self.sub)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sdd {
    False,
    True,
    Literal(Lit),
    /// `(p₁ ∧ s₁) ∨ … ∨ (pₖ ∧ sₖ)`, normalized for `vtree`.
    ///
    /// Elements are sorted by prime. Subs may be FALSE, primes never are.
    Decision { vtree: VtreeId, elements: Vec<Element> },
}

impl Sdd {
    pub fn is_decision(&self) -> bool {
        matches!(self, Sdd::Decision { .. })
    }

    /// Elements of a decision node; empty for other nodes.
    pub fn elements(&self) -> &[Element] {
        match self {
            Sdd::Decision { elements, .. } => elements,
            _ => &[],
        }
    }
}
