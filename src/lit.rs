//! Variables and literals.
//!
//! Variables are **0-based** internally. DIMACS text uses 1-based signed integers,
//! so conversion happens exactly once, at ingestion ([`Lit::from_dimacs`]) and at
//! output ([`Lit::to_dimacs`]).

use std::fmt;
use std::ops::Not;

/// A propositional variable (0-indexed).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Var(u32);

impl Var {
    pub const fn new(index: u32) -> Self {
        Var(index)
    }

    /// Returns the raw 0-based index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn pos(self) -> Lit {
        Lit::new(self, true)
    }

    pub const fn neg(self) -> Lit {
        Lit::new(self, false)
    }

    /// Returns the 1-based DIMACS number of this variable.
    pub const fn to_dimacs(self) -> u32 {
        self.0 + 1
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.to_dimacs())
    }
}

/// A literal: a variable together with a polarity.
///
/// Encoded as `2 * var + (negated as u32)`, so the code doubles as an index
/// into per-literal tables (occurrence lists).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Lit(u32);

impl Lit {
    pub const fn new(var: Var, positive: bool) -> Self {
        Lit((var.0 << 1) | (!positive) as u32)
    }

    /// Converts a signed DIMACS integer (`±(var+1)`) into a literal.
    ///
    /// # Panics
    ///
    /// Panics if `lit == 0`, which is the clause terminator and not a literal.
    pub fn from_dimacs(lit: i32) -> Self {
        assert_ne!(lit, 0, "Literal cannot be zero");
        let var = Var::new(lit.unsigned_abs() - 1);
        Lit::new(var, lit > 0)
    }

    pub fn to_dimacs(self) -> i32 {
        let v = self.var().to_dimacs() as i32;
        if self.is_positive() {
            v
        } else {
            -v
        }
    }

    pub const fn var(self) -> Var {
        Var(self.0 >> 1)
    }

    pub const fn is_positive(self) -> bool {
        self.0 & 1 == 0
    }

    pub const fn is_negative(self) -> bool {
        !self.is_positive()
    }

    /// Index into per-literal tables.
    pub const fn code(self) -> usize {
        self.0 as usize
    }
}

impl Not for Lit {
    type Output = Self;

    fn not(self) -> Self::Output {
        Lit(self.0 ^ 1)
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_dimacs())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_from_dimacs() {
        let lit = Lit::from_dimacs(3);
        assert_eq!(lit.var(), Var::new(2));
        assert!(lit.is_positive());

        let lit = Lit::from_dimacs(-1);
        assert_eq!(lit.var(), Var::new(0));
        assert!(lit.is_negative());
    }

    #[test]
    fn test_negation() {
        let lit = Lit::from_dimacs(5);
        assert_eq!(!lit, Lit::from_dimacs(-5));
        assert_eq!(!!lit, lit);
        assert_eq!((!lit).to_dimacs(), -5);
    }

    #[test]
    fn test_codes_are_dense() {
        let v = Var::new(7);
        assert_eq!(v.pos().code(), 14);
        assert_eq!(v.neg().code(), 15);
    }

    #[test]
    #[should_panic(expected = "Literal cannot be zero")]
    fn test_zero_literal() {
        Lit::from_dimacs(0);
    }
}
