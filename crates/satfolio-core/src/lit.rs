//! Variables and literals.
//!
//! Variables are stored 0-based and printed 1-based, following DIMACS.
//! A literal packs its variable and sign into one `u32` so that literal
//! indexed tables (watch lists, occurrence lists) can be plain vectors.

use std::fmt;
use std::ops::Not;

/// A propositional variable, 0-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var(u32);

impl Var {
    pub const fn new(index: u32) -> Self {
        Var(index)
    }

    /// Creates a variable from its 1-based DIMACS number.
    ///
    /// Returns `None` for 0, which DIMACS reserves as clause terminator.
    pub fn from_dimacs(number: u32) -> Option<Self> {
        number.checked_sub(1).map(Var)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn to_dimacs(self) -> u32 {
        self.0 + 1
    }

    #[inline]
    pub fn positive(self) -> Lit {
        Lit::new(self, false)
    }

    #[inline]
    pub fn negative(self) -> Lit {
        Lit::new(self, true)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_dimacs())
    }
}

/// A literal: a variable or its negation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lit(u32);

impl Lit {
    #[inline]
    pub const fn new(var: Var, negated: bool) -> Self {
        Lit((var.0 << 1) | negated as u32)
    }

    /// Creates a literal from a signed DIMACS integer.
    pub fn from_dimacs(value: i32) -> Option<Self> {
        if value == 0 {
            return None;
        }
        let var = Var::from_dimacs(value.unsigned_abs())?;
        Some(Lit::new(var, value < 0))
    }

    #[inline]
    pub const fn var(self) -> Var {
        Var(self.0 >> 1)
    }

    #[inline]
    pub const fn is_negated(self) -> bool {
        self.0 & 1 == 1
    }

    /// Dense index into literal-indexed tables (`2 * var + sign`).
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn from_index(index: usize) -> Self {
        Lit(index as u32)
    }

    pub fn to_dimacs(self) -> i32 {
        let number = self.var().to_dimacs() as i32;
        if self.is_negated() {
            -number
        } else {
            number
        }
    }

    /// Applies an extra sign flip: `lit.xor(true)` is `!lit`.
    #[inline]
    pub const fn xor(self, flip: bool) -> Self {
        Lit(self.0 ^ flip as u32)
    }
}

impl Not for Lit {
    type Output = Lit;

    #[inline]
    fn not(self) -> Lit {
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
    use super::*;

    #[test]
    fn test_dimacs_numbering() {
        let lit = Lit::from_dimacs(-3).unwrap();
        assert_eq!(lit.var(), Var::new(2));
        assert!(lit.is_negated());
        assert_eq!(lit.to_dimacs(), -3);
        assert_eq!((!lit).to_dimacs(), 3);
        assert_eq!(Lit::from_dimacs(0), None);
    }

    #[test]
    fn test_index_pairs_are_adjacent() {
        let v = Var::new(5);
        assert_eq!(v.positive().index() + 1, v.negative().index());
        assert_eq!(Lit::from_index(v.negative().index()), v.negative());
        assert_eq!(v.positive().xor(true), v.negative());
    }
}
