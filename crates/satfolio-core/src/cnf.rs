//! CNF formulas and models.

use std::fmt;

use crate::lit::{Lit, Var};

/// A formula in conjunctive normal form.
///
/// `num_vars` is the declared variable count; it always covers every
/// variable mentioned by a clause.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cnf {
    num_vars: usize,
    clauses: Vec<Vec<Lit>>,
}

impl Cnf {
    pub fn new(num_vars: usize) -> Self {
        Self {
            num_vars,
            clauses: Vec::new(),
        }
    }

    /// Builds a formula from signed DIMACS integers.
    ///
    /// Zeros inside a clause are skipped.
    pub fn from_dimacs_clauses<C: AsRef<[i32]>>(num_vars: usize, clauses: &[C]) -> Self {
        let mut cnf = Cnf::new(num_vars);
        for clause in clauses {
            cnf.add_clause(clause.as_ref().iter().filter_map(|&v| Lit::from_dimacs(v)));
        }
        cnf
    }

    /// Adds a clause, growing `num_vars` when the clause mentions a new variable.
    pub fn add_clause<I: IntoIterator<Item = Lit>>(&mut self, lits: I) {
        let clause: Vec<Lit> = lits.into_iter().collect();
        if let Some(max) = clause.iter().map(|l| l.var().index() + 1).max() {
            self.num_vars = self.num_vars.max(max);
        }
        self.clauses.push(clause);
    }

    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }

    pub fn clauses(&self) -> &[Vec<Lit>] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Returns true if every clause has a literal that is true under `model`.
    ///
    /// Variables past the end of the model count as false.
    pub fn is_satisfied_by(&self, model: &Model) -> bool {
        self.clauses
            .iter()
            .all(|clause| clause.iter().any(|&lit| model.lit_value(lit)))
    }
}

impl fmt::Display for Cnf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "p cnf {} {}", self.num_vars, self.clauses.len())?;
        for clause in &self.clauses {
            for lit in clause {
                write!(f, "{} ", lit)?;
            }
            writeln!(f, "0")?;
        }
        Ok(())
    }
}

/// A total assignment over variables `1..=len`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Model {
    values: Vec<bool>,
}

impl Model {
    pub fn new(values: Vec<bool>) -> Self {
        Self { values }
    }

    /// Builds a model from signed DIMACS literals, one per variable.
    ///
    /// Variables not mentioned default to false.
    pub fn from_dimacs(lits: &[i32]) -> Self {
        let len = lits.iter().map(|v| v.unsigned_abs() as usize).max().unwrap_or(0);
        let mut values = vec![false; len];
        for &v in lits {
            if v > 0 {
                values[v as usize - 1] = true;
            }
        }
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, var: Var) -> bool {
        self.values.get(var.index()).copied().unwrap_or(false)
    }

    pub fn lit_value(&self, lit: Lit) -> bool {
        self.value(lit.var()) != lit.is_negated()
    }

    pub fn values(&self) -> &[bool] {
        &self.values
    }

    /// Signed DIMACS literals `±i` for `i` in `1..=len`.
    pub fn to_dimacs(&self) -> Vec<i32> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, &value)| {
                let number = i as i32 + 1;
                if value {
                    number
                } else {
                    -number
                }
            })
            .collect()
    }
}

/// Formats the competition model line: `v 1 -2 3 0`.
impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v")?;
        for lit in self.to_dimacs() {
            write!(f, " {}", lit)?;
        }
        write!(f, " 0")
    }
}
