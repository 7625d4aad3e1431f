//! Reconstruction data produced by the preprocessor.

use satfolio_core::{Lit, Var};

/// One undoable simplification, replayed in reverse to extend a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconstructStep {
    /// Variable `pivot.var()` was resolved away; `clauses` are the removed
    /// clauses that contain `pivot`.
    Eliminated { pivot: Lit, clauses: Vec<Vec<Lit>> },
    /// `var` was replaced by the equivalent literal `lit`.
    Substituted { var: Var, lit: Lit },
}

/// Everything needed to map a reduced-space model back to the original
/// variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreprocessArtifact {
    original_vars: usize,
    reduced_vars: usize,
    mapping: Vec<Option<Lit>>,
    fixed: Vec<i8>,
    stack: Vec<ReconstructStep>,
}

#[inline]
fn partial_value(partial: &[i8], lit: Lit) -> i8 {
    let value = partial[lit.var().index()];
    if lit.is_negated() {
        -value
    } else {
        value
    }
}

#[inline]
fn set_true(partial: &mut [i8], lit: Lit) {
    partial[lit.var().index()] = if lit.is_negated() { -1 } else { 1 };
}

impl PreprocessArtifact {
    /// Builds an artifact.
    ///
    /// `mapping` and `fixed` are indexed by original variable; a fixed value
    /// of 0 means the variable was not fixed.
    pub fn new(
        original_vars: usize,
        reduced_vars: usize,
        mapping: Vec<Option<Lit>>,
        fixed: Vec<i8>,
        stack: Vec<ReconstructStep>,
    ) -> Self {
        Self {
            original_vars,
            reduced_vars,
            mapping,
            fixed,
            stack,
        }
    }

    /// The artifact of a preprocessing run that changed nothing.
    pub fn identity(num_vars: usize) -> Self {
        Self {
            original_vars: num_vars,
            reduced_vars: num_vars,
            mapping: (0..num_vars)
                .map(|v| Some(Var::new(v as u32).positive()))
                .collect(),
            fixed: vec![0; num_vars],
            stack: Vec::new(),
        }
    }

    pub fn original_vars(&self) -> usize {
        self.original_vars
    }

    pub fn reduced_vars(&self) -> usize {
        self.reduced_vars
    }

    /// The reduced literal carrying `var`'s value, if it was kept.
    pub fn mapping(&self, var: Var) -> Option<Lit> {
        self.mapping.get(var.index()).copied().flatten()
    }

    pub fn steps(&self) -> &[ReconstructStep] {
        &self.stack
    }

    /// Fills in every variable the reduced model does not determine.
    ///
    /// `partial` holds one value per original variable in {-1, 0, 1}. On
    /// return no entry is 0: fixed values are applied, the reconstruction
    /// stack is replayed newest first, and unconstrained variables become
    /// false.
    pub fn complete_model(&self, partial: &mut [i8]) {
        for (value, &fixed) in partial.iter_mut().zip(&self.fixed) {
            if fixed != 0 {
                *value = fixed;
            }
        }

        for step in self.stack.iter().rev() {
            match step {
                ReconstructStep::Eliminated { pivot, clauses } => {
                    for lit in clauses.iter().flatten() {
                        if partial[lit.var().index()] == 0 {
                            partial[lit.var().index()] = -1;
                        }
                    }
                    set_true(partial, !*pivot);
                    let unsatisfied = clauses
                        .iter()
                        .any(|clause| !clause.iter().any(|&l| partial_value(partial, l) > 0));
                    if unsatisfied {
                        set_true(partial, *pivot);
                    }
                }
                ReconstructStep::Substituted { var, lit } => {
                    if partial[var.index()] != 0 {
                        continue;
                    }
                    if partial[lit.var().index()] == 0 {
                        partial[lit.var().index()] = -1;
                    }
                    partial[var.index()] = partial_value(partial, *lit);
                }
            }
        }

        for value in partial.iter_mut() {
            if *value == 0 {
                *value = -1;
            }
        }
    }
}
