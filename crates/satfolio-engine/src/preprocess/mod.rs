//! Formula preprocessing.
//!
//! Rounds of top-level unit propagation, equivalent-literal substitution
//! and bounded variable elimination, followed by compaction of the live
//! variables. The returned [`PreprocessArtifact`] maps a model of the reduced
//! formula back to the original variables.

mod artifact;
mod scc;

use satfolio_core::{Cnf, Lit, Model, Result, SatfolioError, Var};
use tracing::debug;

pub use artifact::{PreprocessArtifact, ReconstructStep};

/// Bounds on the work the preprocessor does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessLimits {
    pub rounds: usize,
    /// Variables occurring more often than this are never eliminated.
    pub max_occurrences: usize,
    /// Elimination is abandoned when a resolvent is longer than this.
    pub max_resolvent_len: usize,
}

impl Default for PreprocessLimits {
    fn default() -> Self {
        Self {
            rounds: 3,
            max_occurrences: 16,
            max_resolvent_len: 20,
        }
    }
}

/// What preprocessing concluded.
#[derive(Debug, Clone)]
pub enum PreprocessOutcome {
    Unsatisfiable,
    /// Decided without search; the model covers the original variables.
    Satisfiable(Model),
    Reduced {
        formula: Cnf,
        artifact: PreprocessArtifact,
    },
}

/// The formula was refuted during simplification.
struct Refuted;

type Pass = std::result::Result<bool, Refuted>;

#[derive(Debug, Default)]
struct PassCounts {
    fixed: usize,
    substituted: usize,
    eliminated: usize,
}

#[inline]
fn fixed_value(fixed: &[i8], lit: Lit) -> i8 {
    let value = fixed[lit.var().index()];
    if lit.is_negated() {
        -value
    } else {
        value
    }
}

/// Sorts and deduplicates; `None` for tautologies.
fn normalize(mut lits: Vec<Lit>) -> Option<Vec<Lit>> {
    lits.sort_unstable();
    lits.dedup();
    if lits.windows(2).any(|w| w[0].var() == w[1].var()) {
        None
    } else {
        Some(lits)
    }
}

fn resolve(with_pos: &[Lit], with_neg: &[Lit], var: Var) -> Option<Vec<Lit>> {
    let lits = with_pos
        .iter()
        .chain(with_neg)
        .copied()
        .filter(|l| l.var() != var)
        .collect();
    normalize(lits)
}

struct Simplifier {
    limits: PreprocessLimits,
    num_vars: usize,
    clauses: Vec<Option<Vec<Lit>>>,
    fixed: Vec<i8>,
    substituted: Vec<Option<Lit>>,
    eliminated: Vec<bool>,
    stack: Vec<ReconstructStep>,
    counts: PassCounts,
}

impl Simplifier {
    fn new(cnf: &Cnf, limits: PreprocessLimits) -> std::result::Result<Self, Refuted> {
        let mut clauses = Vec::with_capacity(cnf.num_clauses());
        for clause in cnf.clauses() {
            if clause.is_empty() {
                return Err(Refuted);
            }
            if let Some(lits) = normalize(clause.clone()) {
                clauses.push(Some(lits));
            }
        }
        let n = cnf.num_vars();
        Ok(Self {
            limits,
            num_vars: n,
            clauses,
            fixed: vec![0; n],
            substituted: vec![None; n],
            eliminated: vec![false; n],
            stack: Vec::new(),
            counts: PassCounts::default(),
        })
    }

    fn is_live(&self, v: usize) -> bool {
        self.fixed[v] == 0 && self.substituted[v].is_none() && !self.eliminated[v]
    }

    fn live_clauses(&self) -> impl Iterator<Item = &Vec<Lit>> {
        self.clauses.iter().flatten()
    }

    fn propagate_units(&mut self) -> Pass {
        let Self {
            clauses,
            fixed,
            counts,
            ..
        } = self;
        let mut changed = false;
        loop {
            let mut found = false;
            for slot in clauses.iter_mut() {
                let Some(clause) = slot else { continue };
                if clause.iter().any(|&l| fixed_value(fixed, l) == 1) {
                    *slot = None;
                    changed = true;
                    continue;
                }
                let before = clause.len();
                clause.retain(|&l| fixed_value(fixed, l) == 0);
                changed |= clause.len() != before;
                match clause.len() {
                    0 => return Err(Refuted),
                    1 => {
                        let unit = clause[0];
                        fixed[unit.var().index()] = if unit.is_negated() { -1 } else { 1 };
                        counts.fixed += 1;
                        *slot = None;
                        found = true;
                        changed = true;
                    }
                    _ => {}
                }
            }
            if !found {
                return Ok(changed);
            }
        }
    }

    fn substitute_equivalences(&mut self) -> Pass {
        let nodes = 2 * self.num_vars;
        let mut graph = vec![Vec::new(); nodes];
        let mut binary = false;
        for clause in self.live_clauses() {
            if let &[a, b] = clause.as_slice() {
                graph[(!a).index()].push(b.index());
                graph[(!b).index()].push(a.index());
                binary = true;
            }
        }
        if !binary {
            return Ok(false);
        }

        let (component, count) = scc::components(&graph);
        let mut representative = vec![usize::MAX; count];
        for node in 0..nodes {
            let c = component[node];
            representative[c] = representative[c].min(node);
        }

        let mut replace: Vec<Option<Lit>> = vec![None; self.num_vars];
        let mut any = false;
        for v in 0..self.num_vars {
            if !self.is_live(v) {
                continue;
            }
            let pos = Var::new(v as u32).positive();
            if component[pos.index()] == component[(!pos).index()] {
                return Err(Refuted);
            }
            let rep = representative[component[pos.index()]];
            if rep != pos.index() {
                let lit = Lit::from_index(rep);
                replace[v] = Some(lit);
                self.substituted[v] = Some(lit);
                self.stack.push(ReconstructStep::Substituted {
                    var: pos.var(),
                    lit,
                });
                self.counts.substituted += 1;
                any = true;
            }
        }
        if !any {
            return Ok(false);
        }

        for slot in self.clauses.iter_mut() {
            let Some(clause) = slot.take() else { continue };
            let rewritten = clause
                .into_iter()
                .map(|l| match replace[l.var().index()] {
                    Some(rep) => rep.xor(l.is_negated()),
                    None => l,
                })
                .collect();
            *slot = normalize(rewritten);
        }
        Ok(true)
    }

    fn eliminate_variables(&mut self) -> Pass {
        let mut occurs: Vec<Vec<usize>> = vec![Vec::new(); 2 * self.num_vars];
        for (ci, slot) in self.clauses.iter().enumerate() {
            if let Some(clause) = slot {
                for lit in clause {
                    occurs[lit.index()].push(ci);
                }
            }
        }

        let mut changed = false;
        for v in 0..self.num_vars {
            if !self.is_live(v) {
                continue;
            }
            let var = Var::new(v as u32);
            let live = |list: &[usize], clauses: &[Option<Vec<Lit>>]| -> Vec<usize> {
                list.iter().copied().filter(|&ci| clauses[ci].is_some()).collect()
            };
            let pos = live(&occurs[var.positive().index()], &self.clauses);
            let neg = live(&occurs[var.negative().index()], &self.clauses);
            let occurrences = pos.len() + neg.len();
            if occurrences == 0 || occurrences > self.limits.max_occurrences {
                continue;
            }

            let mut resolvents = Vec::new();
            let mut blocked = false;
            'pairs: for &p in &pos {
                for &q in &neg {
                    let (Some(a), Some(b)) = (&self.clauses[p], &self.clauses[q]) else {
                        continue;
                    };
                    if let Some(resolvent) = resolve(a, b, var) {
                        if resolvent.len() > self.limits.max_resolvent_len
                            || resolvents.len() == occurrences
                        {
                            blocked = true;
                            break 'pairs;
                        }
                        resolvents.push(resolvent);
                    }
                }
            }
            if blocked {
                continue;
            }

            let stored: Vec<Vec<Lit>> = pos
                .iter()
                .filter_map(|&ci| self.clauses[ci].take())
                .collect();
            for &ci in &neg {
                self.clauses[ci] = None;
            }
            for resolvent in resolvents {
                if resolvent.is_empty() {
                    return Err(Refuted);
                }
                let ci = self.clauses.len();
                for lit in &resolvent {
                    occurs[lit.index()].push(ci);
                }
                self.clauses.push(Some(resolvent));
            }
            self.eliminated[v] = true;
            self.stack.push(ReconstructStep::Eliminated {
                pivot: var.positive(),
                clauses: stored,
            });
            self.counts.eliminated += 1;
            changed = true;
        }
        Ok(changed)
    }

    fn simplify(&mut self) -> std::result::Result<(), Refuted> {
        for round in 0..self.limits.rounds {
            let mut changed = self.propagate_units()?;
            changed |= self.substitute_equivalences()?;
            changed |= self.eliminate_variables()?;
            debug!(
                event = "preprocess_round",
                round = round,
                clauses = self.live_clauses().count(),
                fixed = self.counts.fixed,
                substituted = self.counts.substituted,
                eliminated = self.counts.eliminated,
            );
            if !changed {
                break;
            }
        }
        self.propagate_units()?;
        Ok(())
    }

    /// Follows substitutions to a variable that was not replaced.
    fn resolve_substitution(&self, var: Var) -> Lit {
        let mut lit = var.positive();
        while let Some(rep) = self.substituted[lit.var().index()] {
            lit = rep.xor(lit.is_negated());
        }
        lit
    }

    fn finish(self) -> PreprocessOutcome {
        let mut compact: Vec<Option<u32>> = vec![None; self.num_vars];
        for clause in self.live_clauses() {
            for lit in clause {
                compact[lit.var().index()] = Some(0);
            }
        }
        let mut reduced_vars = 0u32;
        for slot in compact.iter_mut() {
            if slot.is_some() {
                *slot = Some(reduced_vars);
                reduced_vars += 1;
            }
        }

        let mut formula = Cnf::new(reduced_vars as usize);
        for clause in self.live_clauses() {
            formula.add_clause(clause.iter().filter_map(|l| {
                compact[l.var().index()].map(|idx| Lit::new(Var::new(idx), l.is_negated()))
            }));
        }

        let mapping = (0..self.num_vars)
            .map(|v| {
                let target = self.resolve_substitution(Var::new(v as u32));
                compact[target.var().index()]
                    .map(|idx| Lit::new(Var::new(idx), target.is_negated()))
            })
            .collect();
        let artifact = PreprocessArtifact::new(
            self.num_vars,
            reduced_vars as usize,
            mapping,
            self.fixed,
            self.stack,
        );

        if formula.num_clauses() == 0 {
            let mut partial = vec![0i8; artifact.original_vars()];
            artifact.complete_model(&mut partial);
            return PreprocessOutcome::Satisfiable(Model::new(
                partial.into_iter().map(|v| v > 0).collect(),
            ));
        }
        PreprocessOutcome::Reduced { formula, artifact }
    }
}

/// Simplifies formulas before they are handed to the portfolio workers.
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    limits: PreprocessLimits,
}

impl Preprocessor {
    pub fn new(limits: PreprocessLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> PreprocessLimits {
        self.limits
    }

    pub fn run(&self, cnf: &Cnf) -> Result<PreprocessOutcome> {
        if cnf.num_vars() > (u32::MAX >> 1) as usize {
            return Err(SatfolioError::config(format!(
                "{} variables exceed the supported range",
                cnf.num_vars()
            )));
        }
        let mut simplifier = match Simplifier::new(cnf, self.limits) {
            Ok(simplifier) => simplifier,
            Err(Refuted) => return Ok(PreprocessOutcome::Unsatisfiable),
        };
        if simplifier.simplify().is_err() {
            return Ok(PreprocessOutcome::Unsatisfiable);
        }
        Ok(simplifier.finish())
    }
}

#[cfg(test)]
mod tests;
