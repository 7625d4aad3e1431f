//! WalkSAT local search used as a warm start.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use satfolio_core::{Cnf, Lit, Var};

use crate::engine::StopHandle;

const NOISE: f64 = 0.567;

pub(crate) struct WalkOutcome {
    /// Best assignment seen, one value per variable.
    pub(crate) assignment: Vec<bool>,
    /// Number of clauses the best assignment leaves unsatisfied.
    pub(crate) unsatisfied: usize,
}

struct Walker<'a> {
    clauses: &'a [Vec<Lit>],
    occurs: Vec<Vec<u32>>,
    values: Vec<bool>,
    true_count: Vec<u32>,
    unsat: Vec<u32>,
    unsat_pos: Vec<Option<u32>>,
}

impl<'a> Walker<'a> {
    fn new(cnf: &'a Cnf, initial: &[bool]) -> Self {
        let clauses = cnf.clauses();
        let mut occurs = vec![Vec::new(); cnf.num_vars() * 2];
        for (ci, clause) in clauses.iter().enumerate() {
            for lit in clause {
                occurs[lit.index()].push(ci as u32);
            }
        }
        let mut walker = Self {
            clauses,
            occurs,
            values: initial.to_vec(),
            true_count: vec![0; clauses.len()],
            unsat: Vec::new(),
            unsat_pos: vec![None; clauses.len()],
        };
        for ci in 0..clauses.len() {
            let count = walker.clauses[ci]
                .iter()
                .filter(|&&l| walker.is_true(l))
                .count() as u32;
            walker.true_count[ci] = count;
            if count == 0 {
                walker.mark_unsat(ci as u32);
            }
        }
        walker
    }

    #[inline]
    fn is_true(&self, lit: Lit) -> bool {
        self.values[lit.var().index()] != lit.is_negated()
    }

    fn mark_unsat(&mut self, ci: u32) {
        self.unsat_pos[ci as usize] = Some(self.unsat.len() as u32);
        self.unsat.push(ci);
    }

    fn mark_sat(&mut self, ci: u32) {
        if let Some(pos) = self.unsat_pos[ci as usize].take() {
            let last = self.unsat.swap_remove(pos as usize);
            if last != ci {
                self.unsat_pos[last as usize] = Some(pos);
            }
        }
    }

    /// Clauses that become unsatisfied if `lit` is flipped to false.
    fn break_count(&self, lit: Lit) -> usize {
        self.occurs[lit.index()]
            .iter()
            .filter(|&&ci| self.true_count[ci as usize] == 1)
            .count()
    }

    fn flip(&mut self, var_index: usize) {
        let was_true = Lit::new(Var::new(var_index as u32), !self.values[var_index]);
        self.values[var_index] = !self.values[var_index];
        let now_true = !was_true;
        for i in 0..self.occurs[now_true.index()].len() {
            let ci = self.occurs[now_true.index()][i];
            self.true_count[ci as usize] += 1;
            if self.true_count[ci as usize] == 1 {
                self.mark_sat(ci);
            }
        }
        for i in 0..self.occurs[was_true.index()].len() {
            let ci = self.occurs[was_true.index()][i];
            self.true_count[ci as usize] -= 1;
            if self.true_count[ci as usize] == 0 {
                self.mark_unsat(ci);
            }
        }
    }
}

/// Runs up to `max_flips` WalkSAT flips from `initial`.
///
/// The formula must not contain an empty clause.
pub(crate) fn walk(
    cnf: &Cnf,
    initial: &[bool],
    max_flips: u64,
    rng: &mut ChaCha8Rng,
    stop: &StopHandle,
) -> WalkOutcome {
    let clauses = cnf.clauses();
    let mut walker = Walker::new(cnf, initial);
    let mut best = walker.values.clone();
    let mut best_unsat = walker.unsat.len();

    for flip in 0..max_flips {
        if walker.unsat.is_empty() {
            break;
        }
        if flip % 1024 == 0 && stop.is_forced_stop_requested() {
            break;
        }
        let ci = walker.unsat[rng.random_range(0..walker.unsat.len())] as usize;
        let clause = &clauses[ci];

        // A literal of an unsatisfied clause is false; flipping makes it true.
        let mut candidate = None;
        let mut min_break = usize::MAX;
        for &lit in clause {
            let breaks = walker.break_count(!lit);
            if breaks < min_break {
                min_break = breaks;
                candidate = Some(lit);
            }
        }
        let chosen = if min_break > 0 && rng.random_bool(NOISE) {
            clause[rng.random_range(0..clause.len())]
        } else {
            match candidate {
                Some(lit) => lit,
                None => break,
            }
        };
        walker.flip(chosen.var().index());

        if walker.unsat.len() < best_unsat {
            best_unsat = walker.unsat.len();
            best.copy_from_slice(&walker.values);
        }
    }

    WalkOutcome {
        assignment: best,
        unsatisfied: best_unsat,
    }
}
