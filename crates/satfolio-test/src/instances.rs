//! CNF instance generators.
//!
//! # Example
//!
//! ```
//! use satfolio_test::instances;
//!
//! let php = instances::pigeonhole(3, 2);
//! assert_eq!(php.num_vars(), 6);
//!
//! let (cnf, hidden) = instances::planted_3sat(20, 80, 1);
//! assert!(cnf.is_satisfied_by(&hidden));
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use satfolio_core::{Cnf, Lit, Model, Var};

/// Pigeonhole principle: `pigeons` pigeons into `holes` holes.
///
/// Unsatisfiable whenever `pigeons > holes`.
pub fn pigeonhole(pigeons: usize, holes: usize) -> Cnf {
    let var = |p: usize, h: usize| Var::new((p * holes + h) as u32);
    let mut cnf = Cnf::new(pigeons * holes);
    for p in 0..pigeons {
        cnf.add_clause((0..holes).map(|h| var(p, h).positive()));
    }
    for h in 0..holes {
        for p in 0..pigeons {
            for q in p + 1..pigeons {
                cnf.add_clause([var(p, h).negative(), var(q, h).negative()]);
            }
        }
    }
    cnf
}

/// `x1` and `-x1`.
pub fn trivially_unsat() -> Cnf {
    Cnf::from_dimacs_clauses(1, &[vec![1], vec![-1]])
}

/// A chain `x1, x1 -> x2, ..., x(n-1) -> xn`; the only model is all true.
pub fn implication_chain(n: usize) -> Cnf {
    let mut cnf = Cnf::new(n);
    if n == 0 {
        return cnf;
    }
    cnf.add_clause([Var::new(0).positive()]);
    for i in 1..n {
        cnf.add_clause([Var::new(i as u32 - 1).negative(), Var::new(i as u32).positive()]);
    }
    cnf
}

fn random_clause(rng: &mut ChaCha8Rng, num_vars: usize) -> Vec<Lit> {
    let mut vars: Vec<u32> = Vec::with_capacity(3);
    while vars.len() < 3.min(num_vars) {
        let v = rng.random_range(0..num_vars as u32);
        if !vars.contains(&v) {
            vars.push(v);
        }
    }
    vars.into_iter()
        .map(|v| Lit::new(Var::new(v), rng.random_bool(0.5)))
        .collect()
}

/// Uniform random 3-SAT.
pub fn random_3sat(num_vars: usize, num_clauses: usize, seed: u64) -> Cnf {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut cnf = Cnf::new(num_vars);
    for _ in 0..num_clauses {
        cnf.add_clause(random_clause(&mut rng, num_vars));
    }
    cnf
}

/// Random 3-SAT with a hidden model; every clause is satisfied by it.
pub fn planted_3sat(num_vars: usize, num_clauses: usize, seed: u64) -> (Cnf, Model) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let hidden = Model::new((0..num_vars).map(|_| rng.random_bool(0.5)).collect());
    let mut cnf = Cnf::new(num_vars);
    for _ in 0..num_clauses {
        let mut clause = random_clause(&mut rng, num_vars);
        if !clause.iter().any(|&l| hidden.lit_value(l)) {
            let i = rng.random_range(0..clause.len());
            clause[i] = !clause[i];
        }
        cnf.add_clause(clause);
    }
    (cnf, hidden)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pigeonhole_shape() {
        let cnf = pigeonhole(3, 2);
        // 3 at-least-one clauses, 2 holes * 3 pairs
        assert_eq!(cnf.num_clauses(), 3 + 6);
    }

    #[test]
    fn test_planted_is_deterministic() {
        let (a, ma) = planted_3sat(30, 100, 9);
        let (b, mb) = planted_3sat(30, 100, 9);
        assert_eq!(a.clauses(), b.clauses());
        assert_eq!(ma, mb);
        assert!(a.is_satisfied_by(&ma));
    }

    #[test]
    fn test_chain_model() {
        let cnf = implication_chain(4);
        assert!(cnf.is_satisfied_by(&Model::new(vec![true; 4])));
        assert!(!cnf.is_satisfied_by(&Model::new(vec![true, true, false, true])));
    }
}
