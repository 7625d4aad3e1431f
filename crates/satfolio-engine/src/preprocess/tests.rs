//! Tests for the preprocessor.

use super::*;
use crate::cdcl::Cdcl;
use crate::engine::{Engine, InputSource, StepStatus};
use satfolio_test::instances;
use std::sync::Arc;

fn no_elimination() -> PreprocessLimits {
    PreprocessLimits {
        max_occurrences: 0,
        ..PreprocessLimits::default()
    }
}

fn cnf(num_vars: usize, clauses: &[&[i32]]) -> Cnf {
    Cnf::from_dimacs_clauses(num_vars, clauses)
}

fn extend(reduced: &Model, artifact: &PreprocessArtifact) -> Model {
    let mut partial = vec![0i8; artifact.original_vars()];
    for (v, value) in partial.iter_mut().enumerate() {
        if let Some(lit) = artifact.mapping(Var::new(v as u32)) {
            *value = if reduced.lit_value(lit) { 1 } else { -1 };
        }
    }
    artifact.complete_model(&mut partial);
    Model::new(partial.into_iter().map(|v| v > 0).collect())
}

fn solve_reduced(formula: Cnf) -> (StepStatus, Option<Model>) {
    let mut engine = Cdcl::new(0);
    engine
        .parse(&InputSource::Formula(Arc::new(formula)))
        .unwrap();
    for _ in 0..10_000 {
        let status = engine.solve_step().unwrap();
        if status.is_definitive() {
            return (status, engine.extract_model());
        }
    }
    panic!("engine did not conclude");
}

#[test]
fn test_conflicting_units_are_unsat() {
    let outcome = Preprocessor::default()
        .run(&instances::trivially_unsat())
        .unwrap();
    assert!(matches!(outcome, PreprocessOutcome::Unsatisfiable));
}

#[test]
fn test_empty_clause_is_unsat() {
    let mut formula = Cnf::new(1);
    formula.add_clause(Vec::new());
    let outcome = Preprocessor::default().run(&formula).unwrap();
    assert!(matches!(outcome, PreprocessOutcome::Unsatisfiable));
}

#[test]
fn test_units_are_fixed_and_removed() {
    let formula = cnf(5, &[&[1], &[-1, 2], &[-2, 3, 4, 5], &[-3, -4], &[-4, -5]]);
    let outcome = Preprocessor::new(no_elimination()).run(&formula).unwrap();
    let PreprocessOutcome::Reduced { formula: reduced, artifact } = outcome else {
        panic!("expected a reduced formula");
    };
    assert_eq!(artifact.original_vars(), 5);
    assert_eq!(artifact.reduced_vars(), 3);
    assert_eq!(reduced.num_clauses(), 3);
    assert_eq!(artifact.mapping(Var::new(0)), None);
    assert!(artifact.mapping(Var::new(2)).is_some());

    let (status, model) = solve_reduced(reduced);
    assert_eq!(status, StepStatus::Satisfiable);
    let full = extend(&model.unwrap(), &artifact);
    assert!(formula.is_satisfied_by(&full));
    assert!(full.value(Var::new(0)));
    assert!(full.value(Var::new(1)));
}

#[test]
fn test_equivalent_literals_are_substituted() {
    // 1 v 3 and -1 v -3 make variable 3 the negation of variable 1.
    let formula = cnf(
        4,
        &[&[1, 3], &[-1, -3], &[1, 2, 4], &[-1, -2, 4], &[3, -2, -4], &[2, 4, -3]],
    );
    let outcome = Preprocessor::new(no_elimination()).run(&formula).unwrap();
    let PreprocessOutcome::Reduced { formula: reduced, artifact } = outcome else {
        panic!("expected a reduced formula");
    };
    assert!(artifact.steps().contains(&ReconstructStep::Substituted {
        var: Var::new(2),
        lit: Var::new(0).negative(),
    }));
    assert_eq!(artifact.reduced_vars(), 3);
    let one = artifact.mapping(Var::new(0)).unwrap();
    let three = artifact.mapping(Var::new(2)).unwrap();
    assert_eq!(three, !one);

    let (status, model) = solve_reduced(reduced);
    assert_eq!(status, StepStatus::Satisfiable);
    let full = extend(&model.unwrap(), &artifact);
    assert!(formula.is_satisfied_by(&full));
    assert_ne!(full.value(Var::new(0)), full.value(Var::new(2)));
}

#[test]
fn test_literal_equivalent_to_its_negation_is_unsat() {
    let formula = cnf(2, &[&[1, 2], &[-1, -2], &[1, -2], &[-1, 2]]);
    let outcome = Preprocessor::new(no_elimination()).run(&formula).unwrap();
    assert!(matches!(outcome, PreprocessOutcome::Unsatisfiable));
}

#[test]
fn test_elimination_can_solve_small_formula() {
    let formula = cnf(3, &[&[1, 2], &[-1, 3], &[-2, -3], &[2, 3]]);
    let outcome = Preprocessor::default().run(&formula).unwrap();
    match outcome {
        PreprocessOutcome::Satisfiable(model) => {
            assert_eq!(model.len(), 3);
            assert!(formula.is_satisfied_by(&model));
        }
        PreprocessOutcome::Reduced { formula: reduced, artifact } => {
            let (status, model) = solve_reduced(reduced);
            assert_eq!(status, StepStatus::Satisfiable);
            assert!(formula.is_satisfied_by(&extend(&model.unwrap(), &artifact)));
        }
        PreprocessOutcome::Unsatisfiable => panic!("formula is satisfiable"),
    }
}

#[test]
fn test_planted_instances_keep_models() {
    for seed in 0..5 {
        let (formula, _) = instances::planted_3sat(80, 320, seed);
        match Preprocessor::default().run(&formula).unwrap() {
            PreprocessOutcome::Unsatisfiable => panic!("planted instance refuted"),
            PreprocessOutcome::Satisfiable(model) => assert!(formula.is_satisfied_by(&model)),
            PreprocessOutcome::Reduced { formula: reduced, artifact } => {
                assert!(artifact.reduced_vars() <= 80);
                let (status, model) = solve_reduced(reduced);
                assert_eq!(status, StepStatus::Satisfiable);
                let full = extend(&model.unwrap(), &artifact);
                assert_eq!(full.len(), 80);
                assert!(formula.is_satisfied_by(&full));
            }
        }
    }
}

#[test]
fn test_pigeonhole_stays_unsat() {
    let formula = instances::pigeonhole(5, 4);
    match Preprocessor::default().run(&formula).unwrap() {
        PreprocessOutcome::Unsatisfiable => {}
        PreprocessOutcome::Satisfiable(_) => panic!("pigeonhole is unsatisfiable"),
        PreprocessOutcome::Reduced { formula: reduced, .. } => {
            assert_eq!(solve_reduced(reduced).0, StepStatus::Unsatisfiable);
        }
    }
}

#[test]
fn test_zero_rounds_only_compacts() {
    let formula = cnf(5, &[&[1, -3], &[3, 5]]);
    let limits = PreprocessLimits {
        rounds: 0,
        ..PreprocessLimits::default()
    };
    let PreprocessOutcome::Reduced { formula: reduced, artifact } =
        Preprocessor::new(limits).run(&formula).unwrap()
    else {
        panic!("expected a reduced formula");
    };
    assert_eq!(reduced.num_clauses(), 2);
    assert_eq!(artifact.reduced_vars(), 3);
    assert_eq!(artifact.mapping(Var::new(1)), None);
    assert_eq!(artifact.mapping(Var::new(4)), Some(Var::new(2).positive()));
}

#[test]
fn test_complete_model_replays_elimination() {
    // Variable 2 was eliminated from (2 v 1) and (-2 v 3).
    let x1 = Var::new(0).positive();
    let x2 = Var::new(1).positive();
    let artifact = PreprocessArtifact::new(
        3,
        2,
        vec![Some(Var::new(0).positive()), None, Some(Var::new(1).positive())],
        vec![0; 3],
        vec![ReconstructStep::Eliminated {
            pivot: x2,
            clauses: vec![vec![x2, x1]],
        }],
    );

    let mut partial = vec![-1, 0, 1];
    artifact.complete_model(&mut partial);
    assert_eq!(partial, vec![-1, 1, 1]);

    let mut partial = vec![1, 0, -1];
    artifact.complete_model(&mut partial);
    assert_eq!(partial, vec![1, -1, -1]);
}

#[test]
fn test_complete_model_defaults_and_fixed() {
    let artifact = PreprocessArtifact::new(
        3,
        0,
        vec![None; 3],
        vec![0, 1, 0],
        vec![ReconstructStep::Substituted {
            var: Var::new(2),
            lit: Var::new(1).negative(),
        }],
    );
    let mut partial = vec![0; 3];
    artifact.complete_model(&mut partial);
    assert_eq!(partial, vec![-1, 1, -1]);
}

#[test]
fn test_identity_artifact() {
    let artifact = PreprocessArtifact::identity(2);
    assert_eq!(artifact.mapping(Var::new(1)), Some(Var::new(1).positive()));
    assert!(artifact.steps().is_empty());
}
