use std::sync::{Arc, Barrier};
use std::time::{Duration, Instant};

use satfolio_core::{Model, SatfolioError, SolveResult};
use satfolio_test::{within, ScriptedEngine};

use super::*;
use crate::termination::{CancelStrength, WinnerPolicy};

const POLL: Duration = Duration::from_millis(10);
const LIMIT: Duration = Duration::from_secs(20);

fn workers(engines: Vec<ScriptedEngine>) -> Vec<Worker<ScriptedEngine>> {
    engines
        .into_iter()
        .enumerate()
        .map(|(ordinal, engine)| Worker::new(ordinal, engine))
        .collect()
}

fn first_to_finish() -> Coordinator {
    Coordinator::new(WinnerPolicy::FirstToFinish, CancelStrength::Cooperative)
}

fn priority_weighted() -> Coordinator {
    Coordinator::new(WinnerPolicy::PriorityWeighted, CancelStrength::Cooperative)
}

/// A model whose length identifies the worker that produced it.
fn tagged_model(ordinal: usize) -> Model {
    Model::new(vec![true; ordinal + 1])
}

#[test]
fn test_simultaneous_conclusions_one_winner() {
    within(LIMIT, || {
        for _ in 0..10 {
            let barrier = Arc::new(Barrier::new(4));
            let mut ws = workers(
                (0..4)
                    .map(|i| {
                        ScriptedEngine::sat_after(i, 0, tagged_model(i))
                            .with_barrier(Arc::clone(&barrier))
                    })
                    .collect(),
            );
            let coordinator = first_to_finish();
            let outcome = Scheduler::new(&coordinator, Duration::from_secs(10), POLL)
                .run(&mut ws)
                .unwrap();

            let winner = outcome.snapshot.winner.unwrap();
            assert_eq!(outcome.joined, 4);
            assert!(outcome.snapshot.terminated);
            match outcome.result {
                SolveResult::Satisfiable(model) => assert_eq!(model.len(), winner.worker + 1),
                other => panic!("expected a model, got {other:?}"),
            }
        }
    });
}

#[test]
fn test_unsatisfiable_joins_all() {
    within(LIMIT, || {
        let engines: Vec<_> = (0..4)
            .map(|i| {
                if i == 2 {
                    ScriptedEngine::unsat_after(i, 3)
                } else {
                    ScriptedEngine::never_finishing(i, Duration::from_millis(2))
                }
            })
            .collect();
        let probes: Vec<_> = engines.iter().map(ScriptedEngine::probe).collect();
        let mut ws = workers(engines);
        let coordinator = first_to_finish();
        let outcome = Scheduler::new(&coordinator, Duration::from_secs(10), POLL)
            .run(&mut ws)
            .unwrap();

        assert_eq!(outcome.result, SolveResult::Unsatisfiable);
        assert_eq!(outcome.joined, 4);
        assert_eq!(outcome.snapshot.winner.map(|w| w.worker), Some(2));
        assert_eq!(outcome.snapshot.cause, Some(CancelCause::Concluded));
        assert!(probes.iter().all(|p| p.solve_calls() >= 1));
    });
}

#[test]
fn test_cutoff_returns_unknown() {
    within(LIMIT, || {
        let mut ws = workers(
            (0..3)
                .map(|i| ScriptedEngine::never_finishing(i, Duration::from_millis(20)))
                .collect(),
        );
        let coordinator = first_to_finish();
        let started = Instant::now();
        let scheduler =
            Scheduler::new(&coordinator, Duration::from_secs(1), Duration::from_millis(100));
        let outcome = scheduler.run(&mut ws).unwrap();
        let elapsed = started.elapsed();

        assert_eq!(outcome.result, SolveResult::Unknown);
        assert_eq!(outcome.snapshot.winner, None);
        assert_eq!(outcome.snapshot.cause, Some(CancelCause::Timeout));
        assert!(outcome.snapshot.terminated);
        assert!(elapsed >= Duration::from_millis(950), "{elapsed:?}");
        assert!(elapsed <= Duration::from_secs(2), "{elapsed:?}");
    });
}

#[test]
fn test_forced_cancel_interrupts_long_steps() {
    within(LIMIT, || {
        let mut ws = workers(
            (0..4)
                .map(|i| {
                    if i == 0 {
                        ScriptedEngine::unsat_after(i, 1)
                    } else {
                        ScriptedEngine::never_finishing(i, Duration::from_secs(60))
                    }
                })
                .collect(),
        );
        let coordinator = Coordinator::new(WinnerPolicy::FirstToFinish, CancelStrength::Forced);
        let outcome = Scheduler::new(&coordinator, Duration::from_secs(30), POLL)
            .run(&mut ws)
            .unwrap();
        assert_eq!(outcome.result, SolveResult::Unsatisfiable);
        assert!(outcome.elapsed < Duration::from_secs(5));
        assert!(ws.iter().all(|w| w.stop_handle().is_forced_stop_requested()));
    });
}

#[test]
fn test_priority_weighted_lowest_wins() {
    within(LIMIT, || {
        let barrier = Arc::new(Barrier::new(3));
        let priorities = [30, 10, 20];
        let mut ws = workers(
            priorities
                .iter()
                .enumerate()
                .map(|(i, &p)| {
                    ScriptedEngine::unsat_after(i, 0)
                        .with_priority(p)
                        .with_barrier(Arc::clone(&barrier))
                })
                .collect(),
        );
        let coordinator = priority_weighted();
        let scheduler =
            Scheduler::new(&coordinator, Duration::from_secs(10), Duration::from_millis(300));
        let outcome = scheduler.run(&mut ws).unwrap();

        assert_eq!(outcome.result, SolveResult::Unsatisfiable);
        let winner = outcome.snapshot.winner.unwrap();
        assert_eq!((winner.worker, winner.priority), (1, 10));
        assert!(outcome.snapshot.cancelled);
    });
}

#[test]
fn test_contradicting_results_are_a_fault() {
    within(LIMIT, || {
        let barrier = Arc::new(Barrier::new(2));
        let mut ws = workers(vec![
            ScriptedEngine::sat_after(0, 0, tagged_model(0))
                .with_priority(30)
                .with_barrier(Arc::clone(&barrier)),
            ScriptedEngine::unsat_after(1, 0)
                .with_priority(10)
                .with_barrier(Arc::clone(&barrier)),
        ]);
        let coordinator = priority_weighted();
        let scheduler =
            Scheduler::new(&coordinator, Duration::from_secs(10), Duration::from_millis(300));
        let err = scheduler.run(&mut ws).unwrap_err();

        assert!(matches!(err, SatfolioError::EngineFault { .. }), "{err:?}");
        let snap = coordinator.snapshot();
        assert_eq!(snap.cause, Some(CancelCause::Fault));
        assert!(snap.conflict.is_some());
    });
}

#[test]
fn test_engine_error_cancels_and_propagates() {
    within(LIMIT, || {
        let engines: Vec<_> = (0..3)
            .map(|i| {
                if i == 1 {
                    ScriptedEngine::new(i).failing_step(2)
                } else {
                    ScriptedEngine::never_finishing(i, Duration::from_millis(5))
                }
            })
            .collect();
        let mut ws = workers(engines);
        let coordinator = first_to_finish();
        let err = Scheduler::new(&coordinator, Duration::from_secs(10), POLL)
            .run(&mut ws)
            .unwrap_err();

        assert!(matches!(err, SatfolioError::EngineFault { worker: 1, .. }));
        assert_eq!(coordinator.snapshot().cause, Some(CancelCause::Fault));
        assert!(ws.iter().all(|w| w.stop_handle().is_cooperative_stop_requested()));
    });
}

#[test]
fn test_panic_becomes_engine_fault() {
    within(LIMIT, || {
        let engines: Vec<_> = (0..3)
            .map(|i| {
                if i == 0 {
                    ScriptedEngine::new(i).panicking_step(1)
                } else {
                    ScriptedEngine::never_finishing(i, Duration::from_millis(5))
                }
            })
            .collect();
        let mut ws = workers(engines);
        let coordinator = first_to_finish();
        let err = Scheduler::new(&coordinator, Duration::from_secs(10), POLL)
            .run(&mut ws)
            .unwrap_err();

        match err {
            SatfolioError::EngineFault { worker, message } => {
                assert_eq!(worker, 0);
                assert!(message.contains("scripted panic"), "{message}");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(coordinator.snapshot().cause, Some(CancelCause::Fault));
    });
}

#[test]
fn test_satisfiable_without_model_is_fault() {
    within(LIMIT, || {
        let mut ws = workers(vec![
            ScriptedEngine::new(0).finishing_with(StepStatus::Satisfiable, 0),
        ]);
        let coordinator = first_to_finish();
        let err = Scheduler::new(&coordinator, Duration::from_secs(10), POLL)
            .run(&mut ws)
            .unwrap_err();
        assert!(matches!(err, SatfolioError::EngineFault { worker: 0, .. }));
    });
}

#[test]
fn test_repeated_runs_reset_state() {
    within(LIMIT, || {
        let coordinator = first_to_finish();
        let scheduler = Scheduler::new(&coordinator, Duration::from_secs(10), POLL);

        let mut ws = workers(vec![ScriptedEngine::unsat_after(0, 0)]);
        assert_eq!(scheduler.run(&mut ws).unwrap().result, SolveResult::Unsatisfiable);

        let mut ws = workers(vec![ScriptedEngine::sat_after(0, 1, tagged_model(4))]);
        let outcome = scheduler.run(&mut ws).unwrap();
        assert_eq!(outcome.result.model().map(Model::len), Some(5));
    });
}

#[test]
fn test_run_portfolio_default_cadence() {
    within(LIMIT, || {
        let mut ws = workers((0..2).map(|i| ScriptedEngine::unsat_after(i, i)).collect());
        let coordinator = first_to_finish();
        let result = run_portfolio(&mut ws, &coordinator, Duration::from_secs(10)).unwrap();
        assert_eq!(result, SolveResult::Unsatisfiable);
        assert!(coordinator.is_terminated());
    });
}
