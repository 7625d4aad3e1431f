use std::sync::{Arc, Barrier};
use std::thread;

use super::*;

fn stops(n: usize) -> Vec<StopHandle> {
    (0..n).map(|_| StopHandle::new()).collect()
}

#[test]
fn test_switches_select_policy() {
    let c = Coordinator::from_switches(false, false);
    assert_eq!(c.policy(), WinnerPolicy::FirstToFinish);
    assert_eq!(c.strength(), CancelStrength::Cooperative);

    let c = Coordinator::from_switches(false, true);
    assert_eq!(c.policy(), WinnerPolicy::PriorityWeighted);
    assert_eq!(c.strength(), CancelStrength::Cooperative);

    let c = Coordinator::from_switches(true, false);
    assert_eq!(c.strength(), CancelStrength::Cooperative);

    let c = Coordinator::from_switches(true, true);
    assert_eq!(c.strength(), CancelStrength::Forced);
}

#[test]
fn test_first_offer_wins() {
    let handles = stops(3);
    let c = Coordinator::new(WinnerPolicy::FirstToFinish, CancelStrength::Cooperative);
    c.reset(&handles);
    assert!(!c.is_terminated());

    assert!(c.offer(1, StepStatus::Satisfiable, 50));
    assert!(!c.offer(2, StepStatus::Unsatisfiable, 1));

    let snap = c.snapshot();
    assert!(snap.terminated);
    assert!(snap.cancelled);
    assert_eq!(snap.cause, Some(CancelCause::Concluded));
    assert_eq!(snap.winner.map(|w| w.worker), Some(1));
    assert!(handles.iter().all(StopHandle::is_cooperative_stop_requested));
    assert!(!handles.iter().any(StopHandle::is_forced_stop_requested));
}

#[test]
fn test_unfinished_is_not_an_offer() {
    let c = Coordinator::new(WinnerPolicy::FirstToFinish, CancelStrength::Cooperative);
    c.reset(&stops(1));
    assert!(!c.offer(0, StepStatus::Unfinished, 0));
    assert!(!c.is_terminated());
}

#[test]
fn test_concurrent_offers_have_one_winner() {
    for _ in 0..50 {
        let handles = stops(8);
        let c = Coordinator::new(WinnerPolicy::FirstToFinish, CancelStrength::Cooperative);
        c.reset(&handles);
        let barrier = Arc::new(Barrier::new(8));

        let accepted: usize = thread::scope(|s| {
            let joins: Vec<_> = (0..8)
                .map(|worker| {
                    let c = &c;
                    let barrier = Arc::clone(&barrier);
                    s.spawn(move || {
                        barrier.wait();
                        c.offer(worker, StepStatus::Unsatisfiable, 0) as usize
                    })
                })
                .collect();
            joins.into_iter().map(|j| j.join().unwrap()).sum()
        });

        assert_eq!(accepted, 1);
        assert!(c.snapshot().winner.is_some());
    }
}

#[test]
fn test_priority_weighted_keeps_lowest() {
    let handles = stops(3);
    let c = Coordinator::new(WinnerPolicy::PriorityWeighted, CancelStrength::Cooperative);
    c.reset(&handles);

    assert!(c.offer(0, StepStatus::Satisfiable, 300));
    assert!(c.is_terminated());
    assert!(!handles[0].is_cooperative_stop_requested());

    assert!(c.offer(2, StepStatus::Satisfiable, 100));
    assert!(!c.offer(1, StepStatus::Satisfiable, 200));
    assert!(!c.offer(1, StepStatus::Satisfiable, 100));

    assert!(c.seal());
    assert!(!c.seal());
    let snap = c.snapshot();
    assert_eq!(snap.winner.map(|w| (w.worker, w.priority)), Some((2, 100)));
    assert!(handles.iter().all(StopHandle::is_cooperative_stop_requested));
}

#[test]
fn test_contradicting_offer_records_conflict() {
    let handles = stops(2);
    let c = Coordinator::new(WinnerPolicy::PriorityWeighted, CancelStrength::Cooperative);
    c.reset(&handles);

    assert!(c.offer(0, StepStatus::Satisfiable, 30));
    assert!(!c.offer(1, StepStatus::Unsatisfiable, 10));

    let snap = c.snapshot();
    assert_eq!(snap.winner.map(|w| w.worker), Some(0));
    assert_eq!(snap.cause, Some(CancelCause::Fault));
    let conflict = snap.conflict.unwrap();
    assert_eq!(conflict.held.status, StepStatus::Satisfiable);
    assert_eq!(
        (conflict.offered.worker, conflict.offered.status),
        (1, StepStatus::Unsatisfiable)
    );
    assert!(handles.iter().all(StopHandle::is_cooperative_stop_requested));
    assert!(!c.seal());
}

#[test]
fn test_no_offer_after_broadcast() {
    let c = Coordinator::new(WinnerPolicy::PriorityWeighted, CancelStrength::Cooperative);
    c.reset(&stops(2));
    assert!(c.offer(0, StepStatus::Unsatisfiable, 10));
    c.seal();
    assert!(!c.offer(1, StepStatus::Unsatisfiable, 1));
    assert_eq!(c.snapshot().winner.map(|w| w.worker), Some(0));
}

#[test]
fn test_timeout_cancel_has_no_winner() {
    let handles = stops(2);
    let c = Coordinator::new(WinnerPolicy::FirstToFinish, CancelStrength::Forced);
    c.reset(&handles);

    assert!(c.cancel(CancelCause::Timeout));
    assert!(!c.cancel(CancelCause::Fault));
    assert!(!c.offer(0, StepStatus::Satisfiable, 0));

    let snap = c.snapshot();
    assert!(snap.terminated);
    assert_eq!(snap.winner, None);
    assert_eq!(snap.cause, Some(CancelCause::Timeout));
    assert!(handles.iter().all(StopHandle::is_forced_stop_requested));
}

#[test]
fn test_seal_without_winner_does_not_cancel() {
    let handles = stops(1);
    let c = Coordinator::new(WinnerPolicy::PriorityWeighted, CancelStrength::Cooperative);
    c.reset(&handles);
    assert!(!c.seal());
    assert!(!c.snapshot().cancelled);
    assert!(!handles[0].is_cooperative_stop_requested());
}

#[test]
fn test_reset_clears_previous_run() {
    let handles = stops(2);
    let c = Coordinator::new(WinnerPolicy::FirstToFinish, CancelStrength::Cooperative);
    c.reset(&handles);
    c.offer(0, StepStatus::Satisfiable, 0);

    c.reset(&handles);
    let snap = c.snapshot();
    assert!(!snap.terminated);
    assert_eq!(snap.winner, None);
    assert!(!handles[1].is_cooperative_stop_requested());
    assert!(c.offer(1, StepStatus::Unsatisfiable, 0));
}
