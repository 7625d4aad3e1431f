//! The timed parallel solve loop.
//!
//! [`Scheduler::run`] starts one scoped thread per worker and supervises them
//! from the calling thread until a result is known, the cutoff expires or
//! every task has stopped. All tasks are joined before it returns.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use satfolio_core::{Result, SatfolioError, SolveResult};
use satfolio_engine::{Engine, StepStatus, StopHandle};
use tracing::{debug, info};

use crate::task::panic_fault;
use crate::termination::{CancelCause, Coordinator, TerminationSnapshot};
use crate::worker::Worker;

/// Supervisor cadence used by [`run_portfolio`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Solves with `workers` until a result is known or `cutoff` expires.
pub fn run_portfolio<E: Engine>(
    workers: &mut [Worker<E>],
    coordinator: &Coordinator,
    cutoff: Duration,
) -> Result<SolveResult> {
    Scheduler::new(coordinator, cutoff, DEFAULT_POLL_INTERVAL)
        .run(workers)
        .map(|outcome| outcome.result)
}

/// What one scheduler run produced.
#[derive(Debug, Clone)]
pub struct ScheduleOutcome {
    pub result: SolveResult,
    pub snapshot: TerminationSnapshot,
    /// Number of solve tasks joined; always the worker count.
    pub joined: usize,
    pub elapsed: Duration,
}

/// Runs workers against a wall-clock cutoff.
pub struct Scheduler<'a> {
    coordinator: &'a Coordinator,
    cutoff: Duration,
    poll: Duration,
}

/// Keeps the live task count and cancels the run if its task unwinds.
struct TaskGuard<'a> {
    live: &'a AtomicUsize,
    coordinator: &'a Coordinator,
}

impl Drop for TaskGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.coordinator.cancel(CancelCause::Fault);
        }
        self.live.fetch_sub(1, Ordering::AcqRel);
    }
}

impl<'a> Scheduler<'a> {
    pub fn new(coordinator: &'a Coordinator, cutoff: Duration, poll: Duration) -> Self {
        Self {
            coordinator,
            cutoff,
            poll: poll.max(Duration::from_millis(1)),
        }
    }

    pub fn cutoff(&self) -> Duration {
        self.cutoff
    }

    /// Solves with every worker until the run terminates.
    ///
    /// Engine errors cancel the other workers and the error of the lowest
    /// failing ordinal is returned once all tasks have been joined.
    pub fn run<E: Engine>(&self, workers: &mut [Worker<E>]) -> Result<ScheduleOutcome> {
        let stops: Vec<StopHandle> = workers.iter().map(|w| w.stop_handle().clone()).collect();
        self.coordinator.reset(&stops);
        for worker in workers.iter_mut() {
            worker.set_local_model(None);
        }

        let start = Instant::now();
        info!(
            event = "solve_start",
            workers = workers.len(),
            cutoff_secs = self.cutoff.as_secs_f64(),
            policy = ?self.coordinator.policy(),
            strength = ?self.coordinator.strength(),
        );

        let live = AtomicUsize::new(workers.len());
        let coordinator = self.coordinator;
        let results: Vec<Result<()>> = thread::scope(|s| {
            let handles: Vec<_> = workers
                .iter_mut()
                .map(|worker| {
                    let live = &live;
                    s.spawn(move || {
                        let _guard = TaskGuard { live, coordinator };
                        solve_task(worker, coordinator)
                    })
                })
                .collect();

            self.supervise(&live, start);

            handles
                .into_iter()
                .enumerate()
                .map(|(ordinal, handle)| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| Err(panic_fault(ordinal, payload)))
                })
                .collect()
        });
        let joined = results.len();
        self.coordinator.seal();

        results.into_iter().collect::<Result<Vec<()>>>()?;

        let snapshot = self.coordinator.snapshot();
        if let Some(conflict) = snapshot.conflict {
            return Err(SatfolioError::engine_fault(
                conflict.offered.worker,
                format!(
                    "reported {:?} but worker {} reported {:?}",
                    conflict.offered.status, conflict.held.worker, conflict.held.status
                ),
            ));
        }
        let result = match snapshot.winner {
            Some(winner) if winner.status == StepStatus::Satisfiable => {
                let model = workers[winner.worker].take_local_model().ok_or_else(|| {
                    SatfolioError::engine_fault(winner.worker, "winner has no model")
                })?;
                SolveResult::Satisfiable(model)
            }
            Some(_) => SolveResult::Unsatisfiable,
            None => SolveResult::Unknown,
        };

        let elapsed = start.elapsed();
        info!(
            event = "solve_end",
            result = result.status_name(),
            winner = ?snapshot.winner.map(|w| w.worker),
            cause = ?snapshot.cause,
            joined,
            duration_ms = elapsed.as_millis() as u64,
        );

        Ok(ScheduleOutcome {
            result,
            snapshot,
            joined,
            elapsed,
        })
    }

    fn supervise(&self, live: &AtomicUsize, start: Instant) {
        loop {
            let elapsed = start.elapsed();
            if elapsed < self.cutoff {
                thread::sleep(self.poll.min(self.cutoff - elapsed));
            }

            if self.coordinator.is_terminated() {
                self.coordinator.seal();
                return;
            }
            if live.load(Ordering::Acquire) == 0 {
                return;
            }
            if start.elapsed() >= self.cutoff {
                info!(
                    event = "cutoff_reached",
                    cutoff_secs = self.cutoff.as_secs_f64(),
                );
                self.coordinator.cancel(CancelCause::Timeout);
                return;
            }
        }
    }
}

fn solve_task<E: Engine>(worker: &mut Worker<E>, coordinator: &Coordinator) -> Result<()> {
    let ordinal = worker.ordinal();
    let mut steps = 0u64;
    while !coordinator.is_terminated() {
        let status = match worker.engine_mut().solve_step() {
            Ok(status) => status,
            Err(err) => {
                coordinator.cancel(CancelCause::Fault);
                return Err(err);
            }
        };
        steps += 1;
        if !status.is_definitive() {
            continue;
        }

        if status == StepStatus::Satisfiable {
            let Some(model) = worker.engine().extract_model() else {
                coordinator.cancel(CancelCause::Fault);
                return Err(SatfolioError::engine_fault(
                    ordinal,
                    "satisfiable step without a model",
                ));
            };
            worker.set_local_model(Some(model));
        }

        let priority = worker.engine().conflict_count();
        let accepted = coordinator.offer(ordinal, status, priority);
        debug!(
            event = "worker_concluded",
            worker = ordinal,
            status = ?status,
            priority,
            steps,
            accepted,
        );
        return Ok(());
    }
    Ok(())
}

#[cfg(test)]
mod tests;
