//! Termination and winner coordination.
//!
//! A [`Coordinator`] owns the run's termination state. Workers offer
//! definitive results; the first accepted offer sets `terminated`, and the
//! winner fields are written before that flag is published.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use satfolio_engine::{StepStatus, StopHandle};
use tracing::{info, warn};

/// How competing definitive results are ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinnerPolicy {
    /// The first definitive offer wins and cancels everyone else.
    FirstToFinish,
    /// The lowest priority wins; cancellation waits for the supervisor.
    PriorityWeighted,
}

/// How cancellation reaches running engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelStrength {
    /// Honoured at the start of the next step.
    Cooperative,
    /// Also interrupts a step in progress.
    Forced,
}

/// Why a run was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelCause {
    Concluded,
    Timeout,
    Fault,
}

impl fmt::Display for CancelCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelCause::Concluded => write!(f, "concluded"),
            CancelCause::Timeout => write!(f, "timeout"),
            CancelCause::Fault => write!(f, "fault"),
        }
    }
}

/// The accepted result of one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Winner {
    pub worker: usize,
    pub status: StepStatus,
    pub priority: u64,
}

/// Two workers that reported opposite definitive results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict {
    /// The worker holding the winning slot at the time.
    pub held: Winner,
    /// The contradicting offer.
    pub offered: Winner,
}

/// A consistent copy of the termination state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationSnapshot {
    pub terminated: bool,
    pub winner: Option<Winner>,
    pub cancelled: bool,
    pub cause: Option<CancelCause>,
    pub conflict: Option<Conflict>,
}

#[derive(Debug, Default)]
struct State {
    winner: Option<Winner>,
    sealed: bool,
    cancelled: bool,
    cause: Option<CancelCause>,
    conflict: Option<Conflict>,
    stops: Vec<StopHandle>,
}

/// Race-safe winner selection and cancellation broadcast.
#[derive(Debug)]
pub struct Coordinator {
    policy: WinnerPolicy,
    strength: CancelStrength,
    terminated: AtomicBool,
    state: Mutex<State>,
}

impl Coordinator {
    pub fn new(policy: WinnerPolicy, strength: CancelStrength) -> Self {
        Self {
            policy,
            strength,
            terminated: AtomicBool::new(false),
            state: Mutex::new(State::default()),
        }
    }

    /// Derives policy and strength from the portfolio switches.
    ///
    /// `dce` selects the priority-weighted policy; cancellation is forced only
    /// when clause sharing is on as well.
    pub fn from_switches(clause_sharing: bool, dce: bool) -> Self {
        let policy = if dce {
            WinnerPolicy::PriorityWeighted
        } else {
            WinnerPolicy::FirstToFinish
        };
        let strength = if clause_sharing && dce {
            CancelStrength::Forced
        } else {
            CancelStrength::Cooperative
        };
        Self::new(policy, strength)
    }

    pub fn policy(&self) -> WinnerPolicy {
        self.policy
    }

    pub fn strength(&self) -> CancelStrength {
        self.strength
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clears the state for a new run and registers the workers' stop handles.
    pub fn reset(&self, stops: &[StopHandle]) {
        let mut state = self.lock();
        for stop in stops {
            stop.reset();
        }
        *state = State {
            stops: stops.to_vec(),
            ..State::default()
        };
        self.terminated.store(false, Ordering::Release);
    }

    /// Offers a definitive result. Returns true if it became the winner.
    ///
    /// Offers are rejected once the coordinator is sealed or cancelled, and
    /// `Unfinished` is never accepted. Under the priority-weighted policy an
    /// offer whose status contradicts the current winner records a
    /// [`Conflict`] and cancels the run as a fault.
    pub fn offer(&self, worker: usize, status: StepStatus, priority: u64) -> bool {
        if !status.is_definitive() {
            return false;
        }
        let mut state = self.lock();
        if state.sealed || state.cancelled {
            return false;
        }
        let offered = Winner {
            worker,
            status,
            priority,
        };
        if let Some(held) = state.winner.filter(|held| held.status != status) {
            warn!(
                event = "result_conflict",
                held = held.worker,
                held_status = ?held.status,
                offered = worker,
                offered_status = ?status,
            );
            state.conflict = Some(Conflict { held, offered });
            state.sealed = true;
            self.terminated.store(true, Ordering::Release);
            self.broadcast(&mut state, CancelCause::Fault);
            return false;
        }

        let accepted = match (self.policy, state.winner) {
            (WinnerPolicy::FirstToFinish, Some(_)) => false,
            (WinnerPolicy::FirstToFinish, None) => true,
            (WinnerPolicy::PriorityWeighted, Some(current)) => priority < current.priority,
            (WinnerPolicy::PriorityWeighted, None) => true,
        };
        if !accepted {
            return false;
        }

        let replaced = state.winner.map(|w| w.worker);
        state.winner = Some(offered);
        self.terminated.store(true, Ordering::Release);
        info!(
            event = "winner_recorded",
            worker,
            status = ?status,
            priority,
            replaced = ?replaced,
        );

        if self.policy == WinnerPolicy::FirstToFinish {
            state.sealed = true;
            self.broadcast(&mut state, CancelCause::Concluded);
        }
        true
    }

    /// Stops accepting offers and cancels the workers if a winner exists.
    ///
    /// Returns true if this call broadcast the cancellation.
    pub fn seal(&self) -> bool {
        let mut state = self.lock();
        state.sealed = true;
        if state.winner.is_some() && !state.cancelled {
            self.broadcast(&mut state, CancelCause::Concluded);
            return true;
        }
        false
    }

    /// Terminates the run without a winner update.
    ///
    /// Returns false if the run was already cancelled.
    pub fn cancel(&self, cause: CancelCause) -> bool {
        let mut state = self.lock();
        state.sealed = true;
        if state.cancelled {
            return false;
        }
        self.terminated.store(true, Ordering::Release);
        self.broadcast(&mut state, cause);
        true
    }

    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> TerminationSnapshot {
        let state = self.lock();
        TerminationSnapshot {
            terminated: self.is_terminated(),
            winner: state.winner,
            cancelled: state.cancelled,
            cause: state.cause,
            conflict: state.conflict,
        }
    }

    fn broadcast(&self, state: &mut State, cause: CancelCause) {
        state.cancelled = true;
        state.cause = Some(cause);
        for stop in &state.stops {
            match self.strength {
                CancelStrength::Cooperative => stop.request_cooperative_stop(),
                CancelStrength::Forced => stop.request_forced_stop(),
            }
        }
        info!(
            event = "cancel_broadcast",
            cause = %cause,
            strength = ?self.strength,
            workers = state.stops.len(),
        );
    }
}

#[cfg(test)]
mod tests;
