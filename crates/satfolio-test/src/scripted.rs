//! A scripted engine for orchestration tests.
//!
//! # Example
//!
//! ```
//! use satfolio_engine::{Engine, StepStatus};
//! use satfolio_test::ScriptedEngine;
//!
//! let mut engine = ScriptedEngine::unsat_after(0, 2);
//! assert_eq!(engine.solve_step().unwrap(), StepStatus::Unfinished);
//! assert_eq!(engine.solve_step().unwrap(), StepStatus::Unfinished);
//! assert_eq!(engine.solve_step().unwrap(), StepStatus::Unsatisfiable);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use satfolio_core::{Model, Result, SatfolioError};
use satfolio_engine::{Engine, InputSource, SharePort, StepStatus, StopHandle};

/// Observations shared between a scripted engine and the test that owns it.
#[derive(Debug, Default)]
pub struct EngineProbe {
    configured: Mutex<Vec<(String, f64)>>,
    parses: AtomicUsize,
    steps: AtomicUsize,
    sharing_attached: AtomicUsize,
}

impl EngineProbe {
    /// Every `configure` call in order.
    pub fn configured(&self) -> Vec<(String, f64)> {
        self.configured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The last value configured for `name`.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.configured()
            .into_iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn parse_calls(&self) -> usize {
        self.parses.load(Ordering::SeqCst)
    }

    pub fn solve_calls(&self) -> usize {
        self.steps.load(Ordering::SeqCst)
    }

    pub fn sharing_attached(&self) -> bool {
        self.sharing_attached.load(Ordering::SeqCst) > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    None,
    Parse,
    Step,
    Panic,
}

/// An [`Engine`] that returns a fixed sequence of statuses.
///
/// Honours both stop flags: a cooperative stop skips the step, a forced stop
/// cuts the step delay short.
pub struct ScriptedEngine {
    ordinal: usize,
    script: Vec<StepStatus>,
    after_script: StepStatus,
    position: usize,
    step_delay: Duration,
    barrier: Option<Arc<Barrier>>,
    model: Option<Model>,
    priority: Option<u64>,
    rejected: Vec<String>,
    failure: Failure,
    failure_after: usize,
    concluded: Option<StepStatus>,
    stop: StopHandle,
    probe: Arc<EngineProbe>,
}

impl ScriptedEngine {
    /// An engine whose steps stay `Unfinished` forever.
    pub fn new(ordinal: usize) -> Self {
        Self {
            ordinal,
            script: Vec::new(),
            after_script: StepStatus::Unfinished,
            position: 0,
            step_delay: Duration::ZERO,
            barrier: None,
            model: None,
            priority: None,
            rejected: Vec::new(),
            failure: Failure::None,
            failure_after: 0,
            concluded: None,
            stop: StopHandle::new(),
            probe: Arc::new(EngineProbe::default()),
        }
    }

    /// Concludes `Satisfiable` with `model` after `steps` unfinished steps.
    pub fn sat_after(ordinal: usize, steps: usize, model: Model) -> Self {
        Self::new(ordinal)
            .finishing_with(StepStatus::Satisfiable, steps)
            .with_model(model)
    }

    /// Concludes `Unsatisfiable` after `steps` unfinished steps.
    pub fn unsat_after(ordinal: usize, steps: usize) -> Self {
        Self::new(ordinal).finishing_with(StepStatus::Unsatisfiable, steps)
    }

    /// Never concludes; each step sleeps `delay`.
    pub fn never_finishing(ordinal: usize, delay: Duration) -> Self {
        Self::new(ordinal).with_step_delay(delay)
    }

    pub fn with_script(mut self, script: Vec<StepStatus>) -> Self {
        self.script = script;
        self
    }

    /// `steps` unfinished steps, then `status` on every later step.
    pub fn finishing_with(mut self, status: StepStatus, steps: usize) -> Self {
        self.script = vec![StepStatus::Unfinished; steps];
        self.after_script = status;
        self
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    /// Waits on `barrier` at the start of the first step.
    pub fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    pub fn with_model(mut self, model: Model) -> Self {
        self.model = Some(model);
        self
    }

    /// Fixes the reported conflict count instead of counting steps.
    pub fn with_priority(mut self, priority: u64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Makes `configure(name, _)` fail with `UnknownOption`.
    pub fn rejecting(mut self, name: &str) -> Self {
        self.rejected.push(name.to_string());
        self
    }

    pub fn failing_parse(mut self) -> Self {
        self.failure = Failure::Parse;
        self
    }

    /// The step after `steps` successful steps returns an engine fault.
    pub fn failing_step(mut self, steps: usize) -> Self {
        self.failure = Failure::Step;
        self.failure_after = steps;
        self
    }

    /// The step after `steps` successful steps panics.
    pub fn panicking_step(mut self, steps: usize) -> Self {
        self.failure = Failure::Panic;
        self.failure_after = steps;
        self
    }

    /// Shared observations; clone before moving the engine into a worker.
    pub fn probe(&self) -> Arc<EngineProbe> {
        Arc::clone(&self.probe)
    }

    fn sleep_step(&self) {
        let slice = Duration::from_millis(1);
        let mut slept = Duration::ZERO;
        while slept < self.step_delay {
            if self.stop.is_forced_stop_requested() {
                return;
            }
            let nap = slice.min(self.step_delay - slept);
            thread::sleep(nap);
            slept += nap;
        }
    }
}

impl Engine for ScriptedEngine {
    fn configure(&mut self, name: &str, value: f64) -> Result<()> {
        if self.rejected.iter().any(|r| r == name) {
            return Err(SatfolioError::UnknownOption(name.to_string()));
        }
        self.probe
            .configured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.to_string(), value));
        Ok(())
    }

    fn parse(&mut self, _input: &InputSource) -> Result<()> {
        self.probe.parses.fetch_add(1, Ordering::SeqCst);
        if self.failure == Failure::Parse {
            return Err(SatfolioError::parse(1, "scripted parse failure"));
        }
        Ok(())
    }

    fn solve_step(&mut self) -> Result<StepStatus> {
        self.probe.steps.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.concluded {
            return Ok(status);
        }
        if let Some(barrier) = self.barrier.take() {
            barrier.wait();
        }
        if self.stop.is_cooperative_stop_requested() {
            return Ok(StepStatus::Unfinished);
        }
        self.sleep_step();

        if self.position == self.failure_after {
            match self.failure {
                Failure::Step => {
                    return Err(SatfolioError::engine_fault(
                        self.ordinal,
                        "scripted step failure",
                    ))
                }
                Failure::Panic => panic!("scripted panic in worker {}", self.ordinal),
                Failure::None | Failure::Parse => {}
            }
        }

        let status = self
            .script
            .get(self.position)
            .copied()
            .unwrap_or(self.after_script);
        self.position += 1;
        if status.is_definitive() {
            self.concluded = Some(status);
        }
        Ok(status)
    }

    fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    fn extract_model(&self) -> Option<Model> {
        match self.concluded {
            Some(StepStatus::Satisfiable) => self.model.clone(),
            _ => None,
        }
    }

    fn conflict_count(&self) -> u64 {
        self.priority.unwrap_or(self.position as u64)
    }

    fn attach_sharing(&mut self, _port: SharePort) {
        self.probe.sharing_attached.fetch_add(1, Ordering::SeqCst);
    }
}
