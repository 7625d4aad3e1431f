//! The engine capability interface.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use satfolio_core::{Cnf, Model, Result};

use crate::share::SharePort;

/// Outcome of one bounded solving step.
///
/// The discriminants are the competition exit codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StepStatus {
    Unfinished = 0,
    Satisfiable = 10,
    Unsatisfiable = 20,
}

impl StepStatus {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(StepStatus::Unfinished),
            10 => Some(StepStatus::Satisfiable),
            20 => Some(StepStatus::Unsatisfiable),
            _ => None,
        }
    }

    /// Returns true for `Satisfiable` and `Unsatisfiable`.
    pub fn is_definitive(self) -> bool {
        self != StepStatus::Unfinished
    }
}

/// Where an engine reads its problem from.
#[derive(Clone, Debug)]
pub enum InputSource {
    /// A DIMACS CNF file on disk.
    File(PathBuf),
    /// A formula already in memory, shared between workers.
    Formula(Arc<Cnf>),
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::File(path) => write!(f, "{}", path.display()),
            InputSource::Formula(cnf) => write!(
                f,
                "<formula {} vars, {} clauses>",
                cnf.num_vars(),
                cnf.num_clauses()
            ),
        }
    }
}

/// Stop flags shared between an engine and whoever coordinates it.
///
/// A cooperative stop is honoured at the start of the next
/// [`Engine::solve_step`]. A forced stop is polled inside a running step and
/// also implies a cooperative stop. Requests are idempotent.
#[derive(Clone, Debug, Default)]
pub struct StopHandle {
    cooperative: Arc<AtomicBool>,
    forced: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_cooperative_stop(&self) {
        self.cooperative.store(true, Ordering::Release);
    }

    pub fn request_forced_stop(&self) {
        self.cooperative.store(true, Ordering::Release);
        self.forced.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cooperative_stop_requested(&self) -> bool {
        self.cooperative.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_forced_stop_requested(&self) -> bool {
        self.forced.load(Ordering::Acquire)
    }

    /// Clears both flags before a new run.
    pub fn reset(&self) {
        self.cooperative.store(false, Ordering::Release);
        self.forced.store(false, Ordering::Release);
    }
}

/// A sequential solving engine driven by one portfolio worker.
///
/// Calls arrive in the order `configure*`, `parse`, `attach_sharing?`,
/// `solve_step*`, `extract_model`. An engine is moved into its worker's
/// thread for solving, hence `Send`.
pub trait Engine: Send {
    /// Sets one numeric option. Unknown names are `UnknownOption` errors.
    fn configure(&mut self, name: &str, value: f64) -> Result<()>;

    /// Loads the problem instance.
    fn parse(&mut self, input: &InputSource) -> Result<()>;

    /// Runs one bounded slice of search.
    ///
    /// Once a definitive status has been returned, later calls return it
    /// again without further work.
    fn solve_step(&mut self) -> Result<StepStatus>;

    /// Returns the handle used to stop this engine from another thread.
    fn stop_handle(&self) -> StopHandle;

    /// The satisfying assignment after a `Satisfiable` step.
    fn extract_model(&self) -> Option<Model>;

    /// Conflicts encountered so far; the winner priority under DCE.
    fn conflict_count(&self) -> u64;

    /// Connects the engine to a clause exchange. Engines that do not share
    /// clauses ignore the port.
    fn attach_sharing(&mut self, port: SharePort) {
        let _ = port;
    }
}

impl<E: Engine + ?Sized> Engine for Box<E> {
    fn configure(&mut self, name: &str, value: f64) -> Result<()> {
        (**self).configure(name, value)
    }

    fn parse(&mut self, input: &InputSource) -> Result<()> {
        (**self).parse(input)
    }

    fn solve_step(&mut self) -> Result<StepStatus> {
        (**self).solve_step()
    }

    fn stop_handle(&self) -> StopHandle {
        (**self).stop_handle()
    }

    fn extract_model(&self) -> Option<Model> {
        (**self).extract_model()
    }

    fn conflict_count(&self) -> u64 {
        (**self).conflict_count()
    }

    fn attach_sharing(&mut self, port: SharePort) {
        (**self).attach_sharing(port)
    }
}
