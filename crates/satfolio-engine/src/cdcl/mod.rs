//! A compact CDCL engine.
//!
//! Two watched literals, VSIDS with a binary heap, first-UIP learning with
//! local minimization, Luby restarts alternating between focused and stable
//! mode, LBD-tiered clause reduction, optional chronological backtracking,
//! target phases and an optional WalkSAT warm start.
//!
//! Every solve step runs at most `step_conflicts` conflicts, so the portfolio
//! scheduler regains control at a steady cadence.

mod clause;
mod heap;
mod search;
mod walk;

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use satfolio_core::{dimacs, Cnf, Lit, Model, Result, SatfolioError, Var};
use tracing::trace;

use crate::engine::{Engine, InputSource, StepStatus, StopHandle};
use crate::share::SharePort;

use clause::{CRef, ClauseDb, Watch};
use heap::{Activity, VarHeap};

/// Tunable options, set through [`Engine::configure`].
#[derive(Debug, Clone, PartialEq)]
pub struct CdclOptions {
    /// Seed for the initial variable order; 0 keeps index order.
    pub order_reset: u64,
    /// Learned clauses with LBD at most this value are never deleted.
    pub tier1: u32,
    pub chrono: bool,
    /// 0 focused only, 1 alternate, 2 stable only.
    pub stable: u8,
    pub walk_initially: bool,
    /// 0 off, 1 in stable mode, 2 always.
    pub target: u8,
    /// Initial saved phase.
    pub phase: bool,
    pub step_conflicts: u64,
    pub walk_flips: u64,
    /// Luby unit in focused mode, in conflicts.
    pub restart_interval: u64,
}

impl Default for CdclOptions {
    fn default() -> Self {
        Self {
            order_reset: 0,
            tier1: 2,
            chrono: true,
            stable: 1,
            walk_initially: false,
            target: 1,
            phase: true,
            step_conflicts: 1000,
            walk_flips: 100_000,
            restart_interval: 32,
        }
    }
}

/// Search counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CdclStats {
    pub conflicts: u64,
    pub decisions: u64,
    pub propagations: u64,
    pub restarts: u64,
    pub reductions: u64,
    pub exported: u64,
    pub imported: u64,
}

#[derive(Debug)]
struct SearchState {
    stable_mode: bool,
    restart_count: u32,
    conflicts_since_restart: u64,
    mode_interval: u64,
    next_mode_switch: u64,
    next_reduce: u64,
    reduce_inc: u64,
}

impl SearchState {
    fn new(options: &CdclOptions) -> Self {
        Self {
            stable_mode: options.stable == 2,
            restart_count: 0,
            conflicts_since_restart: 0,
            mode_interval: 1000,
            next_mode_switch: 1000,
            next_reduce: 2000,
            reduce_inc: 300,
        }
    }
}

/// The conflict-driven clause learning engine.
pub struct Cdcl {
    ordinal: usize,
    options: CdclOptions,
    stop: StopHandle,
    formula: Option<Arc<Cnf>>,
    num_vars: usize,

    db: ClauseDb,
    watches: Vec<Vec<Watch>>,
    assigns: Vec<i8>,
    level: Vec<u32>,
    reason: Vec<Option<CRef>>,
    trail: Vec<Lit>,
    trail_lim: Vec<usize>,
    qhead: usize,

    activity: Activity,
    heap: VarHeap,
    saved_phase: Vec<bool>,
    target_phase: Vec<bool>,
    target_len: usize,

    seen: Vec<bool>,
    level_stamp: Vec<u64>,
    stamp: u64,

    ok: bool,
    status: Option<StepStatus>,
    model: Option<Model>,
    walked: bool,
    rng: ChaCha8Rng,
    share: Option<SharePort>,
    search: SearchState,
    stats: CdclStats,
}

impl Cdcl {
    /// Creates an engine for the worker with the given ordinal.
    pub fn new(ordinal: usize) -> Self {
        let options = CdclOptions::default();
        Self {
            ordinal,
            search: SearchState::new(&options),
            options,
            stop: StopHandle::new(),
            formula: None,
            num_vars: 0,
            db: ClauseDb::default(),
            watches: Vec::new(),
            assigns: Vec::new(),
            level: Vec::new(),
            reason: Vec::new(),
            trail: Vec::new(),
            trail_lim: Vec::new(),
            qhead: 0,
            activity: Activity::default(),
            heap: VarHeap::default(),
            saved_phase: Vec::new(),
            target_phase: Vec::new(),
            target_len: 0,
            seen: Vec::new(),
            level_stamp: Vec::new(),
            stamp: 0,
            ok: true,
            status: None,
            model: None,
            walked: false,
            rng: ChaCha8Rng::seed_from_u64(0),
            share: None,
            stats: CdclStats::default(),
        }
    }

    pub fn options(&self) -> &CdclOptions {
        &self.options
    }

    pub fn stats(&self) -> CdclStats {
        self.stats
    }

    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    /// Loads a formula, discarding any previous search state.
    pub fn load(&mut self, formula: Arc<Cnf>) {
        let n = formula.num_vars();
        self.num_vars = n;
        self.db.clear();
        self.watches = vec![Vec::new(); 2 * n];
        self.assigns = vec![0; n];
        self.level = vec![0; n];
        self.reason = vec![None; n];
        self.trail.clear();
        self.trail_lim.clear();
        self.qhead = 0;

        self.activity.reserve(n);
        self.heap.reserve(n);
        self.saved_phase = vec![self.options.phase; n];
        self.target_phase = self.saved_phase.clone();
        self.target_len = 0;
        self.seen = vec![false; n];
        self.level_stamp = vec![0; n + 1];
        self.stamp = 0;

        self.ok = true;
        self.status = None;
        self.model = None;
        self.walked = false;
        self.stats = CdclStats::default();
        self.search = SearchState::new(&self.options);
        self.activity.decay = if self.search.stable_mode { 0.975 } else { 0.95 };

        self.rng = ChaCha8Rng::seed_from_u64(self.options.order_reset);
        if self.options.order_reset != 0 {
            for score in self.activity.scores.iter_mut() {
                *score = self.rng.random::<f64>() * 1e-3;
            }
        }
        for v in 0..n {
            self.heap.push(Var::new(v as u32), &self.activity.scores);
        }

        for clause in formula.clauses() {
            if !self.add_clause_at_root(clause, false) {
                break;
            }
        }
        trace!(
            event = "engine_loaded",
            worker = self.ordinal,
            vars = n,
            clauses = self.db.len(),
        );
        self.formula = Some(formula);
    }

    fn fault(&self, message: impl Into<String>) -> SatfolioError {
        SatfolioError::engine_fault(self.ordinal, message)
    }

    fn warm_start(&mut self) -> Option<Model> {
        let formula = self.formula.clone()?;
        let outcome = walk::walk(
            &formula,
            &self.saved_phase,
            self.options.walk_flips,
            &mut self.rng,
            &self.stop,
        );
        trace!(
            event = "walk_finished",
            worker = self.ordinal,
            unsatisfied = outcome.unsatisfied,
        );
        if outcome.unsatisfied == 0 {
            return Some(Model::new(outcome.assignment));
        }
        self.saved_phase = outcome.assignment;
        None
    }

    fn conclude_satisfiable(&mut self, model: Model) -> Result<StepStatus> {
        let verified = self
            .formula
            .as_ref()
            .is_some_and(|formula| formula.is_satisfied_by(&model));
        if !verified {
            return Err(self.fault("model does not satisfy the input formula"));
        }
        self.model = Some(model);
        self.status = Some(StepStatus::Satisfiable);
        Ok(StepStatus::Satisfiable)
    }
}

impl Default for Cdcl {
    fn default() -> Self {
        Self::new(0)
    }
}

fn finite(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(SatfolioError::config(format!(
            "option {} needs a non-negative number, got {}",
            name, value
        )))
    }
}

fn integral_in(name: &str, value: f64, min: f64, max: f64) -> Result<f64> {
    let value = finite(name, value)?;
    if value.fract() != 0.0 || value < min || value > max {
        return Err(SatfolioError::config(format!(
            "option {} must be an integer in {}..={}, got {}",
            name, min, max, value
        )));
    }
    Ok(value)
}

impl Engine for Cdcl {
    fn configure(&mut self, name: &str, value: f64) -> Result<()> {
        let options = &mut self.options;
        match name {
            "order_reset" => options.order_reset = finite(name, value)? as u64,
            "tier1" => options.tier1 = integral_in(name, value, 1.0, u32::MAX as f64)? as u32,
            "chrono" => options.chrono = finite(name, value)? != 0.0,
            "stable" => options.stable = integral_in(name, value, 0.0, 2.0)? as u8,
            "walkinitially" => options.walk_initially = finite(name, value)? != 0.0,
            "target" => options.target = integral_in(name, value, 0.0, 2.0)? as u8,
            "phase" => options.phase = finite(name, value)? != 0.0,
            "step_conflicts" => {
                options.step_conflicts = integral_in(name, value, 1.0, u64::MAX as f64)? as u64
            }
            "walk_flips" => options.walk_flips = finite(name, value)? as u64,
            "restart_interval" => {
                options.restart_interval = integral_in(name, value, 1.0, u64::MAX as f64)? as u64
            }
            _ => return Err(SatfolioError::UnknownOption(name.to_string())),
        }
        trace!(
            event = "engine_configured",
            worker = self.ordinal,
            option = name,
            value = value,
        );
        Ok(())
    }

    fn parse(&mut self, input: &InputSource) -> Result<()> {
        let formula = match input {
            InputSource::File(path) => Arc::new(dimacs::read_file(path)?),
            InputSource::Formula(cnf) => Arc::clone(cnf),
        };
        self.load(formula);
        Ok(())
    }

    fn solve_step(&mut self) -> Result<StepStatus> {
        if let Some(status) = self.status {
            return Ok(status);
        }
        if self.formula.is_none() {
            return Err(SatfolioError::config("solve_step called before parse"));
        }
        if self.stop.is_cooperative_stop_requested() {
            return Ok(StepStatus::Unfinished);
        }
        if !self.ok {
            self.status = Some(StepStatus::Unsatisfiable);
            return Ok(StepStatus::Unsatisfiable);
        }

        if self.options.walk_initially && !self.walked {
            self.walked = true;
            if let Some(model) = self.warm_start() {
                return self.conclude_satisfiable(model);
            }
        }

        let status = self.run_step()?;
        trace!(
            event = "engine_step",
            worker = self.ordinal,
            status = status.code(),
            conflicts = self.stats.conflicts,
            restarts = self.stats.restarts,
            learnt = self.db.num_learnt,
        );
        match status {
            StepStatus::Satisfiable => {
                let model = Model::new(self.assigns.iter().map(|&v| v > 0).collect());
                self.conclude_satisfiable(model)
            }
            StepStatus::Unsatisfiable => {
                self.status = Some(StepStatus::Unsatisfiable);
                Ok(StepStatus::Unsatisfiable)
            }
            StepStatus::Unfinished => Ok(StepStatus::Unfinished),
        }
    }

    fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    fn extract_model(&self) -> Option<Model> {
        self.model.clone()
    }

    fn conflict_count(&self) -> u64 {
        self.stats.conflicts
    }

    fn attach_sharing(&mut self, port: SharePort) {
        self.share = Some(port);
    }
}
