//! Worker lifecycle: creation, option application and parallel parsing.

use std::collections::BTreeMap;
use std::time::Instant;

use satfolio_config::OptionValue;
use satfolio_core::{Model, Result, SatfolioError};
use satfolio_engine::{Engine, InputSource, StopHandle};
use tracing::info;

use crate::task;

/// One portfolio member: an engine plus the state the portfolio keeps for it.
pub struct Worker<E> {
    ordinal: usize,
    engine: E,
    stop: StopHandle,
    local_model: Option<Model>,
    settings: Vec<(String, f64)>,
}

impl<E: Engine> Worker<E> {
    pub fn new(ordinal: usize, engine: E) -> Self {
        let stop = engine.stop_handle();
        Self {
            ordinal,
            engine,
            stop,
            local_model: None,
            settings: Vec::new(),
        }
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn stop_handle(&self) -> &StopHandle {
        &self.stop
    }

    /// Settings applied so far, in application order.
    pub fn settings(&self) -> &[(String, f64)] {
        &self.settings
    }

    /// Forwards one option to the engine and records it.
    pub fn configure(&mut self, name: &str, value: f64) -> Result<()> {
        self.engine.configure(name, value)?;
        self.settings.push((name.to_string(), value));
        Ok(())
    }

    pub fn local_model(&self) -> Option<&Model> {
        self.local_model.as_ref()
    }

    pub(crate) fn set_local_model(&mut self, model: Option<Model>) {
        self.local_model = model;
    }

    pub fn take_local_model(&mut self) -> Option<Model> {
        self.local_model.take()
    }
}

/// Creates `n` workers with ordinals `0..n`, building each engine with
/// `factory(ordinal)`.
pub fn create_workers<E, F>(n: usize, factory: F) -> Result<Vec<Worker<E>>>
where
    E: Engine,
    F: Fn(usize) -> E,
{
    if n == 0 {
        return Err(SatfolioError::config("a portfolio needs at least one worker"));
    }
    Ok((0..n).map(|ordinal| Worker::new(ordinal, factory(ordinal))).collect())
}

/// Forwards user engine options to every worker.
pub fn apply_engine_options<E: Engine>(
    workers: &mut [Worker<E>],
    options: &BTreeMap<String, OptionValue>,
) -> Result<()> {
    for (name, value) in options {
        let numeric = value.as_f64().ok_or_else(|| {
            SatfolioError::config(format!("engine option {} needs a number, got {}", name, value))
        })?;
        for worker in workers.iter_mut() {
            worker.configure(name, numeric)?;
        }
    }
    Ok(())
}

/// Parses `input` into every worker in parallel.
///
/// Blocks until every parse finished; the first failure by ordinal is
/// returned.
pub fn parse_inputs<E: Engine>(workers: &mut [Worker<E>], input: &InputSource) -> Result<()> {
    let start = Instant::now();
    task::run_all(workers, |_, worker| worker.engine_mut().parse(input))?;
    info!(
        event = "workers_parsed",
        workers = workers.len(),
        input = %input,
        duration_ms = start.elapsed().as_millis() as u64,
    );
    Ok(())
}
