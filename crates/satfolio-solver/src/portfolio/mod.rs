//! The top-level portfolio run.

use std::fmt;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use satfolio_config::PortfolioConfig;
use satfolio_core::{dimacs, Cnf, Result, SatfolioError, SolveResult};
use satfolio_engine::{ClauseExchange, Engine, InputSource, PreprocessOutcome};
use tracing::info;

use crate::diversify::{diversify, Diversifier};
use crate::remap::{preprocess, reconstruct};
use crate::scheduler::Scheduler;
use crate::termination::{CancelCause, Coordinator, Winner};
use crate::worker::{apply_engine_options, create_workers, parse_inputs};

/// The problem a portfolio run solves.
#[derive(Debug, Clone)]
pub enum PortfolioInput {
    /// A DIMACS CNF file.
    File(PathBuf),
    Formula(Cnf),
}

impl fmt::Display for PortfolioInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortfolioInput::File(path) => write!(f, "{}", path.display()),
            PortfolioInput::Formula(cnf) => write!(
                f,
                "<formula {} vars, {} clauses>",
                cnf.num_vars(),
                cnf.num_clauses()
            ),
        }
    }
}

impl From<PathBuf> for PortfolioInput {
    fn from(path: PathBuf) -> Self {
        PortfolioInput::File(path)
    }
}

impl From<Cnf> for PortfolioInput {
    fn from(cnf: Cnf) -> Self {
        PortfolioInput::Formula(cnf)
    }
}

/// Summary of one portfolio run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub result: SolveResult,
    /// The accepted worker result; `None` when preprocessing decided the
    /// instance or the cutoff expired.
    pub winner: Option<Winner>,
    pub terminated: bool,
    pub cause: Option<CancelCause>,
    /// Solve tasks joined; 0 when no solve task was started.
    pub solve_tasks_joined: usize,
    pub preprocessed: bool,
    pub elapsed: Duration,
}

impl RunReport {
    fn decided(result: SolveResult, start: Instant) -> Self {
        Self {
            result,
            winner: None,
            terminated: false,
            cause: None,
            solve_tasks_joined: 0,
            preprocessed: true,
            elapsed: start.elapsed(),
        }
    }
}

/// A parallel portfolio of diversified engines.
///
/// # Example
///
/// ```
/// use satfolio_config::PortfolioConfig;
/// use satfolio_core::{Cnf, SolveResult};
/// use satfolio_engine::Cdcl;
/// use satfolio_solver::{Portfolio, PortfolioInput};
///
/// let cnf = Cnf::from_dimacs_clauses(2, &[vec![1, 2], vec![-1, 2], vec![1, -2]]);
/// let config = PortfolioConfig::new().with_threads(2).with_cutoff_seconds(10.0);
/// let report = Portfolio::new(config, Cdcl::new)
///     .run(PortfolioInput::Formula(cnf.clone()))
///     .unwrap();
///
/// match report.result {
///     SolveResult::Satisfiable(model) => assert!(cnf.is_satisfied_by(&model)),
///     other => panic!("unexpected {other:?}"),
/// }
/// ```
pub struct Portfolio<E, F> {
    config: PortfolioConfig,
    factory: F,
    _engine: PhantomData<fn() -> E>,
}

impl<E, F> Portfolio<E, F>
where
    E: Engine,
    F: Fn(usize) -> E,
{
    /// `factory(ordinal)` builds the engine of each worker.
    pub fn new(config: PortfolioConfig, factory: F) -> Self {
        Self {
            config,
            factory,
            _engine: PhantomData,
        }
    }

    pub fn config(&self) -> &PortfolioConfig {
        &self.config
    }

    /// Solves `input` and returns once every worker task has stopped.
    pub fn run(&self, input: PortfolioInput) -> Result<RunReport> {
        let start = Instant::now();
        let config = &self.config;
        config.validate()?;

        info!(
            event = "portfolio_start",
            input = %input,
            threads = config.threads,
            cutoff_secs = config.cutoff_seconds,
            preprocessor = config.preprocessor,
            clause_sharing = config.clause_sharing,
            dce = config.dce,
        );

        let mut workers = create_workers(config.threads, &self.factory)?;
        diversify(&mut workers, &Diversifier::from_config(&config.diversification)?)?;
        apply_engine_options(&mut workers, &config.engine)?;

        let (source, restore) = if config.preprocessor {
            let original = match input {
                PortfolioInput::File(path) => dimacs::read_file(&path)?,
                PortfolioInput::Formula(cnf) => cnf,
            };
            match preprocess(&original, &config.preprocess)? {
                PreprocessOutcome::Unsatisfiable => {
                    return Ok(RunReport::decided(SolveResult::Unsatisfiable, start));
                }
                PreprocessOutcome::Satisfiable(model) => {
                    return Ok(RunReport::decided(SolveResult::Satisfiable(model), start));
                }
                PreprocessOutcome::Reduced { formula, artifact } => (
                    InputSource::Formula(Arc::new(formula)),
                    Some((original, artifact)),
                ),
            }
        } else {
            let source = match input {
                PortfolioInput::File(path) => InputSource::File(path),
                PortfolioInput::Formula(cnf) => InputSource::Formula(Arc::new(cnf)),
            };
            (source, None)
        };

        parse_inputs(&mut workers, &source)?;
        drop(source);

        let exchange = if config.clause_sharing {
            let (exchange, ports) =
                ClauseExchange::new(workers.len(), config.sharing.max_clause_len);
            for (worker, port) in workers.iter_mut().zip(ports) {
                worker.engine_mut().attach_sharing(port);
            }
            Some(exchange.start(config.sharing.interval())?)
        } else {
            None
        };

        let coordinator = Coordinator::from_switches(config.clause_sharing, config.dce);
        let scheduled = Scheduler::new(&coordinator, config.cutoff(), config.poll_interval())
            .run(&mut workers);
        if let Some(exchange) = exchange {
            exchange.stop();
        }
        let outcome = scheduled?;

        let result = match (outcome.result, &restore) {
            (SolveResult::Satisfiable(reduced), Some((original, artifact))) => {
                let model = reconstruct(&reduced, artifact);
                if !original.is_satisfied_by(&model) {
                    let worker = outcome.snapshot.winner.map_or(0, |w| w.worker);
                    return Err(SatfolioError::engine_fault(
                        worker,
                        "reconstructed model does not satisfy the input formula",
                    ));
                }
                SolveResult::Satisfiable(model)
            }
            (result, _) => result,
        };

        Ok(RunReport {
            result,
            winner: outcome.snapshot.winner,
            terminated: outcome.snapshot.terminated,
            cause: outcome.snapshot.cause,
            solve_tasks_joined: outcome.joined,
            preprocessed: restore.is_some(),
            elapsed: start.elapsed(),
        })
    }
}
