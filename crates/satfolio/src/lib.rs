//! satfolio - a parallel portfolio SAT solver in Rust
//!
//! Runs several diversified CDCL engines on one instance and reports the
//! first definitive answer.
//!
//! # Example
//!
//! ```rust
//! use satfolio::prelude::*;
//!
//! let cnf = Cnf::from_dimacs_clauses(3, &[vec![1, -2], vec![2, 3], vec![-1, -3]]);
//! let config = PortfolioConfig::new().with_threads(2).with_cutoff_seconds(10.0);
//! let report = satfolio::solve(PortfolioInput::Formula(cnf.clone()), config).unwrap();
//! assert!(cnf.is_satisfied_by(report.result.model().unwrap()));
//! ```

use std::path::Path;

// Shared types
pub use satfolio_core::{dimacs, Cnf, Lit, Model, Result, SatfolioError, SolveResult, Var};

// Configuration
pub use satfolio_config::{ConfigError, OptionValue, PortfolioConfig};

// Engines
pub use satfolio_engine::{Cdcl, Engine, InputSource, StepStatus, StopHandle};

// Orchestration
pub use satfolio_solver::{
    CancelCause, Coordinator, Diversifier, Portfolio, PortfolioInput, RunReport, Winner,
    WinnerPolicy,
};

#[cfg(feature = "console")]
pub use satfolio_console::init as init_console;

pub mod cli;

/// Solves `input` with a portfolio of [`Cdcl`] engines.
pub fn solve(input: PortfolioInput, config: PortfolioConfig) -> Result<RunReport> {
    Portfolio::new(config, Cdcl::new).run(input)
}

/// Solves a DIMACS CNF file with a portfolio of [`Cdcl`] engines.
pub fn solve_file(path: impl AsRef<Path>, config: PortfolioConfig) -> Result<SolveResult> {
    let input = PortfolioInput::File(path.as_ref().to_path_buf());
    Ok(solve(input, config)?.result)
}

pub mod prelude {
    pub use super::{Cnf, Model, PortfolioConfig, PortfolioInput, SolveResult};
    pub use super::{solve, solve_file};
}
