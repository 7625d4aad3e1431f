//! Command-line surface of the `satfolio` binary.

use std::path::PathBuf;

use clap::Parser;
use satfolio_config::PortfolioConfig;
use satfolio_core::{Result, SolveResult};

/// Parallel portfolio SAT solver
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Cli {
    /// portfolio configuration file (TOML, or YAML by extension)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// problem file in DIMACS CNF format
    pub problem: PathBuf,

    /// portfolio and engine options, each as --name=value
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub options: Vec<String>,
}

impl Cli {
    /// The configuration file (if any) with the command-line options applied.
    pub fn portfolio_config(&self) -> Result<PortfolioConfig> {
        let mut config = match &self.config {
            Some(path) => PortfolioConfig::load(path)?,
            None => PortfolioConfig::default(),
        };
        config.apply_args(&self.options)?;
        Ok(config)
    }

    pub fn run(&self) -> Result<SolveResult> {
        let config = self.portfolio_config()?;
        crate::solve_file(&self.problem, config)
    }
}
