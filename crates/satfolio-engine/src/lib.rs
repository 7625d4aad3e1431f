//! Sequential solving engines for satfolio.
//!
//! This crate provides:
//! - [`Engine`]: the capability interface every portfolio worker drives
//! - [`Cdcl`]: a compact conflict-driven clause learning engine
//! - [`Preprocessor`]: formula simplification with model reconstruction
//! - [`ClauseExchange`]: background forwarding of short learned clauses

pub mod cdcl;
pub mod engine;
pub mod preprocess;
pub mod share;

pub use cdcl::Cdcl;
pub use engine::{Engine, InputSource, StepStatus, StopHandle};
pub use preprocess::{
    PreprocessArtifact, PreprocessLimits, PreprocessOutcome, Preprocessor, ReconstructStep,
};
pub use share::{ClauseExchange, ExchangeHandle, SharePort};
