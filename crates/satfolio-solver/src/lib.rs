//! satfolio portfolio orchestration
//!
//! This crate runs several diversified sequential engines over one instance
//! and returns the first definitive answer:
//! - Worker lifecycle: creation, option application, parallel parsing
//! - Diversification by worker ordinal
//! - Race-safe termination and winner selection
//! - The timed parallel solve loop
//! - Preprocessing and model reconstruction
//! - The top-level [`Portfolio`] run flow

pub mod diversify;
pub mod portfolio;
pub mod remap;
pub mod scheduler;
pub mod task;
pub mod termination;
pub mod worker;

pub use diversify::{diversify, DiversificationTable, Diversifier};
pub use portfolio::{Portfolio, PortfolioInput, RunReport};
pub use remap::{preprocess, reconstruct};
pub use scheduler::{run_portfolio, ScheduleOutcome, Scheduler};
pub use termination::{
    CancelCause, CancelStrength, Conflict, Coordinator, TerminationSnapshot, Winner,
    WinnerPolicy,
};
pub use worker::{apply_engine_options, create_workers, parse_inputs, Worker};
