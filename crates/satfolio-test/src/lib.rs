//! Shared test fixtures for satfolio crates.
//!
//! This crate provides instance generators and a scripted engine for
//! testing orchestration without real search.
//!
//! - [`instances`] - small CNF families with known answers
//! - [`scripted`] - an [`Engine`](satfolio_engine::Engine) that follows a script
//! - [`timeout`] - a diagnostic timeout for concurrency tests
//!
//! # Usage
//!
//! Add as a dev-dependency in your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! satfolio-test = { workspace = true }
//! ```
//!
//! Then import the fixtures you need:
//!
//! ```ignore
//! use satfolio_test::instances::pigeonhole;
//! use satfolio_test::scripted::ScriptedEngine;
//! ```

pub mod instances;
pub mod scripted;
pub mod timeout;

pub use scripted::{EngineProbe, ScriptedEngine};
pub use timeout::within;
