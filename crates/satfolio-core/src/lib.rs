//! satfolio core - shared types for portfolio SAT solving
//!
//! This crate provides the fundamental abstractions used across satfolio:
//! - Variables and literals in the DIMACS numbering scheme
//! - CNF formulas and satisfying models
//! - The run-level solve result
//! - DIMACS CNF reading and writing
//! - The error taxonomy shared by every crate

pub mod cnf;
pub mod dimacs;
pub mod error;
pub mod lit;
pub mod result;


pub use cnf::{Cnf, Model};
pub use error::{Result, SatfolioError};
pub use lit::{Lit, Var};
pub use result::SolveResult;
