//! Run-level solve result.

use std::fmt;

use crate::cnf::Model;

/// Outcome of one portfolio run.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolveResult {
    /// A witness assignment over the original variables.
    Satisfiable(Model),
    Unsatisfiable,
    /// No definitive answer before the cutoff.
    Unknown,
}

impl SolveResult {
    /// SAT competition exit code: 10, 20, or 0.
    pub fn exit_code(&self) -> u8 {
        match self {
            SolveResult::Satisfiable(_) => 10,
            SolveResult::Unsatisfiable => 20,
            SolveResult::Unknown => 0,
        }
    }

    pub fn is_definitive(&self) -> bool {
        !matches!(self, SolveResult::Unknown)
    }

    pub fn model(&self) -> Option<&Model> {
        match self {
            SolveResult::Satisfiable(model) => Some(model),
            _ => None,
        }
    }

    pub fn status_name(&self) -> &'static str {
        match self {
            SolveResult::Satisfiable(_) => "SATISFIABLE",
            SolveResult::Unsatisfiable => "UNSATISFIABLE",
            SolveResult::Unknown => "UNKNOWN",
        }
    }
}

/// Formats the status line, followed by the model line when satisfiable.
impl fmt::Display for SolveResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s {}", self.status_name())?;
        if let SolveResult::Satisfiable(model) = self {
            write!(f, "\n{}", model)?;
        }
        Ok(())
    }
}
