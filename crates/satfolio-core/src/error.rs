//! Error types for satfolio

use thiserror::Error;

/// Main error type for satfolio operations
#[derive(Debug, Error)]
pub enum SatfolioError {
    /// Invalid portfolio or engine configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// An option name that neither the portfolio nor the engine understands
    #[error("Unknown option: {0}")]
    UnknownOption(String),

    /// Malformed problem instance
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Reading the problem instance failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A sequential engine produced an invalid or contradictory result
    #[error("Engine fault in worker {worker}: {message}")]
    EngineFault { worker: usize, message: String },
}

impl SatfolioError {
    pub fn config(message: impl Into<String>) -> Self {
        SatfolioError::Config(message.into())
    }

    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        SatfolioError::Parse {
            line,
            message: message.into(),
        }
    }

    pub fn engine_fault(worker: usize, message: impl Into<String>) -> Self {
        SatfolioError::EngineFault {
            worker,
            message: message.into(),
        }
    }

    /// Returns true for errors that are reported before any worker starts.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SatfolioError::Config(_) | SatfolioError::UnknownOption(_)
        )
    }
}

/// Result type alias for satfolio operations
pub type Result<T> = std::result::Result<T, SatfolioError>;
