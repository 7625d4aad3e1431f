//! Configuration system for satfolio.
//!
//! Load portfolio configuration from TOML or YAML files, then refine it with
//! `--name=value` command-line overrides.
//!
//! # Examples
//!
//! Load configuration from a TOML string:
//!
//! ```
//! use satfolio_config::PortfolioConfig;
//! use std::time::Duration;
//!
//! let config = PortfolioConfig::from_toml_str(r#"
//!     threads = 8
//!     cutoff_seconds = 30
//!     clause_sharing = true
//!
//!     [diversification]
//!     shuffle = true
//!     pakis = false
//!
//!     [engine]
//!     step_conflicts = 2000
//! "#).unwrap();
//!
//! assert_eq!(config.threads, 8);
//! assert_eq!(config.cutoff(), Duration::from_secs(30));
//! assert!(!config.diversification.pakis);
//! ```
//!
//! Apply command-line style overrides:
//!
//! ```
//! use satfolio_config::{OptionValue, PortfolioConfig};
//!
//! let mut config = PortfolioConfig::default();
//! config.apply_args(["--nThreads=4", "--DCE=1", "--seed=7"]).unwrap();
//!
//! assert_eq!(config.threads, 4);
//! assert!(config.dce);
//! assert_eq!(config.engine.get("seed"), Some(&OptionValue::Int(7)));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use satfolio_core::SatfolioError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unknown option: {0}")]
    UnknownOption(String),
}

impl From<ConfigError> for SatfolioError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnknownOption(name) => SatfolioError::UnknownOption(name),
            other => SatfolioError::Config(other.to_string()),
        }
    }
}

/// Main portfolio configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct PortfolioConfig {
    /// Number of workers (one OS thread each).
    pub threads: usize,

    /// Wall-clock cutoff in seconds.
    ///
    /// Measured from the start of the parallel solve; preprocessing and
    /// parsing happen before the clock starts and are not counted.
    pub cutoff_seconds: f64,

    /// Run the preprocessor before handing the instance to the workers.
    pub preprocessor: bool,

    /// Exchange short learned clauses between workers.
    pub clause_sharing: bool,

    /// Duplicate-elimination mode: selects the priority-weighted winner policy.
    pub dce: bool,

    /// Supervisor cadence for cutoff checks, in milliseconds.
    pub poll_interval_ms: u64,

    /// Per-ordinal engine diversification.
    pub diversification: DiversificationConfig,

    /// Clause exchange settings.
    pub sharing: SharingConfig,

    /// Preprocessor limits.
    pub preprocess: PreprocessConfig,

    /// Engine options applied to every worker after diversification.
    pub engine: BTreeMap<String, OptionValue>,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            threads: 8,
            cutoff_seconds: 5000.0,
            preprocessor: true,
            clause_sharing: false,
            dce: false,
            poll_interval_ms: 100,
            diversification: DiversificationConfig::default(),
            sharing: SharingConfig::default(),
            preprocess: PreprocessConfig::default(),
            engine: BTreeMap::new(),
        }
    }
}

impl PortfolioConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist or contains invalid TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_cutoff_seconds(mut self, seconds: f64) -> Self {
        self.cutoff_seconds = seconds;
        self
    }

    pub fn with_preprocessor(mut self, enabled: bool) -> Self {
        self.preprocessor = enabled;
        self
    }

    pub fn with_clause_sharing(mut self, enabled: bool) -> Self {
        self.clause_sharing = enabled;
        self
    }

    pub fn with_dce(mut self, enabled: bool) -> Self {
        self.dce = enabled;
        self
    }

    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Adds an engine option forwarded to every worker.
    pub fn with_engine_option(mut self, name: impl Into<String>, value: OptionValue) -> Self {
        self.engine.insert(name.into(), value);
        self
    }

    /// Returns the cutoff as a `Duration`.
    ///
    /// Call [`validate`](Self::validate) first; invalid values map to zero.
    pub fn cutoff(&self) -> Duration {
        Duration::try_from_secs_f64(self.cutoff_seconds).unwrap_or_default()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::Invalid(
                "threads must be at least 1".to_string(),
            ));
        }
        if !self.cutoff_seconds.is_finite() || self.cutoff_seconds <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "cutoff_seconds must be a positive number, got {}",
                self.cutoff_seconds
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.sharing.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "sharing.interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Applies one `name=value` override.
    ///
    /// Names the portfolio knows are type checked. Every other name is kept as
    /// an engine option, parsed as integer, then float, else string.
    pub fn apply_override(&mut self, name: &str, raw: &str) -> Result<(), ConfigError> {
        match name {
            "threads" | "nThreads" => self.threads = parse_number(name, raw)?,
            "cutoff" | "cutoff_seconds" => self.cutoff_seconds = parse_number(name, raw)?,
            "preprocessor" => self.preprocessor = parse_bool(name, raw)?,
            "clause_sharing" => self.clause_sharing = parse_bool(name, raw)?,
            "dce" | "DCE" => self.dce = parse_bool(name, raw)?,
            "shuffle" => self.diversification.shuffle = parse_bool(name, raw)?,
            "pakis" => self.diversification.pakis = parse_bool(name, raw)?,
            "poll_interval_ms" => self.poll_interval_ms = parse_number(name, raw)?,
            "share_interval_ms" | "share_intv" => {
                self.sharing.interval_ms = parse_number(name, raw)?
            }
            "share_lits" | "share_max_len" => {
                self.sharing.max_clause_len = parse_number(name, raw)?
            }
            "preprocess_rounds" => self.preprocess.rounds = parse_number(name, raw)?,
            "" => return Err(ConfigError::UnknownOption(raw.to_string())),
            _ => {
                self.engine
                    .insert(name.to_string(), OptionValue::parse(raw));
            }
        }
        Ok(())
    }

    /// Applies `--name=value` arguments in order; a bare `--name` means `--name=1`.
    pub fn apply_args<I, A>(&mut self, args: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = A>,
        A: AsRef<str>,
    {
        for arg in args {
            let arg = arg.as_ref();
            let Some(body) = arg.strip_prefix("--") else {
                return Err(ConfigError::Invalid(format!(
                    "expected --name=value, got `{}`",
                    arg
                )));
            };
            match body.split_once('=') {
                Some((name, raw)) => self.apply_override(name, raw)?,
                None => self.apply_override(body, "1")?,
            }
        }
        Ok(())
    }
}

/// Diversification switches and an optional replacement table.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct DiversificationConfig {
    /// Give every worker but the first its own search-order seed.
    pub shuffle: bool,

    /// Apply the per-ordinal heuristic table.
    pub pakis: bool,

    /// Replaces the built-in per-ordinal rows when present.
    pub table: Option<Vec<DiversificationRow>>,

    /// Row used for ordinals past the end of `table`.
    pub fallback: Option<DiversificationRow>,
}

impl Default for DiversificationConfig {
    fn default() -> Self {
        Self {
            shuffle: true,
            pakis: true,
            table: None,
            fallback: None,
        }
    }
}

/// Heuristic settings for one worker ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DiversificationRow {
    /// LBD bound of learned clauses that are never deleted.
    pub tier1: u32,
    /// Chronological backtracking.
    pub chrono: bool,
    /// 0 focused only, 1 alternate, 2 stable only.
    pub stable: u8,
    /// Local-search warm start before CDCL.
    pub walk_initially: bool,
    /// 0 off, 1 in stable mode, 2 always.
    pub target: u8,
    /// Initial saved phase.
    pub phase: bool,
}

/// Clause exchange configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SharingConfig {
    /// Hub forwarding period in milliseconds.
    pub interval_ms: u64,

    /// Longest learned clause that is exported.
    pub max_clause_len: usize,
}

impl Default for SharingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            max_clause_len: 8,
        }
    }
}

impl SharingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Preprocessor limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct PreprocessConfig {
    /// Simplification rounds.
    pub rounds: usize,

    /// Variables with more occurrences than this are not eliminated.
    pub max_occurrences: usize,

    /// Resolvents longer than this block elimination.
    pub max_resolvent_len: usize,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            rounds: 3,
            max_occurrences: 16,
            max_resolvent_len: 20,
        }
    }
}

/// A loosely typed option value.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl OptionValue {
    /// Parses as integer, then float, else keeps the raw string.
    pub fn parse(raw: &str) -> Self {
        if let Ok(v) = raw.parse::<i64>() {
            OptionValue::Int(v)
        } else if let Ok(v) = raw.parse::<f64>() {
            OptionValue::Float(v)
        } else {
            OptionValue::Str(raw.to_string())
        }
    }

    /// Numeric view used by the engine configuration surface.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OptionValue::Int(v) => Some(*v as f64),
            OptionValue::Float(v) => Some(*v),
            OptionValue::Str(_) => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Int(v) => write!(f, "{}", v),
            OptionValue::Float(v) => write!(f, "{}", v),
            OptionValue::Str(v) => write!(f, "{}", v),
        }
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("invalid value `{}` for {}", raw, name)))
}

fn parse_bool(name: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid(format!(
            "invalid boolean `{}` for {}",
            raw, name
        ))),
    }
}
