//! Preprocessing and model remapping.

use std::time::Instant;

use satfolio_config::PreprocessConfig;
use satfolio_core::{Cnf, Model, Result, Var};
use satfolio_engine::{PreprocessArtifact, PreprocessLimits, PreprocessOutcome, Preprocessor};
use tracing::info;

/// Simplifies `cnf` with the configured limits.
pub fn preprocess(cnf: &Cnf, config: &PreprocessConfig) -> Result<PreprocessOutcome> {
    let limits = PreprocessLimits {
        rounds: config.rounds,
        max_occurrences: config.max_occurrences,
        max_resolvent_len: config.max_resolvent_len,
    };
    let start = Instant::now();
    let outcome = Preprocessor::new(limits).run(cnf)?;

    let (status, reduced_vars, reduced_clauses) = match &outcome {
        PreprocessOutcome::Unsatisfiable => ("unsatisfiable", 0, 0),
        PreprocessOutcome::Satisfiable(_) => ("satisfiable", 0, 0),
        PreprocessOutcome::Reduced { formula, .. } => {
            ("reduced", formula.num_vars(), formula.num_clauses())
        }
    };
    info!(
        event = "preprocess_end",
        outcome = status,
        original_vars = cnf.num_vars(),
        original_clauses = cnf.num_clauses(),
        reduced_vars,
        reduced_clauses,
        duration_ms = start.elapsed().as_millis() as u64,
    );
    Ok(outcome)
}

/// Maps a model of the reduced formula back to the original variables.
pub fn reconstruct(reduced: &Model, artifact: &PreprocessArtifact) -> Model {
    let mut partial = vec![0i8; artifact.original_vars()];
    for (index, value) in partial.iter_mut().enumerate() {
        if let Some(lit) = artifact.mapping(Var::new(index as u32)) {
            *value = if reduced.lit_value(lit) { 1 } else { -1 };
        }
    }
    artifact.complete_model(&mut partial);
    Model::new(partial.into_iter().map(|value| value > 0).collect())
}
