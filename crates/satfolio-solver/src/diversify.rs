//! Per-ordinal heuristic diversification.
//!
//! Settings are a pure function of the worker ordinal: a worker gets the same
//! configuration whatever the portfolio size.

use satfolio_config::{DiversificationConfig, DiversificationRow};
use satfolio_core::{Result, SatfolioError};
use satfolio_engine::Engine;
use tracing::debug;

use crate::worker::Worker;

const fn row(
    tier1: u32,
    chrono: u8,
    stable: u8,
    walk: u8,
    target: u8,
    phase: u8,
) -> DiversificationRow {
    DiversificationRow {
        tier1,
        chrono: chrono == 1,
        stable,
        walk_initially: walk == 1,
        target,
        phase: phase == 1,
    }
}

/// Built-in rows for ordinals 0 to 23.
pub const BUILTIN_ROWS: [DiversificationRow; 24] = [
    row(2, 1, 1, 0, 1, 1),
    row(2, 1, 1, 0, 2, 1),
    row(2, 1, 0, 0, 1, 1),
    row(2, 0, 1, 0, 1, 1),
    row(2, 0, 1, 0, 1, 0),
    row(2, 1, 1, 0, 1, 0),
    row(2, 0, 2, 0, 1, 1),
    row(2, 1, 1, 0, 0, 1),
    row(2, 0, 1, 0, 0, 0),
    row(2, 1, 1, 0, 0, 0),
    row(2, 1, 1, 1, 1, 1),
    row(2, 0, 1, 0, 2, 1),
    row(2, 0, 1, 0, 2, 0),
    row(3, 0, 1, 0, 2, 0),
    row(3, 0, 1, 0, 2, 1),
    row(2, 1, 1, 0, 2, 0),
    row(2, 0, 2, 0, 2, 1),
    row(2, 1, 1, 0, 0, 1),
    row(2, 0, 1, 0, 0, 0),
    row(2, 1, 1, 0, 0, 0),
    row(3, 1, 1, 0, 0, 1),
    row(3, 1, 1, 0, 2, 1),
    row(2, 1, 1, 1, 2, 1),
    row(2, 0, 0, 0, 1, 1),
];

/// Row for ordinals past the explicit table.
pub const FALLBACK_ROW: DiversificationRow = row(2, 1, 1, 0, 2, 1);

/// Ordinal-keyed heuristic rows, validated once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiversificationTable {
    rows: Vec<DiversificationRow>,
    fallback: DiversificationRow,
}

fn check_row(row: &DiversificationRow, which: &str) -> Result<()> {
    if row.tier1 == 0 {
        return Err(SatfolioError::config(format!("{}: tier1 must be at least 1", which)));
    }
    if row.stable > 2 {
        return Err(SatfolioError::config(format!(
            "{}: stable must be 0, 1 or 2, got {}",
            which, row.stable
        )));
    }
    if row.target > 2 {
        return Err(SatfolioError::config(format!(
            "{}: target must be 0, 1 or 2, got {}",
            which, row.target
        )));
    }
    Ok(())
}

impl DiversificationTable {
    pub fn builtin() -> Self {
        Self {
            rows: BUILTIN_ROWS.to_vec(),
            fallback: FALLBACK_ROW,
        }
    }

    pub fn new(rows: Vec<DiversificationRow>, fallback: DiversificationRow) -> Result<Self> {
        for (ordinal, row) in rows.iter().enumerate() {
            check_row(row, &format!("diversification row {}", ordinal))?;
        }
        check_row(&fallback, "diversification fallback")?;
        Ok(Self { rows, fallback })
    }

    /// The configured table, or the built-in one when none is given.
    pub fn from_config(config: &DiversificationConfig) -> Result<Self> {
        match (&config.table, config.fallback) {
            (None, None) => Ok(Self::builtin()),
            (table, fallback) => Self::new(
                table.clone().unwrap_or_else(|| BUILTIN_ROWS.to_vec()),
                fallback.unwrap_or(FALLBACK_ROW),
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, ordinal: usize) -> &DiversificationRow {
        self.rows.get(ordinal).unwrap_or(&self.fallback)
    }
}

impl Default for DiversificationTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Turns ordinals into engine settings.
#[derive(Debug, Clone)]
pub struct Diversifier {
    table: DiversificationTable,
    shuffle: bool,
    pakis: bool,
}

impl Diversifier {
    pub fn new(table: DiversificationTable, shuffle: bool, pakis: bool) -> Self {
        Self {
            table,
            shuffle,
            pakis,
        }
    }

    pub fn from_config(config: &DiversificationConfig) -> Result<Self> {
        Ok(Self::new(
            DiversificationTable::from_config(config)?,
            config.shuffle,
            config.pakis,
        ))
    }

    pub fn table(&self) -> &DiversificationTable {
        &self.table
    }

    /// The settings for `ordinal`, in application order.
    pub fn settings(&self, ordinal: usize) -> Vec<(&'static str, f64)> {
        let mut settings = Vec::with_capacity(7);
        if self.shuffle && ordinal > 0 {
            settings.push(("order_reset", ordinal as f64));
        }
        if self.pakis {
            let row = self.table.row(ordinal);
            let flag = |on: bool| if on { 1.0 } else { 0.0 };
            settings.extend([
                ("tier1", f64::from(row.tier1)),
                ("chrono", flag(row.chrono)),
                ("stable", f64::from(row.stable)),
                ("walkinitially", flag(row.walk_initially)),
                ("target", f64::from(row.target)),
                ("phase", flag(row.phase)),
            ]);
        }
        settings
    }

    /// Configures every worker with its ordinal's settings.
    pub fn apply<E: Engine>(&self, workers: &mut [Worker<E>]) -> Result<()> {
        for worker in workers.iter_mut() {
            let settings = self.settings(worker.ordinal());
            for &(name, value) in &settings {
                worker.configure(name, value)?;
            }
            debug!(
                event = "worker_diversified",
                worker = worker.ordinal(),
                settings = settings.len(),
            );
        }
        Ok(())
    }
}

/// Configures every worker with its ordinal's settings from `diversifier`.
pub fn diversify<E: Engine>(workers: &mut [Worker<E>], diversifier: &Diversifier) -> Result<()> {
    diversifier.apply(workers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::create_workers;
    use satfolio_test::ScriptedEngine;

    fn builtin(shuffle: bool, pakis: bool) -> Diversifier {
        Diversifier::new(DiversificationTable::builtin(), shuffle, pakis)
    }

    #[test]
    fn test_builtin_table_is_valid() {
        let table = DiversificationTable::new(BUILTIN_ROWS.to_vec(), FALLBACK_ROW).unwrap();
        assert_eq!(table, DiversificationTable::builtin());
        assert_eq!(table.len(), 24);
    }

    #[test]
    fn test_first_worker_keeps_order() {
        let settings = builtin(true, true).settings(0);
        assert_eq!(
            settings,
            vec![
                ("tier1", 2.0),
                ("chrono", 1.0),
                ("stable", 1.0),
                ("walkinitially", 0.0),
                ("target", 1.0),
                ("phase", 1.0),
            ]
        );
    }

    #[test]
    fn test_selected_rows() {
        let d = builtin(true, true);
        let s6 = d.settings(6);
        assert_eq!(s6[0], ("order_reset", 6.0));
        assert!(s6.contains(&("stable", 2.0)));
        assert!(s6.contains(&("chrono", 0.0)));

        let s10 = d.settings(10);
        assert!(s10.contains(&("walkinitially", 1.0)));

        let s13 = d.settings(13);
        assert!(s13.contains(&("tier1", 3.0)));
        assert!(s13.contains(&("phase", 0.0)));

        let s23 = d.settings(23);
        assert!(s23.contains(&("stable", 0.0)));
        assert!(s23.contains(&("chrono", 0.0)));
    }

    #[test]
    fn test_fallback_past_table() {
        let d = builtin(true, true);
        let mut expected = d.settings(1);
        expected[0] = ("order_reset", 40.0);
        assert_eq!(d.settings(40), expected);
    }

    #[test]
    fn test_switches() {
        assert!(builtin(false, false).settings(5).is_empty());
        assert_eq!(builtin(true, false).settings(5), vec![("order_reset", 5.0)]);
        assert_eq!(builtin(false, true).settings(5).len(), 6);
    }

    #[test]
    fn test_invalid_rows_rejected() {
        let mut bad = FALLBACK_ROW;
        bad.stable = 3;
        assert!(DiversificationTable::new(vec![bad], FALLBACK_ROW).is_err());

        let mut bad = FALLBACK_ROW;
        bad.tier1 = 0;
        assert!(DiversificationTable::new(Vec::new(), bad).is_err());

        let mut bad = FALLBACK_ROW;
        bad.target = 7;
        let config = DiversificationConfig {
            table: Some(vec![bad]),
            ..DiversificationConfig::default()
        };
        assert!(Diversifier::from_config(&config).is_err());
    }

    #[test]
    fn test_custom_table_from_config() {
        let custom = row(5, 0, 2, 1, 0, 0);
        let config = DiversificationConfig {
            table: Some(vec![custom]),
            ..DiversificationConfig::default()
        };
        let d = Diversifier::from_config(&config).unwrap();
        assert_eq!(d.table().row(0), &custom);
        assert_eq!(d.table().row(1), &FALLBACK_ROW);
    }

    #[test]
    fn test_apply_is_deterministic() {
        let d = builtin(true, true);
        let run = || {
            let mut workers = create_workers(6, ScriptedEngine::new).unwrap();
            diversify(&mut workers, &d).unwrap();
            workers
                .iter()
                .map(|w| w.settings().to_vec())
                .collect::<Vec<_>>()
        };
        let first = run();
        assert_eq!(first, run());
        assert_eq!(first[3][0], ("order_reset".to_string(), 3.0));
    }

    #[test]
    fn test_apply_stops_on_rejection() {
        let d = builtin(true, true);
        let mut workers =
            create_workers(2, |i| ScriptedEngine::new(i).rejecting("target")).unwrap();
        let err = d.apply(&mut workers).unwrap_err();
        assert!(err.is_configuration());
    }
}
