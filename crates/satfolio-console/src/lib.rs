//! Console output for portfolio runs.
//!
//! Provides a `tracing` layer that turns portfolio events into DIMACS comment
//! lines (`c ...`) on stderr, leaving stdout to the solver result.
//!
//! ## Log Levels
//!
//! - **INFO**: Lifecycle events (portfolio, preprocessing, solve start/end, winner)
//! - **DEBUG**: Per-worker progress (conclusions, clause exchange)
//! - **TRACE**: Engine steps

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;
use std::io::{self, Write};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: OnceLock<()> = OnceLock::new();
static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Package version for banner display.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_DIRECTIVES: &str = "satfolio=info,satfolio_solver=info,satfolio_engine=info";

/// Initializes console output.
///
/// Safe to call multiple times - only the first call has effect. When another
/// global subscriber is already installed this one is silently skipped.
pub fn init() {
    INIT.get_or_init(|| {
        EPOCH.get_or_init(Instant::now);
        print_banner();

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(PortfolioConsoleLayer)
            .try_init();
    });
}

fn elapsed_secs() -> f64 {
    EPOCH.get().map_or(0.0, |epoch| epoch.elapsed().as_secs_f64())
}

fn print_banner() {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(
        stderr,
        "c {} {}",
        "satfolio".bright_cyan().bold(),
        format!("v{} - parallel portfolio SAT solver", VERSION).bright_white()
    );
    let _ = stderr.flush();
}

/// A tracing layer that formats portfolio events as comment lines.
pub struct PortfolioConsoleLayer;

impl<S: Subscriber> Layer<S> for PortfolioConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !metadata.target().starts_with("satfolio") {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let output = format_event(&visitor, *metadata.level());
        if !output.is_empty() {
            let _ = writeln!(io::stderr(), "c {} {}", format_elapsed(), output);
        }
    }
}

#[derive(Default)]
struct EventVisitor {
    event: Option<String>,
    input: Option<String>,
    outcome: Option<String>,
    result: Option<String>,
    status: Option<String>,
    policy: Option<String>,
    strength: Option<String>,
    cause: Option<String>,
    winner: Option<String>,
    held_status: Option<String>,
    offered_status: Option<String>,
    threads: Option<u64>,
    workers: Option<u64>,
    worker: Option<u64>,
    priority: Option<u64>,
    steps: Option<u64>,
    joined: Option<u64>,
    conflicts: Option<u64>,
    restarts: Option<u64>,
    forwarded: Option<u64>,
    held: Option<u64>,
    offered: Option<u64>,
    original_vars: Option<u64>,
    original_clauses: Option<u64>,
    reduced_vars: Option<u64>,
    reduced_clauses: Option<u64>,
    duration_ms: Option<u64>,
    cutoff_secs: Option<f64>,
    preprocessor: Option<bool>,
    clause_sharing: Option<bool>,
    dce: Option<bool>,
    accepted: Option<bool>,
    panicked: Option<bool>,
}

impl EventVisitor {
    fn set_text(&mut self, name: &str, value: String) {
        let slot = match name {
            "event" => &mut self.event,
            "input" => &mut self.input,
            "outcome" => &mut self.outcome,
            "result" => &mut self.result,
            "status" => &mut self.status,
            "policy" => &mut self.policy,
            "strength" => &mut self.strength,
            "cause" => &mut self.cause,
            "winner" => &mut self.winner,
            "held_status" => &mut self.held_status,
            "offered_status" => &mut self.offered_status,
            _ => return,
        };
        *slot = Some(value);
    }
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let s = format!("{:?}", value);
        self.set_text(field.name(), s.trim_matches('"').to_string());
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.set_text(field.name(), value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        match field.name() {
            "threads" => self.threads = Some(value),
            "workers" => self.workers = Some(value),
            "worker" => self.worker = Some(value),
            "priority" => self.priority = Some(value),
            "steps" => self.steps = Some(value),
            "joined" => self.joined = Some(value),
            "conflicts" => self.conflicts = Some(value),
            "restarts" => self.restarts = Some(value),
            "forwarded" => self.forwarded = Some(value),
            "held" => self.held = Some(value),
            "offered" => self.offered = Some(value),
            "original_vars" => self.original_vars = Some(value),
            "original_clauses" => self.original_clauses = Some(value),
            "reduced_vars" => self.reduced_vars = Some(value),
            "reduced_clauses" => self.reduced_clauses = Some(value),
            "duration_ms" => self.duration_ms = Some(value),
            _ => {}
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_u64(field, value.max(0) as u64);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if field.name() == "cutoff_secs" {
            self.cutoff_secs = Some(value);
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        match field.name() {
            "preprocessor" => self.preprocessor = Some(value),
            "clause_sharing" => self.clause_sharing = Some(value),
            "dce" => self.dce = Some(value),
            "accepted" => self.accepted = Some(value),
            "panicked" => self.panicked = Some(value),
            _ => {}
        }
    }
}

fn format_event(v: &EventVisitor, level: Level) -> String {
    let event = v.event.as_deref().unwrap_or("");

    match event {
        "portfolio_start" => format_portfolio_start(v),
        "preprocess_end" => format_preprocess_end(v),
        "workers_parsed" => format_workers_parsed(v),
        "solve_start" => format_solve_start(v),
        "worker_concluded" => format_worker_concluded(v),
        "winner_recorded" => format_winner(v),
        "result_conflict" => format_conflict(v),
        "cutoff_reached" => format_cutoff(v),
        "cancel_broadcast" => format_cancel(v),
        "sharing_stopped" => format_sharing_stopped(v),
        "solve_end" => format_solve_end(v),
        "engine_step" => format_engine_step(v, level),
        _ => String::new(),
    }
}

fn format_elapsed() -> String {
    format!("{:>7.3}s", elapsed_secs())
        .bright_black()
        .to_string()
}

fn count(value: Option<u64>) -> String {
    value.unwrap_or(0).to_formatted_string(&Locale::en)
}

fn switch(value: Option<bool>) -> String {
    if value.unwrap_or(false) {
        "on".bright_green().to_string()
    } else {
        "off".bright_black().to_string()
    }
}

fn format_portfolio_start(v: &EventVisitor) -> String {
    format!(
        "{} Portfolio │ {} │ {} threads │ {}s cutoff │ preprocessor {} │ sharing {} │ dce {}",
        "▶".bright_green().bold(),
        v.input.as_deref().unwrap_or("?").white().bold(),
        count(v.threads).bright_yellow(),
        v.cutoff_secs.unwrap_or(0.0),
        switch(v.preprocessor),
        switch(v.clause_sharing),
        switch(v.dce),
    )
}

fn format_preprocess_end(v: &EventVisitor) -> String {
    let outcome = v.outcome.as_deref().unwrap_or("?");
    let mut output = format!(
        "{} Preprocessed │ {} │ {} vars │ {} clauses",
        "◆".bright_blue(),
        format_duration_ms(v.duration_ms.unwrap_or(0)).yellow(),
        count(v.original_vars).bright_yellow(),
        count(v.original_clauses).bright_yellow(),
    );
    if outcome == "reduced" {
        output.push_str(&format!(
            " → {} vars │ {} clauses",
            count(v.reduced_vars).bright_yellow(),
            count(v.reduced_clauses).bright_yellow(),
        ));
    } else {
        output.push_str(&format!(" │ {}", format_status(outcome)));
    }
    output
}

fn format_workers_parsed(v: &EventVisitor) -> String {
    format!(
        "{} Parsed │ {} workers │ {}",
        "◆".bright_blue(),
        count(v.workers).bright_yellow(),
        format_duration_ms(v.duration_ms.unwrap_or(0)).yellow(),
    )
}

fn format_solve_start(v: &EventVisitor) -> String {
    format!(
        "{} Solving │ {} workers │ {} │ {} cancel",
        "▶".bright_green().bold(),
        count(v.workers).bright_yellow(),
        v.policy.as_deref().unwrap_or("?").bright_magenta(),
        v.strength.as_deref().unwrap_or("?").to_lowercase(),
    )
}

fn format_worker_concluded(v: &EventVisitor) -> String {
    let icon = if v.accepted.unwrap_or(false) {
        "✓".bright_green().to_string()
    } else {
        "✗".bright_red().to_string()
    };
    format!(
        "{} Worker {:>3} │ {} │ {} steps │ priority {}",
        icon,
        v.worker.unwrap_or(0),
        format_status(v.status.as_deref().unwrap_or("?")),
        count(v.steps).white(),
        count(v.priority).bright_black(),
    )
}

fn format_winner(v: &EventVisitor) -> String {
    format!(
        "{} Winner │ worker {} │ {} │ {} conflicts",
        "★".bright_yellow().bold(),
        v.worker.unwrap_or(0).bright_white().bold(),
        format_status(v.status.as_deref().unwrap_or("?")),
        count(v.priority).bright_magenta(),
    )
}

fn format_conflict(v: &EventVisitor) -> String {
    format!(
        "{} Conflicting results │ worker {} {} │ worker {} {}",
        "✗".bright_red().bold(),
        count(v.held).bright_yellow(),
        v.held_status.as_deref().unwrap_or("?").to_lowercase(),
        count(v.offered).bright_yellow(),
        v.offered_status.as_deref().unwrap_or("?").to_lowercase(),
    )
}

fn format_cutoff(v: &EventVisitor) -> String {
    format!(
        "{} Cutoff reached │ {}s",
        "⏱".bright_red(),
        v.cutoff_secs.unwrap_or(0.0),
    )
}

fn format_cancel(v: &EventVisitor) -> String {
    format!(
        "{} Cancelled │ {} │ {} workers │ {}",
        "■".bright_black(),
        v.cause.as_deref().unwrap_or("?"),
        count(v.workers),
        v.strength.as_deref().unwrap_or("?").to_lowercase(),
    )
}

fn format_sharing_stopped(v: &EventVisitor) -> String {
    if v.panicked == Some(true) {
        return format!(
            "{} Clause exchange stopped │ hub thread panicked",
            "⇄".bright_red(),
        );
    }
    format!(
        "{} Clause exchange stopped │ {} clauses forwarded",
        "⇄".bright_cyan(),
        count(v.forwarded).bright_magenta(),
    )
}

fn format_solve_end(v: &EventVisitor) -> String {
    format!(
        "{} Solving complete │ {} │ {} │ {} workers joined",
        "■".bright_cyan().bold(),
        format_status(v.result.as_deref().unwrap_or("UNKNOWN")),
        format_duration_ms(v.duration_ms.unwrap_or(0)).yellow(),
        count(v.joined),
    )
}

fn format_engine_step(v: &EventVisitor, level: Level) -> String {
    if level != Level::TRACE {
        return String::new();
    }
    format!(
        "{} Worker {:>3} │ {} conflicts │ {} restarts",
        "·".bright_black(),
        v.worker.unwrap_or(0),
        count(v.conflicts).bright_black(),
        count(v.restarts).bright_black(),
    )
}

fn format_status(status: &str) -> String {
    match status.to_ascii_uppercase().as_str() {
        "SATISFIABLE" => "SATISFIABLE".bright_green().bold().to_string(),
        "UNSATISFIABLE" => "UNSATISFIABLE".bright_red().bold().to_string(),
        other => other.bright_yellow().to_string(),
    }
}

fn format_duration_ms(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.2}s", ms as f64 / 1000.0)
    } else {
        let mins = ms / 60_000;
        let secs = (ms % 60_000) / 1000;
        format!("{}m {}s", mins, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_formatting() {
        assert_eq!(format_duration_ms(250), "250ms");
        assert_eq!(format_duration_ms(1500), "1.50s");
        assert_eq!(format_duration_ms(125_000), "2m 5s");
    }

    #[test]
    fn test_status_names() {
        assert!(format_status("Satisfiable").contains("SATISFIABLE"));
        assert!(format_status("unsatisfiable").contains("UNSATISFIABLE"));
        assert!(format_status("UNKNOWN").contains("UNKNOWN"));
    }

    #[test]
    fn test_steps_only_at_trace() {
        let v = EventVisitor {
            event: Some("engine_step".to_string()),
            ..EventVisitor::default()
        };
        assert!(format_event(&v, Level::INFO).is_empty());
        assert!(!format_event(&v, Level::TRACE).is_empty());
        assert!(format_event(&EventVisitor::default(), Level::INFO).is_empty());
    }

    #[test]
    fn test_solve_end_line() {
        let v = EventVisitor {
            event: Some("solve_end".to_string()),
            result: Some("UNSATISFIABLE".to_string()),
            duration_ms: Some(42),
            joined: Some(12_000),
            ..EventVisitor::default()
        };
        let line = format_event(&v, Level::INFO);
        assert!(line.contains("UNSATISFIABLE"));
        assert!(line.contains("42ms"));
        assert!(line.contains("12,000"));
    }

    #[test]
    fn test_reduced_preprocess_line() {
        let v = EventVisitor {
            event: Some("preprocess_end".to_string()),
            outcome: Some("reduced".to_string()),
            original_vars: Some(1_500),
            reduced_vars: Some(900),
            ..EventVisitor::default()
        };
        let line = format_event(&v, Level::INFO);
        assert!(line.contains("1,500"));
        assert!(line.contains("900"));
    }

    #[test]
    fn test_conflict_line() {
        let v = EventVisitor {
            event: Some("result_conflict".to_string()),
            held: Some(0),
            held_status: Some("Satisfiable".to_string()),
            offered: Some(1),
            offered_status: Some("Unsatisfiable".to_string()),
            ..EventVisitor::default()
        };
        let line = format_event(&v, Level::WARN);
        assert!(line.contains("satisfiable"));
        assert!(line.contains("unsatisfiable"));
    }

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
        tracing::info!(event = "solve_start", workers = 2u64);
    }
}
