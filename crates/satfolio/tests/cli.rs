use std::io::Write;
use std::process::Command;

use clap::Parser;
use satfolio::cli::Cli;
use satfolio::{OptionValue, SatfolioError};
use satfolio_test::instances;
use tempfile::{Builder, NamedTempFile};

fn temp_with(suffix: &str, text: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_options_after_problem() {
    let cli = Cli::try_parse_from([
        "satfolio",
        "problem.cnf",
        "--threads=2",
        "--cutoff=2.5",
        "--restart_interval=64",
        "--dce",
    ])
    .unwrap();
    assert_eq!(cli.problem.to_str(), Some("problem.cnf"));

    let config = cli.portfolio_config().unwrap();
    assert_eq!(config.threads, 2);
    assert_eq!(config.cutoff_seconds, 2.5);
    assert!(config.dce);
    assert_eq!(
        config.engine.get("restart_interval"),
        Some(&OptionValue::Int(64))
    );
}

#[test]
fn test_config_file_then_overrides() {
    let toml = temp_with(
        ".toml",
        "threads = 6\nclause_sharing = true\n\n[sharing]\nmax_clause_len = 4\n",
    );
    let path = toml.path().to_str().unwrap().to_string();
    let cli = Cli::try_parse_from(["satfolio", "--config", &path, "x.cnf", "--threads=3"]).unwrap();
    let config = cli.portfolio_config().unwrap();
    assert_eq!(config.threads, 3);
    assert!(config.clause_sharing);
    assert_eq!(config.sharing.max_clause_len, 4);
}

#[test]
fn test_yaml_config_file() {
    let yaml = temp_with(".yaml", "threads: 5\npreprocessor: false\n");
    let path = yaml.path().to_str().unwrap().to_string();
    let cli = Cli::try_parse_from(["satfolio", "--config", &path, "x.cnf"]).unwrap();
    let config = cli.portfolio_config().unwrap();
    assert_eq!(config.threads, 5);
    assert!(!config.preprocessor);
}

#[test]
fn test_ill_typed_override() {
    let cli = Cli::try_parse_from(["satfolio", "x.cnf", "--threads=many"]).unwrap();
    let err = cli.portfolio_config().unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_unknown_engine_option_fails_run() {
    let problem = temp_with(".cnf", &instances::pigeonhole(3, 2).to_string());
    let path = problem.path().to_str().unwrap().to_string();
    let cli = Cli::try_parse_from(["satfolio", &path, "--bogus=1"]).unwrap();
    let err = cli.run().unwrap_err();
    assert!(matches!(err, SatfolioError::UnknownOption(ref name) if name == "bogus"));
}

#[test]
fn test_missing_problem_argument() {
    assert!(Cli::try_parse_from(["satfolio"]).is_err());
}

fn satfolio() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_satfolio"));
    command.env("RUST_LOG", "off");
    command
}

#[test]
fn test_binary_exit_codes() {
    let (cnf, _) = instances::planted_3sat(30, 120, 3);
    let sat = temp_with(".cnf", &cnf.to_string());
    let output = satfolio()
        .arg(sat.path())
        .arg("--threads=2")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(10));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("s SATISFIABLE\nv "));
    assert!(stdout.trim_end().ends_with(" 0"));

    let unsat = temp_with(".cnf", &instances::pigeonhole(4, 3).to_string());
    let output = satfolio().arg(unsat.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(20));
    assert_eq!(String::from_utf8(output.stdout).unwrap().trim(), "s UNSATISFIABLE");
}

#[test]
fn test_binary_fatal_error() {
    let output = satfolio()
        .arg("/nonexistent/satfolio/problem.cnf")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("c error:"));
}
