use std::process::ExitCode;

use clap::Parser;
use satfolio::cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();

    #[cfg(feature = "console")]
    satfolio::init_console();

    match cli.run() {
        Ok(result) => {
            println!("{}", result);
            ExitCode::from(result.exit_code())
        }
        Err(err) => {
            tracing::error!(event = "run_failed", error = %err);
            eprintln!("c error: {}", err);
            ExitCode::from(1)
        }
    }
}
