use anyhow::anyhow;
use clap::Parser;
use sorter::cli::{Cli, CliError, run_cli};
use sorter::output::OutputFormatter;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: u8) -> anyhow::Result<()> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match run_cli(&cli) {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            // pre-flight failures were already reported by the console reporter
            if !matches!(err, CliError::Preflight(_)) {
                OutputFormatter::error(&err.to_string());
            }
            Ok(ExitCode::from(err.exit_code()))
        }
    }
}
