//! Command-line front end.
//!
//! Parses arguments into a [`Request`], loads the exclusion configuration, runs the engine with a
//! [`ConsoleReporter`] and prints the summary. Exit codes:
//!
//! * `0` the run completed, even if some files were skipped or failed
//! * `1` the source or destination failed validation; nothing was touched
//! * `2` the configuration file could not be loaded or compiled

use crate::config::{CompiledFilters, FilterConfig};
use crate::engine::{self, FileOutcome, Outcome, Request, StatusKind, TransferMode};
use crate::error::{ConfigError, PreflightError};
use crate::file_category::TypeFilter;
use crate::output::OutputFormatter;
use crate::reporter::{Diagnostic, Reporter};
use clap::{ArgAction, Parser};
use indicatif::ProgressBar;
use std::path::PathBuf;
use thiserror::Error;

/// Move or copy files into a destination, optionally sorted into category folders.
#[derive(Debug, Parser)]
#[command(name = "sorter", version, about)]
pub struct Cli {
    /// Source directory
    pub source: PathBuf,

    /// Destination directory (defaults to the source)
    #[arg(short, long)]
    pub destination: Option<PathBuf>,

    /// Sort files into category folders (Images, Documents, ...)
    #[arg(long)]
    pub sort_folders: bool,

    /// Descend into subdirectories of the source
    #[arg(short, long)]
    pub recursive: bool,

    /// Only handle these file types (e.g. `-t jpg png`)
    #[arg(short, long, num_args = 1.., value_name = "EXT")]
    pub types: Vec<String>,

    /// Copy files instead of moving them
    #[arg(short, long)]
    pub copy: bool,

    /// Show what would happen without touching any file
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Exclusion rules file (defaults to .sorterrc.toml, then ~/.config/sorter/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Assembles the engine request from the parsed arguments.
    pub fn to_request(&self, exclusions: Option<CompiledFilters>) -> Request {
        let destination = self
            .destination
            .clone()
            .unwrap_or_else(|| self.source.clone());

        Request {
            sort_into_categories: self.sort_folders,
            recursive: self.recursive,
            type_filter: TypeFilter::from_extensions(&self.types),
            mode: if self.copy {
                TransferMode::Copy
            } else {
                TransferMode::Move
            },
            dry_run: self.dry_run,
            exclusions,
            ..Request::new(&self.source, destination)
        }
    }
}

/// Failures that stop the CLI before any file is processed.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("error loading configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Preflight(#[from] PreflightError),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Preflight(_) => 1,
            CliError::Config(_) => 2,
        }
    }
}

/// Streams run events to the terminal.
///
/// File lines go to stdout, diagnostics to stderr. In quiet mode only diagnostics are printed.
pub struct ConsoleReporter {
    spinner: ProgressBar,
    quiet: bool,
    dry_run: bool,
}

impl ConsoleReporter {
    pub fn new(quiet: bool, dry_run: bool) -> Self {
        Self {
            spinner: OutputFormatter::create_spinner(!quiet),
            quiet,
            dry_run,
        }
    }

    pub fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl Reporter for ConsoleReporter {
    fn file(&mut self, outcome: &FileOutcome) {
        self.spinner.inc(1);
        if self.quiet {
            return;
        }

        let name = outcome
            .source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| outcome.source.display().to_string());
        self.spinner.set_message(name.clone());

        self.spinner.suspend(|| match outcome.status.kind() {
            StatusKind::Moved => {
                let verb = if self.dry_run { "would go to" } else { "→" };
                OutputFormatter::success(&format!(
                    "{} {} {}",
                    name,
                    verb,
                    outcome.destination.display()
                ));
            }
            StatusKind::Skipped | StatusKind::Failed => {
                let line = format!(
                    "{}: {}",
                    outcome.source.display(),
                    outcome.status.reason().unwrap_or_default()
                );
                if outcome.status.kind() == StatusKind::Failed {
                    OutputFormatter::error(&line);
                } else {
                    OutputFormatter::warning(&line);
                }
            }
        });
    }

    fn diagnostic(&mut self, diagnostic: &Diagnostic) {
        self.spinner
            .suspend(|| OutputFormatter::warning_stderr(&diagnostic.message));
    }
}

/// Runs the CLI with parsed arguments and prints the result.
///
/// Returns the outcome so callers can inspect it; a completed run is `Ok` even when files failed.
pub fn run_cli(cli: &Cli) -> Result<Outcome, CliError> {
    let exclusions = FilterConfig::load(cli.config.as_deref())?.compile()?;
    let request = cli.to_request(Some(exclusions));

    if !cli.json {
        let mode = if cli.copy { "Copying" } else { "Moving" };
        OutputFormatter::info(&format!(
            "{} files from {} to {}",
            mode,
            request.source.display(),
            request.destination.display()
        ));
        if cli.dry_run {
            OutputFormatter::dry_run_notice("Nothing will be modified.");
        }
    }

    let mut reporter = ConsoleReporter::new(cli.json, cli.dry_run);
    let result = engine::run(request, &mut reporter);
    reporter.finish();
    let outcome = result?;

    if cli.json {
        println!("{}", OutputFormatter::summary_json(&outcome));
    } else {
        OutputFormatter::summary(&outcome);
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::collections::HashSet;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_full_argument_set() {
        let cli = Cli::try_parse_from([
            "sorter",
            "/in",
            "-d",
            "/out",
            "--sort-folders",
            "-r",
            "--copy",
            "-n",
            "-t",
            "jpg",
            "*.PNG",
        ])
        .expect("valid arguments");

        let request = cli.to_request(None);
        assert_eq!(request.source, PathBuf::from("/in"));
        assert_eq!(request.destination, PathBuf::from("/out"));
        assert!(request.sort_into_categories);
        assert!(request.recursive);
        assert!(request.dry_run);
        assert_eq!(request.mode, TransferMode::Copy);
        assert_eq!(
            request.type_filter,
            TypeFilter::Only(HashSet::from(["jpg".to_string(), "png".to_string()]))
        );
    }

    #[test]
    fn test_destination_defaults_to_source() {
        let cli = Cli::try_parse_from(["sorter", "/in"]).unwrap();
        let request = cli.to_request(None);

        assert_eq!(request.destination, PathBuf::from("/in"));
        assert_eq!(request.type_filter, TypeFilter::All);
        assert_eq!(request.mode, TransferMode::Move);
        assert!(!request.sort_into_categories);
        assert!(!request.recursive);
    }

    #[test]
    fn test_source_is_required() {
        assert!(Cli::try_parse_from(["sorter"]).is_err());
    }

    #[test]
    fn test_exit_codes() {
        let preflight = CliError::Preflight(PreflightError::Source(
            crate::error::ValidationError::NotADirectory {
                path: PathBuf::from("/x"),
            },
        ));
        let config = CliError::Config(ConfigError::ConfigNotFound(PathBuf::from("/c.toml")));

        assert_eq!(preflight.exit_code(), 1);
        assert_eq!(config.exit_code(), 2);
    }
}
