//! Output formatting and styling module.
//!
//! Centralizes all terminal output of the CLI front end: colored status lines, the progress
//! spinner, the end-of-run summary and its JSON rendering.

use crate::engine::{Outcome, StatusKind};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Value, json};
use std::time::Duration;

/// Manages all CLI output with consistent styling and formatting.
///
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
/// - A spinner for live progress
/// - Summary tables with statistics
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sorter::output::OutputFormatter;
    /// OutputFormatter::success("photo.jpg → Images/");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark, on stderr.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints a warning on stderr.
    pub fn warning_stderr(message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a spinner for a run whose length is not known up front.
    ///
    /// Returns a hidden bar when `visible` is false.
    pub fn create_spinner(visible: bool) -> ProgressBar {
        if !visible {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) =
            ProgressStyle::default_spinner().template("{spinner:.cyan} {pos} files {msg}")
        {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    }

    /// Prints the end-of-run summary: status counts, per-category counts and every file that was
    /// not transferred.
    pub fn summary(outcome: &Outcome) {
        Self::header("SUMMARY");

        let moved_label = if outcome.dry_run { "Would move" } else { "Moved" };
        let width = 10;
        println!(
            "{:<width$} | {}",
            moved_label,
            outcome.moved.to_string().green(),
            width = width
        );
        println!(
            "{:<width$} | {}",
            "Skipped",
            outcome.skipped.to_string().yellow(),
            width = width
        );
        println!(
            "{:<width$} | {}",
            "Failed",
            outcome.failed.to_string().red(),
            width = width
        );

        if !outcome.by_category.is_empty() {
            Self::category_table(outcome);
        }

        if !outcome.issues.is_empty() {
            Self::header("NOT TRANSFERRED");
            for issue in &outcome.issues {
                let reason = issue.status.reason().unwrap_or_default();
                let line = format!("{}: {}", issue.source.display(), reason);
                match issue.status.kind() {
                    StatusKind::Failed => Self::error(&line),
                    _ => Self::warning(&line),
                }
            }
        }

        if !outcome.unreadable.is_empty() {
            Self::header("UNREADABLE DIRECTORIES");
            for dir in &outcome.unreadable {
                Self::warning(&dir.display().to_string());
            }
        }

        if outcome.cancelled {
            Self::warning("Run was cancelled before all files were processed.");
        }
        if outcome.dry_run {
            Self::dry_run_notice("No files were modified.");
        }
    }

    fn category_table(outcome: &Outcome) {
        Self::header("BY CATEGORY");

        let max_category_len = outcome
            .by_category
            .keys()
            .map(|category| category.dir_name().len())
            .max()
            .unwrap_or(0)
            .max(8);

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = max_category_len
        );
        println!("{}", "-".repeat(max_category_len + 10));

        for (category, count) in &outcome.by_category {
            let file_word = if *count == 1 { "file" } else { "files" };
            println!(
                "{:<width$} | {} {}",
                category.dir_name(),
                count.to_string().green(),
                file_word,
                width = max_category_len
            );
        }
    }

    /// Renders the outcome as JSON for `--json`.
    pub fn summary_json(outcome: &Outcome) -> Value {
        json!({
            "dry_run": outcome.dry_run,
            "cancelled": outcome.cancelled,
            "started_at": outcome.started_at.to_rfc3339(),
            "finished_at": outcome.finished_at.to_rfc3339(),
            "moved": outcome.moved,
            "skipped": outcome.skipped,
            "failed": outcome.failed,
            "bytes_moved": outcome.bytes_moved,
            "by_category": outcome.by_category.iter().map(|(category, count)| {
                (category.dir_name().to_string(), json!(count))
            }).collect::<serde_json::Map<_, _>>(),
            "issues": outcome.issues.iter().map(|issue| {
                json!({
                    "source": issue.source.to_string_lossy(),
                    "destination": issue.destination.to_string_lossy(),
                    "status": issue.status.kind().to_string(),
                    "reason": issue.status.reason(),
                })
            }).collect::<Vec<_>>(),
            "unreadable": outcome.unreadable.iter().map(|dir| dir.to_string_lossy()).collect::<Vec<_>>(),
        })
    }
}
