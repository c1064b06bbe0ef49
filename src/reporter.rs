//! Progress sinks.
//!
//! The engine pushes every per-file outcome and every diagnostic to a [`Reporter`] as soon as it
//! happens. Front ends supply their own implementation; the CLI's lives in [`crate::cli`].

use crate::engine::{FileOutcome, StatusKind};
use std::path::PathBuf;

/// What kind of non-file event a [`Diagnostic`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Source or destination failed pre-flight validation; nothing was touched.
    Preflight,
    /// A directory could not be listed; traversal continued with its siblings.
    SubdirectoryUnreadable,
    /// The run was cancelled before all candidates were processed.
    Cancelled,
}

/// A message that is not tied to a single candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub path: Option<PathBuf>,
    pub message: String,
}

/// Consumer of live run events. Calls arrive in candidate order.
pub trait Reporter {
    /// Called once per candidate, right after it was processed.
    fn file(&mut self, outcome: &FileOutcome);

    /// Called for run-level and traversal events.
    fn diagnostic(&mut self, diagnostic: &Diagnostic);
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn file(&mut self, outcome: &FileOutcome) {
        (**self).file(outcome);
    }

    fn diagnostic(&mut self, diagnostic: &Diagnostic) {
        (**self).diagnostic(diagnostic);
    }
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn file(&mut self, _outcome: &FileOutcome) {}

    fn diagnostic(&mut self, _diagnostic: &Diagnostic) {}
}

/// An owned snapshot of a [`FileOutcome`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFile {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub status: StatusKind,
    pub reason: Option<String>,
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub files: Vec<RecordedFile>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for RecordingReporter {
    fn file(&mut self, outcome: &FileOutcome) {
        self.files.push(RecordedFile {
            source: outcome.source.clone(),
            destination: outcome.destination.clone(),
            status: outcome.status.kind(),
            reason: outcome.status.reason(),
        });
    }

    fn diagnostic(&mut self, diagnostic: &Diagnostic) {
        self.diagnostics.push(diagnostic.clone());
    }
}
