//! sorter - move or copy files into a destination, optionally sorted by type
//!
//! The library is built around a single entry point, [`engine::run`], which validates a
//! [`Request`], walks the source directory, classifies each file by extension and transfers it,
//! reporting every file to a [`Reporter`] as it goes. The CLI in [`cli`] is one front end for it.

pub mod cancel;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod file_category;
pub mod output;
pub mod reporter;
pub mod traverse;
pub mod validate;

pub use cancel::CancelFlag;
pub use config::{CompiledFilters, FilterConfig};
pub use engine::{FileOutcome, FileStatus, Outcome, Request, StatusKind, TransferMode, run};
pub use error::{ConfigError, PreflightError, SkipReason, TransferError, ValidationError};
pub use file_category::{Category, TypeFilter, classify};
pub use reporter::{Diagnostic, DiagnosticKind, NullReporter, RecordingReporter, Reporter};
pub use traverse::{Candidate, TraversalItem, Traverser, traverse};
pub use validate::{ValidatedPath, validate};
