//! Error types for sorter.
//!
//! Pre-flight errors ([`ValidationError`], [`PreflightError`]) abort a run before any file is
//! touched. Per-file errors ([`TransferError`]) and traversal errors ([`TraversalError`]) never
//! abort a run; they are recorded in the outcome and reported as the run proceeds.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Why a directory failed pre-flight validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The path does not exist or is not a directory.
    #[error("{} is not a directory", .path.display())]
    NotADirectory {
        /// The path as given by the caller.
        path: PathBuf,
    },
    /// The directory exists but cannot be written to.
    #[error("{} is not writable", .path.display())]
    NotWritable {
        /// The resolved directory path.
        path: PathBuf,
    },
}

impl ValidationError {
    /// The path that failed validation.
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::NotADirectory { path } | Self::NotWritable { path } => path,
        }
    }
}

/// A fatal pre-flight failure, naming which side of the request was rejected.
#[derive(Debug, Error)]
pub enum PreflightError {
    #[error("invalid source: {0}")]
    Source(#[source] ValidationError),
    #[error("invalid destination: {0}")]
    Destination(#[source] ValidationError),
}

impl PreflightError {
    /// The underlying validation failure.
    pub fn validation(&self) -> &ValidationError {
        match self {
            Self::Source(err) | Self::Destination(err) => err,
        }
    }
}

/// Why a candidate was left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A file already occupies the target path.
    DestinationExists,
    /// The target path is the candidate itself.
    AlreadyInPlace,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DestinationExists => write!(f, "destination exists"),
            Self::AlreadyInPlace => write!(f, "already in place"),
        }
    }
}

/// A filesystem failure while transferring a single candidate.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("failed to move {} to {}: {source}", .from.display(), .to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    #[error("failed to copy {} to {}: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    #[error("{} has no file name component", .path.display())]
    NoFileName { path: PathBuf },
}

/// A directory that could not be listed during traversal.
#[derive(Debug, Error)]
#[error("cannot read {}: {source}", .path.display())]
pub struct TraversalError {
    pub path: PathBuf,
    #[source]
    pub source: walkdir::Error,
}

/// Errors loading or compiling the exclusion configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(#[from] toml::de::Error),
    /// Invalid glob pattern provided.
    #[error("invalid glob pattern '{pattern}': {source}")]
    InvalidGlobPattern {
        pattern: String,
        source: glob::PatternError,
    },
    /// Invalid regex pattern provided.
    #[error("invalid regex pattern '{pattern}': {source}")]
    InvalidRegexPattern {
        pattern: String,
        source: regex::Error,
    },
    /// IO error while reading configuration.
    #[error("failed to read configuration {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}
