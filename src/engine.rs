//! The operation engine.
//!
//! [`run`] takes a [`Request`], validates both directories, walks the source and transfers each
//! candidate into the destination (or into a category folder beneath it). Every candidate gets a
//! [`FileOutcome`], pushed to the [`Reporter`] immediately and folded into the returned
//! [`Outcome`]. Only pre-flight validation can fail the run as a whole.
//!
//! # Examples
//!
//! ```no_run
//! use sorter::engine::{self, Request};
//! use sorter::reporter::NullReporter;
//!
//! let request = Request {
//!     sort_into_categories: true,
//!     ..Request::new("/home/me/Downloads", "/home/me/Sorted")
//! };
//!
//! match engine::run(request, NullReporter) {
//!     Ok(outcome) => println!("{} moved, {} skipped, {} failed", outcome.moved, outcome.skipped, outcome.failed),
//!     Err(e) => eprintln!("{}", e),
//! }
//! ```

use crate::cancel::CancelFlag;
use crate::config::CompiledFilters;
use crate::error::{PreflightError, SkipReason, TransferError};
use crate::file_category::{Category, TypeFilter, classify};
use crate::reporter::{Diagnostic, DiagnosticKind, Reporter};
use crate::traverse::{Candidate, TraversalItem, Traverser, output_dirs_within};
use crate::validate::validate;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Whether candidates leave the source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransferMode {
    /// Rename into place; the source file disappears.
    #[default]
    Move,
    /// Copy into place; the source file stays.
    Copy,
}

/// Everything one run needs, assembled once by the front end.
#[derive(Debug, Clone)]
pub struct Request {
    pub source: PathBuf,
    /// Where files go. With `sort_into_categories` this is the parent of the category folders.
    pub destination: PathBuf,
    pub sort_into_categories: bool,
    pub recursive: bool,
    pub type_filter: TypeFilter,
    pub mode: TransferMode,
    /// Compute and report targets without touching the filesystem.
    pub dry_run: bool,
    /// Extra exclusion rules; `None` excludes nothing.
    pub exclusions: Option<CompiledFilters>,
}

impl Request {
    /// A flat, non-recursive move of every file from `source` into `destination`.
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            sort_into_categories: false,
            recursive: false,
            type_filter: TypeFilter::All,
            mode: TransferMode::Move,
            dry_run: false,
            exclusions: None,
        }
    }
}

/// Coarse status of a processed candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    Moved,
    Skipped,
    Failed,
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusKind::Moved => write!(f, "moved"),
            StatusKind::Skipped => write!(f, "skipped"),
            StatusKind::Failed => write!(f, "failed"),
        }
    }
}

/// What happened to one candidate.
///
/// `Moved` also covers a successful copy in [`TransferMode::Copy`], and a planned transfer in a
/// dry run.
#[derive(Debug)]
pub enum FileStatus {
    Moved,
    Skipped(SkipReason),
    Failed(TransferError),
}

impl FileStatus {
    pub fn kind(&self) -> StatusKind {
        match self {
            FileStatus::Moved => StatusKind::Moved,
            FileStatus::Skipped(_) => StatusKind::Skipped,
            FileStatus::Failed(_) => StatusKind::Failed,
        }
    }

    /// Human-readable reason, present for skipped and failed candidates.
    pub fn reason(&self) -> Option<String> {
        match self {
            FileStatus::Moved => None,
            FileStatus::Skipped(reason) => Some(reason.to_string()),
            FileStatus::Failed(err) => Some(err.to_string()),
        }
    }
}

/// The result for a single candidate.
#[derive(Debug)]
pub struct FileOutcome {
    pub source: PathBuf,
    /// The target path that was used, or would have been.
    pub destination: PathBuf,
    pub category: Category,
    pub status: FileStatus,
}

/// Aggregate result of one run.
///
/// Successful transfers are only counted; skipped and failed candidates are kept in `issues`,
/// in the order they were processed.
#[derive(Debug)]
pub struct Outcome {
    pub moved: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Bytes transferred by moved candidates.
    pub bytes_moved: u64,
    /// Moved candidates per category.
    pub by_category: BTreeMap<Category, usize>,
    pub issues: Vec<FileOutcome>,
    /// Directories that could not be listed.
    pub unreadable: Vec<PathBuf>,
    pub dry_run: bool,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl Outcome {
    fn new(dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            moved: 0,
            skipped: 0,
            failed: 0,
            bytes_moved: 0,
            by_category: BTreeMap::new(),
            issues: Vec::new(),
            unreadable: Vec::new(),
            dry_run,
            cancelled: false,
            started_at: now,
            finished_at: now,
        }
    }

    fn record(&mut self, outcome: FileOutcome, size: u64) {
        match outcome.status.kind() {
            StatusKind::Moved => {
                self.moved += 1;
                self.bytes_moved += size;
                *self.by_category.entry(outcome.category).or_insert(0) += 1;
            }
            StatusKind::Skipped => {
                self.skipped += 1;
                self.issues.push(outcome);
            }
            StatusKind::Failed => {
                self.failed += 1;
                self.issues.push(outcome);
            }
        }
    }

    /// Number of candidates processed.
    pub fn total(&self) -> usize {
        self.moved + self.skipped + self.failed
    }

    /// True if nothing was skipped, failed, or left unread.
    pub fn is_clean(&self) -> bool {
        self.skipped == 0 && self.failed == 0 && self.unreadable.is_empty()
    }
}

/// Runs `request` to completion, reporting to `reporter`.
///
/// # Errors
///
/// Returns [`PreflightError`] if the source or destination is not a writable directory. In that
/// case nothing on disk has been touched. Per-file problems never produce an error; they are
/// recorded in the [`Outcome`].
pub fn run<R: Reporter>(request: Request, reporter: R) -> Result<Outcome, PreflightError> {
    run_with_cancel(request, reporter, &CancelFlag::new())
}

/// Like [`run`], stopping before the next candidate once `cancel` is set.
pub fn run_with_cancel<R: Reporter>(
    request: Request,
    mut reporter: R,
    cancel: &CancelFlag,
) -> Result<Outcome, PreflightError> {
    let source = validate(&request.source)
        .map_err(PreflightError::Source)
        .and_then(|source| {
            validate(&request.destination)
                .map_err(PreflightError::Destination)
                .map(|destination| (source, destination))
        });
    let (source, destination) = match source {
        Ok(paths) => paths,
        Err(err) => {
            warn!(error = %err, "pre-flight validation failed");
            reporter.diagnostic(&Diagnostic {
                kind: DiagnosticKind::Preflight,
                path: Some(err.validation().path().clone()),
                message: err.to_string(),
            });
            return Err(err);
        }
    };

    info!(
        source = %source.as_path().display(),
        destination = %destination.as_path().display(),
        sort = request.sort_into_categories,
        recursive = request.recursive,
        dry_run = request.dry_run,
        "starting run"
    );

    let pruned = output_dirs_within(
        source.as_path(),
        destination.as_path(),
        request.sort_into_categories,
        request.recursive,
    );
    let mut traverser = Traverser::new(source.as_path(), request.recursive)
        .with_filter(request.type_filter)
        .with_exclusions(request.exclusions)
        .prune(pruned);

    let mut transfer = Transfer {
        destination: destination.into_path_buf(),
        sort_into_categories: request.sort_into_categories,
        mode: request.mode,
        dry_run: request.dry_run,
        planned: HashSet::new(),
    };
    let mut outcome = Outcome::new(request.dry_run);

    loop {
        if cancel.is_cancelled() {
            info!(processed = outcome.total(), "run cancelled");
            outcome.cancelled = true;
            reporter.diagnostic(&Diagnostic {
                kind: DiagnosticKind::Cancelled,
                path: None,
                message: format!("cancelled after {} files", outcome.total()),
            });
            break;
        }

        let Some(item) = traverser.next() else {
            break;
        };

        match item {
            TraversalItem::Unreadable(err) => {
                warn!(error = %err, "skipping unreadable directory");
                reporter.diagnostic(&Diagnostic {
                    kind: DiagnosticKind::SubdirectoryUnreadable,
                    path: Some(err.path.clone()),
                    message: err.to_string(),
                });
                outcome.unreadable.push(err.path);
            }
            TraversalItem::Candidate(candidate) => {
                let size = candidate.size;
                let file_outcome = transfer.process(candidate);
                reporter.file(&file_outcome);
                outcome.record(file_outcome, size);
            }
        }
    }

    outcome.finished_at = Utc::now();
    info!(
        moved = outcome.moved,
        skipped = outcome.skipped,
        failed = outcome.failed,
        "run finished"
    );
    Ok(outcome)
}

/// Per-run transfer state.
struct Transfer {
    destination: PathBuf,
    sort_into_categories: bool,
    mode: TransferMode,
    dry_run: bool,
    /// Targets claimed so far in a dry run, standing in for files that would now exist.
    planned: HashSet<PathBuf>,
}

impl Transfer {
    fn target_dir(&self, category: Category) -> PathBuf {
        if self.sort_into_categories {
            self.destination.join(category.dir_name())
        } else {
            self.destination.clone()
        }
    }

    fn process(&mut self, candidate: Candidate) -> FileOutcome {
        let category = classify(&candidate.extension);
        let target_dir = self.target_dir(category);

        let Some(file_name) = candidate.path.file_name() else {
            let status = FileStatus::Failed(TransferError::NoFileName {
                path: candidate.path.clone(),
            });
            return FileOutcome {
                source: candidate.path,
                destination: target_dir,
                category,
                status,
            };
        };
        let target = target_dir.join(file_name);

        let status = self.transfer(&candidate.path, &target_dir, &target);
        debug!(
            file = %candidate.path.display(),
            target = %target.display(),
            size = candidate.size,
            status = %status.kind(),
            "processed candidate"
        );
        if let FileStatus::Failed(err) = &status {
            warn!(error = %err, "transfer failed");
        }

        FileOutcome {
            source: candidate.path,
            destination: target,
            category,
            status,
        }
    }

    fn transfer(&mut self, source: &Path, target_dir: &Path, target: &Path) -> FileStatus {
        if source == target {
            return FileStatus::Skipped(SkipReason::AlreadyInPlace);
        }
        // symlink_metadata so a dangling link still counts as occupied
        if target.symlink_metadata().is_ok() || self.planned.contains(target) {
            return FileStatus::Skipped(SkipReason::DestinationExists);
        }

        if self.dry_run {
            self.planned.insert(target.to_path_buf());
            return FileStatus::Moved;
        }

        if self.sort_into_categories
            && let Err(source) = fs::create_dir_all(target_dir)
        {
            return FileStatus::Failed(TransferError::CreateDir {
                path: target_dir.to_path_buf(),
                source,
            });
        }

        let result = match self.mode {
            TransferMode::Move => {
                rename_no_replace(source, target).map_err(|e| TransferError::Move {
                    from: source.to_path_buf(),
                    to: target.to_path_buf(),
                    source: e,
                })
            }
            TransferMode::Copy => copy_no_replace(source, target)
                .map(|_| ())
                .map_err(|e| TransferError::Copy {
                    from: source.to_path_buf(),
                    to: target.to_path_buf(),
                    source: e,
                }),
        };

        match result {
            Ok(()) => FileStatus::Moved,
            // a file appeared at the target after the existence check
            Err(TransferError::Move { source: err, .. } | TransferError::Copy { source: err, .. })
                if err.kind() == io::ErrorKind::AlreadyExists =>
            {
                FileStatus::Skipped(SkipReason::DestinationExists)
            }
            Err(err) => FileStatus::Failed(err),
        }
    }
}

/// Renames `from` to `to`, failing with `AlreadyExists` rather than replacing `to`.
fn rename_no_replace(from: &Path, to: &Path) -> io::Result<()> {
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    {
        use nix::errno::Errno;
        use nix::fcntl::{RenameFlags, renameat2};

        match renameat2(None, from, None, to, RenameFlags::RENAME_NOREPLACE) {
            Ok(()) => return Ok(()),
            // filesystem without RENAME_NOREPLACE
            Err(Errno::EINVAL | Errno::ENOSYS) => {}
            Err(errno) => return Err(errno.into()),
        }
    }

    if to.symlink_metadata().is_ok() {
        return Err(io::Error::from(io::ErrorKind::AlreadyExists));
    }
    fs::rename(from, to)
}

/// Copies `from` to a newly created `to`, keeping permissions. Never opens an existing `to`.
fn copy_no_replace(from: &Path, to: &Path) -> io::Result<u64> {
    let mut reader = File::open(from)?;
    let permissions = reader.metadata()?.permissions();
    let mut writer = OpenOptions::new().write(true).create_new(true).open(to)?;

    let copied = io::copy(&mut reader, &mut writer).and_then(|bytes| {
        writer.set_permissions(permissions)?;
        Ok(bytes)
    });
    if copied.is_err() {
        let _ = fs::remove_file(to);
    }
    copied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::{NullReporter, RecordingReporter};
    use tempfile::TempDir;

    fn dirs() -> (TempDir, PathBuf, PathBuf) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir(&src).unwrap();
        fs::create_dir(&dst).unwrap();
        (temp_dir, src, dst)
    }

    #[test]
    fn test_flat_move() {
        let (_tmp, src, dst) = dirs();
        fs::write(src.join("a.jpg"), "a").unwrap();
        fs::write(src.join("b.txt"), "b").unwrap();

        let outcome = run(Request::new(&src, &dst), NullReporter).unwrap();

        assert_eq!((outcome.moved, outcome.skipped, outcome.failed), (2, 0, 0));
        assert_eq!(outcome.bytes_moved, 2);
        assert!(outcome.issues.is_empty());
        assert!(dst.join("a.jpg").is_file());
        assert!(!src.join("a.jpg").exists());
    }

    #[test]
    fn test_sorted_copy_keeps_sources() {
        let (_tmp, src, dst) = dirs();
        fs::write(src.join("a.jpg"), "a").unwrap();

        let request = Request {
            sort_into_categories: true,
            mode: TransferMode::Copy,
            ..Request::new(&src, &dst)
        };
        let outcome = run(request, NullReporter).unwrap();

        assert_eq!(outcome.moved, 1);
        assert_eq!(outcome.by_category.get(&Category::Images), Some(&1));
        assert!(src.join("a.jpg").is_file());
        assert!(dst.join("Images/a.jpg").is_file());
    }

    #[test]
    fn test_conflict_is_skipped_and_preserved() {
        let (_tmp, src, dst) = dirs();
        fs::write(src.join("a.txt"), "new").unwrap();
        fs::write(dst.join("a.txt"), "old").unwrap();

        let mut reporter = RecordingReporter::new();
        let outcome = run(Request::new(&src, &dst), &mut reporter).unwrap();

        assert_eq!(outcome.skipped, 1);
        assert!(matches!(
            outcome.issues[0].status,
            FileStatus::Skipped(SkipReason::DestinationExists)
        ));
        assert_eq!(fs::read_to_string(dst.join("a.txt")).unwrap(), "old");
        assert_eq!(fs::read_to_string(src.join("a.txt")).unwrap(), "new");
        assert_eq!(reporter.files.len(), 1);
        assert_eq!(reporter.files[0].status, StatusKind::Skipped);
        assert_eq!(reporter.files[0].reason.as_deref(), Some("destination exists"));
    }

    #[test]
    fn test_dry_run_touches_nothing_but_detects_collisions() {
        let (_tmp, src, dst) = dirs();
        fs::create_dir(src.join("sub")).unwrap();
        fs::write(src.join("a.txt"), "1").unwrap();
        fs::write(src.join("sub/a.txt"), "2").unwrap();

        let request = Request {
            recursive: true,
            sort_into_categories: true,
            dry_run: true,
            ..Request::new(&src, &dst)
        };
        let outcome = run(request, NullReporter).unwrap();

        assert!(outcome.dry_run);
        assert_eq!((outcome.moved, outcome.skipped), (1, 1));
        assert!(src.join("a.txt").is_file());
        assert!(src.join("sub/a.txt").is_file());
        assert!(!dst.join("Documents").exists());
    }

    #[test]
    fn test_same_directory_flat_is_already_in_place() {
        let (_tmp, src, _dst) = dirs();
        fs::write(src.join("a.txt"), "a").unwrap();

        let outcome = run(Request::new(&src, &src), NullReporter).unwrap();

        assert_eq!(outcome.skipped, 1);
        assert!(matches!(
            outcome.issues[0].status,
            FileStatus::Skipped(SkipReason::AlreadyInPlace)
        ));
        assert!(src.join("a.txt").is_file());
    }

    #[test]
    fn test_category_dir_blocked_by_file_fails_candidate() {
        let (_tmp, src, dst) = dirs();
        fs::write(src.join("a.png"), "a").unwrap();
        fs::write(src.join("b.zzz"), "b").unwrap();
        fs::write(dst.join("Images"), "not a directory").unwrap();

        let request = Request {
            sort_into_categories: true,
            ..Request::new(&src, &dst)
        };
        let outcome = run(request, NullReporter).unwrap();

        assert_eq!((outcome.moved, outcome.failed), (1, 1));
        assert!(matches!(
            outcome.issues[0].status,
            FileStatus::Failed(TransferError::CreateDir { .. })
        ));
        assert!(src.join("a.png").is_file());
        assert!(dst.join("Other/b.zzz").is_file());
    }

    #[test]
    fn test_missing_source_is_preflight_error() {
        let (_tmp, src, dst) = dirs();
        let mut reporter = RecordingReporter::new();

        let err = run(Request::new(src.join("nope"), &dst), &mut reporter).unwrap_err();

        assert!(matches!(err, PreflightError::Source(_)));
        assert_eq!(reporter.diagnostics.len(), 1);
        assert_eq!(reporter.diagnostics[0].kind, DiagnosticKind::Preflight);
        assert!(reporter.files.is_empty());
    }

    #[test]
    fn test_rename_refuses_to_replace_existing_target() {
        let (_tmp, src, dst) = dirs();
        fs::write(src.join("a.txt"), "new").unwrap();
        fs::write(dst.join("a.txt"), "old").unwrap();

        let err = rename_no_replace(&src.join("a.txt"), &dst.join("a.txt")).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(dst.join("a.txt")).unwrap(), "old");
        assert_eq!(fs::read_to_string(src.join("a.txt")).unwrap(), "new");
    }

    #[test]
    fn test_copy_refuses_to_replace_existing_target() {
        let (_tmp, src, dst) = dirs();
        fs::write(src.join("a.txt"), "new").unwrap();
        fs::write(dst.join("a.txt"), "old").unwrap();

        let err = copy_no_replace(&src.join("a.txt"), &dst.join("a.txt")).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(dst.join("a.txt")).unwrap(), "old");
    }

    #[test]
    fn test_copy_creates_target_with_contents() {
        let (_tmp, src, dst) = dirs();
        fs::write(src.join("a.txt"), "hello").unwrap();

        let bytes = copy_no_replace(&src.join("a.txt"), &dst.join("a.txt")).unwrap();

        assert_eq!(bytes, 5);
        assert_eq!(fs::read_to_string(dst.join("a.txt")).unwrap(), "hello");
        assert!(src.join("a.txt").is_file());
    }

    #[test]
    fn test_cancelled_before_start_processes_nothing() {
        let (_tmp, src, dst) = dirs();
        fs::write(src.join("a.txt"), "a").unwrap();
        let cancel = CancelFlag::new();
        cancel.cancel();

        let outcome = run_with_cancel(Request::new(&src, &dst), NullReporter, &cancel).unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.total(), 0);
        assert!(src.join("a.txt").is_file());
    }

    #[test]
    fn test_cancel_between_candidates() {
        struct CancelAfterFirst(CancelFlag);

        impl Reporter for CancelAfterFirst {
            fn file(&mut self, _outcome: &FileOutcome) {
                self.0.cancel();
            }

            fn diagnostic(&mut self, _diagnostic: &Diagnostic) {}
        }

        let (_tmp, src, dst) = dirs();
        fs::write(src.join("a.txt"), "a").unwrap();
        fs::write(src.join("b.txt"), "b").unwrap();
        let cancel = CancelFlag::new();

        let outcome = run_with_cancel(
            Request::new(&src, &dst),
            CancelAfterFirst(cancel.clone()),
            &cancel,
        )
        .unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.moved, 1);
        assert!(dst.join("a.txt").is_file());
        assert!(src.join("b.txt").is_file());
    }
}
