//! Lazy discovery of candidate files under a source directory.
//!
//! Directories are read one at a time, children in file-name order, so identical trees always
//! produce the same sequence. A directory that cannot be listed yields a
//! [`TraversalItem::Unreadable`] and the walk carries on with its siblings.

use crate::config::CompiledFilters;
use crate::error::TraversalError;
use crate::file_category::{Category, TypeFilter, extension_of};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// A regular file eligible for transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Lower-cased final extension without the dot; empty if the file has none.
    pub extension: String,
    /// Size in bytes at discovery time.
    pub size: u64,
}

/// One step of a traversal.
#[derive(Debug)]
pub enum TraversalItem {
    Candidate(Candidate),
    Unreadable(TraversalError),
}

/// Iterator over the candidates below a root directory.
///
/// Not restartable: iterate again by building a new traverser.
pub struct Traverser {
    root: PathBuf,
    walker: walkdir::IntoIter,
    filter: TypeFilter,
    exclusions: Option<CompiledFilters>,
    pruned: Vec<PathBuf>,
}

/// Walks `root` and yields its regular files.
///
/// Non-recursive traversal only looks at the direct children of `root`. Files whose extension
/// `filter` rejects are silently skipped.
pub fn traverse(root: &Path, recursive: bool, filter: &TypeFilter) -> Traverser {
    Traverser::new(root, recursive).with_filter(filter.clone())
}

impl Traverser {
    pub fn new(root: &Path, recursive: bool) -> Self {
        let max_depth = if recursive { usize::MAX } else { 1 };
        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(max_depth)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        Self {
            root: root.to_path_buf(),
            walker,
            filter: TypeFilter::All,
            exclusions: None,
            pruned: Vec::new(),
        }
    }

    /// Only yield files whose extension passes `filter`.
    pub fn with_filter(mut self, filter: TypeFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Drop files the exclusion rules reject.
    pub fn with_exclusions(mut self, exclusions: Option<CompiledFilters>) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Never descend into these directories.
    pub fn prune<I: IntoIterator<Item = PathBuf>>(mut self, dirs: I) -> Self {
        self.pruned.extend(dirs);
        self
    }

    fn descends_into(&self, dir: &Path) -> bool {
        match &self.exclusions {
            Some(exclusions) => {
                let relative = dir.strip_prefix(&self.root).unwrap_or(dir);
                exclusions.should_descend(relative)
            }
            None => true,
        }
    }

    fn accepts(&self, path: &Path, extension: &str) -> bool {
        if !self.filter.allows(extension) {
            return false;
        }

        match &self.exclusions {
            Some(exclusions) => {
                let relative = path.strip_prefix(&self.root).unwrap_or(path);
                exclusions.should_include(relative)
            }
            None => true,
        }
    }
}

impl Iterator for Traverser {
    type Item = TraversalItem;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(source) => {
                    let path = source
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    return Some(TraversalItem::Unreadable(TraversalError { path, source }));
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                if self.pruned.iter().any(|dir| dir == entry.path()) {
                    debug!(dir = %entry.path().display(), "not descending into output directory");
                    self.walker.skip_current_dir();
                } else if !self.descends_into(entry.path()) {
                    debug!(dir = %entry.path().display(), "not descending into excluded directory");
                    self.walker.skip_current_dir();
                }
                continue;
            }
            if !file_type.is_file() {
                continue;
            }

            let path = entry.into_path();
            let extension = extension_of(&path);
            if !self.accepts(&path, &extension) {
                trace!(file = %path.display(), "filtered out");
                continue;
            }

            let size = path.metadata().map(|m| m.len()).unwrap_or(0);
            return Some(TraversalItem::Candidate(Candidate {
                path,
                extension,
                size,
            }));
        }
    }
}

/// Directories under `source` that hold this run's own output and must not be walked.
///
/// Only matters in recursive mode when the destination is inside (or equal to) the source:
/// category folders when sorting, otherwise the whole destination subtree.
pub fn output_dirs_within(
    source: &Path,
    destination: &Path,
    sort_into_categories: bool,
    recursive: bool,
) -> Vec<PathBuf> {
    if !recursive || !destination.starts_with(source) {
        return Vec::new();
    }

    if sort_into_categories {
        Category::ALL
            .iter()
            .map(|category| destination.join(category.dir_name()))
            .collect()
    } else if destination != source {
        vec![destination.to_path_buf()]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn candidates(traverser: Traverser) -> Vec<PathBuf> {
        traverser
            .filter_map(|item| match item {
                TraversalItem::Candidate(c) => Some(c.path),
                TraversalItem::Unreadable(_) => None,
            })
            .collect()
    }

    fn tree() -> TempDir {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("b.txt"), "b").unwrap();
        fs::write(root.join("a.JPG"), "a").unwrap();
        fs::create_dir_all(root.join("sub/deeper")).unwrap();
        fs::write(root.join("sub/c.pdf"), "c").unwrap();
        fs::write(root.join("sub/deeper/d.png"), "d").unwrap();
        temp_dir
    }

    #[test]
    fn test_non_recursive_yields_direct_files_only() {
        let temp_dir = tree();
        let root = temp_dir.path();

        let found = candidates(traverse(root, false, &TypeFilter::All));
        assert_eq!(found, vec![root.join("a.JPG"), root.join("b.txt")]);
    }

    #[test]
    fn test_recursive_yields_every_file_once_in_stable_order() {
        let temp_dir = tree();
        let root = temp_dir.path();

        let first = candidates(traverse(root, true, &TypeFilter::All));
        let second = candidates(traverse(root, true, &TypeFilter::All));

        assert_eq!(
            first,
            vec![
                root.join("a.JPG"),
                root.join("b.txt"),
                root.join("sub/c.pdf"),
                root.join("sub/deeper/d.png"),
            ]
        );
        assert_eq!(first, second);
    }

    #[test]
    fn test_candidate_fields() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("Photo.JPEG"), "12345").unwrap();

        let item = traverse(temp_dir.path(), false, &TypeFilter::All)
            .next()
            .expect("one candidate");
        let TraversalItem::Candidate(candidate) = item else {
            panic!("expected a candidate");
        };
        assert_eq!(candidate.extension, "jpeg");
        assert_eq!(candidate.size, 5);
    }

    #[test]
    fn test_type_filter_excludes_silently() {
        let temp_dir = tree();
        let root = temp_dir.path();

        let filter = TypeFilter::from_extensions(["jpg", "png"]);
        let found = candidates(traverse(root, true, &filter));
        assert_eq!(found, vec![root.join("a.JPG"), root.join("sub/deeper/d.png")]);
    }

    #[test]
    fn test_exclusions_use_relative_paths() {
        let temp_dir = tree();
        let root = temp_dir.path();
        let exclusions = crate::config::FilterConfig::from_toml_str(
            "[filters.exclude]\npatterns = [\"sub/**\"]\n",
        )
        .unwrap()
        .compile()
        .unwrap();

        let found = candidates(Traverser::new(root, true).with_exclusions(Some(exclusions)));
        assert_eq!(found, vec![root.join("a.JPG"), root.join("b.txt")]);
    }

    #[test]
    fn test_default_exclusions_skip_hidden_directories() {
        let temp_dir = tree();
        let root = temp_dir.path();
        fs::create_dir_all(root.join(".git/objects")).unwrap();
        fs::write(root.join(".git/config"), "[core]").unwrap();
        fs::write(root.join(".git/objects/ab"), "blob").unwrap();
        let exclusions = crate::config::FilterConfig::default().compile().unwrap();

        let found = candidates(Traverser::new(root, true).with_exclusions(Some(exclusions)));
        assert_eq!(
            found,
            vec![
                root.join("a.JPG"),
                root.join("b.txt"),
                root.join("sub/c.pdf"),
                root.join("sub/deeper/d.png"),
            ]
        );
    }

    #[test]
    fn test_pruned_directories_are_not_walked() {
        let temp_dir = tree();
        let root = temp_dir.path();

        let found = candidates(Traverser::new(root, true).prune([root.join("sub/deeper")]));
        assert!(!found.contains(&root.join("sub/deeper/d.png")));
        assert!(found.contains(&root.join("sub/c.pdf")));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_not_candidates() {
        let temp_dir = tree();
        let root = temp_dir.path();
        std::os::unix::fs::symlink(root.join("b.txt"), root.join("link.txt")).unwrap();

        let found = candidates(traverse(root, false, &TypeFilter::All));
        assert!(!found.contains(&root.join("link.txt")));
    }

    #[test]
    fn test_output_dirs_within() {
        let src = Path::new("/data/in");

        assert!(output_dirs_within(src, Path::new("/data/in/out"), true, false).is_empty());
        assert!(output_dirs_within(src, Path::new("/elsewhere"), true, true).is_empty());

        let sorted = output_dirs_within(src, src, true, true);
        assert_eq!(sorted.len(), Category::ALL.len());
        assert!(sorted.contains(&PathBuf::from("/data/in/Images")));
        assert!(sorted.contains(&PathBuf::from("/data/in/Other")));

        assert_eq!(
            output_dirs_within(src, Path::new("/data/in/out"), false, true),
            vec![PathBuf::from("/data/in/out")]
        );
        assert!(output_dirs_within(src, src, false, true).is_empty());
    }
}
