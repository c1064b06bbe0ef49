//! Exclusion rules loaded from an optional TOML file.
//!
//! The file is only ever read. Rules decide which files the traverser drops before they become
//! candidates; dropped files are never reported.
//!
//! ```toml
//! [filters]
//! enable_hidden_files = false
//!
//! [filters.exclude]
//! filenames = [".DS_Store", "Thumbs.db"]
//! patterns = ["*.tmp", "**/node_modules/**"]
//! extensions = ["bak", "tmp"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//! ```
//!
//! Glob patterns are matched against the path relative to the source directory.

use crate::error::ConfigError;
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".sorterrc.toml";

/// Exclusion configuration as written in TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub filters: FilterRules,
}

/// Root-level filter rules configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether files whose name starts with ".", or that live under such a directory, are
    /// candidates. Defaults to false.
    #[serde(default)]
    pub enable_hidden_files: bool,

    /// Rules for excluding files.
    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Rules for including files (whitelist, overrides exclude rules).
    #[serde(default)]
    pub include: IncludeRules,
}

/// Rules for excluding files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames to exclude (e.g., ".DS_Store", "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns to exclude (e.g., "*.tmp", "node_modules/**").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// File extensions to exclude (e.g., "bak", "tmp", "log").
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regex patterns matched against the file name.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// Rules for including files, overriding exclude rules (whitelist).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    /// Glob patterns that override exclude rules.
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl FilterConfig {
    /// Load configuration, falling back to defaults.
    ///
    /// Lookup order:
    /// 1. `config_path`, if given (it must exist)
    /// 2. `.sorterrc.toml` in the current directory
    /// 3. `~/.config/sorter/config.toml`
    /// 4. Built-in defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.is_file() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("sorter")
                .join("config.toml");
            if home_config.is_file() {
                return Self::load_from_file(&home_config);
            }
        }

        debug!("no configuration file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded configuration");

        Self::from_toml_str(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Compile into matchers, validating every glob and regex.
    pub fn compile(self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(self.filters)
    }
}

/// Pre-compiled exclusion rules, ready for per-file matching.
#[derive(Debug, Clone)]
pub struct CompiledFilters {
    enable_hidden_files: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|source| ConfigError::InvalidGlobPattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

impl CompiledFilters {
    fn new(rules: FilterRules) -> Result<Self, ConfigError> {
        let exclude_patterns = compile_globs(&rules.exclude.patterns)?;
        let include_patterns = compile_globs(&rules.include.patterns)?;

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            enable_hidden_files: rules.enable_hidden_files,
            exclude_filenames: rules.exclude.filenames.into_iter().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| crate::file_category::normalize_extension(ext))
                .collect(),
            exclude_patterns,
            exclude_regexes,
            include_patterns,
        })
    }

    /// Check whether the traverser may enter a directory.
    ///
    /// Hidden directories are skipped outright while hidden files are disabled, unless include
    /// patterns exist that could match something inside them.
    pub fn should_descend(&self, relative_dir: &Path) -> bool {
        self.enable_hidden_files || !self.include_patterns.is_empty() || !is_hidden(relative_dir)
    }

    /// Check whether a file stays a candidate.
    ///
    /// `relative_path` is the file's path relative to the source root. Checks run in order,
    /// first decisive one wins:
    /// 1. Include patterns - if matched, include
    /// 2. Hidden file or hidden parent directory - if disabled, exclude
    /// 3. Exact filename - exclude
    /// 4. Extension - exclude
    /// 5. Glob pattern - exclude
    /// 6. Regex on the file name - exclude
    /// 7. Otherwise include
    pub fn should_include(&self, relative_path: &Path) -> bool {
        let file_name = relative_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self
            .include_patterns
            .iter()
            .any(|pattern| pattern.matches_path(relative_path))
        {
            return true;
        }

        if !self.enable_hidden_files && is_hidden(relative_path) {
            return false;
        }

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return false;
        }

        let ext = crate::file_category::extension_of(relative_path);
        if !ext.is_empty() && self.exclude_extensions.contains(&ext) {
            return false;
        }

        if self
            .exclude_patterns
            .iter()
            .any(|pattern| pattern.matches_path(relative_path))
        {
            return false;
        }

        !self
            .exclude_regexes
            .iter()
            .any(|regex| regex.is_match(&file_name))
    }
}

/// True if any component of `relative_path` is a dot-file or dot-directory.
fn is_hidden(relative_path: &Path) -> bool {
    relative_path.components().any(|component| match component {
        Component::Normal(name) => name.to_string_lossy().starts_with('.'),
        _ => false,
    })
}
