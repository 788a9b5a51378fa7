//! Include/exclude glob matching of source files.

use std::path::{
    Path,
    PathBuf,
};

use globset::{
    Glob,
    GlobSet,
    GlobSetBuilder,
};

use super::ScannerError;
use crate::config::FindConfig;

/// Matches files against the configured `find` globs.
#[derive(Debug, Clone)]
pub struct SourceMatcher {
    /// Root the globs are relative to.
    root: PathBuf,
    /// `includePatterns`
    include_set: GlobSet,
    /// `excludePatterns`
    exclude_set: GlobSet,
}

impl SourceMatcher {
    /// Creates a new matcher for files below `root`.
    pub fn new(root: PathBuf, config: &FindConfig) -> Result<Self, ScannerError> {
        let include_set = Self::build_glob_set(&config.include_patterns, |pattern, source| {
            ScannerError::InvalidIncludePattern { pattern, source }
        })?;

        let exclude_set = Self::build_glob_set(&config.exclude_patterns, |pattern, source| {
            ScannerError::InvalidExcludePattern { pattern, source }
        })?;

        Ok(Self { root, include_set, exclude_set })
    }

    /// Compiles one pattern list, reporting the offending pattern.
    fn build_glob_set<F>(patterns: &[String], make_error: F) -> Result<GlobSet, ScannerError>
    where
        F: Fn(String, globset::Error) -> ScannerError,
    {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| make_error(pattern.clone(), e))?;
            builder.add(glob);
        }
        Ok(builder.build()?)
    }

    /// Returns true if the path matches `includePatterns` but not `excludePatterns`.
    ///
    /// The path must be under the root.
    #[must_use]
    pub fn is_source_file(&self, path: &Path) -> bool {
        let Some(relative_path) = path.strip_prefix(&self.root).ok() else {
            return false;
        };

        self.is_source_file_relative(relative_path)
    }

    /// Returns true if the path matches `includePatterns` but not `excludePatterns`.
    ///
    /// The path must be relative to the root.
    #[must_use]
    pub fn is_source_file_relative(&self, relative_path: &Path) -> bool {
        self.include_set.is_match(relative_path) && !self.exclude_set.is_match(relative_path)
    }
}
