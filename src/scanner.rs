//! Source scanning for `find`.
//!
//! Walks a project, pulls the string arguments of translation helper calls out
//! of every matching file, and seeds the store with what it finds.

/// Helper call extraction
mod extractor;
pub mod matcher;

use std::collections::{
    BTreeSet,
    HashMap,
};
use std::path::{
    Path,
    PathBuf,
};

use ignore::WalkBuilder;
use serde_json::{
    Map,
    Value,
};

pub use self::extractor::{
    KeyExtractor,
    classify,
};
use self::matcher::SourceMatcher;
use crate::address::GroupKind;
use crate::config::FindConfig;
use crate::input::translation::{
    LoadError,
    TranslationLoader,
    flatten_tree,
};
use crate::store::{
    StoreError,
    TranslationStore,
};
use crate::types::{
    JSON_GROUP,
    UpsertOutcome,
};

#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    #[error("Invalid include pattern '{pattern}': {source}")]
    InvalidIncludePattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Invalid exclude pattern '{pattern}': {source}")]
    InvalidExcludePattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Failed to build glob set: {0}")]
    GlobSetBuild(#[from] globset::Error),

    #[error("Invalid helper function pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Directory {} does not exist", path.display())]
    MissingDirectory { path: PathBuf },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A key referenced from source code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Candidate {
    pub group: String,
    pub key: String,
}

impl Candidate {
    #[must_use]
    pub fn new(group: &str, key: &str) -> Self {
        Self { group: group.to_string(), key: key.to_string() }
    }
}

/// Counts of a `find` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindSummary {
    pub candidates: usize,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl FindSummary {
    #[must_use]
    pub const fn changed(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Finds translation keys in project sources.
#[derive(Debug, Clone)]
pub struct Scanner {
    /// `find` section of the settings.
    config: FindConfig,
    /// Compiled helper pattern.
    extractor: KeyExtractor,
}

impl Scanner {
    /// Compiles the helper pattern and checks the globs.
    pub fn new(config: &FindConfig) -> Result<Self, ScannerError> {
        SourceMatcher::new(PathBuf::new(), config)?;
        let extractor = KeyExtractor::new(&config.functions)?;
        Ok(Self { config: config.clone(), extractor })
    }

    /// Sorted, de-duplicated candidates from every source file below `root`.
    pub fn scan(&self, root: &Path) -> Result<Vec<Candidate>, ScannerError> {
        if !root.is_dir() {
            return Err(ScannerError::MissingDirectory { path: root.to_path_buf() });
        }

        let matcher = SourceMatcher::new(root.to_path_buf(), &self.config)?;
        let mut found = BTreeSet::new();
        let mut files = 0_usize;

        for result in WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(false)
            .build()
        {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_some_and(|ft| ft.is_file()) || !matcher.is_source_file(path) {
                continue;
            }

            let content = match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!("Failed to read file {:?}: {}", path, e);
                    continue;
                }
            };

            files += 1;
            found.extend(self.scan_source(&content));
        }

        tracing::info!("Scanned {} files, found {} keys", files, found.len());
        Ok(found.into_iter().collect())
    }

    /// Candidates of a single source text, in order of appearance.
    #[must_use]
    pub fn scan_source(&self, source: &str) -> Vec<Candidate> {
        self.extractor.extract(source)
    }
}

/// Adds every candidate to the store for `locale` without touching existing
/// values.
///
/// Seeded values come from the locale's own files when they hold the key. A
/// JSON key falls back to itself, a group key to the empty string.
pub fn seed_candidates<S, L>(
    store: &mut S,
    loader: &L,
    candidates: &[Candidate],
    locale: &str,
) -> Result<FindSummary, ScannerError>
where
    S: TranslationStore + ?Sized,
    L: TranslationLoader + ?Sized,
{
    let mut summary = FindSummary { candidates: candidates.len(), ..FindSummary::default() };
    let mut known: HashMap<String, HashMap<String, Value>> = HashMap::new();

    for candidate in candidates {
        if !known.contains_key(&candidate.group) {
            let tree = loader.load(locale, &GroupKind::parse(&candidate.group))?;
            known.insert(candidate.group.clone(), existing_values(candidate, tree));
        }

        let existing = known.get(&candidate.group).and_then(|values| values.get(&candidate.key));
        let value = match existing {
            Some(value) => value.clone(),
            None if candidate.group == JSON_GROUP => Value::String(candidate.key.clone()),
            None => Value::String(String::new()),
        };

        let outcome =
            store.upsert_locale_value(&candidate.group, &candidate.key, locale, value, false)?;
        match outcome {
            UpsertOutcome::Inserted => summary.inserted += 1,
            UpsertOutcome::Updated => summary.updated += 1,
            UpsertOutcome::Skipped => summary.skipped += 1,
        }
    }

    Ok(summary)
}

/// Flat key → value view of a loaded group.
fn existing_values(candidate: &Candidate, tree: Option<Map<String, Value>>) -> HashMap<String, Value> {
    let Some(tree) = tree else {
        return HashMap::new();
    };
    if candidate.group == JSON_GROUP {
        return tree.into_iter().collect();
    }
    flatten_tree(&tree).into_iter().collect()
}
