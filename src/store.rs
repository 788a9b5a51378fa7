//! Persistence of translation rows.
//!
//! A row holds every locale's value of one (group, key) as a single JSON
//! object. The engines only talk to [`TranslationStore`]; [`sqlite`] is the
//! backend used by the command line.

pub mod sqlite;

use serde_json::Value;

use crate::config::Settings;
use crate::filter::GroupPattern;
use crate::types::{
    TranslationRow,
    UpsertOutcome,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Stored translations of ({group}, {key}) are not a JSON object: {source}")]
    InvalidBlob {
        group: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Names of the table and its columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table: String,
    pub group_column: String,
    pub key_column: String,
    pub translations_column: String,
    pub status_column: Option<String>,
}

impl TableSchema {
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            table: settings.table.clone(),
            group_column: settings.group_column.clone(),
            key_column: settings.key_column.clone(),
            translations_column: settings.translations_column.clone(),
            status_column: settings.status_column.clone(),
        }
    }
}

impl Default for TableSchema {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Row-level operations the engines and housekeeping commands need.
pub trait TranslationStore {
    /// Looks up one row.
    fn find(&self, group: &str, key: &str) -> Result<Option<TranslationRow>, StoreError>;

    /// Merges one locale value into the row of (group, key), creating the row
    /// when it does not exist.
    ///
    /// An existing locale value is replaced when `overwrite` is set or when it
    /// is empty; otherwise the call is skipped. Each call is atomic.
    fn upsert_locale_value(
        &mut self,
        group: &str,
        key: &str,
        locale: &str,
        value: Value,
        overwrite: bool,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Every group present, sorted.
    fn distinct_groups(&self) -> Result<Vec<String>, StoreError>;

    /// Rows of one group in insertion order.
    fn rows_for_group(&self, group: &str) -> Result<Vec<TranslationRow>, StoreError>;

    /// Deletes rows whose blob is missing, not an object, or holds only empty
    /// values. Returns the number of deleted rows.
    fn delete_where_all_locales_empty(&mut self) -> Result<usize, StoreError>;

    /// Deletes rows whose group matches any pattern; `None` deletes every row.
    fn delete_by_group_pattern(
        &mut self,
        patterns: Option<&[GroupPattern]>,
    ) -> Result<usize, StoreError>;

    /// Flags the rows of a group as written to disk. No-op without a status
    /// column.
    fn mark_group_saved(&mut self, group: &str) -> Result<usize, StoreError>;

    /// Every row, in insertion order.
    fn all_rows(&self) -> Result<Vec<TranslationRow>, StoreError>;
}
