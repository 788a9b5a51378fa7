//! Core types used throughout the project.

use serde_json::{
    Map,
    Value,
};

/// Sentinel group holding the flat JSON namespace.
pub const JSON_GROUP: &str = "_json";

/// Status written by export once a row has been flushed to disk.
pub const STATUS_SAVED: i64 = 0;
/// Status written whenever an import or find changes a row.
pub const STATUS_CHANGED: i64 = 1;

/// Per-locale values of one (group, key), persisted as a single JSON object.
///
/// Locale order is insertion order, so `{"en": .., "fr": ..}` is re-encoded the
/// way it was first written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocaleValues(Map<String, Value>);

impl LocaleValues {
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builds a blob holding a single locale.
    #[must_use]
    pub fn single(locale: &str, value: Value) -> Self {
        let mut map = Map::new();
        map.insert(locale.to_string(), value);
        Self(map)
    }

    /// Decodes a stored blob.
    ///
    /// `null` and the empty string decode to an empty blob; any other non-object
    /// JSON is an error.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        match serde_json::from_str::<Value>(text)? {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::new()),
            other => Err(serde::de::Error::custom(format!(
                "expected a JSON object of locale values, found {other}"
            ))),
        }
    }

    #[must_use]
    pub fn encode(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    #[must_use]
    pub fn get(&self, locale: &str) -> Option<&Value> {
        self.0.get(locale)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the blob is empty or every locale value is empty.
    #[must_use]
    pub fn all_empty(&self) -> bool {
        self.0.values().all(is_empty_value)
    }

    /// Merges one locale value into the blob.
    ///
    /// The value is written when `overwrite` is set, when the locale is missing,
    /// or when the existing value is empty, checked in that order. Returns
    /// whether the blob changed.
    pub fn merge(&mut self, locale: &str, value: Value, overwrite: bool) -> bool {
        let writable = overwrite
            || !self.0.contains_key(locale)
            || self.0.get(locale).is_some_and(is_empty_value);
        if writable {
            self.0.insert(locale.to_string(), value);
        }
        writable
    }
}

impl FromIterator<(String, Value)> for LocaleValues {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A locale value is empty when it is `null` or the empty string.
#[must_use]
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// One persisted row: every locale's value for a (group, key).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRow {
    pub group: String,
    pub key: String,
    pub values: LocaleValues,
    pub status: Option<i64>,
}

/// Result of merging a single locale value into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Skipped,
}

impl UpsertOutcome {
    /// Inserted and updated rows count towards a run's total.
    #[must_use]
    pub const fn changed(self) -> bool {
        matches!(self, Self::Inserted | Self::Updated)
    }
}
