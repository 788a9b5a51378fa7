//! Translation trees: flattening to dotted keys, unflattening, and loading
//! group and JSON files from the language directory.

use std::collections::HashMap;
use std::path::{
    Path,
    PathBuf,
};

use serde_json::{
    Map,
    Value,
};

use crate::address::GroupKind;
use crate::codec::{
    self,
    CodecError,
};
use crate::types::JSON_GROUP;

/// Separator between the levels of a nested key.
pub const KEY_SEPARATOR: &str = ".";

/// A translation file could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read translation file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse translation file {} ({source})", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: CodecError,
    },
}

impl LoadError {
    /// The file the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. } | Self::Parse { path, .. } => path,
        }
    }
}

/// Flattens a nested tree into dotted keys, depth-first in source order.
///
/// Only scalar leaves are emitted. `null` and empty containers produce no
/// entries. List items are addressed by their index (`months.0`).
#[must_use]
pub fn flatten_tree(tree: &Map<String, Value>) -> Vec<(String, Value)> {
    let mut result = Vec::new();
    for (key, value) in tree {
        flatten_value(value, key, &mut result);
    }
    result
}

/// Flattens one value below `prefix`.
fn flatten_value(value: &Value, prefix: &str, result: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten_value(child, &format!("{prefix}{KEY_SEPARATOR}{key}"), result);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_value(child, &format!("{prefix}{KEY_SEPARATOR}{index}"), result);
            }
        }
        Value::Null => {}
        Value::String(_) | Value::Number(_) | Value::Bool(_) => {
            result.push((prefix.to_string(), value.clone()));
        }
    }
}

/// Rebuilds a nested tree from dotted keys.
///
/// When a scalar already sits where a nested level is needed (or the other way
/// round) the later entry wins and a warning is logged.
pub fn unflatten<I>(entries: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (String, Value)>,
{
    let mut tree = Map::new();
    for (key, value) in entries {
        insert_dotted(&mut tree, &key, &key, value);
    }
    tree
}

/// Inserts one dotted key below `target`.
fn insert_dotted(target: &mut Map<String, Value>, full_key: &str, path: &str, value: Value) {
    match path.split_once(KEY_SEPARATOR) {
        None => {
            if target.get(path).is_some_and(Value::is_object) {
                tracing::warn!(key = full_key, "Nested keys replaced by a plain value");
            }
            target.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let slot =
                target.entry(head.to_string()).or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                tracing::warn!(key = full_key, "Plain value at '{head}' replaced by nested keys");
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(child) = slot {
                insert_dotted(child, full_key, rest, value);
            }
        }
    }
}

/// Deep-merges `overlay` into `base`; overlay leaves win.
pub fn deep_merge(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Reads and parses a group file.
pub fn read_group_file(path: &Path) -> Result<Map<String, Value>, LoadError> {
    let content = read(path)?;
    codec::php::parse(&content)
        .map_err(|source| LoadError::Parse { path: path.to_path_buf(), source })
}

/// Reads and parses a JSON namespace file.
pub fn read_json_file(path: &Path) -> Result<Map<String, Value>, LoadError> {
    let content = read(path)?;
    codec::json::parse(&content)
        .map_err(|source| LoadError::Parse { path: path.to_path_buf(), source })
}

/// Reads a file, keeping its path on failure.
fn read(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io { path: path.to_path_buf(), source })
}

/// Source of translation trees for a (locale, group).
pub trait TranslationLoader {
    /// Loads a group as a nested tree. `Ok(None)` when the group does not exist
    /// for the locale.
    fn load(&self, locale: &str, kind: &GroupKind) -> Result<Option<Map<String, Value>>, LoadError>;

    /// Loads the flat JSON namespace of a locale.
    fn load_json(&self, locale: &str) -> Result<Option<Map<String, Value>>, LoadError>;
}

/// Loads files from the language directory.
#[derive(Debug, Clone)]
pub struct FileLoader {
    /// Language root.
    lang_dir: PathBuf,
}

impl FileLoader {
    #[must_use]
    pub const fn new(lang_dir: PathBuf) -> Self {
        Self { lang_dir }
    }

    #[must_use]
    pub fn lang_dir(&self) -> &Path {
        &self.lang_dir
    }
}

impl TranslationLoader for FileLoader {
    fn load(&self, locale: &str, kind: &GroupKind) -> Result<Option<Map<String, Value>>, LoadError> {
        if kind.is_json() {
            return self.load_json(locale);
        }

        let Some(relative) = kind.resolve_path(locale) else {
            tracing::warn!("Group '{}' for '{}' has no safe file path", kind, locale);
            return Ok(None);
        };
        let path = self.lang_dir.join(relative);
        if !path.is_file() {
            return Ok(None);
        }
        tracing::debug!("Loading group '{}' for '{}' from {:?}", kind, locale, path);
        read_group_file(&path).map(Some)
    }

    fn load_json(&self, locale: &str) -> Result<Option<Map<String, Value>>, LoadError> {
        let Some(relative) = GroupKind::Json.resolve_path(locale) else {
            tracing::warn!("Locale '{}' has no safe JSON file path", locale);
            return Ok(None);
        };
        let path = self.lang_dir.join(relative);
        if !path.is_file() {
            return Ok(None);
        }
        tracing::debug!("Loading JSON namespace for '{}' from {:?}", locale, path);
        read_json_file(&path).map(Some)
    }
}

/// Layers in-memory overrides on top of another loader.
///
/// Overrides are deep-merged over what the inner loader returns, and make a
/// group exist even when it has no file.
#[derive(Debug, Clone)]
pub struct OverlayLoader<L> {
    /// Loader the overrides apply to.
    inner: L,
    /// (locale, group) → override tree
    overrides: HashMap<(String, String), Map<String, Value>>,
}

impl<L: TranslationLoader> OverlayLoader<L> {
    #[must_use]
    pub fn new(inner: L) -> Self {
        Self { inner, overrides: HashMap::new() }
    }

    /// Adds an override tree for a group. Repeated calls for the same group
    /// merge into each other.
    pub fn add_override(&mut self, locale: &str, group: &str, tree: Map<String, Value>) {
        let slot = self.overrides.entry((locale.to_string(), group.to_string())).or_default();
        deep_merge(slot, tree);
    }

    /// Merges the override of a group, if any, over what was loaded.
    fn apply(
        &self,
        locale: &str,
        group: &str,
        loaded: Option<Map<String, Value>>,
    ) -> Option<Map<String, Value>> {
        let Some(overlay) = self.overrides.get(&(locale.to_string(), group.to_string())) else {
            return loaded;
        };
        let mut tree = loaded.unwrap_or_default();
        deep_merge(&mut tree, overlay.clone());
        Some(tree)
    }
}

impl<L: TranslationLoader> TranslationLoader for OverlayLoader<L> {
    fn load(&self, locale: &str, kind: &GroupKind) -> Result<Option<Map<String, Value>>, LoadError> {
        if kind.is_json() {
            return self.load_json(locale);
        }
        let loaded = self.inner.load(locale, kind)?;
        Ok(self.apply(locale, &kind.group(), loaded))
    }

    fn load_json(&self, locale: &str) -> Result<Option<Map<String, Value>>, LoadError> {
        let loaded = self.inner.load_json(locale)?;
        Ok(self.apply(locale, JSON_GROUP, loaded))
    }
}
