//! Files → database.

use std::ops::AddAssign;
use std::path::{
    Path,
    PathBuf,
};

use serde_json::Value;

use super::EngineError;
use crate::address::{
    self,
    GroupKind,
    VENDOR_DIR,
};
use crate::filter::FilterSpec;
use crate::input::translation::{
    TranslationLoader,
    flatten_tree,
};
use crate::lang_dir;
use crate::store::TranslationStore;
use crate::types::{
    JSON_GROUP,
    UpsertOutcome,
};

/// Options of one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Replace locale values that are already set.
    pub overwrite: bool,
    /// Import `vendor/<package>/<locale>` files.
    pub allow_vendor: bool,
    /// Import `<locale>.json` files.
    pub allow_json: bool,
    pub filter: FilterSpec,
}

/// One file to import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportItem {
    pub locale: String,
    pub kind: GroupKind,
    pub path: PathBuf,
}

/// Row counts of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub files: usize,
}

impl ImportSummary {
    /// Rows inserted or updated.
    #[must_use]
    pub const fn changed(&self) -> usize {
        self.inserted + self.updated
    }

    /// Counts one upsert.
    fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Skipped => self.skipped += 1,
        }
    }
}

impl AddAssign for ImportSummary {
    fn add_assign(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.files += other.files;
    }
}

/// Walks the language directory and merges every file into the store.
#[derive(Debug, Clone)]
pub struct ImportEngine {
    /// Language root.
    lang_dir: PathBuf,
    /// Run options.
    options: ImportOptions,
}

impl ImportEngine {
    #[must_use]
    pub const fn new(lang_dir: PathBuf, options: ImportOptions) -> Self {
        Self { lang_dir, options }
    }

    /// Lists the files to import, in the order they will be processed.
    ///
    /// Locale and group filters are applied here; skipped entries are logged.
    pub fn plan(&self) -> Result<Vec<ImportItem>, EngineError> {
        if !self.lang_dir.is_dir() {
            return Err(EngineError::MissingDirectory { path: self.lang_dir.clone() });
        }

        let mut items = Vec::new();

        for dir in lang_dir::directories(&self.lang_dir)? {
            let Some(name) = dir_name(&dir) else {
                continue;
            };

            if name == VENDOR_DIR {
                if self.options.allow_vendor {
                    self.plan_vendor(&dir, &mut items)?;
                } else {
                    tracing::debug!("Skipping vendor translations in {:?}", dir);
                }
                continue;
            }

            self.plan_locale(&dir, name, None, &mut items)?;
        }

        if self.options.allow_json {
            self.plan_json(&mut items)?;
        }

        Ok(items)
    }

    /// `vendor/<package>/<locale>/...`
    fn plan_vendor(
        &self,
        vendor_dir: &Path,
        items: &mut Vec<ImportItem>,
    ) -> Result<(), EngineError> {
        for package_dir in lang_dir::directories(vendor_dir)? {
            let Some(package) = dir_name(&package_dir) else {
                continue;
            };
            for locale_dir in lang_dir::directories(&package_dir)? {
                let Some(locale) = dir_name(&locale_dir) else {
                    continue;
                };
                self.plan_locale(&locale_dir, locale, Some(package), items)?;
            }
        }
        Ok(())
    }

    /// Every group file below one locale directory.
    fn plan_locale(
        &self,
        locale_dir: &Path,
        locale: &str,
        vendor_package: Option<&str>,
        items: &mut Vec<ImportItem>,
    ) -> Result<(), EngineError> {
        let filter = &self.options.filter;
        if !filter.locale_allowed(locale) {
            tracing::info!("Skipping locale '{}'", locale);
            return Ok(());
        }

        for file in lang_dir::all_files(locale_dir)? {
            if !address::is_group_file(&file) {
                tracing::debug!("Skipping {:?}: not a group file", file);
                continue;
            }
            let Some(kind) = address::resolve_group(locale_dir, &file, vendor_package) else {
                tracing::warn!("Cannot derive a group name from {:?}", file);
                continue;
            };
            if !filter.group_allowed(&kind.group()) {
                tracing::info!("Skipping group '{}'", kind);
                continue;
            }
            items.push(ImportItem { locale: locale.to_string(), kind, path: file });
        }
        Ok(())
    }

    /// `<locale>.json` files directly under the language directory.
    fn plan_json(&self, items: &mut Vec<ImportItem>) -> Result<(), EngineError> {
        let filter = &self.options.filter;
        if !filter.group_allowed(JSON_GROUP) {
            tracing::info!("Skipping group '{}'", JSON_GROUP);
            return Ok(());
        }

        for file in lang_dir::files(&self.lang_dir)? {
            let Some(locale) = address::json_file_locale(&file) else {
                continue;
            };
            if !filter.locale_allowed(locale) {
                tracing::info!("Skipping locale '{}'", locale);
                continue;
            }
            items.push(ImportItem {
                locale: locale.to_string(),
                kind: GroupKind::Json,
                path: file,
            });
        }
        Ok(())
    }

    /// Imports one file. The whole file is parsed before any row is written.
    pub fn run_item<S, L>(
        &self,
        item: &ImportItem,
        store: &mut S,
        loader: &L,
    ) -> Result<ImportSummary, EngineError>
    where
        S: TranslationStore + ?Sized,
        L: TranslationLoader + ?Sized,
    {
        let group = item.kind.group();
        tracing::debug!("Importing {:?} as group '{}' ({})", item.path, group, item.locale);

        let tree = loader.load(&item.locale, &item.kind)?.unwrap_or_else(|| {
            tracing::warn!("Group '{}' vanished for '{}'", group, item.locale);
            serde_json::Map::new()
        });
        let entries = if item.kind.is_json() { json_entries(tree) } else { flatten_tree(&tree) };

        let mut summary = ImportSummary { files: 1, ..ImportSummary::default() };
        for (key, value) in entries {
            let outcome = store.upsert_locale_value(
                &group,
                &key,
                &item.locale,
                value,
                self.options.overwrite,
            )?;
            summary.record(outcome);
        }
        Ok(summary)
    }

    /// Plans and runs a whole import.
    pub fn run<S, L>(&self, store: &mut S, loader: &L) -> Result<ImportSummary, EngineError>
    where
        S: TranslationStore + ?Sized,
        L: TranslationLoader + ?Sized,
    {
        let items = self.plan()?;
        let mut summary = ImportSummary::default();
        let mut current_locale: Option<&str> = None;

        for item in &items {
            if current_locale != Some(item.locale.as_str()) {
                tracing::info!("Processing locale '{}'", item.locale);
                current_locale = Some(item.locale.as_str());
            }
            summary += self.run_item(item, store, loader)?;
        }

        tracing::info!(
            "Imported {} files: {} inserted, {} updated, {} unchanged",
            summary.files,
            summary.inserted,
            summary.updated,
            summary.skipped
        );
        Ok(summary)
    }
}

/// Final path component as UTF-8.
fn dir_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

/// Top-level scalar entries of a JSON namespace. Its keys are never split.
fn json_entries(map: serde_json::Map<String, Value>) -> Vec<(String, Value)> {
    map.into_iter()
        .filter(|(key, value)| {
            let scalar = matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_));
            if !scalar && !value.is_null() {
                tracing::debug!("Skipping non-scalar JSON entry '{}'", key);
            }
            scalar
        })
        .collect()
}
