//! Database → files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::{
    Map,
    Value,
};

use super::EngineError;
use crate::address::GroupKind;
use crate::codec;
use crate::filter::FilterSpec;
use crate::input::translation::unflatten;
use crate::lang_dir;
use crate::store::TranslationStore;
use crate::types::TranslationRow;

/// Options of one export run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOptions {
    pub allow_vendor: bool,
    pub allow_json: bool,
    pub filter: FilterSpec,
}

/// One file to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportItem {
    pub locale: String,
    pub kind: GroupKind,
    /// Absolute target path.
    pub path: PathBuf,
    pub contents: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub files: usize,
    pub groups: usize,
}

/// `locale → group → flat entries`, rebuilt for every export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LanguageTree {
    /// locale → group → entries
    locales: BTreeMap<String, BTreeMap<String, Vec<(String, Value)>>>,
}

impl LanguageTree {
    /// Distributes row values over their locales. `null` values and ignored
    /// locales are left out.
    #[must_use]
    pub fn from_rows(rows: &[TranslationRow], filter: &FilterSpec) -> Self {
        let mut tree = Self::default();
        for row in rows {
            for (locale, value) in row.values.iter() {
                if value.is_null() || !filter.locale_allowed(locale) {
                    continue;
                }
                tree.insert(locale, &row.group, &row.key, value.clone());
            }
        }
        tree
    }

    pub fn insert(&mut self, locale: &str, group: &str, key: &str, value: Value) {
        self.locales
            .entry(locale.to_string())
            .or_default()
            .entry(group.to_string())
            .or_default()
            .push((key.to_string(), value));
    }

    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.locales.keys().map(String::as_str)
    }

    /// Flat entries of a group for a locale, in row order.
    #[must_use]
    pub fn entries(&self, locale: &str, group: &str) -> Option<&[(String, Value)]> {
        self.locales.get(locale)?.get(group).map(Vec::as_slice)
    }
}

/// Renders one group file.
#[must_use]
pub fn render_group(kind: &GroupKind, entries: &[(String, Value)]) -> String {
    if kind.is_json() {
        let flat: Map<String, Value> = entries.iter().cloned().collect();
        codec::json::render(&flat)
    } else {
        codec::php::render(&unflatten(entries.iter().cloned()))
    }
}

/// Rebuilds group files from the store.
#[derive(Debug, Clone)]
pub struct ExportEngine {
    /// Language root the files are written to.
    lang_dir: PathBuf,
    /// Run options.
    options: ExportOptions,
}

impl ExportEngine {
    #[must_use]
    pub const fn new(lang_dir: PathBuf, options: ExportOptions) -> Self {
        Self { lang_dir, options }
    }

    /// Decides whether a group takes part in this run.
    fn group_selected(&self, kind: &GroupKind) -> bool {
        if kind.is_vendor() && !self.options.allow_vendor {
            tracing::debug!("Skipping vendor group '{}'", kind);
            return false;
        }
        if kind.is_json() && !self.options.allow_json {
            tracing::debug!("Skipping group '{}'", kind);
            return false;
        }
        if !self.options.filter.group_allowed(&kind.group()) {
            tracing::info!("Skipping group '{}'", kind);
            return false;
        }
        true
    }

    /// The files of one group, one per locale.
    pub fn plan_group<S>(&self, store: &S, group: &str) -> Result<Vec<ExportItem>, EngineError>
    where
        S: TranslationStore + ?Sized,
    {
        let kind = GroupKind::parse(group);
        if !self.group_selected(&kind) {
            return Ok(Vec::new());
        }

        let rows = store.rows_for_group(group)?;
        let tree = LanguageTree::from_rows(&rows, &self.options.filter);

        let items = tree
            .locales()
            .filter_map(|locale| {
                let entries = tree.entries(locale, group)?;
                let Some(relative) = kind.resolve_path(locale) else {
                    tracing::warn!(
                        "Skipping group '{}' for locale '{}': not a path inside the language directory",
                        group,
                        locale
                    );
                    return None;
                };
                Some(ExportItem {
                    locale: locale.to_string(),
                    path: self.lang_dir.join(relative),
                    contents: render_group(&kind, entries),
                    kind: kind.clone(),
                })
            })
            .collect();
        Ok(items)
    }

    /// Every file of the run, grouped by group in sorted group order.
    pub fn plan<S>(&self, store: &S) -> Result<Vec<ExportItem>, EngineError>
    where
        S: TranslationStore + ?Sized,
    {
        let mut items = Vec::new();
        for group in store.distinct_groups()? {
            items.extend(self.plan_group(store, &group)?);
        }
        Ok(items)
    }

    /// Writes one file atomically.
    pub fn write_item(&self, item: &ExportItem) -> Result<(), EngineError> {
        tracing::debug!("Writing {:?}", item.path);
        lang_dir::write_atomic(&item.path, &item.contents)?;
        Ok(())
    }

    /// Exports every selected group; each group is marked saved once its files
    /// are written.
    pub fn run<S>(&self, store: &mut S) -> Result<ExportSummary, EngineError>
    where
        S: TranslationStore + ?Sized,
    {
        if !self.lang_dir.is_dir() {
            return Err(EngineError::MissingDirectory { path: self.lang_dir.clone() });
        }

        let mut summary = ExportSummary::default();
        for group in store.distinct_groups()? {
            let items = self.plan_group(store, &group)?;
            if items.is_empty() {
                continue;
            }

            tracing::info!("Exporting group '{}'", group);
            for item in &items {
                self.write_item(item)?;
            }
            store.mark_group_saved(&group)?;

            summary.files += items.len();
            summary.groups += 1;
        }

        tracing::info!("Exported {} groups to {} files", summary.groups, summary.files);
        Ok(summary)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use googletest::prelude::*;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::store::TableSchema;
    use crate::store::sqlite::SqliteStore;
    use crate::types::STATUS_SAVED;

    fn store_with(schema: TableSchema, rows: &[(&str, &str, &str, Value)]) -> SqliteStore {
        let mut store = SqliteStore::open_in_memory(schema).unwrap();
        store.ensure_schema().unwrap();
        for (group, key, locale, value) in rows {
            store.upsert_locale_value(group, key, locale, value.clone(), false).unwrap();
        }
        store
    }

    fn store(rows: &[(&str, &str, &str, Value)]) -> SqliteStore {
        store_with(TableSchema::default(), rows)
    }

    fn read(dir: &TempDir, relative: &str) -> String {
        fs::read_to_string(dir.path().join(relative)).unwrap()
    }

    #[googletest::test]
    fn nested_group_is_written_per_locale() {
        let mut store = store(&[
            ("admin/report", "title", "en", json!("Report")),
            ("admin/report", "title", "fr", json!("Rapport")),
            ("admin/report", "actions.print", "en", json!("Print")),
            ("auth", "login", "en", json!("Login")),
        ]);
        let dir = TempDir::new().unwrap();

        let summary = ExportEngine::new(dir.path().to_path_buf(), ExportOptions::default())
            .run(&mut store)
            .unwrap();

        assert_eq!(summary, ExportSummary { files: 3, groups: 2 });
        expect_that!(
            read(&dir, "en/admin/report.php"),
            eq("<?php

return [
  'title' => 'Report',
  'actions' => [
    'print' => 'Print',
  ],
];
")
        );
        expect_that!(
            read(&dir, "fr/admin/report.php"),
            eq("<?php\n\nreturn [\n  'title' => 'Rapport',\n];\n")
        );
        expect_that!(read(&dir, "en/auth.php"), not(contains_substring("Report")));
        expect_that!(dir.path().join("fr/auth.php").exists(), eq(false));
    }

    #[googletest::test]
    fn null_values_and_ignored_locales_are_left_out() {
        let mut store = store(&[
            ("auth", "login", "en", json!("Login")),
            ("auth", "logout", "en", Value::Null),
            ("auth", "login", "de", json!("Anmelden")),
        ]);
        let dir = TempDir::new().unwrap();
        let options = ExportOptions {
            filter: FilterSpec {
                ignore_locales: Some(vec!["de".to_string()]),
                ..FilterSpec::default()
            },
            ..ExportOptions::default()
        };

        ExportEngine::new(dir.path().to_path_buf(), options).run(&mut store).unwrap();

        expect_that!(read(&dir, "en/auth.php"), not(contains_substring("logout")));
        expect_that!(dir.path().join("de").exists(), eq(false));
    }

    #[googletest::test]
    fn vendor_and_json_need_their_flags() {
        let rows = [
            ("vendor/acme/messages", "hello", "en", json!("Hello")),
            ("_json", "Hello world", "en", json!("Hello world")),
            ("_json", "a/b", "nl", json!("Hallo wereld")),
        ];
        let dir = TempDir::new().unwrap();

        let skipped = ExportEngine::new(dir.path().to_path_buf(), ExportOptions::default())
            .run(&mut store(&rows))
            .unwrap();
        let options =
            ExportOptions { allow_vendor: true, allow_json: true, ..ExportOptions::default() };
        let exported =
            ExportEngine::new(dir.path().to_path_buf(), options).run(&mut store(&rows)).unwrap();

        expect_that!(skipped.files, eq(0));
        expect_that!(exported.files, eq(3));
        expect_that!(
            read(&dir, "vendor/acme/en/messages.php"),
            contains_substring("'hello' => 'Hello',")
        );
        expect_that!(read(&dir, "en.json"), eq("{\n    \"Hello world\": \"Hello world\"\n}\n"));
        expect_that!(read(&dir, "nl.json"), eq("{\n    \"a/b\": \"Hallo wereld\"\n}\n"));
    }

    #[googletest::test]
    fn only_groups_limit_the_run() {
        let store = store(&[
            ("admin/report", "title", "en", json!("Report")),
            ("auth", "login", "en", json!("Login")),
        ]);
        let options = ExportOptions {
            filter: FilterSpec {
                only_groups: Some(vec!["admin/*".to_string()]),
                ..FilterSpec::default()
            },
            ..ExportOptions::default()
        };

        let items = ExportEngine::new(PathBuf::from("/lang"), options).plan(&store).unwrap();

        expect_that!(items.len(), eq(1));
        assert_eq!(
            items.first().map(|item| item.path.clone()),
            Some(PathBuf::from("/lang/en/admin/report.php"))
        );
    }

    #[googletest::test]
    fn exported_groups_are_marked_saved() {
        let schema =
            TableSchema { status_column: Some("status".to_string()), ..TableSchema::default() };
        let mut store = store_with(schema, &[("auth", "login", "en", json!("Login"))]);
        let dir = TempDir::new().unwrap();

        ExportEngine::new(dir.path().to_path_buf(), ExportOptions::default())
            .run(&mut store)
            .unwrap();

        assert_eq!(store.find("auth", "login").unwrap().unwrap().status, Some(STATUS_SAVED));
    }

    #[googletest::test]
    fn groups_and_locales_cannot_leave_the_language_directory() {
        let mut store = store(&[
            ("auth", "login", "en", json!("Login")),
            ("auth", "login", "../escaped", json!("Escaped")),
            ("../../outside", "k", "en", json!("Outside")),
            ("_json", "Hello", "../escaped", json!("Hello")),
        ]);
        let root = TempDir::new().unwrap();
        let lang = root.path().join("app/lang");
        fs::create_dir_all(&lang).unwrap();
        let options = ExportOptions { allow_json: true, ..ExportOptions::default() };

        let summary = ExportEngine::new(lang.clone(), options).run(&mut store).unwrap();

        assert_eq!(summary, ExportSummary { files: 1, groups: 1 });
        expect_that!(lang.join("en/auth.php").exists(), eq(true));
        expect_that!(root.path().join("app/escaped").exists(), eq(false));
        expect_that!(root.path().join("app/escaped.json").exists(), eq(false));
        expect_that!(root.path().join("outside.php").exists(), eq(false));
        expect_that!(root.path().join("app/outside.php").exists(), eq(false));
    }

    #[googletest::test]
    fn missing_language_directory_is_fatal() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&[("auth", "login", "en", json!("Login"))]);

        let result =
            ExportEngine::new(dir.path().join("missing"), ExportOptions::default()).run(&mut store);

        expect_that!(matches!(result, Err(EngineError::MissingDirectory { .. })), eq(true));
    }

    #[googletest::test]
    fn language_tree_keeps_row_order() {
        let rows = vec![
            TranslationRow {
                group: "auth".to_string(),
                key: "b".to_string(),
                values: [("en".to_string(), json!("B")), ("fr".to_string(), Value::Null)]
                    .into_iter()
                    .collect(),
                status: None,
            },
            TranslationRow {
                group: "auth".to_string(),
                key: "a".to_string(),
                values: [("en".to_string(), json!("A"))].into_iter().collect(),
                status: None,
            },
        ];

        let tree = LanguageTree::from_rows(&rows, &FilterSpec::default());

        assert_eq!(tree.locales().collect::<Vec<_>>(), vec!["en"]);
        let keys: Vec<&str> =
            tree.entries("en", "auth").unwrap().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }
}
