//! Import → export → import flows against real files and a file-backed database.

#![allow(clippy::unwrap_used)]
#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use serde_json::Value;
use tempfile::TempDir;
use translations_import::config::FindConfig;
use translations_import::engine::{
    ExportEngine,
    ExportOptions,
    ImportEngine,
    ImportOptions,
};
use translations_import::input::translation::FileLoader;
use translations_import::scanner::{
    Scanner,
    seed_candidates,
};
use translations_import::store::sqlite::SqliteStore;
use translations_import::store::{
    TableSchema,
    TranslationStore,
};

type Snapshot = BTreeMap<(String, String), BTreeMap<String, Value>>;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn lang_fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        "en/auth.php",
        r"<?php

// Authentication messages
return [
    'login' => 'Login',
    'password' => [
        'reset' => 'Reset password',
        'hint' => 'It\'s C:\\temp',
    ],
    'attempts' => 5,
    'pending' => '',
];
",
    );
    write(root, "fr/auth.php", "<?php return array('login' => 'Connexion', 'password' => array('reset' => \"R\\u{e9}initialiser\"));");
    write(root, "en/admin/report.php", "<?php return ['title' => 'Report', 'columns' => ['date' => 'Date']];");
    write(root, "fr/admin/report.php", "<?php return ['title' => 'Rapport'];");
    write(root, "vendor/acme/en/messages.php", "<?php return ['hello' => 'Hello from acme'];");
    write(root, "en.json", r#"{"Welcome, :name": "Welcome, :name", "5/5 done": "5/5 done"}"#);
    write(root, "fr.json", r#"{"Welcome, :name": "Bienvenue, :name"}"#);
    dir
}

fn open_store(dir: &Path) -> SqliteStore {
    let store = SqliteStore::open(&dir.join("translations.sqlite"), TableSchema::default()).unwrap();
    store.ensure_schema().unwrap();
    store
}

fn snapshot(store: &SqliteStore) -> Snapshot {
    store
        .all_rows()
        .unwrap()
        .into_iter()
        .map(|row| {
            let values = row.values.iter().map(|(l, v)| (l.clone(), v.clone())).collect();
            ((row.group, row.key), values)
        })
        .collect()
}

fn import(lang: &Path, store: &mut SqliteStore, options: ImportOptions) {
    let loader = FileLoader::new(lang.to_path_buf());
    ImportEngine::new(lang.to_path_buf(), options).run(store, &loader).unwrap();
}

fn everything() -> ImportOptions {
    ImportOptions { allow_vendor: true, allow_json: true, ..ImportOptions::default() }
}

#[test]
fn export_then_reimport_preserves_every_row() {
    let lang = lang_fixture();
    let db = TempDir::new().unwrap();
    let mut store = open_store(db.path());
    import(lang.path(), &mut store, everything());

    let exported = TempDir::new().unwrap();
    let options = ExportOptions { allow_vendor: true, allow_json: true, ..ExportOptions::default() };
    let summary = ExportEngine::new(exported.path().to_path_buf(), options).run(&mut store).unwrap();

    let fresh_db = TempDir::new().unwrap();
    let mut fresh = open_store(fresh_db.path());
    import(exported.path(), &mut fresh, everything());

    assert_eq!(summary.groups, 4);
    assert_eq!(summary.files, 7);
    assert_eq!(snapshot(&fresh), snapshot(&store));
    assert_eq!(
        fresh.find("auth", "password.reset").unwrap().unwrap().values.encode(),
        r#"{"en":"Reset password","fr":"Réinitialiser"}"#
    );
    assert_eq!(
        fresh.find("auth", "password.hint").unwrap().unwrap().values.encode(),
        r#"{"en":"It's C:\\temp"}"#
    );
}

#[test]
fn exported_files_use_the_canonical_layout() {
    let lang = lang_fixture();
    let db = TempDir::new().unwrap();
    let mut store = open_store(db.path());
    import(lang.path(), &mut store, everything());

    let exported = TempDir::new().unwrap();
    let options = ExportOptions { allow_vendor: true, allow_json: true, ..ExportOptions::default() };
    ExportEngine::new(exported.path().to_path_buf(), options).run(&mut store).unwrap();

    let report = fs::read_to_string(exported.path().join("fr/admin/report.php")).unwrap();
    assert_eq!(report, "<?php\n\nreturn [\n  'title' => 'Rapport',\n];\n");

    let json = fs::read_to_string(exported.path().join("fr.json")).unwrap();
    assert_eq!(json, "{\n    \"Welcome, :name\": \"Bienvenue, :name\"\n}\n");

    let vendor = fs::read_to_string(exported.path().join("vendor/acme/en/messages.php")).unwrap();
    assert_eq!(vendor, "<?php\n\nreturn [\n  'hello' => 'Hello from acme',\n];\n");
}

#[test]
fn plain_round_trip_leaves_vendor_and_json_alone() {
    let lang = lang_fixture();
    let db = TempDir::new().unwrap();
    let mut store = open_store(db.path());
    import(lang.path(), &mut store, everything());

    let exported = TempDir::new().unwrap();
    ExportEngine::new(exported.path().to_path_buf(), ExportOptions::default())
        .run(&mut store)
        .unwrap();

    assert!(!exported.path().join("vendor").exists());
    assert!(!exported.path().join("en.json").exists());

    let fresh_db = TempDir::new().unwrap();
    let mut fresh = open_store(fresh_db.path());
    import(exported.path(), &mut fresh, ImportOptions::default());

    let expected: Snapshot = snapshot(&store)
        .into_iter()
        .filter(|((group, _), _)| group != "_json" && !group.starts_with("vendor/"))
        .collect();
    assert_eq!(snapshot(&fresh), expected);
}

#[test]
fn found_keys_are_exported_with_their_seed_values() {
    let lang = lang_fixture();
    let project = TempDir::new().unwrap();
    write(
        project.path(),
        "resources/views/welcome.blade.php",
        "<h1>{{ __('Welcome, :name') }}</h1>\n<p>{{ __('Nothing here yet') }}</p>\n\
         <a>@lang('auth.login')</a>\n<a>{{ trans('auth.logout') }}</a>\n",
    );
    let db = TempDir::new().unwrap();
    let mut store = open_store(db.path());

    let scanner = Scanner::new(&FindConfig::default()).unwrap();
    let candidates = scanner.scan(project.path()).unwrap();
    let loader = FileLoader::new(lang.path().to_path_buf());
    let summary = seed_candidates(&mut store, &loader, &candidates, "en").unwrap();

    assert_eq!(summary.inserted, 4);

    let exported = TempDir::new().unwrap();
    let options = ExportOptions { allow_json: true, ..ExportOptions::default() };
    ExportEngine::new(exported.path().to_path_buf(), options).run(&mut store).unwrap();

    let json = fs::read_to_string(exported.path().join("en.json")).unwrap();
    assert_eq!(
        json,
        "{\n    \"Nothing here yet\": \"Nothing here yet\",\n    \"Welcome, :name\": \"Welcome, :name\"\n}\n"
    );
    let auth = fs::read_to_string(exported.path().join("en/auth.php")).unwrap();
    assert_eq!(auth, "<?php\n\nreturn [\n  'login' => 'Login',\n  'logout' => '',\n];\n");
}

#[test]
fn clean_and_nuke_on_a_shared_database() {
    let lang = lang_fixture();
    let db = TempDir::new().unwrap();
    let mut store = open_store(db.path());
    import(lang.path(), &mut store, everything());

    let removed = store.delete_where_all_locales_empty().unwrap();
    assert_eq!(removed, 1);
    assert!(store.find("auth", "pending").unwrap().is_none());

    let mut other = open_store(db.path());
    let patterns = translations_import::filter::parse_patterns(&["vendor/*".to_string()]);
    let nuked = other.delete_by_group_pattern(Some(patterns.as_slice())).unwrap();
    assert_eq!(nuked, 1);

    let groups = store.distinct_groups().unwrap();
    assert_eq!(groups, vec!["_json", "admin/report", "auth"]);
}
