use std::path::PathBuf;

use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "find.includePatterns[0]")
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    #[error("Failed to load configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Numbered list of validation errors.
fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// SQLite database file, relative to the project root.
    pub database: PathBuf,

    pub table: String,
    pub group_column: String,
    pub key_column: String,
    /// Column holding the JSON-encoded `{locale: value}` blob.
    pub translations_column: String,
    /// Optional status column (`0` = saved, `1` = changed).
    pub status_column: Option<String>,

    /// Language root, relative to the project root.
    pub lang_path: PathBuf,

    pub find: FindConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FindConfig {
    /// Translation helper names searched for by `find`.
    pub functions: Vec<String>,

    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,

    /// Locale that newly found keys are seeded for.
    pub default_locale: String,
}

impl Default for FindConfig {
    fn default() -> Self {
        Self {
            functions: ["__", "trans", "trans_choice", "@lang", "Lang::get", "Lang::choice", "@choice"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            include_patterns: vec!["**/*.php".to_string(), "**/*.twig".to_string()],
            exclude_patterns: vec![
                "vendor/**".to_string(),
                "node_modules/**".to_string(),
                "storage/**".to_string(),
            ],
            default_locale: "en".to_string(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: PathBuf::from("translations.sqlite"),
            table: "language_lines".to_string(),
            group_column: "group".to_string(),
            key_column: "key".to_string(),
            translations_column: "text".to_string(),
            status_column: None,
            lang_path: PathBuf::from("lang"),
            find: FindConfig::default(),
        }
    }
}

/// SQL identifiers are interpolated into statements, so only plain names are accepted.
fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Table and column names must be plain SQL identifiers.
fn validate_identifier(field_path: &str, name: &str, errors: &mut Vec<ValidationError>) {
    if name.is_empty() {
        errors.push(ValidationError::new(
            field_path,
            "The name cannot be empty. Ensure table, groupColumn, keyColumn and translationsColumn are set",
        ));
    } else if !is_sql_identifier(name) {
        errors.push(ValidationError::new(
            field_path,
            format!(
                "Invalid name '{name}'. Use letters, digits and underscores, not starting with a digit"
            ),
        ));
    }
}

impl Settings {
    /// # Errors
    /// - Table or column name is empty or not a plain identifier
    /// - Columns are not distinct
    /// - Empty language path
    /// - Invalid `find` section
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        validate_identifier("table", &self.table, &mut errors);
        validate_identifier("groupColumn", &self.group_column, &mut errors);
        validate_identifier("keyColumn", &self.key_column, &mut errors);
        validate_identifier("translationsColumn", &self.translations_column, &mut errors);
        if let Some(status) = &self.status_column {
            validate_identifier("statusColumn", status, &mut errors);
        }

        let mut columns = vec![&self.group_column, &self.key_column, &self.translations_column];
        if let Some(status) = &self.status_column {
            columns.push(status);
        }
        columns.sort();
        if columns.windows(2).any(|pair| pair.first() == pair.last()) {
            errors.push(ValidationError::new(
                "groupColumn/keyColumn/translationsColumn/statusColumn",
                "Column names must be distinct",
            ));
        }

        if self.database.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "database",
                "The database path cannot be empty. Example: \"translations.sqlite\"",
            ));
        }

        if self.lang_path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "langPath",
                "The language path cannot be empty. Example: \"lang\" or \"resources/lang\"",
            ));
        }

        self.find.validate(&mut errors);

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl FindConfig {
    /// Checks the `find` section.
    fn validate(&self, errors: &mut Vec<ValidationError>) {
        if self.functions.is_empty() {
            errors.push(ValidationError::new(
                "find.functions",
                "At least one function is required. Example: [\"__\", \"trans\"]",
            ));
        }

        for (index, function) in self.functions.iter().enumerate() {
            if function.trim().is_empty() {
                errors.push(ValidationError::new(
                    format!("find.functions[{index}]"),
                    "The function name cannot be empty",
                ));
            }
        }

        if self.include_patterns.is_empty() {
            errors.push(ValidationError::new(
                "find.includePatterns",
                "At least one pattern is required. Example: [\"**/*.php\"]",
            ));
        }

        for (index, pattern) in self.include_patterns.iter().enumerate() {
            if let Err(e) = globset::Glob::new(pattern) {
                errors.push(ValidationError::new(
                    format!("find.includePatterns[{index}]"),
                    format!("Invalid glob pattern '{pattern}': {e}"),
                ));
            }
        }

        for (index, pattern) in self.exclude_patterns.iter().enumerate() {
            if let Err(e) = globset::Glob::new(pattern) {
                errors.push(ValidationError::new(
                    format!("find.excludePatterns[{index}]"),
                    format!("Invalid glob pattern '{pattern}': {e}"),
                ));
            }
        }

        if self.default_locale.is_empty() {
            errors.push(ValidationError::new(
                "find.defaultLocale",
                "The locale cannot be empty. Example: \"en\"",
            ));
        }
    }
}
