//! SQLite backend.

use std::path::Path;
use std::time::Duration;

use rusqlite::{
    Connection,
    OptionalExtension,
    TransactionBehavior,
    params,
    params_from_iter,
};
use serde_json::Value;

use super::{
    StoreError,
    TableSchema,
    TranslationStore,
};
use crate::filter::GroupPattern;
use crate::types::{
    LocaleValues,
    STATUS_CHANGED,
    STATUS_SAVED,
    TranslationRow,
    UpsertOutcome,
};

/// How long a writer waits for another connection's lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Quotes an identifier for use in SQL.
fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Escapes `%`, `_` and `\` so `prefix` matches literally in a `LIKE` pattern
/// with `ESCAPE '\'`, then appends the `%` wildcard.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// A row as read, before its blob is decoded.
struct RawRow {
    /// Row id
    id: i64,
    /// Group name.
    group: String,
    /// Dotted key.
    key: String,
    /// Encoded blob; `NULL` reads as `None`.
    text: Option<String>,
    /// `None` without a status column.
    status: Option<i64>,
}

impl RawRow {
    /// Decodes the blob.
    fn decode(self) -> Result<TranslationRow, StoreError> {
        let values = LocaleValues::decode(self.text.as_deref().unwrap_or_default()).map_err(
            |source| StoreError::InvalidBlob {
                group: self.group.clone(),
                key: self.key.clone(),
                source,
            },
        )?;
        Ok(TranslationRow { group: self.group, key: self.key, values, status: self.status })
    }

    /// True when clean should delete the row.
    fn is_all_empty(&self) -> bool {
        LocaleValues::decode(self.text.as_deref().unwrap_or_default())
            .map_or(true, |values| values.all_empty())
    }
}

/// Translation store backed by one SQLite table.
#[derive(Debug)]
pub struct SqliteStore {
    /// Open connection.
    conn: Connection,
    /// Unquoted names as configured.
    schema: TableSchema,
    /// Quoted table name
    table: String,
    /// Quoted group column
    group: String,
    /// Quoted key column
    key: String,
    /// Quoted translations column
    text: String,
    /// Quoted status column
    status: Option<String>,
}

impl SqliteStore {
    /// Opens (or creates) a database file.
    pub fn open(path: &Path, schema: TableSchema) -> Result<Self, StoreError> {
        tracing::debug!("Opening database {:?}", path);
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self::with_connection(conn, schema))
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory(schema: TableSchema) -> Result<Self, StoreError> {
        Ok(Self::with_connection(Connection::open_in_memory()?, schema))
    }

    /// Wraps a connection, quoting the configured names once.
    fn with_connection(conn: Connection, schema: TableSchema) -> Self {
        Self {
            conn,
            table: quote(&schema.table),
            group: quote(&schema.group_column),
            key: quote(&schema.key_column),
            text: quote(&schema.translations_column),
            status: schema.status_column.as_deref().map(quote),
            schema,
        }
    }

    /// Creates the table and its unique (group, key) index when missing.
    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        let status_column = self
            .status
            .as_ref()
            .map(|status| format!(", {status} INTEGER NOT NULL DEFAULT {STATUS_SAVED}"))
            .unwrap_or_default();
        let index = quote(&format!("{}_group_key_unique", self.schema.table));

        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                \"id\" INTEGER PRIMARY KEY AUTOINCREMENT,
                {group} TEXT NOT NULL,
                {key} TEXT NOT NULL,
                {text} TEXT{status_column}
            );
            CREATE UNIQUE INDEX IF NOT EXISTS {index} ON {table} ({group}, {key});",
            table = self.table,
            group = self.group,
            key = self.key,
            text = self.text,
        ))?;
        Ok(())
    }

    /// `id, group, key, text[, status]`
    fn select_columns(&self) -> String {
        format!(
            "\"id\", {}, {}, {}, {}",
            self.group,
            self.key,
            self.text,
            self.status.as_deref().unwrap_or("NULL")
        )
    }

    /// Reads the columns of `select_columns`.
    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
        Ok(RawRow {
            id: row.get(0)?,
            group: row.get(1)?,
            key: row.get(2)?,
            text: row.get(3)?,
            status: row.get(4)?,
        })
    }

    /// Rows matching `condition`, in insertion order.
    fn query_rows(
        &self,
        condition: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<RawRow>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} {condition} ORDER BY \"id\"",
            self.select_columns(),
            self.table
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params, Self::map_row)?.collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// `SET` fragment that flags a row as changed, if a status column exists.
    fn changed_status_assignment(&self) -> String {
        self.status
            .as_ref()
            .map(|status| format!(", {status} = {STATUS_CHANGED}"))
            .unwrap_or_default()
    }
}

impl TranslationStore for SqliteStore {
    fn find(&self, group: &str, key: &str) -> Result<Option<TranslationRow>, StoreError> {
        let condition = format!("WHERE {} = ?1 AND {} = ?2", self.group, self.key);
        self.query_rows(&condition, params![group, key])?
            .into_iter()
            .next()
            .map(RawRow::decode)
            .transpose()
    }

    fn upsert_locale_value(
        &mut self,
        group: &str,
        key: &str,
        locale: &str,
        value: Value,
        overwrite: bool,
    ) -> Result<UpsertOutcome, StoreError> {
        let select = format!(
            "SELECT \"id\", {} FROM {} WHERE {} = ?1 AND {} = ?2",
            self.text, self.table, self.group, self.key
        );
        let insert = match &self.status {
            Some(status) => format!(
                "INSERT INTO {} ({}, {}, {}, {status}) VALUES (?1, ?2, ?3, {STATUS_CHANGED})",
                self.table, self.group, self.key, self.text
            ),
            None => format!(
                "INSERT INTO {} ({}, {}, {}) VALUES (?1, ?2, ?3)",
                self.table, self.group, self.key, self.text
            ),
        };
        let update = format!(
            "UPDATE {} SET {} = ?1{} WHERE \"id\" = ?2",
            self.table,
            self.text,
            self.changed_status_assignment()
        );

        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: Option<(i64, Option<String>)> = tx
            .query_row(&select, params![group, key], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;

        let outcome = match existing {
            None => {
                let values = LocaleValues::single(locale, value);
                tx.execute(&insert, params![group, key, values.encode()])?;
                UpsertOutcome::Inserted
            }
            Some((id, text)) => {
                let mut values = LocaleValues::decode(text.as_deref().unwrap_or_default())
                    .map_err(|source| StoreError::InvalidBlob {
                        group: group.to_string(),
                        key: key.to_string(),
                        source,
                    })?;
                if values.merge(locale, value, overwrite) {
                    tx.execute(&update, params![values.encode(), id])?;
                    UpsertOutcome::Updated
                } else {
                    UpsertOutcome::Skipped
                }
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    fn distinct_groups(&self) -> Result<Vec<String>, StoreError> {
        let sql = format!(
            "SELECT DISTINCT {group} FROM {} ORDER BY {group}",
            self.table,
            group = self.group
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let groups =
            stmt.query_map([], |row| row.get(0))?.collect::<Result<Vec<String>, _>>()?;
        Ok(groups)
    }

    fn rows_for_group(&self, group: &str) -> Result<Vec<TranslationRow>, StoreError> {
        let condition = format!("WHERE {} = ?1", self.group);
        self.query_rows(&condition, params![group])?.into_iter().map(RawRow::decode).collect()
    }

    fn delete_where_all_locales_empty(&mut self) -> Result<usize, StoreError> {
        let doomed: Vec<i64> = self
            .query_rows("", [])?
            .into_iter()
            .filter(RawRow::is_all_empty)
            .map(|row| row.id)
            .collect();

        let delete = format!("DELETE FROM {} WHERE \"id\" = ?1", self.table);
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut deleted = 0;
        {
            let mut stmt = tx.prepare(&delete)?;
            for id in &doomed {
                deleted += stmt.execute(params![id])?;
            }
        }
        tx.commit()?;

        tracing::debug!("Deleted {} rows without any translation", deleted);
        Ok(deleted)
    }

    fn delete_by_group_pattern(
        &mut self,
        patterns: Option<&[GroupPattern]>,
    ) -> Result<usize, StoreError> {
        let Some(patterns) = patterns else {
            let deleted = self.conn.execute(&format!("DELETE FROM {}", self.table), [])?;
            return Ok(deleted);
        };
        if patterns.is_empty() {
            return Ok(0);
        }

        let mut clauses = Vec::with_capacity(patterns.len());
        let mut values = Vec::new();
        for pattern in patterns {
            match pattern {
                GroupPattern::Exact(name) => {
                    values.push(name.clone());
                    clauses.push(format!("{} = ?{}", self.group, values.len()));
                }
                GroupPattern::Prefix(prefix) => {
                    // LIKE ignores ASCII case; substr keeps the match exact.
                    values.push(like_prefix(prefix));
                    let like = values.len();
                    values.push(prefix.clone());
                    let exact = values.len();
                    clauses.push(format!(
                        "({group} LIKE ?{like} ESCAPE '\\' AND substr({group}, 1, length(?{exact})) = ?{exact})",
                        group = self.group
                    ));
                }
            }
        }

        let sql = format!("DELETE FROM {} WHERE {}", self.table, clauses.join(" OR "));
        let deleted = self.conn.execute(&sql, params_from_iter(values.iter()))?;
        Ok(deleted)
    }

    fn mark_group_saved(&mut self, group: &str) -> Result<usize, StoreError> {
        let Some(status) = &self.status else {
            return Ok(0);
        };
        let sql = format!(
            "UPDATE {} SET {status} = {STATUS_SAVED} WHERE {} = ?1",
            self.table, self.group
        );
        Ok(self.conn.execute(&sql, params![group])?)
    }

    fn all_rows(&self) -> Result<Vec<TranslationRow>, StoreError> {
        self.query_rows("", [])?.into_iter().map(RawRow::decode).collect()
    }
}
