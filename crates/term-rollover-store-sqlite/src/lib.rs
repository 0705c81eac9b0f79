use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use rusqlite::{params_from_iter, Connection, DatabaseName};
use serde::{Deserialize, Serialize};
use term_rollover_core::{Predicate, SqlParam, Statement};

mod records;
mod schema;

pub use records::{AdminHold, CourseSection, HomeworkAttempt, Registration};
pub use rusqlite::types::Value;
pub use schema::TABLES;

pub struct SqliteStore {
    conn: Connection,
}

/// Rows read back from a table, column names in select order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RowSet {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == column)
    }

    /// Values of `columns` from one row, in the order requested.
    ///
    /// # Errors
    /// Returns an error when a requested column is not part of this row set.
    pub fn project(&self, row: &[Value], columns: &[&str]) -> Result<Vec<Value>> {
        columns
            .iter()
            .map(|column| {
                self.column_index(column)
                    .and_then(|index| row.get(index))
                    .cloned()
                    .ok_or_else(|| anyhow!("column {column} missing from selected rows"))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForeignKeyViolation {
    pub table: String,
    pub rowid: i64,
    pub parent: String,
    pub fk_index: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntegrityReport {
    pub quick_check_ok: bool,
    pub quick_check_message: String,
    pub foreign_key_violations: Vec<ForeignKeyViolation>,
    pub missing_tables: Vec<String>,
}

/// A named connection target: the primary, secondary, or archive store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreProfile {
    pub name: String,
    pub path: PathBuf,
}

impl StoreProfile {
    #[must_use]
    pub fn new(name: &str, path: impl Into<PathBuf>) -> Self {
        Self { name: name.to_string(), path: path.into() }
    }

    /// Check out a fresh connection to an existing store.
    ///
    /// # Errors
    /// Returns an error when the database file is missing or cannot be opened.
    pub fn checkout(&self) -> Result<SqliteStore> {
        if !self.path.exists() {
            return Err(anyhow!(
                "{} store database does not exist: {}",
                self.name,
                self.path.display()
            ));
        }
        SqliteStore::open(&self.path)
            .with_context(|| format!("failed to check out {} store connection", self.name))
    }
}

#[must_use]
pub fn to_value(param: &SqlParam) -> Value {
    match param {
        SqlParam::Null => Value::Null,
        SqlParam::Integer(value) => Value::Integer(*value),
        SqlParam::Text(value) => Value::Text(value.clone()),
    }
}

fn to_values(params: &[SqlParam]) -> Vec<Value> {
    params.iter().map(to_value).collect()
}

/// NULL-safe equality over `columns`, one placeholder per column.
fn match_clause(columns: &[&str]) -> String {
    columns.iter().map(|column| format!("{column} IS ?")).collect::<Vec<_>>().join(" AND ")
}

impl SqliteStore {
    /// Open a SQLite-backed course store and configure required runtime pragmas.
    ///
    /// # Errors
    /// Returns an error when the database cannot be opened or pragmas cannot be applied.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite database at {}", path.display()))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to configure sqlite pragmas")?;

        Ok(Self { conn })
    }

    /// Create any missing tables of the course store schema.
    ///
    /// # Errors
    /// Returns an error when the DDL batch fails.
    pub fn bootstrap_schema(&self) -> Result<()> {
        self.execute_batch(schema::SCHEMA_SQL).context("failed to apply course store schema")
    }

    /// Run several semicolon-separated statements without parameters.
    ///
    /// # Errors
    /// Returns an error when any statement fails.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql).context("failed to execute sql batch")
    }

    /// # Errors
    /// Returns an error when `sqlite_master` cannot be queried.
    pub fn table_exists(&self, table: &str) -> Result<bool> {
        self.conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
                [table],
                |row| row.get::<_, i64>(0),
            )
            .map(|exists| exists == 1)
            .with_context(|| format!("failed to check table existence for {table}"))
    }

    /// Tables of the bootstrap schema absent from this store.
    ///
    /// # Errors
    /// Returns an error when `sqlite_master` cannot be queried.
    pub fn missing_tables(&self) -> Result<Vec<String>> {
        let mut missing = Vec::new();
        for table in TABLES {
            if !self.table_exists(table)? {
                missing.push((*table).to_string());
            }
        }
        Ok(missing)
    }

    /// Column names of `table` in declaration order.
    ///
    /// # Errors
    /// Returns an error when table metadata cannot be read.
    pub fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .with_context(|| format!("failed to inspect columns for {table}"))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
        let mut columns = Vec::new();
        for row in rows {
            columns.push(row?);
        }
        if columns.is_empty() {
            return Err(anyhow!("table {table} does not exist"));
        }
        Ok(columns)
    }

    /// Run one bulk statement and return the affected row count.
    ///
    /// # Errors
    /// Returns an error when the statement fails.
    pub fn execute(&self, statement: &Statement) -> Result<usize> {
        let sql = statement.sql();
        self.conn
            .execute(&sql, params_from_iter(to_values(&statement.params())))
            .with_context(|| format!("failed to execute `{sql}`"))
    }

    /// Count the rows `statement` would touch, without mutating anything.
    ///
    /// # Errors
    /// Returns an error when the preview query fails.
    pub fn preview(&self, statement: &Statement) -> Result<i64> {
        let sql = statement.preview_sql();
        self.conn
            .query_row(&sql, params_from_iter(to_values(&statement.preview_params())), |row| {
                row.get::<_, i64>(0)
            })
            .with_context(|| format!("failed to preview `{sql}`"))
    }

    /// # Errors
    /// Returns an error when the count query fails.
    pub fn count_rows(&self, table: &str, filter: Option<&Predicate>) -> Result<i64> {
        let (sql, params) = match filter {
            Some(filter) => {
                (format!("SELECT COUNT(*) FROM {table} WHERE {}", filter.clause), filter.params.clone())
            }
            None => (format!("SELECT COUNT(*) FROM {table}"), Vec::new()),
        };
        self.conn
            .query_row(&sql, params_from_iter(to_values(&params)), |row| row.get::<_, i64>(0))
            .with_context(|| format!("failed to count rows in {table}"))
    }

    /// Run an arbitrary read query.
    ///
    /// # Errors
    /// Returns an error when the query cannot be prepared or rows cannot be read.
    pub fn query(&self, sql: &str, params: &[SqlParam]) -> Result<RowSet> {
        self.query_values(sql, &to_values(params))
    }

    /// All columns of the rows in `table` matching `filter`.
    ///
    /// # Errors
    /// Returns an error when the select fails.
    pub fn select_rows(&self, table: &str, filter: Option<&Predicate>) -> Result<RowSet> {
        match filter {
            Some(filter) => self.query(
                &format!("SELECT * FROM {table} WHERE {}", filter.clause),
                &filter.params,
            ),
            None => self.query(&format!("SELECT * FROM {table}"), &[]),
        }
    }

    /// Insert every row of `rows` into `table`, replacing the columns named in
    /// `overrides` with fixed values.
    ///
    /// # Errors
    /// Returns an error when `table` lacks one of the row set's columns or an
    /// insert fails.
    pub fn insert_rows(
        &self,
        table: &str,
        rows: &RowSet,
        overrides: &[(&str, SqlParam)],
    ) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let target_columns = self.table_columns(table)?;
        if let Some(missing) =
            rows.columns.iter().find(|column| !target_columns.contains(column))
        {
            return Err(anyhow!("destination table {table} has no column {missing}"));
        }

        let placeholders =
            (1..=rows.columns.len()).map(|index| format!("?{index}")).collect::<Vec<_>>();
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            rows.columns.join(", "),
            placeholders.join(", ")
        );
        let override_slots = overrides
            .iter()
            .map(|(column, value)| {
                rows.column_index(column)
                    .map(|index| (index, to_value(value)))
                    .ok_or_else(|| anyhow!("override column {column} not selected from {table}"))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut stmt =
            self.conn.prepare(&sql).with_context(|| format!("failed to prepare insert into {table}"))?;
        let mut inserted = 0;
        for row in &rows.rows {
            let mut values = row.clone();
            for (index, value) in &override_slots {
                values[*index] = value.clone();
            }
            inserted += stmt
                .execute(params_from_iter(values))
                .with_context(|| format!("failed to insert row into {table}"))?;
        }
        Ok(inserted)
    }

    /// Insert one row given as column/value pairs.
    ///
    /// # Errors
    /// Returns an error when the insert fails.
    pub fn insert_values(&self, table: &str, values: &[(&str, SqlParam)]) -> Result<()> {
        let rows = RowSet {
            columns: values.iter().map(|(column, _)| (*column).to_string()).collect(),
            rows: vec![values.iter().map(|(_, value)| to_value(value)).collect()],
        };
        self.insert_rows(table, &rows, &[]).map(|_| ())
    }

    /// Whether a row matching every column/value pair exists, NULLs matching NULLs.
    ///
    /// # Errors
    /// Returns an error when the lookup fails.
    pub fn row_exists(&self, table: &str, columns: &[&str], values: &[Value]) -> Result<bool> {
        let sql =
            format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE {})", match_clause(columns));
        self.conn
            .query_row(&sql, params_from_iter(values.iter()), |row| row.get::<_, i64>(0))
            .map(|exists| exists == 1)
            .with_context(|| format!("failed to look up existing row in {table}"))
    }

    /// Rows of `table` matching every column/value pair, NULLs matching NULLs.
    ///
    /// # Errors
    /// Returns an error when the select fails.
    pub fn select_matching(&self, table: &str, columns: &[&str], values: &[Value]) -> Result<RowSet> {
        self.query_values(
            &format!("SELECT * FROM {table} WHERE {}", match_clause(columns)),
            values,
        )
    }

    /// Set `assignments` on rows matching every column/value pair.
    ///
    /// # Errors
    /// Returns an error when the update fails.
    pub fn update_matching(
        &self,
        table: &str,
        assignments: &[(&str, Value)],
        columns: &[&str],
        values: &[Value],
    ) -> Result<usize> {
        let set = assignments
            .iter()
            .map(|(column, _)| format!("{column} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE {table} SET {set} WHERE {}", match_clause(columns));
        let params = assignments.iter().map(|(_, value)| value).chain(values.iter());
        self.conn
            .execute(&sql, params_from_iter(params))
            .with_context(|| format!("failed to update {table}"))
    }

    /// Run `work` inside one transaction; any error rolls every write back.
    ///
    /// # Errors
    /// Returns the error from `work`, or an error when the transaction cannot
    /// start or commit.
    pub fn in_unit<T>(&self, work: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction().context("failed to start transaction")?;
        let value = work(self)?;
        tx.commit().context("failed to commit transaction")?;
        Ok(value)
    }

    /// Write a full online backup of this store.
    ///
    /// # Errors
    /// Returns an error when the destination directory or backup cannot be written.
    pub fn backup_database(&self, out_file: &Path) -> Result<()> {
        if let Some(parent) = out_file.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create parent directory for backup file {}", out_file.display())
            })?;
        }

        self.conn
            .backup(DatabaseName::Main, out_file, None)
            .with_context(|| format!("failed to create sqlite backup at {}", out_file.display()))
    }

    /// Run `SQLite` structural checks and report schema tables that are absent.
    ///
    /// # Errors
    /// Returns an error when a check cannot be executed.
    pub fn integrity_check(&self) -> Result<IntegrityReport> {
        let quick_check_message: String = self
            .conn
            .query_row("PRAGMA quick_check", [], |row| row.get::<_, String>(0))
            .context("failed to run PRAGMA quick_check")?;

        let mut stmt = self
            .conn
            .prepare("PRAGMA foreign_key_check")
            .context("failed to prepare PRAGMA foreign_key_check")?;
        let rows = stmt.query_map([], |row| {
            Ok(ForeignKeyViolation {
                table: row.get(0)?,
                rowid: row.get(1)?,
                parent: row.get(2)?,
                fk_index: row.get(3)?,
            })
        })?;

        let mut foreign_key_violations = Vec::new();
        for row in rows {
            foreign_key_violations.push(row?);
        }

        Ok(IntegrityReport {
            quick_check_ok: quick_check_message == "ok",
            quick_check_message,
            foreign_key_violations,
            missing_tables: self.missing_tables()?,
        })
    }

    fn query_values(&self, sql: &str, params: &[Value]) -> Result<RowSet> {
        let mut stmt =
            self.conn.prepare(sql).with_context(|| format!("failed to prepare `{sql}`"))?;
        let columns =
            stmt.column_names().into_iter().map(str::to_string).collect::<Vec<_>>();
        let width = columns.len();

        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for index in 0..width {
                values.push(row.get::<_, Value>(index)?);
            }
            out.push(values);
        }
        Ok(RowSet { columns, rows: out })
    }
}

/// Copy the rows of `table` matching `filter` from `source` into the same
/// table of `target`. Callers own the surrounding transaction.
///
/// # Errors
/// Returns an error when reading or inserting fails.
pub fn copy_rows(
    source: &SqliteStore,
    target: &SqliteStore,
    table: &str,
    filter: Option<&Predicate>,
    overrides: &[(&str, SqlParam)],
) -> Result<usize> {
    let rows = source.select_rows(table, filter)?;
    target.insert_rows(table, &rows, overrides)
}
