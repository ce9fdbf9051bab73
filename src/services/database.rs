// src/services/database.rs
//! Read-only access to the SQLite file the agent answers questions from.

use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{Column, Connection, Row, SqliteConnection, TypeInfo, ValueRef};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::error;

/// Sample rows shown per table by [`SqlDatabase::table_info`].
const SAMPLE_ROWS: usize = 3;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("database file {} not found", .0.display())]
    NotFound(PathBuf),
    #[error("failed to open database: {0}")]
    Open(#[source] sqlx::Error),
    #[error("{0}")]
    Query(#[source] sqlx::Error),
    #[error("table names {0:?} not found in database")]
    UnknownTables(Vec<String>),
}

/// Rows returned by a statement, with values already rendered as text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl QueryOutput {
    /// Render as a list of tuples, e.g. `[(1, 'Alice'), (2, 'Bob')]`.
    /// An empty result renders as the empty string.
    pub fn to_tuple_list(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        let rows: Vec<String> = self
            .rows
            .iter()
            .map(|row| {
                if row.len() == 1 {
                    format!("({},)", row[0])
                } else {
                    format!("({})", row.join(", "))
                }
            })
            .collect();
        format!("[{}]", rows.join(", "))
    }
}

/// A read-only connection to the company database.
///
/// A fresh handle is opened for each agent; nothing is pooled or shared
/// across requests. No method writes: the connection is opened with
/// `SQLITE_OPEN_READONLY`, so destructive statements fail here.
#[derive(Debug)]
pub struct SqlDatabase {
    path: PathBuf,
    conn: Mutex<SqliteConnection>,
}

impl SqlDatabase {
    pub async fn open_read_only(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            error!(path = %path.display(), "database file missing");
            return Err(DatabaseError::NotFound(path));
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .read_only(true)
            .create_if_missing(false);
        let conn = SqliteConnection::connect_with(&options).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "database connection failed");
            DatabaseError::Open(e)
        })?;

        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dialect(&self) -> &'static str {
        "SQLite"
    }

    /// Execute `sql` and collect every returned row.
    pub async fn run(&self, sql: &str) -> Result<QueryOutput, DatabaseError> {
        let mut conn = self.conn.lock().await;
        let rows = sqlx::query(sql)
            .fetch_all(&mut *conn)
            .await
            .map_err(DatabaseError::Query)?;

        let columns = rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_owned()).collect())
            .unwrap_or_default();
        let rows = rows
            .iter()
            .map(render_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(DatabaseError::Query)?;

        Ok(QueryOutput { columns, rows })
    }

    /// User tables, sorted by name.
    pub async fn table_names(&self) -> Result<Vec<String>, DatabaseError> {
        let mut conn = self.conn.lock().await;
        let names: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&mut *conn)
        .await
        .map_err(DatabaseError::Query)?;
        Ok(names.into_iter().map(|(n,)| n).collect())
    }

    /// `CREATE TABLE` statement and a few sample rows for each named table.
    /// Names are matched case-insensitively; any unknown name is an error.
    pub async fn table_info(&self, tables: &[&str]) -> Result<String, DatabaseError> {
        let known = self.table_names().await?;
        let mut selected = Vec::with_capacity(tables.len());
        let mut missing = Vec::new();
        for wanted in tables {
            match known.iter().find(|k| k.eq_ignore_ascii_case(wanted)) {
                Some(name) => selected.push(name.clone()),
                None => missing.push((*wanted).to_owned()),
            }
        }
        if !missing.is_empty() {
            return Err(DatabaseError::UnknownTables(missing));
        }

        let mut sections = Vec::with_capacity(selected.len());
        for table in selected {
            let ddl = {
                let mut conn = self.conn.lock().await;
                let row: Option<(String,)> = sqlx::query_as(
                    "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
                )
                .bind(&table)
                .fetch_optional(&mut *conn)
                .await
                .map_err(DatabaseError::Query)?;
                row.map(|(s,)| s).unwrap_or_default()
            };

            let sample = self
                .run(&format!(
                    "SELECT * FROM \"{}\" LIMIT {SAMPLE_ROWS}",
                    table.replace('"', "\"\"")
                ))
                .await?;
            let mut section = format!(
                "\n{}\n\n/*\n{SAMPLE_ROWS} rows from {table} table:\n",
                ddl.trim()
            );
            section.push_str(&sample.columns.join("\t"));
            for row in &sample.rows {
                section.push('\n');
                section.push_str(&row.join("\t"));
            }
            section.push_str("\n*/");
            sections.push(section);
        }
        Ok(sections.join("\n\n"))
    }
}

fn render_row(row: &SqliteRow) -> Result<Vec<String>, sqlx::Error> {
    (0..row.len()).map(|idx| render_value(row, idx)).collect()
}

fn render_value(row: &SqliteRow, idx: usize) -> Result<String, sqlx::Error> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok("None".to_owned());
    }
    let type_name = raw.type_info().name().to_ascii_uppercase();
    let rendered = match type_name.as_str() {
        "INTEGER" | "INT" | "BIGINT" | "BOOLEAN" => {
            row.try_get_unchecked::<i64, _>(idx)?.to_string()
        }
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
            row.try_get_unchecked::<f64, _>(idx)?.to_string()
        }
        "BLOB" => {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(idx)?;
            format!("<{} bytes>", bytes.len())
        }
        _ => {
            let text = row.try_get_unchecked::<String, _>(idx)?;
            format!("'{}'", text.replace('\'', "\\'"))
        }
    };
    Ok(rendered)
}

const SAMPLE_SCHEMA: &[&str] = &[
    "DROP TABLE IF EXISTS Employees",
    "DROP TABLE IF EXISTS Departments",
    "CREATE TABLE Employees (
        ID INTEGER PRIMARY KEY,
        Name TEXT,
        Department TEXT,
        Salary INTEGER,
        Hire_Date TEXT
    )",
    "CREATE TABLE Departments (
        ID INTEGER PRIMARY KEY,
        Name TEXT,
        Manager TEXT
    )",
];

const SAMPLE_EMPLOYEES: &[(i64, &str, &str, i64, &str)] = &[
    (1, "Alice", "Sales", 50000, "2021-01-15"),
    (2, "Bob", "Engineering", 70000, "2020-06-10"),
    (3, "Charlie", "Marketing", 60000, "2022-03-20"),
];

const SAMPLE_DEPARTMENTS: &[(i64, &str, &str)] = &[
    (1, "Sales", "Alice"),
    (2, "Engineering", "Bob"),
    (3, "Marketing", "Charlie"),
];

/// (Re)create the two-table sample database at `path`.
///
/// This is the only write path in the crate and it never runs inside the
/// service; it backs the `seed-database` binary and the tests.
pub async fn create_sample_database(path: impl AsRef<Path>) -> Result<(), sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path.as_ref())
        .create_if_missing(true);
    let mut conn = SqliteConnection::connect_with(&options).await?;

    let mut tx = conn.begin().await?;
    for statement in SAMPLE_SCHEMA {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    for (id, name, department, salary, hired) in SAMPLE_EMPLOYEES {
        sqlx::query("INSERT INTO Employees VALUES (?1, ?2, ?3, ?4, ?5)")
            .bind(*id)
            .bind(*name)
            .bind(*department)
            .bind(*salary)
            .bind(*hired)
            .execute(&mut *tx)
            .await?;
    }
    for (id, name, manager) in SAMPLE_DEPARTMENTS {
        sqlx::query("INSERT INTO Departments VALUES (?1, ?2, ?3)")
            .bind(*id)
            .bind(*name)
            .bind(*manager)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    conn.close().await?;
    Ok(())
}
