//! The structured store and the executor that runs validated actions on it.
//!
//! The store owns its write serialization: one mutation per transaction,
//! guarded by the store's own lock, so concurrent pipeline runs cannot
//! interleave a batch. The executor makes no trust decisions — an `Action`
//! has already passed validation by construction — only storage-layer
//! concerns live here.

mod executor;


pub use executor::{ExecOutcome, Executor};

use casebook_schema::{Record, RECORD_FIELDS, TABLE_NAME};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or a call failed mid-flight. Fatal to
    /// the current request, never to the process.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    /// The store rejected the data. Reported, not retried.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, message)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::ConstraintViolation(
                    message.clone().unwrap_or_else(|| code.to_string()),
                )
            }
            _ => StoreError::StorageUnavailable(err.to_string()),
        }
    }
}

/// Ordered rows returned by a query action. Possibly empty — a well-formed
/// query with no matches is a result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl QueryRows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// SQLite-backed store of customer-service records.
///
/// The handle is explicitly passed with caller-controlled lifetime; there is
/// no process-wide connection.
pub struct FactStore {
    conn: Mutex<Connection>,
}

impl FactStore {
    /// Open (and bootstrap, if needed) a file-backed store.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::bootstrap(conn)
    }

    /// Open a private in-memory store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::bootstrap(conn)
    }

    fn bootstrap(conn: Connection) -> Result<Self, StoreError> {
        let columns = RECORD_FIELDS
            .iter()
            .map(|field| format!("    {field} TEXT"))
            .collect::<Vec<_>>()
            .join(",\n");
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {TABLE_NAME} (\n    id INTEGER PRIMARY KEY,\n{columns}\n);"
        ))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert a batch of records in one transaction; returns the stored count.
    pub fn insert(&self, records: &[Record]) -> Result<usize, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let sql = format!(
                "INSERT INTO {TABLE_NAME} ({}) VALUES (?1, ?2, ?3, ?4, ?5)",
                RECORD_FIELDS.join(", ")
            );
            let mut stmt = tx.prepare(&sql)?;
            for record in records {
                stmt.execute(rusqlite::params![
                    record.agent_name,
                    record.customer_email,
                    record.customer_order,
                    record.customer_phone,
                    record.customer_sentiment,
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(count = records.len(), "records stored");
        Ok(records.len())
    }

    /// Run a validated read expression and collect its rows in order.
    pub fn query(&self, sql: &str) -> Result<QueryRows, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        let width = columns.len();
        let mut rows = stmt.query([])?;
        let mut collected = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                let value: rusqlite::types::Value = row.get(i)?;
                values.push(render_value(value));
            }
            collected.push(values);
        }
        Ok(QueryRows {
            columns,
            rows: collected,
        })
    }
}

fn render_value(value: rusqlite::types::Value) -> String {
    use rusqlite::types::Value;
    match value {
        Value::Null => String::new(),
        Value::Integer(n) => n.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s,
        Value::Blob(bytes) => format!("<{} bytes>", bytes.len()),
    }
}
