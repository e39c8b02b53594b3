//! DuckDB-backed persistence for users, collections and decks.
//!
//! All statements are parameterized with `?` placeholders; user-supplied
//! values never reach the SQL text. Quantity merges are single-statement
//! upserts (`ON CONFLICT ... DO UPDATE SET quantity = quantity + ...`) so
//! concurrent adds from two sessions cannot lose an increment.

use chrono::{DateTime, Utc};
use duckdb::types::{Value as SqlValue, ValueRef};
use duckdb::Connection as DuckDbConnection;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::{BinderError, Result};
use crate::models::User;

const SCHEMA: &str = r#"
CREATE SEQUENCE IF NOT EXISTS collection_seq;
CREATE SEQUENCE IF NOT EXISTS deck_card_seq;

CREATE TABLE IF NOT EXISTS users (
    id          TEXT PRIMARY KEY,
    email       TEXT NOT NULL UNIQUE,
    name        TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS collection_entries (
    user_id             TEXT NOT NULL,
    identity            TEXT NOT NULL,
    seq                 BIGINT NOT NULL DEFAULT nextval('collection_seq'),
    card_data           TEXT NOT NULL,
    quantity            BIGINT NOT NULL,
    condition           TEXT NOT NULL,
    foil                BOOLEAN NOT NULL,
    language            TEXT NOT NULL,
    notes               TEXT,
    acquired_date       TEXT NOT NULL,
    acquired_price      DOUBLE,
    pricing             TEXT,
    pricing_updated_at  TEXT,
    added_at            TEXT NOT NULL,
    updated_at          TEXT NOT NULL,
    last_synced_at      TEXT,
    PRIMARY KEY (user_id, identity)
);

CREATE TABLE IF NOT EXISTS decks (
    id              TEXT PRIMARY KEY,
    user_id         TEXT NOT NULL,
    name            TEXT NOT NULL,
    description     TEXT NOT NULL,
    format          TEXT NOT NULL,
    is_public       BOOLEAN NOT NULL,
    cover_card      TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    last_played_at  TEXT
);

CREATE TABLE IF NOT EXISTS deck_cards (
    deck_id        TEXT NOT NULL,
    identity       TEXT NOT NULL,
    category       TEXT NOT NULL,
    seq            BIGINT NOT NULL DEFAULT nextval('deck_card_seq'),
    multiverse_id  BIGINT,
    card_id        TEXT,
    quantity       BIGINT NOT NULL,
    is_basic_land  BOOLEAN NOT NULL,
    card_data      TEXT,
    PRIMARY KEY (deck_id, identity, category)
);
"#;

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Wraps a DuckDB database holding the user documents.
///
/// Opened file-backed under the data directory, or in-memory for tests.
pub struct Store {
    conn: DuckDbConnection,
    data_dir: Option<PathBuf>,
}

impl Store {
    /// Open (creating if needed) the database under `data_dir`.
    pub fn open(data_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&data_dir)?;
        let conn = DuckDbConnection::open(data_dir.join("binder.duckdb"))?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            data_dir: Some(data_dir),
        })
    }

    /// Open an in-memory database. Nothing survives the process.
    pub fn open_in_memory() -> Result<Self> {
        let conn = DuckDbConnection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            data_dir: None,
        })
    }

    /// Directory the database lives in, if file-backed.
    pub fn data_dir(&self) -> Option<&PathBuf> {
        self.data_dir.as_ref()
    }

    // -- Query execution ---------------------------------------------------

    /// Execute a mutation statement, returning the number of affected rows.
    pub(crate) fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize> {
        let mut stmt = self.conn.prepare(sql)?;
        let refs: Vec<&dyn duckdb::ToSql> =
            params.iter().map(|p| p as &dyn duckdb::ToSql).collect();
        Ok(stmt.execute(refs.as_slice())?)
    }

    /// Execute a SELECT, returning each row as a
    /// `HashMap<String, serde_json::Value>`.
    pub(crate) fn query_rows(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        let mut stmt = self.conn.prepare(sql)?;
        let refs: Vec<&dyn duckdb::ToSql> =
            params.iter().map(|p| p as &dyn duckdb::ToSql).collect();

        let mut rows = stmt.query(refs.as_slice())?;

        // Column metadata is only available after query execution.
        let column_names: Vec<String> = rows
            .as_ref()
            .map(|r| r.column_names().into_iter().map(|s| s.to_string()).collect())
            .unwrap_or_default();
        let column_count = rows.as_ref().map(|r| r.column_count()).unwrap_or(0);

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut map = HashMap::new();
            for i in 0..column_count {
                map.insert(column_names[i].clone(), convert_value_ref(row.get_ref(i)?));
            }
            out.push(map);
        }
        Ok(out)
    }

    /// Execute a SELECT and return the first column of the first row.
    pub(crate) fn query_scalar(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Option<serde_json::Value>> {
        let mut stmt = self.conn.prepare(sql)?;
        let refs: Vec<&dyn duckdb::ToSql> =
            params.iter().map(|p| p as &dyn duckdb::ToSql).collect();

        let mut rows = stmt.query(refs.as_slice())?;
        if let Some(row) = rows.next()? {
            Ok(Some(convert_value_ref(row.get_ref(0)?)))
        } else {
            Ok(None)
        }
    }

    // -- Users -------------------------------------------------------------

    /// Create the root user document. Fails `Validation` on an empty email
    /// or name, or when the email is already registered.
    pub fn register_user(&self, email: &str, name: &str) -> Result<User> {
        let email = email.trim();
        let name = name.trim();
        if email.is_empty() {
            return Err(BinderError::Validation("email is required".into()));
        }
        if name.is_empty() {
            return Err(BinderError::Validation("name is required".into()));
        }

        let existing = self.query_scalar(
            "SELECT id FROM users WHERE email = ?",
            &[SqlValue::Text(email.to_string())],
        )?;
        if existing.is_some() {
            return Err(BinderError::Validation(format!(
                "email already registered: {email}"
            )));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.execute(
            "INSERT INTO users (id, email, name, created_at) VALUES (?, ?, ?, ?)",
            &[
                SqlValue::Text(user.id.clone()),
                SqlValue::Text(user.email.clone()),
                SqlValue::Text(user.name.clone()),
                SqlValue::Text(user.created_at.to_rfc3339()),
            ],
        )?;
        Ok(user)
    }

    /// Look up a user document by id.
    pub fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let rows = self.query_rows(
            "SELECT id, email, name, created_at FROM users WHERE id = ?",
            &[SqlValue::Text(user_id.to_string())],
        )?;
        rows.into_iter()
            .next()
            .map(|row| {
                Ok(User {
                    id: row_str(&row, "id")?,
                    email: row_str(&row, "email")?,
                    name: row_str(&row, "name")?,
                    created_at: row_datetime(&row, "created_at")?,
                })
            })
            .transpose()
    }

    /// Number of registered users.
    pub fn user_count(&self) -> Result<i64> {
        let v = self.query_scalar("SELECT COUNT(*) FROM users", &[])?;
        Ok(v.and_then(|v| v.as_i64()).unwrap_or(0))
    }
}

// ---------------------------------------------------------------------------
// Value conversion
// ---------------------------------------------------------------------------

/// Convert a DuckDB `ValueRef` to a `serde_json::Value`.
fn convert_value_ref(val: ValueRef<'_>) -> serde_json::Value {
    match val {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Boolean(b) => serde_json::Value::Bool(b),
        ValueRef::TinyInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::SmallInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::Int(n) => serde_json::Value::Number(n.into()),
        ValueRef::BigInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::HugeInt(n) => {
            // May not fit in i64; fall back to the string form.
            if let Ok(i) = i64::try_from(n) {
                serde_json::Value::Number(i.into())
            } else {
                serde_json::Value::String(n.to_string())
            }
        }
        ValueRef::Float(f) => serde_json::Number::from_f64(f as f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Double(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => {
            serde_json::Value::String(String::from_utf8_lossy(bytes).to_string())
        }
        _ => serde_json::Value::Null,
    }
}

// ---------------------------------------------------------------------------
// Row extraction helpers
// ---------------------------------------------------------------------------

type Row = HashMap<String, serde_json::Value>;

fn malformed(key: &str) -> BinderError {
    BinderError::Validation(format!("malformed row: missing or invalid '{key}'"))
}

pub(crate) fn row_str(row: &Row, key: &str) -> Result<String> {
    row.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| malformed(key))
}

pub(crate) fn row_opt_str(row: &Row, key: &str) -> Option<String> {
    row.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

pub(crate) fn row_i64(row: &Row, key: &str) -> Result<i64> {
    row.get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| malformed(key))
}

pub(crate) fn row_opt_i64(row: &Row, key: &str) -> Option<i64> {
    row.get(key).and_then(|v| v.as_i64())
}

pub(crate) fn row_opt_f64(row: &Row, key: &str) -> Option<f64> {
    row.get(key).and_then(|v| v.as_f64())
}

pub(crate) fn row_bool(row: &Row, key: &str) -> Result<bool> {
    row.get(key)
        .and_then(|v| v.as_bool())
        .ok_or_else(|| malformed(key))
}

pub(crate) fn row_datetime(row: &Row, key: &str) -> Result<DateTime<Utc>> {
    let s = row_str(row, key)?;
    parse_datetime(&s).ok_or_else(|| malformed(key))
}

pub(crate) fn row_opt_datetime(row: &Row, key: &str) -> Option<DateTime<Utc>> {
    row_opt_str(row, key).and_then(|s| parse_datetime(&s))
}

pub(crate) fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a JSON-text column into `T`, if present and non-null.
pub(crate) fn row_opt_json<T: serde::de::DeserializeOwned>(
    row: &Row,
    key: &str,
) -> Result<Option<T>> {
    match row.get(key) {
        Some(serde_json::Value::String(s)) => Ok(Some(serde_json::from_str(s)?)),
        _ => Ok(None),
    }
}

/// Parse a required JSON-text column into `T`.
pub(crate) fn row_json<T: serde::de::DeserializeOwned>(row: &Row, key: &str) -> Result<T> {
    row_opt_json(row, key)?.ok_or_else(|| malformed(key))
}
