//! Per-user JSON document storage using SQLite.
//!
//! Documents live at `(owner, collection, doc_id)` and are arbitrary JSON.
//! Readers validate shape themselves; the store never interprets bodies
//! beyond the object merge in [`DocumentStore::merge`].

use crate::error::StoreError;
use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// A stored document with its key and write times
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub body: Value,
    pub created_at: String,
    pub updated_at: String,
}

/// Persists per-user documents in SQLite.
pub struct DocumentStore {
    conn: Mutex<Connection>,
}

impl DocumentStore {
    /// Opens (or creates) the SQLite database and ensures the table exists.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        // Both stores may share one database file
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS documents (
                owner_user_id TEXT NOT NULL,
                collection    TEXT NOT NULL,
                doc_id        TEXT NOT NULL,
                body          TEXT NOT NULL,
                created_at    TEXT NOT NULL,
                updated_at    TEXT NOT NULL,
                PRIMARY KEY (owner_user_id, collection, doc_id)
            );
            CREATE INDEX IF NOT EXISTS idx_documents_created
                ON documents(owner_user_id, collection, created_at);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Reads a document body, `None` if it does not exist.
    pub fn get(&self, owner: &str, collection: &str, doc_id: &str) -> Result<Option<Value>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let body = read_body(&conn, owner, collection, doc_id)?;
        body.map(|raw| serde_json::from_str(&raw).map_err(StoreError::from))
            .transpose()
    }

    /// Writes a document, replacing any existing body.
    pub fn set(&self, owner: &str, collection: &str, doc_id: &str, body: &Value) -> Result<(), StoreError> {
        let raw = serde_json::to_string(body)?;
        let conn = self.conn.lock().unwrap();
        write_body(&conn, owner, collection, doc_id, &raw)
    }

    /// Shallow-merges `patch` into an existing object document (creating it if
    /// absent). Top-level fields not named in the patch are kept.
    ///
    /// Runs under the connection lock, so concurrent merges never lose each
    /// other's fields.
    pub fn merge(
        &self,
        owner: &str,
        collection: &str,
        doc_id: &str,
        patch: &Map<String, Value>,
    ) -> Result<Value, StoreError> {
        let conn = self.conn.lock().unwrap();

        let mut merged = match read_body(&conn, owner, collection, doc_id)? {
            Some(raw) => match serde_json::from_str::<Value>(&raw)? {
                Value::Object(existing) => existing,
                _ => Map::new(),
            },
            None => Map::new(),
        };
        for (key, value) in patch {
            merged.insert(key.clone(), value.clone());
        }

        let merged = Value::Object(merged);
        write_body(&conn, owner, collection, doc_id, &serde_json::to_string(&merged)?)?;
        Ok(merged)
    }

    /// Lists a collection, newest first.
    pub fn list(&self, owner: &str, collection: &str) -> Result<Vec<Document>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT doc_id, body, created_at, updated_at FROM documents
             WHERE owner_user_id = ?1 AND collection = ?2
             ORDER BY created_at DESC, rowid DESC",
        )?;

        let rows = stmt
            .query_map(params![owner, collection], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, raw, created_at, updated_at)| -> Result<Document, StoreError> {
                Ok(Document {
                    id,
                    body: serde_json::from_str(&raw)?,
                    created_at,
                    updated_at,
                })
            })
            .collect()
    }

    /// Deletes a document. Returns whether it existed.
    pub fn delete(&self, owner: &str, collection: &str, doc_id: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "DELETE FROM documents WHERE owner_user_id = ?1 AND collection = ?2 AND doc_id = ?3",
            params![owner, collection, doc_id],
        )?;
        Ok(rows > 0)
    }
}

fn read_body(
    conn: &Connection,
    owner: &str,
    collection: &str,
    doc_id: &str,
) -> Result<Option<String>, StoreError> {
    let body = conn
        .query_row(
            "SELECT body FROM documents WHERE owner_user_id = ?1 AND collection = ?2 AND doc_id = ?3",
            params![owner, collection, doc_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(body)
}

fn write_body(
    conn: &Connection,
    owner: &str,
    collection: &str,
    doc_id: &str,
    raw: &str,
) -> Result<(), StoreError> {
    // Fixed-width timestamps so text ordering matches time ordering
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    conn.execute(
        "INSERT INTO documents (owner_user_id, collection, doc_id, body, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)
         ON CONFLICT(owner_user_id, collection, doc_id) DO UPDATE SET
             body = excluded.body,
             updated_at = excluded.updated_at",
        params![owner, collection, doc_id, raw, now],
    )?;
    Ok(())
}
