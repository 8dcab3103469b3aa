//! Encrypted credential storage using SQLite.

use super::{ResourceCredential, ResourceType, SealedToken, TokenCipher};
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Encrypted credential storage backed by SQLite.
///
/// # Schema
/// ```sql
/// CREATE TABLE resource_credentials (
///     owner_user_id      TEXT NOT NULL,
///     resource_type      TEXT NOT NULL,
///     resource_id        TEXT NOT NULL,
///     resource_name      TEXT,
///     access_token       TEXT NOT NULL,  -- Encrypted
///     access_token_nonce TEXT NOT NULL,
///     obtained_at        TEXT NOT NULL,  -- RFC 3339
///     last_modified      TEXT NOT NULL,  -- RFC 3339
///     created_at         TEXT NOT NULL,  -- first connect, kept across reconnects
///     PRIMARY KEY (owner_user_id, resource_type)
/// );
/// ```
///
/// The connection is wrapped in a Mutex; each statement is its own atomic
/// write, so concurrent saves for the same key resolve last-write-wins.
pub struct CredentialStore {
    conn: Mutex<Connection>,
    cipher: TokenCipher,
}

impl CredentialStore {
    /// Creates or opens a credential store.
    ///
    /// # Arguments
    /// * `db_path` - Path to SQLite database file (":memory:" for tests)
    /// * `encryption_key` - Base64-encoded 32-byte master key
    pub fn new<P: AsRef<Path>>(db_path: P, encryption_key: &str) -> Result<Self, StoreError> {
        let cipher = TokenCipher::from_base64_key(encryption_key)?;

        let conn = Connection::open(db_path)?;
        // Both stores may share one database file
        conn.busy_timeout(Duration::from_secs(5))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS resource_credentials (
                owner_user_id      TEXT NOT NULL,
                resource_type      TEXT NOT NULL,
                resource_id        TEXT NOT NULL,
                resource_name      TEXT,
                access_token       TEXT NOT NULL,
                access_token_nonce TEXT NOT NULL,
                obtained_at        TEXT NOT NULL,
                last_modified      TEXT NOT NULL,
                created_at         TEXT NOT NULL,
                PRIMARY KEY (owner_user_id, resource_type)
            );
            "#,
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            cipher,
        })
    }

    /// Stores the credential for an owner and resource type.
    ///
    /// Replaces the credential columns of an existing row and leaves the rest
    /// of the row (first-connect time) untouched.
    pub fn save(
        &self,
        owner_user_id: &str,
        resource_type: ResourceType,
        credential: &ResourceCredential,
    ) -> Result<(), StoreError> {
        let sealed = self.cipher.seal(&credential.access_token)?;
        let now = Utc::now().to_rfc3339();

        self.conn.lock().unwrap().execute(
            r#"
            INSERT INTO resource_credentials (
                owner_user_id, resource_type,
                resource_id, resource_name,
                access_token, access_token_nonce,
                obtained_at, last_modified, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            ON CONFLICT(owner_user_id, resource_type) DO UPDATE SET
                resource_id = excluded.resource_id,
                resource_name = excluded.resource_name,
                access_token = excluded.access_token,
                access_token_nonce = excluded.access_token_nonce,
                obtained_at = excluded.obtained_at,
                last_modified = excluded.last_modified
            "#,
            params![
                owner_user_id,
                resource_type.as_str(),
                credential.resource_id,
                credential.resource_name,
                sealed.ciphertext,
                sealed.nonce,
                credential.obtained_at.to_rfc3339(),
                now,
            ],
        )?;

        Ok(())
    }

    /// Retrieves the credential for an owner and resource type.
    ///
    /// `Ok(None)` means the resource has not been connected.
    pub fn load(
        &self,
        owner_user_id: &str,
        resource_type: ResourceType,
    ) -> Result<Option<ResourceCredential>, StoreError> {
        let row = {
            let conn = self.conn.lock().unwrap();
            conn.query_row(
                r#"
                SELECT resource_id, resource_name,
                       access_token, access_token_nonce,
                       obtained_at, last_modified
                FROM resource_credentials
                WHERE owner_user_id = ?1 AND resource_type = ?2
                "#,
                params![owner_user_id, resource_type.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?
        };

        let Some((resource_id, resource_name, ciphertext, nonce, obtained_at, last_modified)) = row
        else {
            return Ok(None);
        };

        let access_token = self.cipher.open(&SealedToken { ciphertext, nonce })?;

        Ok(Some(ResourceCredential {
            owner_user_id: owner_user_id.to_string(),
            resource_id,
            resource_name,
            access_token,
            obtained_at: parse_timestamp(&obtained_at)?,
            last_modified: parse_timestamp(&last_modified)?,
        }))
    }

    /// Deletes the credential for an owner and resource type.
    ///
    /// Returns whether a row existed.
    pub fn delete(&self, owner_user_id: &str, resource_type: ResourceType) -> Result<bool, StoreError> {
        let rows_affected = self.conn.lock().unwrap().execute(
            "DELETE FROM resource_credentials WHERE owner_user_id = ?1 AND resource_type = ?2",
            params![owner_user_id, resource_type.as_str()],
        )?;

        Ok(rows_affected > 0)
    }

    /// Lists the resource types an owner has connected.
    pub fn list_by_owner(&self, owner_user_id: &str) -> Result<Vec<ResourceType>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT resource_type FROM resource_credentials WHERE owner_user_id = ?1 ORDER BY resource_type",
        )?;

        let names = stmt
            .query_map(params![owner_user_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<String>, _>>()?;

        names
            .iter()
            .map(|name| name.parse().map_err(StoreError::Corrupt))
            .collect()
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

    fn create_test_store() -> CredentialStore {
        let key = BASE64.encode([0u8; 32]);
        CredentialStore::new(":memory:", &key).expect("Failed to create test store")
    }

    fn page_credential(resource_id: &str, token: &str) -> ResourceCredential {
        let now = Utc::now();
        ResourceCredential {
            owner_user_id: "owner-1".to_string(),
            resource_id: resource_id.to_string(),
            resource_name: Some("My Page".to_string()),
            access_token: token.to_string(),
            obtained_at: now,
            last_modified: now,
        }
    }

    #[test]
    fn test_save_and_load() {
        let store = create_test_store();
        let credential = page_credential("page1", "PAT1");

        store
            .save("owner-1", ResourceType::Facebook, &credential)
            .expect("Failed to save");

        let loaded = store
            .load("owner-1", ResourceType::Facebook)
            .expect("Failed to load")
            .expect("Credential not found");

        assert_eq!(loaded.resource_id, "page1");
        assert_eq!(loaded.access_token, "PAT1");
        assert_eq!(loaded.resource_name.as_deref(), Some("My Page"));
        assert_eq!(loaded.obtained_at.timestamp(), credential.obtained_at.timestamp());
    }

    #[test]
    fn test_token_is_encrypted_at_rest() {
        let store = create_test_store();
        store
            .save("owner-1", ResourceType::Facebook, &page_credential("page1", "PAT1-plain"))
            .unwrap();

        let raw: String = store
            .conn
            .lock()
            .unwrap()
            .query_row(
                "SELECT access_token FROM resource_credentials WHERE owner_user_id = 'owner-1'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(!raw.contains("PAT1-plain"));
    }

    #[test]
    fn test_load_missing_is_none() {
        let store = create_test_store();

        let result = store.load("owner-1", ResourceType::Facebook).expect("Failed to load");
        assert!(result.is_none());
    }

    #[test]
    fn test_reconnect_overwrites_credential() {
        let store = create_test_store();

        store
            .save("owner-1", ResourceType::Facebook, &page_credential("page1", "PAT1"))
            .unwrap();
        let created_before: String = store
            .conn
            .lock()
            .unwrap()
            .query_row("SELECT created_at FROM resource_credentials", [], |row| row.get(0))
            .unwrap();

        store
            .save("owner-1", ResourceType::Facebook, &page_credential("page2", "PAT2"))
            .unwrap();

        let loaded = store.load("owner-1", ResourceType::Facebook).unwrap().unwrap();
        assert_eq!(loaded.resource_id, "page2");
        assert_eq!(loaded.access_token, "PAT2");

        // Bookkeeping outside the credential columns survives the upsert
        let created_after: String = store
            .conn
            .lock()
            .unwrap()
            .query_row("SELECT created_at FROM resource_credentials", [], |row| row.get(0))
            .unwrap();
        assert_eq!(created_before, created_after);
    }

    #[test]
    fn test_resource_types_are_independent() {
        let store = create_test_store();

        store
            .save("owner-1", ResourceType::Facebook, &page_credential("page1", "PAT1"))
            .unwrap();
        store
            .save("owner-1", ResourceType::X, &page_credential("me", "XTOKEN"))
            .unwrap();
        store
            .save("owner-2", ResourceType::Facebook, &page_credential("page9", "PAT9"))
            .unwrap();

        assert_eq!(
            store.list_by_owner("owner-1").unwrap(),
            vec![ResourceType::Facebook, ResourceType::X]
        );
        assert_eq!(store.list_by_owner("owner-2").unwrap(), vec![ResourceType::Facebook]);
        assert!(store.list_by_owner("owner-3").unwrap().is_empty());

        let x = store.load("owner-1", ResourceType::X).unwrap().unwrap();
        assert_eq!(x.access_token, "XTOKEN");
    }

    #[test]
    fn test_delete() {
        let store = create_test_store();
        store
            .save("owner-1", ResourceType::Facebook, &page_credential("page1", "PAT1"))
            .unwrap();

        assert!(store.delete("owner-1", ResourceType::Facebook).unwrap());
        assert!(store.load("owner-1", ResourceType::Facebook).unwrap().is_none());
        assert!(!store.delete("owner-1", ResourceType::Facebook).unwrap());
    }

    #[test]
    fn test_file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.db");
        let key = BASE64.encode([7u8; 32]);

        {
            let store = CredentialStore::new(&path, &key).unwrap();
            store
                .save("owner-1", ResourceType::Facebook, &page_credential("page1", "PAT1"))
                .unwrap();
        }

        let reopened = CredentialStore::new(&path, &key).unwrap();
        let loaded = reopened.load("owner-1", ResourceType::Facebook).unwrap().unwrap();
        assert_eq!(loaded.access_token, "PAT1");

        // A different master key cannot read the token
        let wrong = CredentialStore::new(&path, &BASE64.encode([8u8; 32])).unwrap();
        assert!(wrong.load("owner-1", ResourceType::Facebook).is_err());
    }

    #[test]
    fn test_invalid_encryption_key() {
        assert!(CredentialStore::new(":memory:", "short").is_err());
        assert!(CredentialStore::new(":memory:", "not-valid-base64!@#$").is_err());
    }
}
