//! Shared key-value store.
//!
//! Every persisted record (session, lockout, rate-limit windows, action log,
//! badge progress) lives under a string key as JSON text. Reads that fail to
//! parse are reported as absent so a corrupt entry heals on the next write.

use rusqlite::{OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use super::Database;
use crate::error::{DatabaseError, ServiceResult};

/// Key holding the current session record
pub const SESSION_KEY: &str = "session";
/// Pre-session storage key, removed on logout
pub const LEGACY_USER_KEY: &str = "user";
/// Key holding the failed-login lockout record
pub const LOCKOUT_KEY: &str = "lockout";
/// Key holding the logged sustainability actions
pub const ACTIONS_KEY: &str = "sustainableActions";
/// Key holding badge progress counters
pub const BADGES_KEY: &str = "badges";

/// Storage key for an action's rate-limit window
pub fn rate_limit_key(action: &str) -> String {
    format!("rateLimit_{}", action)
}

/// String key-value store
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> ServiceResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> ServiceResult<()>;

    /// Removing a missing key is not an error
    fn remove(&self, key: &str) -> ServiceResult<()>;
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> ServiceResult<Option<String>> {
        let conn = self.conn();

        conn.query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| DatabaseError::Query(e).into())
    }

    fn set(&self, key: &str, value: &str) -> ServiceResult<()> {
        let conn = self.conn();

        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, datetime('now')) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value],
        )
        .map_err(DatabaseError::Query)?;

        Ok(())
    }

    fn remove(&self, key: &str) -> ServiceResult<()> {
        let conn = self.conn();

        conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])
            .map_err(DatabaseError::Query)?;

        Ok(())
    }
}

/// Read and decode a JSON record.
///
/// Missing keys and undecodable values both come back as `None`.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> ServiceResult<Option<T>> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(key = %key, error = %e, "Ignoring corrupt stored record");
            Ok(None)
        }
    }
}

/// Encode a record as JSON and write it
pub fn save_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> ServiceResult<()> {
    let raw = serde_json::to_string(value).map_err(DatabaseError::Serialization)?;
    store.set(key, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        user: String,
        timestamp: i64,
    }

    #[test]
    fn test_get_set_remove() {
        let db = Database::open_in_memory().unwrap();

        assert_eq!(db.get("missing").unwrap(), None);

        db.set("k", "v1").unwrap();
        db.set("k", "v2").unwrap();
        assert_eq!(db.get("k").unwrap().as_deref(), Some("v2"));

        db.remove("k").unwrap();
        assert_eq!(db.get("k").unwrap(), None);

        // Removing again is fine
        db.remove("k").unwrap();
    }

    #[test]
    fn test_json_record_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("greenite.db");
        let record = Record {
            user: "someone@example.com".to_string(),
            timestamp: 1_700_000_000_000,
        };

        {
            let db = Database::open(&path).unwrap();
            save_json(&db, SESSION_KEY, &record).unwrap();
        }

        let db = Database::open(&path).unwrap();
        let loaded: Option<Record> = load_json(&db, SESSION_KEY).unwrap();
        assert_eq!(loaded, Some(record));
    }

    #[test]
    fn test_garbage_reads_as_absent() {
        let db = Database::open_in_memory().unwrap();

        db.set(SESSION_KEY, "{not json").unwrap();
        let loaded: Option<Record> = load_json(&db, SESSION_KEY).unwrap();
        assert!(loaded.is_none());

        // Valid JSON with the wrong shape is also absent
        db.set(SESSION_KEY, "[1,2,3]").unwrap();
        let loaded: Option<Record> = load_json(&db, SESSION_KEY).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_rate_limit_key() {
        assert_eq!(rate_limit_key("login"), "rateLimit_login");
    }
}
