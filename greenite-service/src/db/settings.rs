//! Settings storage operations.
//!
//! Runtime overrides for the dynamic configuration. Only keys the dynamic
//! configuration knows about, with in-range values, are ever written; rows
//! that fail the same check on the way out are skipped.

use std::collections::HashMap;

use rusqlite::params;
use tracing::warn;

use super::Database;
use crate::config::DynamicConfig;
use crate::error::{DatabaseError, ServiceError, ServiceResult};

impl Database {
    /// Get all stored overrides as a map
    pub fn get_all_settings(&self) -> ServiceResult<HashMap<String, serde_json::Value>> {
        let conn = self.conn();

        let mut stmt = conn
            .prepare("SELECT key, value FROM settings")
            .map_err(DatabaseError::Query)?;

        let rows = stmt
            .query_map([], |row| {
                let key: String = row.get(0)?;
                let value_str: String = row.get(1)?;
                Ok((key, value_str))
            })
            .map_err(DatabaseError::Query)?;

        let mut settings = HashMap::new();
        for row in rows {
            let (key, value_str) = row.map_err(DatabaseError::Query)?;
            let value = match serde_json::from_str::<serde_json::Value>(&value_str) {
                Ok(value) => value,
                Err(e) => {
                    warn!(key = %key, error = %e, "Skipping unreadable setting");
                    continue;
                }
            };
            if let Err(reason) = DynamicConfig::check_setting(&key, &value) {
                warn!(key = %key, reason = %reason, "Skipping stored setting");
                continue;
            }
            settings.insert(key, value);
        }

        Ok(settings)
    }

    /// Apply a batch of overrides atomically.
    ///
    /// Null values delete the override (revert to default). Every entry is
    /// checked before anything is written, so one bad entry rejects the batch.
    pub fn set_settings(&self, settings: HashMap<String, serde_json::Value>) -> ServiceResult<()> {
        let mut writes = Vec::with_capacity(settings.len());
        for (key, value) in settings {
            DynamicConfig::check_setting(&key, &value)
                .map_err(|message| ServiceError::InvalidRequest { message })?;
            let value_str = if value.is_null() {
                None
            } else {
                Some(serde_json::to_string(&value).map_err(DatabaseError::Serialization)?)
            };
            writes.push((key, value_str));
        }

        let mut conn = self.conn();
        let tx = conn.transaction().map_err(DatabaseError::Query)?;
        for (key, value_str) in &writes {
            match value_str {
                None => {
                    tx.execute("DELETE FROM settings WHERE key = ?1", params![key])
                        .map_err(DatabaseError::Query)?;
                }
                Some(value_str) => {
                    tx.execute(
                        "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, datetime('now')) \
                         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                        params![key, value_str],
                    )
                    .map_err(DatabaseError::Query)?;
                }
            }
        }
        tx.commit().map_err(DatabaseError::Query)?;

        Ok(())
    }
}
