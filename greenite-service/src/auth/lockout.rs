//! Failed-login lockout.
//!
//! The guard is Open until a failure pushes the attempt counter to the
//! configured maximum, then Locked until the lockout window has passed since
//! the most recent failure or a login succeeds. Expiry is observed lazily by
//! [`LockoutGuard::is_locked`], which deletes the stale record it finds.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::RuntimeConfig;
use crate::db::KeyValueStore;
use crate::db::store::{LOCKOUT_KEY, load_json, save_json};
use crate::error::ServiceResult;

use super::expiry::{Expiring, Reaped, check_and_reap};

/// Persisted failure counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutRecord {
    /// Epoch ms of the most recent failure
    pub timestamp: i64,
    pub attempts: u32,
}

impl Expiring for LockoutRecord {
    fn is_expired(&self, now_ms: i64, lifetime_ms: i64) -> bool {
        now_ms.saturating_sub(self.timestamp) >= lifetime_ms
    }
}

pub struct LockoutGuard {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    config: Arc<RuntimeConfig>,
    write_lock: Mutex<()>,
}

impl LockoutGuard {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: Arc<RuntimeConfig>,
    ) -> Self {
        Self {
            store,
            clock,
            config,
            write_lock: Mutex::new(()),
        }
    }

    /// Whether login attempts must be refused outright.
    ///
    /// Removes the stored record when its window has elapsed.
    pub fn is_locked(&self) -> ServiceResult<bool> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let dynamic = self.config.dynamic();
        let auth = &dynamic.auth;

        match self.read_record(auth.lockout_ms())? {
            Reaped::Absent => Ok(false),
            Reaped::Expired => {
                self.store.remove(LOCKOUT_KEY)?;
                debug!("Lockout window elapsed, record cleared");
                Ok(false)
            }
            Reaped::Live(record) => Ok(record.attempts >= auth.max_login_attempts),
        }
    }

    /// Count one failed credential check, returning the new attempt total
    pub fn record_failure(&self) -> ServiceResult<u32> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let dynamic = self.config.dynamic();
        let auth = &dynamic.auth;

        let attempts = self
            .read_record(auth.lockout_ms())?
            .live()
            .map_or(1, |record| record.attempts.saturating_add(1));

        let record = LockoutRecord {
            timestamp: self.clock.now_ms(),
            attempts,
        };
        save_json(self.store.as_ref(), LOCKOUT_KEY, &record)?;

        if attempts >= auth.max_login_attempts {
            warn!(attempts, "Account locked after repeated failed logins");
        } else {
            debug!(attempts, "Failed login recorded");
        }

        Ok(attempts)
    }

    /// Forget all failures
    pub fn clear(&self) -> ServiceResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.store.remove(LOCKOUT_KEY)?;
        info!("Failed login attempts cleared");
        Ok(())
    }

    /// Current failure count, without reaping
    #[allow(dead_code)] // Useful for monitoring/debugging
    pub fn attempts(&self) -> ServiceResult<u32> {
        let record: Option<LockoutRecord> = load_json(self.store.as_ref(), LOCKOUT_KEY)?;
        Ok(record.map_or(0, |r| r.attempts))
    }

    fn read_record(&self, window_ms: i64) -> ServiceResult<Reaped<LockoutRecord>> {
        let record = load_json(self.store.as_ref(), LOCKOUT_KEY)?;
        Ok(check_and_reap(record, self.clock.now_ms(), window_ms))
    }
}
