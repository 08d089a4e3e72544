//! Sliding-window attempt limiter.
//!
//! Each action keeps the timestamps of its admitted attempts under
//! `rateLimit_<action>`. Timestamps that fall out of the window are pruned on
//! every check; a rejected attempt is not recorded.

use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::clock::Clock;
use crate::db::KeyValueStore;
use crate::db::store::{load_json, rate_limit_key, save_json};
use crate::error::ServiceResult;

pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    /// Admit one attempt of `action` if fewer than `max_attempts` were admitted
    /// within the last `window_ms`.
    pub fn try_admit(&self, action: &str, max_attempts: u32, window_ms: i64) -> ServiceResult<bool> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let key = rate_limit_key(action);
        let now = self.clock.now_ms();

        let mut attempts: Vec<i64> = load_json(self.store.as_ref(), &key)?.unwrap_or_default();
        attempts.retain(|&ts| now.saturating_sub(ts) < window_ms);

        if attempts.len() >= max_attempts as usize {
            debug!(action, in_window = attempts.len(), "Attempt rejected by rate limit");
            return Ok(false);
        }

        attempts.push(now);
        save_json(self.store.as_ref(), &key, &attempts)?;
        Ok(true)
    }

    /// Attempts admitted within the window, without recording anything
    #[allow(dead_code)] // Useful for monitoring/debugging
    pub fn recent_attempts(&self, action: &str, window_ms: i64) -> ServiceResult<usize> {
        let now = self.clock.now_ms();
        let attempts: Vec<i64> =
            load_json(self.store.as_ref(), &rate_limit_key(action))?.unwrap_or_default();
        Ok(attempts.iter().filter(|&&ts| now.saturating_sub(ts) < window_ms).count())
    }
}
