//! Login, logout and session validity.
//!
//! At most one session record exists, under the `session` key. Its lifetime is
//! absolute from login: checking it never extends it. An expired session is
//! logged out by the check that notices it.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::RuntimeConfig;
use crate::db::KeyValueStore;
use crate::db::store::{LEGACY_USER_KEY, SESSION_KEY, load_json, save_json};
use crate::error::{AuthError, ServiceError, ServiceResult};

use super::expiry::{Expiring, Reaped, check_and_reap};
use super::lockout::LockoutGuard;
use super::password::{is_valid_email, legacy_password_digest, password_len};

/// Persisted session record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: String,
    /// Epoch ms of the login that created it
    pub timestamp: i64,
    pub session_id: String,
}

impl Expiring for Session {
    fn is_expired(&self, now_ms: i64, lifetime_ms: i64) -> bool {
        now_ms.saturating_sub(self.timestamp) > lifetime_ms
    }
}

/// Result of a login attempt, in the shape returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Stable error code for rejected attempts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl LoginOutcome {
    fn accepted(session: &Session) -> Self {
        Self {
            success: true,
            message: Some("Login successful!".to_string()),
            code: None,
            user: Some(session.user.clone()),
            session_id: Some(session.session_id.clone()),
        }
    }

    pub fn rejected(error: &AuthError) -> Self {
        let code = ServiceError::from(error.clone()).error_code();
        Self {
            success: false,
            message: Some(error.to_string()),
            code: Some(code),
            user: None,
            session_id: None,
        }
    }
}

/// Time-based id with a random suffix, unique enough within one process
pub fn generate_session_id(now_ms: i64) -> String {
    let suffix: u64 = rand::thread_rng().r#gen();
    format!("{}{}", to_base36(now_ms.unsigned_abs()), to_base36(suffix))
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    config: Arc<RuntimeConfig>,
    lockout: LockoutGuard,
    session_lock: Mutex<()>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: Arc<RuntimeConfig>,
    ) -> Self {
        let lockout = LockoutGuard::new(store.clone(), clock.clone(), config.clone());
        Self {
            store,
            clock,
            config,
            lockout,
            session_lock: Mutex::new(()),
        }
    }

    #[allow(dead_code)] // Useful for monitoring/debugging
    pub fn lockout(&self) -> &LockoutGuard {
        &self.lockout
    }

    /// Attempt a login with the given credentials.
    ///
    /// Auth rejections (including a locked account) come back as an
    /// unsuccessful outcome. Only storage failures are returned as errors.
    pub fn login(&self, email: &str, password: &str) -> ServiceResult<LoginOutcome> {
        match self.authenticate(email, password) {
            Ok(session) => Ok(LoginOutcome::accepted(&session)),
            Err(ServiceError::Auth(err)) => Ok(LoginOutcome::rejected(&err)),
            Err(e) => Err(e),
        }
    }

    fn authenticate(&self, email: &str, password: &str) -> ServiceResult<Session> {
        if email.is_empty() {
            return Err(AuthError::email_required().into());
        }
        if password.is_empty() {
            return Err(AuthError::password_required().into());
        }

        if !self.validate_credentials(email, password)? {
            let attempts = self.lockout.record_failure()?;
            warn!(attempts, "Login rejected: invalid credentials");
            return Err(AuthError::InvalidCredentials.into());
        }

        self.lockout.clear()?;

        let _guard = self.session_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now_ms();
        let session = Session {
            user: email.to_string(),
            timestamp: now,
            session_id: generate_session_id(now),
        };
        save_json(self.store.as_ref(), SESSION_KEY, &session)?;

        info!(user = %session.user, session_id = %session.session_id, "Login succeeded");
        Ok(session)
    }

    /// Compare credentials against the reference account.
    ///
    /// Fails with `AccountLocked` before looking at the credentials when the
    /// lockout is active.
    fn validate_credentials(&self, email: &str, password: &str) -> ServiceResult<bool> {
        if self.lockout.is_locked()? {
            warn!("Login rejected: account locked");
            return Err(AuthError::AccountLocked.into());
        }

        let dynamic = self.config.dynamic();
        let auth = &dynamic.auth;

        let shape_ok = is_valid_email(email) && password_len(password) >= auth.min_password_len;
        Ok(shape_ok
            && email == auth.account_email
            && legacy_password_digest(password) == auth.account_password_digest)
    }

    /// Drop the session and the pre-session user key. Idempotent.
    pub fn logout(&self) -> ServiceResult<()> {
        let _guard = self.session_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.remove_session()
    }

    fn remove_session(&self) -> ServiceResult<()> {
        self.store.remove(SESSION_KEY)?;
        self.store.remove(LEGACY_USER_KEY)?;
        info!("Session cleared");
        Ok(())
    }

    /// Whether a live session exists; an expired one is logged out here
    pub fn is_authenticated(&self) -> ServiceResult<bool> {
        let _guard = self.session_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let timeout_ms = self.config.dynamic().auth.session_timeout_ms();

        match self.read_session(timeout_ms)? {
            Reaped::Live(_) => Ok(true),
            Reaped::Absent => Ok(false),
            Reaped::Expired => {
                info!("Session expired");
                metrics::counter!("greenite_sessions_expired_total").increment(1);
                self.remove_session()?;
                Ok(false)
            }
        }
    }

    /// User of the stored session, if any. Does not check expiry.
    pub fn current_user(&self) -> ServiceResult<Option<String>> {
        let session: Option<Session> = load_json(self.store.as_ref(), SESSION_KEY)?;
        Ok(session.map(|s| s.user))
    }

    /// An unreadable record is reported as expired so the check removes it
    fn read_session(&self, timeout_ms: i64) -> ServiceResult<Reaped<Session>> {
        let Some(raw) = self.store.get(SESSION_KEY)? else {
            return Ok(Reaped::Absent);
        };

        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => Ok(check_and_reap(Some(session), self.clock.now_ms(), timeout_ms)),
            Err(e) => {
                warn!(error = %e, "Unreadable session record");
                Ok(Reaped::Expired)
            }
        }
    }
}
