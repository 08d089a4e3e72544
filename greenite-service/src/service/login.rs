//! Login submission flow.
//!
//! Input checks come first and touch no stored state. The rate limiter is
//! consulted next, so malformed submissions do not use up attempts. Only then
//! does the session manager see the credentials.

use tracing::{info, warn};

use crate::auth::{LoginOutcome, is_valid_email};
use crate::error::{AuthError, ServiceResult};

use super::GreeniteService;

const LOGIN_ACTION: &str = "login";
const MAX_EMAIL_LEN: usize = 1000;

impl GreeniteService {
    /// Handle a submitted login form
    pub fn handle_login(&self, email: &str, password: &str) -> ServiceResult<LoginOutcome> {
        let email: String = email.trim().chars().take(MAX_EMAIL_LEN).collect();

        if let Err(rejection) = check_login_input(&email, password) {
            return Ok(self.reject(rejection, "invalid_input"));
        }

        let limits = self.runtime_config.dynamic().rate_limit.clone();
        if !self.rate_limiter.try_admit(
            LOGIN_ACTION,
            limits.login_max_attempts,
            limits.login_window_ms(),
        )? {
            metrics::counter!("greenite_rate_limited_total", "action" => LOGIN_ACTION)
                .increment(1);
            let rejection = AuthError::RateLimited {
                action: LOGIN_ACTION.to_string(),
            };
            return Ok(self.reject(rejection, "rate_limited"));
        }

        let outcome = self.sessions.login(&email, password)?;
        let label = match outcome.code {
            None => "success",
            Some(code) => code,
        };
        metrics::counter!("greenite_login_attempts_total", "outcome" => label).increment(1);

        if outcome.success {
            info!(user = %email, "User logged in");
        }
        Ok(outcome)
    }

    fn reject(&self, rejection: AuthError, label: &'static str) -> LoginOutcome {
        warn!(reason = %rejection, "Login submission rejected");
        metrics::counter!("greenite_login_attempts_total", "outcome" => label).increment(1);
        LoginOutcome::rejected(&rejection)
    }
}

/// Submit-time checks on the raw form fields
fn check_login_input(email: &str, password: &str) -> Result<(), AuthError> {
    if email.is_empty() {
        return Err(AuthError::email_required());
    }
    if password.is_empty() {
        return Err(AuthError::password_required());
    }
    if !is_valid_email(email) {
        return Err(AuthError::email_malformed());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::KeyValueStore;
    use crate::db::store::{LOCKOUT_KEY, rate_limit_key};
    use crate::service::test_support::test_service;
    use std::time::Duration;
    use tokio_test::assert_ok;

    const EMAIL: &str = "adminITE@user.com.sg";
    const PASSWORD: &str = "admin1234";

    #[test]
    fn test_login_trims_email() {
        let (service, _clock) = test_service();

        let outcome = assert_ok!(service.handle_login("  adminITE@user.com.sg  ", PASSWORD));
        assert!(outcome.success);
        assert!(service.sessions.is_authenticated().unwrap());
    }

    #[test]
    fn test_invalid_input_spends_no_attempt() {
        let (service, _clock) = test_service();

        let outcome = service.handle_login("   ", PASSWORD).unwrap();
        assert_eq!(outcome.code, Some("validation_error"));
        assert_eq!(outcome.message.as_deref(), Some("Email is required"));

        let outcome = service.handle_login("not-an-email", PASSWORD).unwrap();
        assert_eq!(
            outcome.message.as_deref(),
            Some("Please enter a valid email address")
        );

        let outcome = service.handle_login(EMAIL, "").unwrap();
        assert_eq!(outcome.message.as_deref(), Some("Password is required"));

        assert!(service.db.get(&rate_limit_key("login")).unwrap().is_none());
        assert!(service.db.get(LOCKOUT_KEY).unwrap().is_none());
    }

    #[test]
    fn test_sixth_attempt_in_window_is_rate_limited() {
        let (service, clock) = test_service();

        // Lockout would trip after three failures; lift it so only the rate limit remains
        let mut updates = std::collections::HashMap::new();
        updates.insert("auth.max_login_attempts".to_string(), serde_json::json!(100));
        service.update_settings(updates).unwrap();

        for _ in 0..5 {
            let outcome = service.handle_login(EMAIL, "wrongpass").unwrap();
            assert_eq!(outcome.code, Some("invalid_credentials"));
        }

        let outcome = service.handle_login(EMAIL, PASSWORD).unwrap();
        assert_eq!(outcome.code, Some("rate_limited"));
        assert_eq!(
            outcome.message.as_deref(),
            Some("Too many login attempts. Please try again later.")
        );
        // Rate-limited attempts never reach the credential check
        assert_eq!(service.sessions.lockout().attempts().unwrap(), 5);

        clock.advance(Duration::from_secs(5 * 60));
        assert!(service.handle_login(EMAIL, PASSWORD).unwrap().success);
    }

    #[test]
    fn test_lockout_message_differs_from_invalid_credentials() {
        let (service, _clock) = test_service();

        for _ in 0..3 {
            service.handle_login(EMAIL, "wrongpass").unwrap();
        }
        let outcome = service.handle_login(EMAIL, PASSWORD).unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.code, Some("account_locked"));
    }
}
