//! Configuration struct definitions for DynamicConfig sections.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Session and credential configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Absolute session lifetime from login
    #[serde(default = "super::defaults::default_session_timeout_secs")]
    pub session_timeout_secs: u64,

    /// Consecutive failures that lock the account
    #[serde(default = "super::defaults::default_max_login_attempts")]
    pub max_login_attempts: u32,

    #[serde(default = "super::defaults::default_lockout_secs")]
    pub lockout_secs: u64,

    /// Period of the background session liveness check
    #[serde(default = "super::defaults::default_liveness_interval_secs")]
    pub liveness_interval_secs: u64,

    /// Email of the single reference account
    #[serde(default = "super::defaults::default_account_email")]
    pub account_email: String,

    /// Placeholder digest of the reference account's password
    #[serde(default = "super::defaults::default_account_password_digest")]
    pub account_password_digest: String,

    #[serde(default = "super::defaults::default_min_password_len")]
    pub min_password_len: usize,
}

/// Seconds to epoch-ms arithmetic, saturating instead of overflowing
pub(crate) fn secs_to_ms(secs: u64) -> i64 {
    i64::try_from(secs.saturating_mul(1000)).unwrap_or(i64::MAX)
}

impl AuthConfig {
    pub fn session_timeout_ms(&self) -> i64 {
        secs_to_ms(self.session_timeout_secs)
    }

    pub fn lockout_ms(&self) -> i64 {
        secs_to_ms(self.lockout_secs)
    }

    pub fn liveness_interval(&self) -> Duration {
        Duration::from_secs(self.liveness_interval_secs)
    }
}

/// Per-action attempt limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "super::defaults::default_login_max_attempts")]
    pub login_max_attempts: u32,

    #[serde(default = "super::defaults::default_login_window_secs")]
    pub login_window_secs: u64,
}

impl RateLimitConfig {
    pub fn login_window_ms(&self) -> i64 {
        secs_to_ms(self.login_window_secs)
    }
}

/// Chat queue pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Lower bound of the simulated thinking delay
    #[serde(default = "super::defaults::default_thinking_delay_min_ms")]
    pub thinking_delay_min_ms: u64,

    /// Upper bound of the simulated thinking delay
    #[serde(default = "super::defaults::default_thinking_delay_max_ms")]
    pub thinking_delay_max_ms: u64,

    /// Pause between one answer and the next queued message
    #[serde(default = "super::defaults::default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    #[serde(default = "super::defaults::default_max_message_len")]
    pub max_message_len: usize,
}

impl ChatConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_huge_durations_saturate() {
        assert_eq!(secs_to_ms(1800), 1_800_000);
        assert_eq!(secs_to_ms(u64::MAX), i64::MAX);
        assert_eq!(secs_to_ms(u64::MAX / 1000), i64::MAX);

        let mut auth = super::super::defaults::default_auth();
        auth.session_timeout_secs = u64::MAX;
        assert_eq!(auth.session_timeout_ms(), i64::MAX);
    }
}
