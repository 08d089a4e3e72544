//! Default value functions for DynamicConfig.

use super::schemas::{AuthConfig, ChatConfig, RateLimitConfig};
use crate::auth::legacy_password_digest;

// ==================== Top-level Section Defaults ====================

pub(crate) fn default_auth() -> AuthConfig {
    AuthConfig {
        session_timeout_secs: default_session_timeout_secs(),
        max_login_attempts: default_max_login_attempts(),
        lockout_secs: default_lockout_secs(),
        liveness_interval_secs: default_liveness_interval_secs(),
        account_email: default_account_email(),
        account_password_digest: default_account_password_digest(),
        min_password_len: default_min_password_len(),
    }
}

pub(crate) fn default_rate_limit() -> RateLimitConfig {
    RateLimitConfig {
        login_max_attempts: default_login_max_attempts(),
        login_window_secs: default_login_window_secs(),
    }
}

pub(crate) fn default_chat() -> ChatConfig {
    ChatConfig {
        thinking_delay_min_ms: default_thinking_delay_min_ms(),
        thinking_delay_max_ms: default_thinking_delay_max_ms(),
        settle_delay_ms: default_settle_delay_ms(),
        max_message_len: default_max_message_len(),
    }
}

// ==================== Auth Defaults ====================

pub(crate) fn default_session_timeout_secs() -> u64 {
    30 * 60
}

pub(crate) fn default_max_login_attempts() -> u32 {
    3
}

pub(crate) fn default_lockout_secs() -> u64 {
    15 * 60
}

pub(crate) fn default_liveness_interval_secs() -> u64 {
    60
}

pub(crate) fn default_account_email() -> String {
    "adminITE@user.com.sg".to_string()
}

pub(crate) fn default_account_password_digest() -> String {
    legacy_password_digest("admin1234")
}

pub(crate) fn default_min_password_len() -> usize {
    6
}

// ==================== Rate Limit Defaults ====================

pub(crate) fn default_login_max_attempts() -> u32 {
    5
}

pub(crate) fn default_login_window_secs() -> u64 {
    5 * 60
}

// ==================== Chat Defaults ====================

pub(crate) fn default_thinking_delay_min_ms() -> u64 {
    1500
}

pub(crate) fn default_thinking_delay_max_ms() -> u64 {
    2500
}

pub(crate) fn default_settle_delay_ms() -> u64 {
    500
}

pub(crate) fn default_max_message_len() -> usize {
    1000
}
