//! Valid setting keys for DynamicConfig and the range each one accepts.
//!
//! The reference account's email and digest are deliberately absent: they come
//! from the config file or environment only and are never exposed or written
//! through the settings API.

use std::ops::RangeInclusive;

/// Every runtime-settable key with its accepted range
pub const SETTING_BOUNDS: &[(&str, RangeInclusive<u64>)] = &[
    ("auth.session_timeout_secs", 60..=86_400),
    ("auth.max_login_attempts", 1..=100),
    ("auth.lockout_secs", 60..=86_400),
    ("auth.liveness_interval_secs", 1..=3_600),
    ("auth.min_password_len", 1..=128),
    ("rate_limit.login_max_attempts", 1..=1_000),
    ("rate_limit.login_window_secs", 1..=86_400),
    ("chat.thinking_delay_min_ms", 0..=60_000),
    ("chat.thinking_delay_max_ms", 0..=60_000),
    ("chat.settle_delay_ms", 0..=60_000),
    ("chat.max_message_len", 1..=100_000),
];

/// Accepted range for a key, `None` when the key is unknown
pub fn setting_bounds(key: &str) -> Option<&'static RangeInclusive<u64>> {
    SETTING_BOUNDS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, bounds)| bounds)
}

/// The value as an in-range integer for `key`
pub fn bounded_value(key: &str, value: &serde_json::Value) -> Option<u64> {
    let bounds = setting_bounds(key)?;
    value.as_u64().filter(|v| bounds.contains(v))
}

/// Check a requested update. Null reverts to the default and is always allowed.
pub fn check_setting(key: &str, value: &serde_json::Value) -> Result<(), String> {
    let Some(bounds) = setting_bounds(key) else {
        return Err(format!("Unknown setting key: {}", key));
    };
    if value.is_null() || bounded_value(key, value).is_some() {
        return Ok(());
    }
    Err(format!(
        "Setting {} must be an integer between {} and {}",
        key,
        bounds.start(),
        bounds.end()
    ))
}
