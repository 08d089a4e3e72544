//! Key-value conversion and DB merging logic for DynamicConfig.

use std::collections::HashMap;

use super::DynamicConfig;
use super::keys::bounded_value;

impl DynamicConfig {
    /// Convert config to key-value map for API response
    pub fn to_key_value_map(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();

        // Auth settings
        map.insert(
            "auth.session_timeout_secs".to_string(),
            serde_json::json!(self.auth.session_timeout_secs),
        );
        map.insert(
            "auth.max_login_attempts".to_string(),
            serde_json::json!(self.auth.max_login_attempts),
        );
        map.insert(
            "auth.lockout_secs".to_string(),
            serde_json::json!(self.auth.lockout_secs),
        );
        map.insert(
            "auth.liveness_interval_secs".to_string(),
            serde_json::json!(self.auth.liveness_interval_secs),
        );
        map.insert(
            "auth.min_password_len".to_string(),
            serde_json::json!(self.auth.min_password_len),
        );

        // Rate limit settings
        map.insert(
            "rate_limit.login_max_attempts".to_string(),
            serde_json::json!(self.rate_limit.login_max_attempts),
        );
        map.insert(
            "rate_limit.login_window_secs".to_string(),
            serde_json::json!(self.rate_limit.login_window_secs),
        );

        // Chat settings
        map.insert(
            "chat.thinking_delay_min_ms".to_string(),
            serde_json::json!(self.chat.thinking_delay_min_ms),
        );
        map.insert(
            "chat.thinking_delay_max_ms".to_string(),
            serde_json::json!(self.chat.thinking_delay_max_ms),
        );
        map.insert(
            "chat.settle_delay_ms".to_string(),
            serde_json::json!(self.chat.settle_delay_ms),
        );
        map.insert(
            "chat.max_message_len".to_string(),
            serde_json::json!(self.chat.max_message_len),
        );

        map
    }

    /// Apply DB settings as overrides to this config
    pub fn merge_from_db(&mut self, db_settings: &HashMap<String, serde_json::Value>) {
        for (key, value) in db_settings {
            self.apply_setting(key, value);
        }
    }

    /// Apply a single setting value.
    ///
    /// Unknown keys and out-of-range values are skipped, so a bad row in the
    /// settings table cannot push the config outside its accepted bounds.
    fn apply_setting(&mut self, key: &str, value: &serde_json::Value) {
        let Some(v) = bounded_value(key, value) else {
            tracing::warn!(key = %key, value = %value, "Ignoring invalid setting override");
            return;
        };
        // Bounds fit every target type, the fallbacks are unreachable
        let as_u32 = u32::try_from(v).unwrap_or(u32::MAX);
        let as_usize = usize::try_from(v).unwrap_or(usize::MAX);

        match key {
            // Auth settings
            "auth.session_timeout_secs" => self.auth.session_timeout_secs = v,
            "auth.max_login_attempts" => self.auth.max_login_attempts = as_u32,
            "auth.lockout_secs" => self.auth.lockout_secs = v,
            "auth.liveness_interval_secs" => self.auth.liveness_interval_secs = v,
            "auth.min_password_len" => self.auth.min_password_len = as_usize,

            // Rate limit settings
            "rate_limit.login_max_attempts" => self.rate_limit.login_max_attempts = as_u32,
            "rate_limit.login_window_secs" => self.rate_limit.login_window_secs = v,

            // Chat settings
            "chat.thinking_delay_min_ms" => self.chat.thinking_delay_min_ms = v,
            "chat.thinking_delay_max_ms" => self.chat.thinking_delay_max_ms = v,
            "chat.settle_delay_ms" => self.chat.settle_delay_ms = v,
            "chat.max_message_len" => self.chat.max_message_len = as_usize,

            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_value_map_covers_valid_keys() {
        let config = DynamicConfig::default();
        let map = config.to_key_value_map();
        for (key, _) in super::super::keys::SETTING_BOUNDS {
            assert!(map.contains_key(*key), "missing {}", key);
        }
        assert_eq!(map.len(), super::super::keys::SETTING_BOUNDS.len());
        assert!(!map.contains_key("auth.account_password_digest"));
    }

    #[test]
    fn test_merge_from_db_overrides() {
        let mut config = DynamicConfig::default();
        let mut overrides = HashMap::new();
        overrides.insert("auth.max_login_attempts".to_string(), serde_json::json!(5));
        overrides.insert("chat.settle_delay_ms".to_string(), serde_json::json!(100));
        // Wrong type is ignored
        overrides.insert("auth.lockout_secs".to_string(), serde_json::json!("soon"));

        config.merge_from_db(&overrides);

        assert_eq!(config.auth.max_login_attempts, 5);
        assert_eq!(config.chat.settle_delay_ms, 100);
        assert_eq!(config.auth.lockout_secs, 900);
    }

    #[test]
    fn test_out_of_range_override_is_ignored() {
        let mut config = DynamicConfig::default();
        let mut overrides = HashMap::new();
        overrides.insert(
            "auth.session_timeout_secs".to_string(),
            serde_json::json!(u64::MAX),
        );
        overrides.insert("auth.max_login_attempts".to_string(), serde_json::json!(0));
        overrides.insert(
            "auth.account_password_digest".to_string(),
            serde_json::json!("0"),
        );

        config.merge_from_db(&overrides);

        assert_eq!(config.auth.session_timeout_secs, 1800);
        assert_eq!(config.auth.max_login_attempts, 3);
        assert_eq!(
            config.auth.account_password_digest,
            DynamicConfig::default().auth.account_password_digest
        );
    }
}
