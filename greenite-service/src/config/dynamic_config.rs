//! Dynamic configuration that can be updated at runtime via API.
//! DB values override config file/env defaults.

mod defaults;
mod keys;
mod merging;
mod schemas;

use serde::{Deserialize, Serialize};

pub use schemas::{AuthConfig, ChatConfig, RateLimitConfig};

use defaults::{default_auth, default_chat, default_rate_limit};

/// Dynamic configuration that can be updated at runtime via API
/// DB values override config file/env defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicConfig {
    #[serde(default = "default_auth")]
    pub auth: AuthConfig,

    #[serde(default = "default_rate_limit")]
    pub rate_limit: RateLimitConfig,

    #[serde(default = "default_chat")]
    pub chat: ChatConfig,
}

impl Default for DynamicConfig {
    fn default() -> Self {
        Self {
            auth: default_auth(),
            rate_limit: default_rate_limit(),
            chat: default_chat(),
        }
    }
}

impl DynamicConfig {
    /// Check one requested settings update against its key and range
    pub fn check_setting(key: &str, value: &serde_json::Value) -> Result<(), String> {
        keys::check_setting(key, value)
    }
}
