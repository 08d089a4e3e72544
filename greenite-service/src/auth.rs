//! Session lifecycle, failed-login lockout and attempt rate limiting.
//!
//! All state lives in the shared key-value store and is re-read on every
//! operation; nothing is cached between calls.

mod expiry;
mod lockout;
mod password;
mod rate_limit;
mod session;

pub use password::{is_valid_email, legacy_password_digest, password_len};
pub use rate_limit::RateLimiter;
pub use session::{LoginOutcome, SessionManager};
