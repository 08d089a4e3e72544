//! Credential predicates.

use regex::Regex;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// `local@domain.tld` shape check
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Length in UTF-16 code units, matching how the browser client counts
pub fn password_len(password: &str) -> usize {
    password.encode_utf16().count()
}

/// 32-bit rolling string hash rendered as hex.
///
/// PLACEHOLDER ONLY: this is not a password hash. It is kept bit-for-bit so
/// stored digests and the reference account keep matching; a real deployment
/// must replace it with a vetted verifier such as argon2.
pub fn legacy_password_digest(password: &str) -> String {
    let mut hash: i32 = 0;
    for unit in password.encode_utf16() {
        hash = (hash << 5).wrapping_sub(hash).wrapping_add(i32::from(unit));
    }
    format!("{:x}", i64::from(hash).abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("adminITE@user.com.sg"));
        assert!(is_valid_email("a@b.c"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("user@nodot"));
        assert!(!is_valid_email("user name@example.com"));
        assert!(!is_valid_email("user@@example.com"));
    }

    #[test]
    fn test_digest_is_deterministic() {
        assert_eq!(legacy_password_digest("admin1234"), legacy_password_digest("admin1234"));
        assert_ne!(legacy_password_digest("admin1234"), legacy_password_digest("admin1235"));
    }

    #[test]
    fn test_digest_known_values() {
        assert_eq!(legacy_password_digest(""), "0");
        // 'a' = 97
        assert_eq!(legacy_password_digest("a"), "61");
        // 97 * 31 + 98 = 3105
        assert_eq!(legacy_password_digest("ab"), "c21");
    }

    #[test]
    fn test_digest_wraps_like_32_bit_int() {
        // Long input overflows i32 many times; must not panic
        let digest = legacy_password_digest(&"z".repeat(64));
        assert!(!digest.is_empty());
        assert!(!digest.starts_with('-'));
    }

    #[test]
    fn test_password_len_counts_utf16_units() {
        assert_eq!(password_len("abcdef"), 6);
        assert_eq!(password_len("🌱"), 2);
    }
}
