//! Lazy, read-triggered expiry of persisted records.
//!
//! Nothing runs on a timer to expire sessions or lockouts. Each read site
//! passes the stored record through [`check_and_reap`] and removes it from the
//! store when the verdict is [`Reaped::Expired`].

/// A record carrying the epoch-ms timestamp its lifetime is measured from
pub trait Expiring {
    fn is_expired(&self, now_ms: i64, lifetime_ms: i64) -> bool;
}

/// Outcome of checking a stored record against the clock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaped<T> {
    /// Nothing stored (or the stored value was unreadable)
    Absent,
    /// Record is still within its lifetime
    Live(T),
    /// Record outlived its lifetime; the caller must delete it
    Expired,
}

impl<T> Reaped<T> {
    pub fn live(self) -> Option<T> {
        match self {
            Reaped::Live(record) => Some(record),
            Reaped::Absent | Reaped::Expired => None,
        }
    }

    #[allow(dead_code)] // Useful for monitoring/debugging
    pub fn is_expired(&self) -> bool {
        matches!(self, Reaped::Expired)
    }
}

/// Classify a stored record as absent, live or expired
pub fn check_and_reap<T: Expiring>(record: Option<T>, now_ms: i64, lifetime_ms: i64) -> Reaped<T> {
    match record {
        None => Reaped::Absent,
        Some(r) if r.is_expired(now_ms, lifetime_ms) => Reaped::Expired,
        Some(r) => Reaped::Live(r),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Stamp(i64);

    impl Expiring for Stamp {
        fn is_expired(&self, now_ms: i64, lifetime_ms: i64) -> bool {
            now_ms.saturating_sub(self.0) > lifetime_ms
        }
    }

    #[test]
    fn test_absent_stays_absent() {
        let verdict: Reaped<Stamp> = check_and_reap(None, 1_000, 10);
        assert_eq!(verdict, Reaped::Absent);
        assert!(verdict.live().is_none());
    }

    #[test]
    fn test_live_and_expired() {
        assert_eq!(check_and_reap(Some(Stamp(100)), 110, 10), Reaped::Live(Stamp(100)));

        let verdict = check_and_reap(Some(Stamp(100)), 111, 10);
        assert!(verdict.is_expired());
        assert!(verdict.live().is_none());
    }
}
