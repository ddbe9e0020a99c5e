use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Reservation {
    bytes: u64,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Reservation {
    /// A listed object only fulfils the reservation if it was written after
    /// the URL was issued; an older object under the same key is the
    /// version the pending PUT will replace.
    fn landed_by(&self, listed_at: Option<&DateTime<Utc>>) -> bool {
        listed_at.is_some_and(|t| *t >= self.issued_at)
    }
}

/// Bytes promised to upload URLs that have been issued but not yet landed.
///
/// Keyed by user, then by full object key. Re-issuing a URL for the same key
/// replaces the earlier reservation instead of stacking on top of it.
#[derive(Debug, Default)]
pub struct ReservationLedger {
    inner: Mutex<HashMap<String, HashMap<String, Reservation>>>,
}

impl ReservationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn reserve(
        &self,
        user_id: &str,
        key: &str,
        bytes: u64,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) {
        let mut map = self.inner.lock().await;
        map.entry(user_id.to_string()).or_default().insert(
            key.to_string(),
            Reservation {
                bytes,
                issued_at,
                expires_at,
            },
        );
    }

    /// Drop the reservation for `key`. Returns whether one existed.
    pub async fn release(&self, user_id: &str, key: &str) -> bool {
        let mut map = self.inner.lock().await;
        let Some(entries) = map.get_mut(user_id) else {
            return false;
        };
        let removed = entries.remove(key).is_some();
        if entries.is_empty() {
            map.remove(user_id);
        }
        removed
    }

    /// Sum of live reservations for `user_id`.
    ///
    /// `listed` maps each key of the listing the caller just took to its
    /// last-modified time. Reservations that have expired, or whose upload
    /// shows up in `listed`, are dropped first so their bytes are not counted
    /// twice.
    pub async fn outstanding(
        &self,
        user_id: &str,
        listed: &HashMap<&str, DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> u64 {
        let mut map = self.inner.lock().await;
        let Some(entries) = map.get_mut(user_id) else {
            return 0;
        };
        entries.retain(|key, r| r.expires_at > now && !r.landed_by(listed.get(key.as_str())));
        let total = entries
            .values()
            .fold(0u64, |acc, r| acc.saturating_add(r.bytes));
        if entries.is_empty() {
            map.remove(user_id);
        }
        total
    }

    /// Remove every expired reservation. Returns how many were dropped.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut map = self.inner.lock().await;
        let mut purged = 0;
        map.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|_, r| r.expires_at > now);
            purged += before - entries.len();
            !entries.is_empty()
        });
        purged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn nothing_listed() -> HashMap<&'static str, DateTime<Utc>> {
        HashMap::new()
    }

    #[tokio::test]
    async fn outstanding_sums_live_reservations_per_user() {
        let ledger = ReservationLedger::new();
        let now = Utc::now();
        let later = now + Duration::hours(1);
        ledger.reserve("a", "a/one", 100, now, later).await;
        ledger.reserve("a", "a/two", 50, now, later).await;
        ledger.reserve("b", "b/one", 7, now, later).await;

        assert_eq!(ledger.outstanding("a", &nothing_listed(), now).await, 150);
        assert_eq!(ledger.outstanding("b", &nothing_listed(), now).await, 7);
        assert_eq!(ledger.outstanding("c", &nothing_listed(), now).await, 0);
    }

    #[tokio::test]
    async fn reissue_replaces_and_release_frees() {
        let ledger = ReservationLedger::new();
        let now = Utc::now();
        let later = now + Duration::hours(1);
        ledger.reserve("a", "a/f", 100, now, later).await;
        ledger.reserve("a", "a/f", 30, now, later).await;
        assert_eq!(ledger.outstanding("a", &nothing_listed(), now).await, 30);

        assert!(ledger.release("a", "a/f").await);
        assert!(!ledger.release("a", "a/f").await);
        assert_eq!(ledger.outstanding("a", &nothing_listed(), now).await, 0);
    }

    #[tokio::test]
    async fn landed_and_expired_entries_are_dropped() {
        let ledger = ReservationLedger::new();
        let now = Utc::now();
        let later = now + Duration::hours(1);
        ledger.reserve("a", "a/landed", 10, now, later).await;
        ledger.reserve("a", "a/stale", 20, now - Duration::hours(2), now - Duration::seconds(1)).await;
        ledger.reserve("a", "a/live", 40, now, later).await;

        let listed: HashMap<&str, DateTime<Utc>> =
            [("a/landed", now + Duration::seconds(5))].into_iter().collect();
        assert_eq!(ledger.outstanding("a", &listed, now).await, 40);
        // The landed entry is gone for good, not just skipped once.
        assert_eq!(ledger.outstanding("a", &nothing_listed(), now).await, 40);
    }

    #[tokio::test]
    async fn object_older_than_the_url_does_not_fulfil_it() {
        let ledger = ReservationLedger::new();
        let now = Utc::now();
        ledger.reserve("a", "a/f", 9, now, now + Duration::hours(1)).await;

        let replaced: HashMap<&str, DateTime<Utc>> =
            [("a/f", now - Duration::minutes(10))].into_iter().collect();
        assert_eq!(ledger.outstanding("a", &replaced, now).await, 9);

        let rewritten: HashMap<&str, DateTime<Utc>> = [("a/f", now)].into_iter().collect();
        assert_eq!(ledger.outstanding("a", &rewritten, now).await, 0);
    }

    #[tokio::test]
    async fn purge_counts_removed_entries() {
        let ledger = ReservationLedger::new();
        let now = Utc::now();
        let past = now - Duration::hours(1);
        ledger.reserve("a", "a/old", 1, past, now - Duration::minutes(5)).await;
        ledger.reserve("b", "b/old", 1, past, now - Duration::minutes(5)).await;
        ledger.reserve("b", "b/new", 1, past, now + Duration::minutes(5)).await;

        assert_eq!(ledger.purge_expired(now).await, 2);
        assert_eq!(ledger.outstanding("b", &nothing_listed(), now).await, 1);
    }
}
