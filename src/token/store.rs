use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::token::claim::Claim;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenEntry {
    pub id: String,
    pub claims: Vec<Claim>,
    pub expires_at: DateTime<Utc>,
}

impl TokenEntry {
    pub fn new(id: String, claims: Vec<Claim>, expires_at: DateTime<Utc>) -> Self {
        Self {
            id,
            claims,
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Registry of outstanding tokens.
///
/// Every method is atomic with respect to the others. `try_remove` in
/// particular hands a given entry to at most one caller.
pub trait TokenStore: Send + Sync {
    fn insert(&self, entry: TokenEntry);

    fn try_remove(&self, id: &str) -> Option<TokenEntry>;

    /// Drops every entry with `expires_at <= now`, returning how many went.
    fn remove_expired(&self, now: DateTime<Utc>) -> usize;

    fn snapshot(&self) -> HashMap<String, TokenEntry>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: Mutex<HashMap<String, TokenEntry>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    // the map is never left half-updated, so a poisoned lock is still usable
    fn entries(&self) -> MutexGuard<'_, HashMap<String, TokenEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TokenStore for MemoryTokenStore {
    fn insert(&self, entry: TokenEntry) {
        self.entries().insert(entry.id.clone(), entry);
    }

    fn try_remove(&self, id: &str) -> Option<TokenEntry> {
        self.entries().remove(id)
    }

    fn remove_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries();
        let before = entries.len();

        entries.retain(|_, entry| !entry.is_expired(now));

        before - entries.len()
    }

    fn snapshot(&self) -> HashMap<String, TokenEntry> {
        self.entries().clone()
    }

    fn len(&self) -> usize {
        self.entries().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;
    use std::thread;

    fn entry(id: &str, expires_at: DateTime<Utc>) -> TokenEntry {
        TokenEntry::new(id.to_string(), vec![Claim::role("Reader")], expires_at)
    }

    #[test]
    fn test_insert_and_remove() {
        let store = MemoryTokenStore::new();
        let now = Utc::now();

        store.insert(entry("a", now));
        assert_eq!(store.len(), 1);

        let removed = store.try_remove("a").unwrap();
        assert_eq!(removed.id, "a");
        assert_eq!(removed.claims, vec![Claim::role("Reader")]);

        assert!(store.try_remove("a").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_expired_is_inclusive() {
        let store = MemoryTokenStore::new();
        let now = Utc::now();

        store.insert(entry("past", now - Duration::seconds(1)));
        store.insert(entry("exact", now));
        store.insert(entry("future", now + Duration::seconds(1)));

        assert_eq!(store.remove_expired(now), 2);

        let remaining = store.snapshot();
        assert_eq!(remaining.len(), 1);
        assert!(remaining.contains_key("future"));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let store = MemoryTokenStore::new();
        store.insert(entry("a", Utc::now()));

        let snapshot = store.snapshot();
        store.try_remove("a");

        assert_eq!(snapshot.len(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_remove_hands_out_entry_once() {
        let store = Arc::new(MemoryTokenStore::new());
        store.insert(entry("shared", Utc::now() + Duration::minutes(1)));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || store.try_remove("shared").is_some())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
    }
}
