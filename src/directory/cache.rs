use std::sync::Arc;

use super::client::{DirectoryEntry, DirectoryList, DirectorySource};
use super::store::KeyValueStore;
use super::KnownAccounts;
use crate::clock::Clock;

/// Cached lists are refetched once they are older than this
pub const CACHE_TTL_MILLIS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Directory lists backed by a key/value cache
///
/// Each list is stored as a JSON array under its storage key, with the time it
/// was written (epoch millis) under `<key>_date`.
pub struct CachedDirectory<S> {
    source: S,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl<S: DirectorySource> CachedDirectory<S> {
    pub fn new(source: S, store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            store,
            clock,
        }
    }

    /// Return the list, fetching it only when the cache is missing or stale.
    ///
    /// Never fails: a fetch error falls back to the stale copy, or to an empty
    /// list when nothing was ever cached.
    pub async fn get(&self, list: DirectoryList) -> Vec<DirectoryEntry> {
        let cached = self.read_cached(list);
        let now = self.clock.now_millis();

        if let Some((entries, stored_at)) = &cached {
            if now - stored_at < CACHE_TTL_MILLIS {
                log::debug!("Using cached {:?} directory", list);
                return entries.clone();
            }
        }

        match self.source.fetch(list).await {
            Ok(entries) => {
                log::info!("Fetched {} {:?} directory entries", entries.len(), list);
                if let Err(e) = self.write_cached(list, &entries, now) {
                    log::warn!("Could not cache {:?} directory: {}", list, e);
                }
                entries
            }
            Err(e) => {
                log::warn!("{:?} directory fetch failed, using cache: {}", list, e);
                cached.map(|(entries, _)| entries).unwrap_or_default()
            }
        }
    }

    pub async fn known_accounts(&self) -> KnownAccounts {
        let (flagged, memo_required) = futures::join!(
            self.get(DirectoryList::Flagged),
            self.get(DirectoryList::MemoRequired)
        );
        KnownAccounts {
            flagged,
            memo_required,
        }
    }

    fn read_cached(&self, list: DirectoryList) -> Option<(Vec<DirectoryEntry>, i64)> {
        let key = list.storage_key();
        let raw = match self.store.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                log::warn!("Could not read cached {:?} directory: {}", list, e);
                return None;
            }
        };
        let entries: Vec<DirectoryEntry> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Discarding corrupt {:?} directory cache: {}", list, e);
                return None;
            }
        };
        // A missing or unreadable date makes the copy stale but still usable as a fallback
        let stored_at = self
            .store
            .get(&date_key(key))
            .ok()
            .flatten()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(i64::MIN / 2);
        Some((entries, stored_at))
    }

    fn write_cached(
        &self,
        list: DirectoryList,
        entries: &[DirectoryEntry],
        now: i64,
    ) -> Result<(), crate::error::StorageError> {
        let key = list.storage_key();
        self.store.set(key, &serde_json::to_string(entries)?)?;
        self.store.set(&date_key(key), &now.to_string())?;
        Ok(())
    }
}

fn date_key(key: &str) -> String {
    format!("{}_date", key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::directory::MemoryStore;
    use crate::error::ViewerError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSource {
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeSource {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl DirectorySource for FakeSource {
        async fn fetch(&self, list: DirectoryList) -> Result<Vec<DirectoryEntry>, ViewerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ViewerError::Network("timed out".to_string()));
            }
            Ok(vec![DirectoryEntry {
                address: format!("{:?}", list),
                name: None,
                domain: None,
                tags: vec![],
            }])
        }
    }

    fn cached(
        source: FakeSource,
        store: Arc<MemoryStore>,
        clock: &ManualClock,
    ) -> CachedDirectory<FakeSource> {
        CachedDirectory::new(source, store, Arc::new(clock.clone()))
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_fetch() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(1_000_000);
        let dir = cached(FakeSource::new(false), store.clone(), &clock);

        let first = dir.get(DirectoryList::Flagged).await;
        assert_eq!(first.len(), 1);
        assert_eq!(
            store.get("flagged_accounts_date").unwrap().as_deref(),
            Some("1000000")
        );

        clock.advance_millis(CACHE_TTL_MILLIS - 1);
        dir.get(DirectoryList::Flagged).await;
        assert_eq!(dir.source.calls.load(Ordering::SeqCst), 1);

        clock.advance_millis(1);
        dir.get(DirectoryList::Flagged).await;
        assert_eq!(dir.source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_falls_back_to_stale_copy() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(0);
        store
            .set(
                "memo_required_accounts",
                r#"[{"address":"GOLD","tags":["memo-required"]}]"#,
            )
            .unwrap();
        store.set("memo_required_accounts_date", "0").unwrap();
        clock.advance_millis(CACHE_TTL_MILLIS * 2);

        let dir = cached(FakeSource::new(true), store, &clock);
        let entries = dir.get(DirectoryList::MemoRequired).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].address, "GOLD");
    }

    #[tokio::test]
    async fn test_failed_fetch_without_cache_is_empty() {
        let clock = ManualClock::new(0);
        let dir = cached(FakeSource::new(true), Arc::new(MemoryStore::new()), &clock);
        assert!(dir.get(DirectoryList::Flagged).await.is_empty());
    }
}
