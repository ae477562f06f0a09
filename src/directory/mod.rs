//! Account reputation directory
//!
//! Flagged (malicious/unsafe) and memo-required account lists are fetched from
//! a third-party directory and cached for a week in a [`KeyValueStore`].

pub mod cache;
pub mod client;
pub mod store;

pub use cache::{CachedDirectory, CACHE_TTL_MILLIS};
pub use client::{DirectoryClient, DirectoryEntry, DirectoryList, DirectorySource};
pub use store::{FileStore, KeyValueStore, MemoryStore};

/// Directory lists as held in the state store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownAccounts {
    pub flagged: Vec<DirectoryEntry>,
    pub memo_required: Vec<DirectoryEntry>,
}

impl KnownAccounts {
    pub fn flagged_entry(&self, account_id: &str) -> Option<&DirectoryEntry> {
        self.flagged.iter().find(|e| e.address == account_id)
    }

    pub fn is_flagged(&self, account_id: &str) -> bool {
        self.flagged_entry(account_id).is_some()
    }

    pub fn requires_memo(&self, account_id: &str) -> bool {
        self.memo_required.iter().any(|e| e.address == account_id)
    }
}
