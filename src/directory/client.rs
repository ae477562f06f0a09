use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ViewerError;
use crate::horizon::types::Collection;

/// Directory calls are the only ones with a client-side deadline
pub const DIRECTORY_TIMEOUT: Duration = Duration::from_secs(5);

/// Records requested per directory list
pub const DIRECTORY_LIMIT: u32 = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub address: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectoryList {
    /// Accounts tagged malicious or unsafe
    Flagged,
    /// Exchanges and custodians that need a memo on incoming payments
    MemoRequired,
}

impl DirectoryList {
    pub fn storage_key(&self) -> &'static str {
        match self {
            DirectoryList::Flagged => "flagged_accounts",
            DirectoryList::MemoRequired => "memo_required_accounts",
        }
    }

    pub fn tags(&self) -> &'static [&'static str] {
        match self {
            DirectoryList::Flagged => &["malicious", "unsafe"],
            DirectoryList::MemoRequired => &["memo-required"],
        }
    }
}

/// Where directory lists come from
#[async_trait]
pub trait DirectorySource: Send + Sync {
    async fn fetch(&self, list: DirectoryList) -> Result<Vec<DirectoryEntry>, ViewerError>;
}

#[async_trait]
impl<T: DirectorySource + ?Sized> DirectorySource for Box<T> {
    async fn fetch(&self, list: DirectoryList) -> Result<Vec<DirectoryEntry>, ViewerError> {
        (**self).fetch(list).await
    }
}

/// HTTP client for the account reputation directory
#[derive(Clone)]
pub struct DirectoryClient {
    client: reqwest::Client,
    base_url: String,
}

impl DirectoryClient {
    pub fn new(base_url: &str) -> Result<Self, ViewerError> {
        let client = reqwest::Client::builder()
            .timeout(DIRECTORY_TIMEOUT)
            .build()
            .map_err(|e| ViewerError::Config(format!("directory client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl DirectorySource for DirectoryClient {
    async fn fetch(&self, list: DirectoryList) -> Result<Vec<DirectoryEntry>, ViewerError> {
        let url = format!("{}/explorer/directory", self.base_url);
        let mut query: Vec<(&str, String)> = list
            .tags()
            .iter()
            .map(|tag| ("tag[]", tag.to_string()))
            .collect();
        query.push(("limit", DIRECTORY_LIMIT.to_string()));

        log::debug!("Fetching {:?} directory from {}", list, url);
        let response = self.client.get(&url).query(&query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ViewerError::Network(format!(
                "directory returned {}",
                status
            )));
        }

        let collection: Collection<DirectoryEntry> = response.json().await?;
        Ok(collection.embedded.records)
    }
}
