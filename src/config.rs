use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::env;
use std::path::PathBuf;

use crate::amount::Amount;
use crate::error::ViewerError;

/// Ledger network variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Public,
    #[default]
    Testnet,
}

impl Network {
    pub fn passphrase(&self) -> &'static str {
        match self {
            Network::Public => "Public Global Stellar Network ; September 2015",
            Network::Testnet => "Test SDF Network ; September 2015",
        }
    }

    /// SHA-256 of the passphrase; prefixed to every transaction hash
    pub fn network_id(&self) -> [u8; 32] {
        Sha256::digest(self.passphrase().as_bytes()).into()
    }

    pub fn default_horizon_url(&self) -> &'static str {
        match self {
            Network::Public => "https://horizon.stellar.org",
            Network::Testnet => "https://horizon-testnet.stellar.org",
        }
    }

    pub fn is_testnet(&self) -> bool {
        matches!(self, Network::Testnet)
    }

    /// Pick the network from a page URL or bare query string (`testnet=true|false`).
    ///
    /// Returns `None` when the parameter is absent or not a boolean, so the
    /// caller keeps whatever network it already had.
    pub fn from_query(url_or_query: &str) -> Option<Network> {
        let query = match url_or_query.split_once('?') {
            Some((_, q)) => q,
            None => url_or_query,
        };
        let parsed = reqwest::Url::parse(&format!("http://localhost/?{}", query)).ok()?;
        let value = parsed
            .query_pairs()
            .find(|(key, _)| key == "testnet")
            .map(|(_, value)| value.to_ascii_lowercase())?;
        match value.as_str() {
            "true" => Some(Network::Testnet),
            "false" => Some(Network::Public),
            _ => None,
        }
    }

    fn from_name(name: &str) -> Option<Network> {
        match name.trim().to_ascii_lowercase().as_str() {
            "public" | "pubnet" | "mainnet" => Some(Network::Public),
            "testnet" | "test" | "" => Some(Network::Testnet),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub network: Network,
    /// Horizon API base URL
    pub horizon_url: String,
    /// Account directory (reputation) API base URL
    pub directory_url: String,
    /// Where cached directory data and preferences are kept
    pub storage_dir: PathBuf,
    /// Incoming payments at or below this amount are hidden from history
    pub dust_threshold: Amount,
    /// Scheme used to fetch `stellar.toml` during federation lookups
    pub federation_scheme: String,
}

impl ViewerConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `LEDGER_NETWORK`: "testnet" (default) or "public"
    /// - `HORIZON_URL`: Horizon endpoint (defaults per network)
    /// - `DIRECTORY_URL`: account directory endpoint
    /// - `VIEWER_STORAGE_DIR`: cache directory (default `./viewer-data`)
    /// - `DUST_THRESHOLD`: decimal amount, default `0.5`
    pub fn from_env() -> Result<Self, ViewerError> {
        let network_name = env::var("LEDGER_NETWORK").unwrap_or_default();
        let network = Network::from_name(&network_name).ok_or_else(|| {
            ViewerError::Config(format!("unknown LEDGER_NETWORK '{}'", network_name))
        })?;
        log::info!("Using {:?} network", network);

        let mut config = Self::for_network(network);

        if let Ok(url) = env::var("HORIZON_URL") {
            log::info!("Horizon URL: {}", url);
            config.horizon_url = url;
        }
        if let Ok(url) = env::var("DIRECTORY_URL") {
            config.directory_url = url;
        }
        if let Ok(dir) = env::var("VIEWER_STORAGE_DIR") {
            config.storage_dir = PathBuf::from(dir);
        }
        if let Ok(raw) = env::var("DUST_THRESHOLD") {
            config.dust_threshold = raw
                .parse()
                .map_err(|e| ViewerError::Config(format!("DUST_THRESHOLD: {}", e)))?;
        }

        Ok(config)
    }

    pub fn for_network(network: Network) -> Self {
        Self {
            network,
            horizon_url: network.default_horizon_url().to_string(),
            directory_url: "https://api.stellar.expert".to_string(),
            storage_dir: PathBuf::from("./viewer-data"),
            dust_threshold: Amount::from_stroops(5_000_000),
            federation_scheme: "https".to_string(),
        }
    }

    /// Same settings pointed at another network; a custom Horizon URL is dropped
    pub fn switch_network(&self, network: Network) -> Self {
        Self {
            network,
            horizon_url: network.default_horizon_url().to_string(),
            ..self.clone()
        }
    }
}

impl Default for ViewerConfig {
    /// Default configuration (testnet)
    fn default() -> Self {
        Self::for_network(Network::Testnet)
    }
}
