//! Federation address (`name*domain`) resolution
//!
//! The domain publishes `FEDERATION_SERVER` in its `/.well-known/stellar.toml`;
//! that server maps the address to an account id and an optional memo.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ViewerError;
use crate::keys::{is_federation_address, PublicKey};
use crate::memo::{Memo, MemoKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederationRecord {
    pub address: String,
    pub account: PublicKey,
    /// Memo the receiving service asks senders to attach
    pub memo: Memo,
}

#[async_trait]
pub trait FederationResolver: Send + Sync {
    async fn resolve(&self, address: &str) -> Result<FederationRecord, ViewerError>;
}

#[derive(Debug, Deserialize)]
struct FederationResponse {
    account_id: String,
    #[serde(default)]
    memo_type: Option<String>,
    /// Servers send id memos as numbers or strings
    #[serde(default)]
    memo: Option<serde_json::Value>,
}

#[derive(Clone)]
pub struct HttpFederationResolver {
    client: reqwest::Client,
    scheme: String,
}

impl HttpFederationResolver {
    /// `scheme` is `https` in production; tests point it at a plain-HTTP server
    pub fn new(scheme: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            scheme: scheme.to_string(),
        }
    }

    async fn federation_server(&self, domain: &str) -> Result<String, ViewerError> {
        let url = format!("{}://{}/.well-known/stellar.toml", self.scheme, domain);
        log::debug!("Fetching {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ViewerError::Federation(format!(
                "{} has no stellar.toml ({})",
                domain,
                response.status()
            )));
        }
        let body = response.text().await?;
        federation_server_from_toml(&body)
            .ok_or_else(|| ViewerError::Federation(format!("{} has no federation server", domain)))
    }
}

/// `FEDERATION_SERVER` from a stellar.toml document
pub fn federation_server_from_toml(body: &str) -> Option<String> {
    let parsed: toml::Table = body.parse().ok()?;
    parsed
        .get("FEDERATION_SERVER")?
        .as_str()
        .map(|s| s.trim_end_matches('/').to_string())
}

#[async_trait]
impl FederationResolver for HttpFederationResolver {
    async fn resolve(&self, address: &str) -> Result<FederationRecord, ViewerError> {
        let address = address.trim();
        if !is_federation_address(address) {
            return Err(ViewerError::Federation(format!(
                "'{}' is not a federation address",
                address
            )));
        }
        let domain = address
            .rsplit_once('*')
            .map(|(_, domain)| domain)
            .unwrap_or_default();

        let server = self.federation_server(domain).await?;
        let response = self
            .client
            .get(&server)
            .query(&[("q", address), ("type", "name")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ViewerError::Federation(format!(
                "{} could not be resolved ({})",
                address,
                response.status()
            )));
        }

        let record: FederationResponse = response.json().await?;
        let account = PublicKey::from_account_id(&record.account_id).map_err(|_| {
            ViewerError::Federation(format!("{} resolved to an invalid account id", address))
        })?;
        let memo = memo_from_response(record.memo_type.as_deref(), record.memo.as_ref())?;

        log::info!("Resolved {} to {}", address, account);
        Ok(FederationRecord {
            address: address.to_string(),
            account,
            memo,
        })
    }
}

fn memo_from_response(
    memo_type: Option<&str>,
    memo: Option<&serde_json::Value>,
) -> Result<Memo, ViewerError> {
    let Some(memo_type) = memo_type else {
        return Ok(Memo::None);
    };
    let kind: MemoKind = memo_type.parse()?;
    let content = match memo {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    Memo::parse(kind, &content)
}
