//! Wallet connectors
//!
//! Every sign-in method goes through one [`WalletConnector`]; the method is a
//! tag and the vendor-specific part sits behind [`SigningProvider`].

pub mod provider;
pub mod rate_limit;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::config::Network;
use crate::error::ViewerError;
use crate::keys::PublicKey;
use crate::xdr::TransactionEnvelope;

pub use provider::{SecretKeyProvider, SignedPayload, SigningProvider};
pub use rate_limit::RateLimiter;

/// Shown when a signer fails without saying why
pub const NOT_SIGNED_MESSAGE: &str = "The transaction was not signed";

/// Account path used by hardware wallets unless the user picks another
pub const DEFAULT_BIP44_PATH: &str = "44'/148'/0'";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMethod {
    SecretKey,
    Ledger,
    Trezor,
    Freighter,
    Albedo,
    Lyra,
}

impl ConnectionMethod {
    pub fn is_hardware(&self) -> bool {
        matches!(self, ConnectionMethod::Ledger | ConnectionMethod::Trezor)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConnectionMethod::SecretKey => "Secret key",
            ConnectionMethod::Ledger => "Ledger",
            ConnectionMethod::Trezor => "Trezor",
            ConnectionMethod::Freighter => "Freighter",
            ConnectionMethod::Albedo => "Albedo",
            ConnectionMethod::Lyra => "Lyra",
        }
    }
}

impl fmt::Display for ConnectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Idle,
    Pending,
    Connected {
        public_key: PublicKey,
        /// BIP-44 path for hardware signers
        path: Option<String>,
    },
    Error(String),
}

impl ConnectionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, ConnectionState::Idle)
    }

    pub fn public_key(&self) -> Option<PublicKey> {
        match self {
            ConnectionState::Connected { public_key, .. } => Some(*public_key),
            _ => None,
        }
    }
}

/// Signer message, or the generic one when it is blank
pub fn signer_message(message: &str) -> String {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        NOT_SIGNED_MESSAGE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// A sign-in method plus its connection state
#[derive(Clone)]
pub struct WalletConnector {
    provider: Arc<dyn SigningProvider>,
    state: ConnectionState,
}

impl WalletConnector {
    pub fn new(provider: Arc<dyn SigningProvider>) -> Self {
        Self {
            provider,
            state: ConnectionState::Idle,
        }
    }

    pub fn method(&self) -> ConnectionMethod {
        self.provider.method()
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn public_key(&self) -> Option<PublicKey> {
        self.state.public_key()
    }

    /// `Idle -> Pending -> Connected | Error`. Fails without touching the
    /// state if the connector is not idle.
    pub async fn connect(&mut self, path: Option<String>) -> Result<PublicKey, ViewerError> {
        if !self.state.is_idle() {
            return Err(ViewerError::InvalidState(format!(
                "{} connector is not idle",
                self.method()
            )));
        }

        let method = self.method();
        let path = match path {
            Some(path) => Some(path),
            None if method.is_hardware() => Some(DEFAULT_BIP44_PATH.to_string()),
            None => None,
        };

        self.state = ConnectionState::Pending;
        log::info!("Connecting with {}", method);

        match self.provider.public_key(path.as_deref()).await {
            Ok(public_key) => {
                log::info!("{} connected as {}", method, public_key);
                self.state = ConnectionState::Connected { public_key, path };
                Ok(public_key)
            }
            Err(message) => {
                let message = if message.trim().is_empty() {
                    format!("Could not connect to {}", method)
                } else {
                    message
                };
                log::warn!("{} connection failed: {}", method, message);
                self.state = ConnectionState::Error(message.clone());
                Err(ViewerError::Connector(message))
            }
        }
    }

    pub fn reset(&mut self) {
        self.state = ConnectionState::Idle;
    }

    /// Sign `envelope` with the connected account.
    ///
    /// A bare signature from the provider is verified against the transaction
    /// hash before it is attached.
    pub async fn sign(
        &self,
        envelope: &TransactionEnvelope,
        network: Network,
    ) -> Result<TransactionEnvelope, ViewerError> {
        let ConnectionState::Connected { public_key, path } = &self.state else {
            return Err(ViewerError::InvalidState(
                "wallet is not connected".to_string(),
            ));
        };

        let payload = self
            .provider
            .sign(envelope, network, path.as_deref())
            .await
            .map_err(|message| ViewerError::Signing(signer_message(&message)))?;

        match payload {
            SignedPayload::Envelope(signed) => {
                if signed.tx != envelope.tx || !signed.is_signed_by(public_key, network) {
                    return Err(ViewerError::Signing(NOT_SIGNED_MESSAGE.to_string()));
                }
                Ok(signed)
            }
            SignedPayload::Signature(signature) => {
                let mut signed = envelope.clone();
                signed
                    .add_signature(public_key, &signature, network)
                    .map_err(|_| ViewerError::Signing(NOT_SIGNED_MESSAGE.to_string()))?;
                Ok(signed)
            }
        }
    }
}

impl fmt::Debug for WalletConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletConnector")
            .field("method", &self.method())
            .field("state", &self.state)
            .finish()
    }
}
