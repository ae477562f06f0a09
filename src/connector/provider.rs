use async_trait::async_trait;

use super::ConnectionMethod;
use crate::config::Network;
use crate::keys::{Keypair, PublicKey};
use crate::xdr::TransactionEnvelope;

/// What a signer hands back
#[derive(Debug, Clone)]
pub enum SignedPayload {
    /// A full envelope with the signature already attached (extension wallets)
    Envelope(TransactionEnvelope),
    /// A bare ed25519 signature over the transaction hash (hardware wallets)
    Signature(Vec<u8>),
}

/// An external signer: hardware transport, browser extension or local key.
///
/// Errors are the signer's own message. An empty message means the signer
/// gave no reason.
#[async_trait]
pub trait SigningProvider: Send + Sync {
    fn method(&self) -> ConnectionMethod;

    /// Ask the signer for its account key. `path` is the BIP-44 path for hardware signers.
    async fn public_key(&self, path: Option<&str>) -> Result<PublicKey, String>;

    async fn sign(
        &self,
        envelope: &TransactionEnvelope,
        network: Network,
        path: Option<&str>,
    ) -> Result<SignedPayload, String>;
}

/// Signs locally with a secret seed
pub struct SecretKeyProvider {
    keypair: Keypair,
}

impl SecretKeyProvider {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }
}

#[async_trait]
impl SigningProvider for SecretKeyProvider {
    fn method(&self) -> ConnectionMethod {
        ConnectionMethod::SecretKey
    }

    async fn public_key(&self, _path: Option<&str>) -> Result<PublicKey, String> {
        Ok(self.keypair.public_key())
    }

    async fn sign(
        &self,
        envelope: &TransactionEnvelope,
        network: Network,
        _path: Option<&str>,
    ) -> Result<SignedPayload, String> {
        let mut signed = envelope.clone();
        signed.sign(&self.keypair, network);
        Ok(SignedPayload::Envelope(signed))
    }
}
