//! Account keys
//!
//! - `PublicKey`: ed25519 verifying key, `G...` account id
//! - `Keypair`: ed25519 signing key, `S...` secret seed
//! - federation address detection (`name*domain`)

pub mod strkey;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ViewerError;
use strkey::VersionByte;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_account_id(account_id: &str) -> Result<Self, ViewerError> {
        strkey::decode(VersionByte::AccountId, account_id.trim()).map(Self)
    }

    pub fn account_id(&self) -> String {
        strkey::encode(VersionByte::AccountId, &self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Last four bytes of the key, used to tag a decorated signature
    pub fn signature_hint(&self) -> [u8; 4] {
        let mut hint = [0u8; 4];
        hint.copy_from_slice(&self.0[28..]);
        hint
    }

    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let Ok(signature) = <[u8; 64]>::try_from(signature) else {
            return false;
        };
        match VerifyingKey::from_bytes(&self.0) {
            Ok(key) => key
                .verify(message, &Signature::from_bytes(&signature))
                .is_ok(),
            Err(_) => false,
        }
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.account_id())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.account_id())
    }
}

impl FromStr for PublicKey {
    type Err = ViewerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_account_id(s)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.account_id())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_account_id(&raw).map_err(serde::de::Error::custom)
    }
}

/// Ed25519 keypair derived from a secret seed
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    pub fn from_seed_bytes(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    pub fn from_secret_seed(secret: &str) -> Result<Self, ViewerError> {
        let seed = strkey::decode(VersionByte::SecretSeed, secret.trim())?;
        Ok(Self::from_seed_bytes(seed))
    }

    pub fn secret_seed(&self) -> String {
        strkey::encode(VersionByte::SecretSeed, &self.signing_key.to_bytes())
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// `name*domain`, with a non-empty name and a dotted domain
pub fn is_federation_address(input: &str) -> bool {
    match input.trim().rsplit_once('*') {
        Some((name, domain)) => {
            !name.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED_7: &str = "SADQOBYHA4DQOBYHA4DQOBYHA4DQOBYHA4DQOBYHA4DQOBYHA4DQP54X";
    const ACCOUNT_7: &str = "GDVEU3DD4KOFECV66VIHWEZOYX4ZKR3WV27L464SIIPOU2IUI3JCZA57";

    #[test]
    fn test_public_key_from_seed() {
        let keypair = Keypair::from_secret_seed(SEED_7).unwrap();
        assert_eq!(keypair.public_key().account_id(), ACCOUNT_7);
        assert_eq!(keypair.secret_seed(), SEED_7);
    }

    #[test]
    fn test_sign_and_verify() {
        let keypair = Keypair::from_seed_bytes([9u8; 32]);
        let signature = keypair.sign(b"payload");
        assert!(keypair.public_key().verify(b"payload", &signature));
        assert!(!keypair.public_key().verify(b"other", &signature));
        assert!(!keypair.public_key().verify(b"payload", &signature[..63]));
    }

    #[test]
    fn test_account_id_is_not_a_seed() {
        assert!(Keypair::from_secret_seed(ACCOUNT_7).is_err());
        assert!(PublicKey::from_account_id(SEED_7).is_err());
    }

    #[test]
    fn test_signature_hint_is_key_suffix() {
        let key = PublicKey::from_account_id(ACCOUNT_7).unwrap();
        assert_eq!(&key.signature_hint(), &key.as_bytes()[28..]);
    }

    #[test]
    fn test_federation_address_detection() {
        assert!(is_federation_address("alice*example.com"));
        assert!(is_federation_address("alice@mail.org*example.com"));
        assert!(!is_federation_address("*example.com"));
        assert!(!is_federation_address("alice*localhost"));
        assert!(!is_federation_address(ACCOUNT_7));
    }

    #[test]
    fn test_debug_hides_secret() {
        let keypair = Keypair::from_secret_seed(SEED_7).unwrap();
        let rendered = format!("{:?}", keypair);
        assert!(!rendered.contains(SEED_7));
        assert!(rendered.contains(ACCOUNT_7));
    }
}
