//! Binary transaction encoding
//!
//! - `codec` - XDR reader/writer primitives
//! - `types` - the transaction envelope subset the viewer builds and reads

pub mod codec;
pub mod types;

use base64::{engine::general_purpose::STANDARD, Engine as _};

pub use codec::{ReadXdr, WriteXdr, XdrReader, XdrWriter};
pub use types::{
    Asset, ClaimPredicate, ClaimableBalanceId, Claimant, DecoratedSignature, Operation,
    OperationBody, TimeBounds, Transaction, TransactionEnvelope,
};

use crate::error::ViewerError;

impl TransactionEnvelope {
    /// Base64 XDR, the form submitted to the ledger and exchanged with wallets
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_xdr())
    }

    pub fn from_base64(encoded: &str) -> Result<Self, ViewerError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| ViewerError::Xdr(format!("invalid base64: {}", e)))?;
        Self::from_xdr(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::Amount;
    use crate::keys::Keypair;
    use crate::memo::Memo;

    fn sample_envelope(memo: Memo, operations: Vec<Operation>) -> TransactionEnvelope {
        let source = Keypair::from_seed_bytes([1u8; 32]).public_key();
        TransactionEnvelope {
            tx: Transaction {
                source,
                fee: 100 * operations.len() as u32,
                sequence: 4_294_967_297,
                time_bounds: Some(TimeBounds {
                    min_time: 0,
                    max_time: 1_700_000_000,
                }),
                memo,
                operations,
            },
            signatures: vec![DecoratedSignature {
                hint: [1, 2, 3, 4],
                signature: vec![9u8; 64],
            }],
        }
    }

    #[test]
    fn test_text_memo_survives_encoding() {
        let destination = Keypair::from_seed_bytes([2u8; 32]).public_key();
        let envelope = sample_envelope(
            Memo::Text("hello".to_string()),
            vec![Operation::new(OperationBody::Payment {
                destination,
                asset: Asset::Native,
                amount: Amount::from_units(5),
            })],
        );

        let decoded = TransactionEnvelope::from_base64(&envelope.to_base64()).unwrap();
        assert_eq!(decoded.tx.memo, Memo::Text("hello".to_string()));
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_claimable_balance_operations_decode() {
        let claimant = Keypair::from_seed_bytes([3u8; 32]).public_key();
        let issuer = Keypair::from_seed_bytes([4u8; 32]).public_key();
        let predicate = ClaimPredicate::And(
            Box::new(ClaimPredicate::Not(Box::new(
                ClaimPredicate::BeforeRelativeTime(60),
            ))),
            Box::new(ClaimPredicate::BeforeAbsoluteTime(2_000_000_000)),
        );
        let envelope = sample_envelope(
            Memo::Id(42),
            vec![
                Operation::new(OperationBody::CreateClaimableBalance {
                    asset: Asset::credit("USDC", issuer).unwrap(),
                    amount: Amount::from_units(10),
                    claimants: vec![Claimant {
                        destination: claimant,
                        predicate,
                    }],
                }),
                Operation {
                    source: Some(claimant),
                    body: OperationBody::ClaimClaimableBalance {
                        balance_id: ClaimableBalanceId([5u8; 32]),
                    },
                },
            ],
        );

        let decoded = TransactionEnvelope::from_xdr(&envelope.to_xdr()).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_long_asset_code_uses_alphanum12() {
        let issuer = Keypair::from_seed_bytes([4u8; 32]).public_key();
        let asset = Asset::credit("LONGCODE", issuer).unwrap();
        let bytes = asset.to_xdr();
        assert_eq!(&bytes[..4], &[0, 0, 0, 2]);
        assert_eq!(Asset::from_xdr(&bytes).unwrap(), asset);
    }

    #[test]
    fn test_canonical_asset_strings() {
        let issuer = Keypair::from_seed_bytes([4u8; 32]).public_key();
        let asset = Asset::credit("USD", issuer).unwrap();
        assert_eq!(Asset::from_canonical(&asset.canonical()).unwrap(), asset);
        assert_eq!(Asset::from_canonical("native").unwrap(), Asset::Native);
        assert!(Asset::from_canonical("USD").is_err());
    }

    #[test]
    fn test_balance_id_hex_forms() {
        let hash = "da0d57da7d4850e7fc10d2a9d0ebc731f7afb40574c03395b17d49149b91f5be";
        let from_full = ClaimableBalanceId::from_hex(&format!("00000000{}", hash)).unwrap();
        let from_bare = ClaimableBalanceId::from_hex(hash).unwrap();
        assert_eq!(from_full, from_bare);
        assert_eq!(from_full.to_hex(), format!("00000000{}", hash));
        assert!(ClaimableBalanceId::from_hex("1234").is_err());
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let envelope = sample_envelope(Memo::None, Vec::new());
        let mut bytes = envelope.to_xdr();
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        assert!(TransactionEnvelope::from_xdr(&bytes).is_err());
    }

    #[test]
    fn test_predicate_evaluation() {
        let created = 1_000;
        let window = ClaimPredicate::BeforeRelativeTime(100);
        assert!(window.is_satisfied(1_050, created));
        assert!(!window.is_satisfied(1_100, created));

        let after = ClaimPredicate::Not(Box::new(ClaimPredicate::BeforeAbsoluteTime(2_000)));
        assert!(!after.is_satisfied(1_999, created));
        assert!(after.is_satisfied(2_000, created));
    }
}
