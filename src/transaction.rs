//! Transaction building, hashing and signing

use sha2::{Digest, Sha256};

use crate::amount::Amount;
use crate::config::Network;
use crate::error::ViewerError;
use crate::keys::{Keypair, PublicKey};
use crate::memo::Memo;
use crate::xdr::types::ENVELOPE_TYPE_TX;
use crate::xdr::{
    DecoratedSignature, Operation, TimeBounds, Transaction, TransactionEnvelope, WriteXdr,
};

/// Network minimum fee per operation, in stroops
pub const BASE_FEE: u32 = 100;

/// Default validity window for built transactions
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;

pub struct TransactionBuilder {
    source: PublicKey,
    sequence: i64,
    fee_per_op: u32,
    memo: Memo,
    operations: Vec<Operation>,
    time_bounds: Option<TimeBounds>,
}

impl TransactionBuilder {
    /// `current_sequence` is the account's sequence as loaded; the built
    /// transaction uses the next one.
    pub fn new(source: PublicKey, current_sequence: i64) -> Self {
        Self {
            source,
            sequence: current_sequence.saturating_add(1),
            fee_per_op: BASE_FEE,
            memo: Memo::None,
            operations: Vec::new(),
            time_bounds: None,
        }
    }

    pub fn fee_per_operation(mut self, fee: u32) -> Self {
        self.fee_per_op = fee;
        self
    }

    pub fn memo(mut self, memo: Memo) -> Self {
        self.memo = memo;
        self
    }

    pub fn operation(mut self, op: Operation) -> Self {
        self.operations.push(op);
        self
    }

    /// Valid until `now + timeout_secs` (unix seconds)
    pub fn timeout(mut self, now: u64, timeout_secs: u64) -> Self {
        self.time_bounds = Some(TimeBounds {
            min_time: 0,
            max_time: now.saturating_add(timeout_secs),
        });
        self
    }

    pub fn build(self) -> Result<TransactionEnvelope, ViewerError> {
        if self.operations.is_empty() {
            return Err(ViewerError::InvalidState(
                "a transaction needs at least one operation".to_string(),
            ));
        }
        let fee = self
            .fee_per_op
            .checked_mul(self.operations.len() as u32)
            .ok_or_else(|| ViewerError::InvalidAmount("fee is too large".to_string()))?;

        Ok(TransactionEnvelope {
            tx: Transaction {
                source: self.source,
                fee,
                sequence: self.sequence,
                time_bounds: self.time_bounds,
                memo: self.memo,
                operations: self.operations,
            },
            signatures: Vec::new(),
        })
    }
}

impl Transaction {
    /// Hash that signers sign: sha256(network id || envelope type || tx)
    pub fn hash(&self, network: Network) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(network.network_id());
        hasher.update(ENVELOPE_TYPE_TX.to_be_bytes());
        hasher.update(self.to_xdr());
        hasher.finalize().into()
    }

    /// Fee as a native amount
    pub fn fee_amount(&self) -> Amount {
        Amount::from_stroops(self.fee as i64)
    }
}

impl TransactionEnvelope {
    pub fn hash_hex(&self, network: Network) -> String {
        hex::encode(self.tx.hash(network))
    }

    pub fn sign(&mut self, keypair: &Keypair, network: Network) {
        let hash = self.tx.hash(network);
        self.signatures.push(DecoratedSignature {
            hint: keypair.public_key().signature_hint(),
            signature: keypair.sign(&hash).to_vec(),
        });
    }

    /// Attach a signature produced elsewhere (hardware device, extension)
    pub fn add_signature(
        &mut self,
        signer: &PublicKey,
        signature: &[u8],
        network: Network,
    ) -> Result<(), ViewerError> {
        let hash = self.tx.hash(network);
        if !signer.verify(&hash, signature) {
            return Err(ViewerError::Signing(
                "signature does not match the transaction".to_string(),
            ));
        }
        self.signatures.push(DecoratedSignature {
            hint: signer.signature_hint(),
            signature: signature.to_vec(),
        });
        Ok(())
    }

    pub fn is_signed_by(&self, signer: &PublicKey, network: Network) -> bool {
        let hash = self.tx.hash(network);
        let hint = signer.signature_hint();
        self.signatures
            .iter()
            .any(|sig| sig.hint == hint && signer.verify(&hash, &sig.signature))
    }
}
