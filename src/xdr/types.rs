//! Ledger transaction types for the operations the viewer builds
//!
//! Covers create-account, payment, create/claim claimable balance, memos,
//! time bounds and decorated signatures. Muxed accounts and other operation
//! types are rejected on decode.

use crate::amount::Amount;
use crate::error::ViewerError;
use crate::keys::PublicKey;
use crate::memo::{Memo, MAX_TEXT_MEMO_BYTES};

use super::codec::{ReadXdr, WriteXdr, XdrReader, XdrWriter};

const PUBLIC_KEY_TYPE_ED25519: u32 = 0;
const KEY_TYPE_ED25519: u32 = 0;

const ASSET_TYPE_NATIVE: u32 = 0;
const ASSET_TYPE_CREDIT_ALPHANUM4: u32 = 1;
const ASSET_TYPE_CREDIT_ALPHANUM12: u32 = 2;

const MEMO_NONE: u32 = 0;
const MEMO_TEXT: u32 = 1;
const MEMO_ID: u32 = 2;
const MEMO_HASH: u32 = 3;
const MEMO_RETURN: u32 = 4;

const CREATE_ACCOUNT: u32 = 0;
const PAYMENT: u32 = 1;
const CREATE_CLAIMABLE_BALANCE: u32 = 14;
const CLAIM_CLAIMABLE_BALANCE: u32 = 15;

const CLAIM_PREDICATE_UNCONDITIONAL: u32 = 0;
const CLAIM_PREDICATE_AND: u32 = 1;
const CLAIM_PREDICATE_OR: u32 = 2;
const CLAIM_PREDICATE_NOT: u32 = 3;
const CLAIM_PREDICATE_BEFORE_ABSOLUTE_TIME: u32 = 4;
const CLAIM_PREDICATE_BEFORE_RELATIVE_TIME: u32 = 5;

const CLAIMANT_TYPE_V0: u32 = 0;
const CLAIMABLE_BALANCE_ID_TYPE_V0: u32 = 0;

const PRECOND_NONE: u32 = 0;
const PRECOND_TIME: u32 = 1;

pub(crate) const ENVELOPE_TYPE_TX: u32 = 2;

const MAX_OPERATIONS: usize = 100;
const MAX_SIGNATURES: usize = 20;
const MAX_CLAIMANTS: usize = 10;
const MAX_PREDICATE_DEPTH: usize = 4;

// --- keys --------------------------------------------------------------

/// `AccountID`: a public-key union
impl WriteXdr for PublicKey {
    fn write_xdr(&self, w: &mut XdrWriter) {
        w.write_u32(PUBLIC_KEY_TYPE_ED25519);
        w.write_fixed(self.as_bytes());
    }
}

impl ReadXdr for PublicKey {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, ViewerError> {
        match r.read_u32()? {
            PUBLIC_KEY_TYPE_ED25519 => Ok(PublicKey::from_bytes(r.read_fixed::<32>()?)),
            other => Err(ViewerError::Xdr(format!("unsupported public key type {}", other))),
        }
    }
}

/// Unmultiplexed `MuxedAccount`
fn write_muxed(key: &PublicKey, w: &mut XdrWriter) {
    w.write_u32(KEY_TYPE_ED25519);
    w.write_fixed(key.as_bytes());
}

fn read_muxed(r: &mut XdrReader<'_>) -> Result<PublicKey, ViewerError> {
    match r.read_u32()? {
        KEY_TYPE_ED25519 => Ok(PublicKey::from_bytes(r.read_fixed::<32>()?)),
        other => Err(ViewerError::Xdr(format!("unsupported muxed account type {}", other))),
    }
}

fn write_amount(amount: Amount, w: &mut XdrWriter) {
    w.write_i64(amount.stroops());
}

fn read_amount(r: &mut XdrReader<'_>) -> Result<Amount, ViewerError> {
    Ok(Amount::from_stroops(r.read_i64()?))
}

// --- assets ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Asset {
    Native,
    Credit { code: String, issuer: PublicKey },
}

impl Asset {
    pub fn credit(code: &str, issuer: PublicKey) -> Result<Self, ViewerError> {
        if code.is_empty() || code.len() > 12 || !code.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ViewerError::Xdr(format!("invalid asset code '{}'", code)));
        }
        Ok(Asset::Credit {
            code: code.to_string(),
            issuer,
        })
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Native)
    }

    /// `native` or `CODE:ISSUER`, the form the ledger API uses
    pub fn canonical(&self) -> String {
        match self {
            Asset::Native => "native".to_string(),
            Asset::Credit { code, issuer } => format!("{}:{}", code, issuer),
        }
    }

    pub fn from_canonical(value: &str) -> Result<Self, ViewerError> {
        if value == "native" {
            return Ok(Asset::Native);
        }
        let (code, issuer) = value
            .split_once(':')
            .ok_or_else(|| ViewerError::Xdr(format!("invalid asset '{}'", value)))?;
        Asset::credit(code, PublicKey::from_account_id(issuer)?)
    }
}

impl WriteXdr for Asset {
    fn write_xdr(&self, w: &mut XdrWriter) {
        match self {
            Asset::Native => w.write_u32(ASSET_TYPE_NATIVE),
            Asset::Credit { code, issuer } => {
                if code.len() <= 4 {
                    w.write_u32(ASSET_TYPE_CREDIT_ALPHANUM4);
                    let mut raw = [0u8; 4];
                    raw[..code.len()].copy_from_slice(code.as_bytes());
                    w.write_fixed(&raw);
                } else {
                    w.write_u32(ASSET_TYPE_CREDIT_ALPHANUM12);
                    let mut raw = [0u8; 12];
                    raw[..code.len()].copy_from_slice(code.as_bytes());
                    w.write_fixed(&raw);
                }
                issuer.write_xdr(w);
            }
        }
    }
}

impl ReadXdr for Asset {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, ViewerError> {
        let code_bytes = match r.read_u32()? {
            ASSET_TYPE_NATIVE => return Ok(Asset::Native),
            ASSET_TYPE_CREDIT_ALPHANUM4 => r.read_fixed::<4>()?.to_vec(),
            ASSET_TYPE_CREDIT_ALPHANUM12 => r.read_fixed::<12>()?.to_vec(),
            other => return Err(ViewerError::Xdr(format!("unsupported asset type {}", other))),
        };
        let end = code_bytes.iter().position(|b| *b == 0).unwrap_or(code_bytes.len());
        let code = String::from_utf8(code_bytes[..end].to_vec())
            .map_err(|_| ViewerError::Xdr("asset code is not ASCII".to_string()))?;
        let issuer = PublicKey::read_xdr(r)?;
        Asset::credit(&code, issuer)
    }
}

// --- memo --------------------------------------------------------------

impl WriteXdr for Memo {
    fn write_xdr(&self, w: &mut XdrWriter) {
        match self {
            Memo::None => w.write_u32(MEMO_NONE),
            Memo::Text(text) => {
                w.write_u32(MEMO_TEXT);
                w.write_var(text.as_bytes());
            }
            Memo::Id(id) => {
                w.write_u32(MEMO_ID);
                w.write_u64(*id);
            }
            Memo::Hash(hash) => {
                w.write_u32(MEMO_HASH);
                w.write_fixed(hash);
            }
            Memo::Return(hash) => {
                w.write_u32(MEMO_RETURN);
                w.write_fixed(hash);
            }
        }
    }
}

impl ReadXdr for Memo {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, ViewerError> {
        match r.read_u32()? {
            MEMO_NONE => Ok(Memo::None),
            MEMO_TEXT => {
                let raw = r.read_var(MAX_TEXT_MEMO_BYTES)?;
                String::from_utf8(raw)
                    .map(Memo::Text)
                    .map_err(|_| ViewerError::Xdr("memo text is not UTF-8".to_string()))
            }
            MEMO_ID => Ok(Memo::Id(r.read_u64()?)),
            MEMO_HASH => Ok(Memo::Hash(r.read_fixed::<32>()?)),
            MEMO_RETURN => Ok(Memo::Return(r.read_fixed::<32>()?)),
            other => Err(ViewerError::Xdr(format!("unknown memo type {}", other))),
        }
    }
}

// --- claimable balances --------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimPredicate {
    Unconditional,
    And(Box<ClaimPredicate>, Box<ClaimPredicate>),
    Or(Box<ClaimPredicate>, Box<ClaimPredicate>),
    Not(Box<ClaimPredicate>),
    /// Unix seconds
    BeforeAbsoluteTime(i64),
    /// Seconds after the balance was created
    BeforeRelativeTime(i64),
}

impl ClaimPredicate {
    /// Whether a claim at `now` (unix seconds) satisfies the predicate.
    /// Relative bounds are measured from `created_at`.
    pub fn is_satisfied(&self, now: i64, created_at: i64) -> bool {
        match self {
            ClaimPredicate::Unconditional => true,
            ClaimPredicate::And(a, b) => {
                a.is_satisfied(now, created_at) && b.is_satisfied(now, created_at)
            }
            ClaimPredicate::Or(a, b) => {
                a.is_satisfied(now, created_at) || b.is_satisfied(now, created_at)
            }
            ClaimPredicate::Not(inner) => !inner.is_satisfied(now, created_at),
            ClaimPredicate::BeforeAbsoluteTime(deadline) => now < *deadline,
            ClaimPredicate::BeforeRelativeTime(seconds) => {
                now < created_at.saturating_add(*seconds)
            }
        }
    }

    fn write_at(&self, w: &mut XdrWriter) {
        match self {
            ClaimPredicate::Unconditional => w.write_u32(CLAIM_PREDICATE_UNCONDITIONAL),
            ClaimPredicate::And(a, b) => {
                w.write_u32(CLAIM_PREDICATE_AND);
                w.write_u32(2);
                a.write_at(w);
                b.write_at(w);
            }
            ClaimPredicate::Or(a, b) => {
                w.write_u32(CLAIM_PREDICATE_OR);
                w.write_u32(2);
                a.write_at(w);
                b.write_at(w);
            }
            ClaimPredicate::Not(inner) => {
                w.write_u32(CLAIM_PREDICATE_NOT);
                // Optional pointer, always present
                w.write_bool(true);
                inner.write_at(w);
            }
            ClaimPredicate::BeforeAbsoluteTime(t) => {
                w.write_u32(CLAIM_PREDICATE_BEFORE_ABSOLUTE_TIME);
                w.write_i64(*t);
            }
            ClaimPredicate::BeforeRelativeTime(t) => {
                w.write_u32(CLAIM_PREDICATE_BEFORE_RELATIVE_TIME);
                w.write_i64(*t);
            }
        }
    }

    fn read_at(r: &mut XdrReader<'_>, depth: usize) -> Result<Self, ViewerError> {
        if depth > MAX_PREDICATE_DEPTH {
            return Err(ViewerError::Xdr("claim predicate nested too deeply".to_string()));
        }
        match r.read_u32()? {
            CLAIM_PREDICATE_UNCONDITIONAL => Ok(ClaimPredicate::Unconditional),
            kind @ (CLAIM_PREDICATE_AND | CLAIM_PREDICATE_OR) => {
                if r.read_u32()? != 2 {
                    return Err(ViewerError::Xdr(
                        "compound predicate needs exactly two parts".to_string(),
                    ));
                }
                let a = Box::new(Self::read_at(r, depth + 1)?);
                let b = Box::new(Self::read_at(r, depth + 1)?);
                Ok(if kind == CLAIM_PREDICATE_AND {
                    ClaimPredicate::And(a, b)
                } else {
                    ClaimPredicate::Or(a, b)
                })
            }
            CLAIM_PREDICATE_NOT => {
                if !r.read_bool()? {
                    return Err(ViewerError::Xdr("empty negated predicate".to_string()));
                }
                Ok(ClaimPredicate::Not(Box::new(Self::read_at(r, depth + 1)?)))
            }
            CLAIM_PREDICATE_BEFORE_ABSOLUTE_TIME => {
                Ok(ClaimPredicate::BeforeAbsoluteTime(r.read_i64()?))
            }
            CLAIM_PREDICATE_BEFORE_RELATIVE_TIME => {
                Ok(ClaimPredicate::BeforeRelativeTime(r.read_i64()?))
            }
            other => Err(ViewerError::Xdr(format!("unknown claim predicate {}", other))),
        }
    }
}

impl WriteXdr for ClaimPredicate {
    fn write_xdr(&self, w: &mut XdrWriter) {
        self.write_at(w);
    }
}

impl ReadXdr for ClaimPredicate {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, ViewerError> {
        Self::read_at(r, 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claimant {
    pub destination: PublicKey,
    pub predicate: ClaimPredicate,
}

impl WriteXdr for Claimant {
    fn write_xdr(&self, w: &mut XdrWriter) {
        w.write_u32(CLAIMANT_TYPE_V0);
        self.destination.write_xdr(w);
        self.predicate.write_xdr(w);
    }
}

impl ReadXdr for Claimant {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, ViewerError> {
        match r.read_u32()? {
            CLAIMANT_TYPE_V0 => Ok(Claimant {
                destination: PublicKey::read_xdr(r)?,
                predicate: ClaimPredicate::read_xdr(r)?,
            }),
            other => Err(ViewerError::Xdr(format!("unknown claimant type {}", other))),
        }
    }
}

/// Claimable balance id: a type tag followed by a 32-byte hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClaimableBalanceId(pub [u8; 32]);

impl ClaimableBalanceId {
    /// Accepts the ledger API's 72-character form (`00000000` + hash) or a bare hash
    pub fn from_hex(value: &str) -> Result<Self, ViewerError> {
        let hash_hex = match value.len() {
            72 if value.starts_with("00000000") => &value[8..],
            64 => value,
            _ => {
                return Err(ViewerError::Xdr(format!(
                    "invalid claimable balance id '{}'",
                    value
                )))
            }
        };
        let bytes = hex::decode(hash_hex)
            .map_err(|_| ViewerError::Xdr(format!("invalid claimable balance id '{}'", value)))?;
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }

    pub fn to_hex(&self) -> String {
        format!("00000000{}", hex::encode(self.0))
    }
}

impl WriteXdr for ClaimableBalanceId {
    fn write_xdr(&self, w: &mut XdrWriter) {
        w.write_u32(CLAIMABLE_BALANCE_ID_TYPE_V0);
        w.write_fixed(&self.0);
    }
}

impl ReadXdr for ClaimableBalanceId {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, ViewerError> {
        match r.read_u32()? {
            CLAIMABLE_BALANCE_ID_TYPE_V0 => Ok(Self(r.read_fixed::<32>()?)),
            other => Err(ViewerError::Xdr(format!("unknown balance id type {}", other))),
        }
    }
}

// --- operations ----------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationBody {
    CreateAccount {
        destination: PublicKey,
        starting_balance: Amount,
    },
    Payment {
        destination: PublicKey,
        asset: Asset,
        amount: Amount,
    },
    CreateClaimableBalance {
        asset: Asset,
        amount: Amount,
        claimants: Vec<Claimant>,
    },
    ClaimClaimableBalance {
        balance_id: ClaimableBalanceId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub source: Option<PublicKey>,
    pub body: OperationBody,
}

impl Operation {
    pub fn new(body: OperationBody) -> Self {
        Self { source: None, body }
    }
}

impl WriteXdr for Operation {
    fn write_xdr(&self, w: &mut XdrWriter) {
        match &self.source {
            Some(source) => {
                w.write_bool(true);
                write_muxed(source, w);
            }
            None => w.write_bool(false),
        }
        match &self.body {
            OperationBody::CreateAccount {
                destination,
                starting_balance,
            } => {
                w.write_u32(CREATE_ACCOUNT);
                destination.write_xdr(w);
                write_amount(*starting_balance, w);
            }
            OperationBody::Payment {
                destination,
                asset,
                amount,
            } => {
                w.write_u32(PAYMENT);
                write_muxed(destination, w);
                asset.write_xdr(w);
                write_amount(*amount, w);
            }
            OperationBody::CreateClaimableBalance {
                asset,
                amount,
                claimants,
            } => {
                w.write_u32(CREATE_CLAIMABLE_BALANCE);
                asset.write_xdr(w);
                write_amount(*amount, w);
                w.write_u32(claimants.len() as u32);
                for claimant in claimants {
                    claimant.write_xdr(w);
                }
            }
            OperationBody::ClaimClaimableBalance { balance_id } => {
                w.write_u32(CLAIM_CLAIMABLE_BALANCE);
                balance_id.write_xdr(w);
            }
        }
    }
}

impl ReadXdr for Operation {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, ViewerError> {
        let source = if r.read_bool()? {
            Some(read_muxed(r)?)
        } else {
            None
        };
        let body = match r.read_u32()? {
            CREATE_ACCOUNT => OperationBody::CreateAccount {
                destination: PublicKey::read_xdr(r)?,
                starting_balance: read_amount(r)?,
            },
            PAYMENT => OperationBody::Payment {
                destination: read_muxed(r)?,
                asset: Asset::read_xdr(r)?,
                amount: read_amount(r)?,
            },
            CREATE_CLAIMABLE_BALANCE => {
                let asset = Asset::read_xdr(r)?;
                let amount = read_amount(r)?;
                let count = r.read_u32()? as usize;
                if count > MAX_CLAIMANTS {
                    return Err(ViewerError::Xdr(format!("{} claimants exceeds limit", count)));
                }
                let claimants = (0..count)
                    .map(|_| Claimant::read_xdr(r))
                    .collect::<Result<Vec<_>, _>>()?;
                OperationBody::CreateClaimableBalance {
                    asset,
                    amount,
                    claimants,
                }
            }
            CLAIM_CLAIMABLE_BALANCE => OperationBody::ClaimClaimableBalance {
                balance_id: ClaimableBalanceId::read_xdr(r)?,
            },
            other => return Err(ViewerError::Xdr(format!("unsupported operation type {}", other))),
        };
        Ok(Operation { source, body })
    }
}

// --- transaction -------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBounds {
    pub min_time: u64,
    /// 0 means no upper bound
    pub max_time: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub source: PublicKey,
    /// Total fee in stroops (per-operation fee × operation count)
    pub fee: u32,
    pub sequence: i64,
    pub time_bounds: Option<TimeBounds>,
    pub memo: Memo,
    pub operations: Vec<Operation>,
}

impl WriteXdr for Transaction {
    fn write_xdr(&self, w: &mut XdrWriter) {
        write_muxed(&self.source, w);
        w.write_u32(self.fee);
        w.write_i64(self.sequence);
        match &self.time_bounds {
            Some(bounds) => {
                w.write_u32(PRECOND_TIME);
                w.write_u64(bounds.min_time);
                w.write_u64(bounds.max_time);
            }
            None => w.write_u32(PRECOND_NONE),
        }
        self.memo.write_xdr(w);
        w.write_u32(self.operations.len() as u32);
        for op in &self.operations {
            op.write_xdr(w);
        }
        // ext
        w.write_i32(0);
    }
}

impl ReadXdr for Transaction {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, ViewerError> {
        let source = read_muxed(r)?;
        let fee = r.read_u32()?;
        let sequence = r.read_i64()?;
        let time_bounds = match r.read_u32()? {
            PRECOND_NONE => None,
            PRECOND_TIME => Some(TimeBounds {
                min_time: r.read_u64()?,
                max_time: r.read_u64()?,
            }),
            other => return Err(ViewerError::Xdr(format!("unsupported precondition {}", other))),
        };
        let memo = Memo::read_xdr(r)?;
        let count = r.read_u32()? as usize;
        if count > MAX_OPERATIONS {
            return Err(ViewerError::Xdr(format!("{} operations exceeds limit", count)));
        }
        let operations = (0..count)
            .map(|_| Operation::read_xdr(r))
            .collect::<Result<Vec<_>, _>>()?;
        if r.read_i32()? != 0 {
            return Err(ViewerError::Xdr("unsupported transaction extension".to_string()));
        }
        Ok(Transaction {
            source,
            fee,
            sequence,
            time_bounds,
            memo,
            operations,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratedSignature {
    pub hint: [u8; 4],
    pub signature: Vec<u8>,
}

impl WriteXdr for DecoratedSignature {
    fn write_xdr(&self, w: &mut XdrWriter) {
        w.write_fixed(&self.hint);
        w.write_var(&self.signature);
    }
}

impl ReadXdr for DecoratedSignature {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, ViewerError> {
        Ok(DecoratedSignature {
            hint: r.read_fixed::<4>()?,
            signature: r.read_var(64)?,
        })
    }
}

/// `TransactionEnvelope` of type `ENVELOPE_TYPE_TX`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionEnvelope {
    pub tx: Transaction,
    pub signatures: Vec<DecoratedSignature>,
}

impl WriteXdr for TransactionEnvelope {
    fn write_xdr(&self, w: &mut XdrWriter) {
        w.write_u32(ENVELOPE_TYPE_TX);
        self.tx.write_xdr(w);
        w.write_u32(self.signatures.len() as u32);
        for sig in &self.signatures {
            sig.write_xdr(w);
        }
    }
}

impl ReadXdr for TransactionEnvelope {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, ViewerError> {
        match r.read_u32()? {
            ENVELOPE_TYPE_TX => {}
            other => return Err(ViewerError::Xdr(format!("unsupported envelope type {}", other))),
        }
        let tx = Transaction::read_xdr(r)?;
        let count = r.read_u32()? as usize;
        if count > MAX_SIGNATURES {
            return Err(ViewerError::Xdr(format!("{} signatures exceeds limit", count)));
        }
        let signatures = (0..count)
            .map(|_| DecoratedSignature::read_xdr(r))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TransactionEnvelope { tx, signatures })
    }
}
