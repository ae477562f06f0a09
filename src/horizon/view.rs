//! View-friendly shapes built from Horizon responses

use chrono::{DateTime, Utc};

use super::types::{
    AccountFlags, AccountResponse, ClaimableBalanceRecord, FeeStatsResponse, OperationRecord,
    PaymentRecord, PredicateRecord, Thresholds,
};
use crate::amount::Amount;
use crate::error::ViewerError;
use crate::keys::PublicKey;
use crate::transaction::BASE_FEE;
use crate::xdr::{Asset, ClaimPredicate, ClaimableBalanceId};

/// Reserve held per ledger entry
pub const BASE_RESERVE: Amount = Amount::from_stroops(5_000_000);

/// Smallest starting balance a new account can be created with (two base reserves)
pub const MIN_ACCOUNT_BALANCE: Amount = Amount::from_stroops(10_000_000);

/// Fixed page size for history and operation listings
pub const HISTORY_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeBalance {
    pub balance: Amount,
    pub reserve: Amount,
    pub buying_liabilities: Amount,
    pub selling_liabilities: Amount,
}

impl NativeBalance {
    /// Spendable amount: balance minus reserve and selling liabilities
    pub fn available(&self) -> Amount {
        self.balance
            .saturating_sub(self.reserve)
            .saturating_sub(self.selling_liabilities)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetBalance {
    pub asset: Asset,
    pub balance: Amount,
    pub limit: Option<Amount>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signer {
    pub key: String,
    pub weight: u32,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub public_key: PublicKey,
    pub sequence: i64,
    pub funded: bool,
    pub native: NativeBalance,
    pub balances: Vec<AssetBalance>,
    pub signers: Vec<Signer>,
    pub thresholds: Thresholds,
    pub flags: AccountFlags,
    pub subentry_count: u32,
    pub num_sponsoring: u32,
    pub num_sponsored: u32,
}

impl AccountInfo {
    /// An account id that has never been created on the ledger
    pub fn unfunded(public_key: PublicKey) -> Self {
        Self {
            public_key,
            sequence: 0,
            funded: false,
            native: NativeBalance {
                balance: Amount::ZERO,
                reserve: Amount::ZERO,
                buying_liabilities: Amount::ZERO,
                selling_liabilities: Amount::ZERO,
            },
            balances: Vec::new(),
            signers: Vec::new(),
            thresholds: Thresholds::default(),
            flags: AccountFlags::default(),
            subentry_count: 0,
            num_sponsoring: 0,
            num_sponsored: 0,
        }
    }

    pub fn from_response(response: &AccountResponse) -> Result<Self, ViewerError> {
        let public_key = PublicKey::from_account_id(&response.account_id)?;
        let sequence = response.sequence.parse::<i64>().map_err(|_| {
            ViewerError::Network(format!("invalid sequence '{}'", response.sequence))
        })?;

        let mut native_line = None;
        let mut balances = Vec::new();
        for line in &response.balances {
            if line.asset_type == "native" {
                native_line = Some(line);
                continue;
            }
            // Liquidity pool shares have no code/issuer
            let (Some(code), Some(issuer)) = (&line.asset_code, &line.asset_issuer) else {
                continue;
            };
            balances.push(AssetBalance {
                asset: Asset::credit(code, PublicKey::from_account_id(issuer)?)?,
                balance: line.balance.parse()?,
                limit: line.limit.as_deref().map(str::parse::<Amount>).transpose()?,
            });
        }

        let parse_opt = |value: Option<&String>| -> Result<Amount, ViewerError> {
            value.map(|v| v.parse()).unwrap_or(Ok(Amount::ZERO))
        };
        let native = match native_line {
            Some(line) => NativeBalance {
                balance: line.balance.parse()?,
                reserve: minimum_reserve(
                    response.subentry_count,
                    response.num_sponsoring,
                    response.num_sponsored,
                ),
                buying_liabilities: parse_opt(line.buying_liabilities.as_ref())?,
                selling_liabilities: parse_opt(line.selling_liabilities.as_ref())?,
            },
            None => {
                return Err(ViewerError::Network(
                    "account response has no native balance".to_string(),
                ))
            }
        };

        Ok(Self {
            public_key,
            sequence,
            funded: true,
            native,
            balances,
            signers: response
                .signers
                .iter()
                .map(|s| Signer {
                    key: s.key.clone(),
                    weight: s.weight,
                    kind: s.kind.clone(),
                })
                .collect(),
            thresholds: response.thresholds.clone(),
            flags: response.flags.clone(),
            subentry_count: response.subentry_count,
            num_sponsoring: response.num_sponsoring,
            num_sponsored: response.num_sponsored,
        })
    }

    pub fn available_native(&self) -> Amount {
        self.native.available()
    }

    pub fn has_trustline(&self, asset: &Asset) -> bool {
        asset.is_native() || self.balances.iter().any(|b| &b.asset == asset)
    }
}

/// (2 + subentries + sponsoring − sponsored) × base reserve
pub fn minimum_reserve(subentry_count: u32, num_sponsoring: u32, num_sponsored: u32) -> Amount {
    let entries = (2 + subentry_count as i64 + num_sponsoring as i64 - num_sponsored as i64).max(0);
    Amount::from_stroops(entries * BASE_RESERVE.stroops())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub records: Vec<T>,
    /// Paging token of the last record; `None` when the page came back empty
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    Payment,
    PathPayment,
    CreateAccount,
    AccountMerge,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Sent,
    Received,
    /// Both sides are the viewed account
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: String,
    pub paging_token: String,
    pub kind: HistoryKind,
    pub direction: Direction,
    pub counterparty: Option<String>,
    pub amount: Option<Amount>,
    /// `native` or `CODE:ISSUER`
    pub asset: String,
    pub created_at: DateTime<Utc>,
    pub transaction_hash: String,
}

impl HistoryEntry {
    pub fn from_record(record: &PaymentRecord, viewer: &PublicKey) -> Result<Self, ViewerError> {
        let me = viewer.account_id();
        let (kind, from, to, amount) = match record.kind.as_str() {
            "payment" => (
                HistoryKind::Payment,
                record.from.clone(),
                record.to.clone(),
                record.amount.clone(),
            ),
            "path_payment_strict_send" | "path_payment_strict_receive" | "path_payment" => (
                HistoryKind::PathPayment,
                record.from.clone(),
                record.to.clone(),
                record.amount.clone(),
            ),
            "create_account" => (
                HistoryKind::CreateAccount,
                record.funder.clone(),
                record.account.clone(),
                record.starting_balance.clone(),
            ),
            "account_merge" => (
                HistoryKind::AccountMerge,
                record.account.clone(),
                record.into.clone(),
                None,
            ),
            _ => (
                HistoryKind::Other,
                record.source_account.clone(),
                None,
                None,
            ),
        };

        let direction = match (from.as_deref() == Some(&me), to.as_deref() == Some(&me)) {
            (true, true) => Direction::Internal,
            (true, false) => Direction::Sent,
            _ => Direction::Received,
        };
        let counterparty = match direction {
            Direction::Sent => to,
            Direction::Received => from,
            Direction::Internal => None,
        };

        let asset = match (
            record.asset_type.as_deref(),
            &record.asset_code,
            &record.asset_issuer,
        ) {
            (Some("native") | None, _, _) => "native".to_string(),
            (Some(_), Some(code), Some(issuer)) => format!("{}:{}", code, issuer),
            (Some(other), _, _) => other.to_string(),
        };

        Ok(Self {
            id: record.id.clone(),
            paging_token: record.paging_token.clone(),
            kind,
            direction,
            counterparty,
            amount: amount.as_deref().map(str::parse::<Amount>).transpose()?,
            asset,
            created_at: parse_timestamp(&record.created_at)?,
            transaction_hash: record.transaction_hash.clone(),
        })
    }
}

/// Hide incoming native payments at or below `threshold`.
///
/// Outgoing entries and non-native assets are always kept.
pub fn filter_dust(entries: Vec<HistoryEntry>, threshold: Amount) -> Vec<HistoryEntry> {
    entries
        .into_iter()
        .filter(|entry| {
            let is_dust = entry.direction == Direction::Received
                && entry.asset == "native"
                && entry.amount.is_some_and(|amount| amount <= threshold);
            !is_dust
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationEntry {
    pub id: String,
    pub paging_token: String,
    pub kind: String,
    pub source_account: String,
    pub created_at: DateTime<Utc>,
    pub transaction_hash: String,
    pub successful: bool,
}

impl OperationEntry {
    pub fn from_record(record: &OperationRecord) -> Result<Self, ViewerError> {
        Ok(Self {
            id: record.id.clone(),
            paging_token: record.paging_token.clone(),
            kind: record.kind.clone(),
            source_account: record.source_account.clone(),
            created_at: parse_timestamp(&record.created_at)?,
            transaction_hash: record.transaction_hash.clone(),
            successful: record.transaction_successful.unwrap_or(true),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimableBalance {
    pub id: ClaimableBalanceId,
    pub asset: Asset,
    pub amount: Amount,
    pub sponsor: Option<String>,
    /// Predicate that applies to the viewed account
    pub predicate: ClaimPredicate,
    pub last_modified: Option<DateTime<Utc>>,
}

impl ClaimableBalance {
    pub fn from_record(
        record: &ClaimableBalanceRecord,
        claimant: &PublicKey,
    ) -> Result<Self, ViewerError> {
        let me = claimant.account_id();
        let entry = record
            .claimants
            .iter()
            .find(|c| c.destination == me)
            .ok_or_else(|| {
                ViewerError::Network(format!("balance {} does not list {}", record.id, me))
            })?;

        Ok(Self {
            id: ClaimableBalanceId::from_hex(&record.id)?,
            asset: Asset::from_canonical(&record.asset)?,
            amount: record.amount.parse()?,
            sponsor: record.sponsor.clone(),
            predicate: predicate_from_record(&entry.predicate)?,
            last_modified: record
                .last_modified_time
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
        })
    }

    /// Whether the predicate allows claiming at `now` (unix seconds)
    pub fn is_claimable_at(&self, now: i64) -> bool {
        let created = self.last_modified.map(|t| t.timestamp()).unwrap_or(now);
        self.predicate.is_satisfied(now, created)
    }
}

pub fn predicate_from_record(record: &PredicateRecord) -> Result<ClaimPredicate, ViewerError> {
    let invalid = || ViewerError::Network("invalid claim predicate".to_string());

    if record.unconditional == Some(true) {
        return Ok(ClaimPredicate::Unconditional);
    }
    if let Some(parts) = record.and.as_ref().or(record.or.as_ref()) {
        let [a, b] = parts.as_slice() else {
            return Err(invalid());
        };
        let a = Box::new(predicate_from_record(a)?);
        let b = Box::new(predicate_from_record(b)?);
        return Ok(if record.and.is_some() {
            ClaimPredicate::And(a, b)
        } else {
            ClaimPredicate::Or(a, b)
        });
    }
    if let Some(inner) = &record.not {
        return Ok(ClaimPredicate::Not(Box::new(predicate_from_record(inner)?)));
    }
    if let Some(epoch) = &record.abs_before_epoch {
        return epoch
            .parse()
            .map(ClaimPredicate::BeforeAbsoluteTime)
            .map_err(|_| invalid());
    }
    if let Some(abs) = &record.abs_before {
        return Ok(ClaimPredicate::BeforeAbsoluteTime(parse_timestamp(abs)?.timestamp()));
    }
    if let Some(rel) = &record.rel_before {
        return rel
            .parse()
            .map(ClaimPredicate::BeforeRelativeTime)
            .map_err(|_| invalid());
    }
    Err(invalid())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Congestion {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeeStats {
    /// Fee of the last closed ledger, stroops per operation
    pub base_fee: u32,
    /// Fee the send form should default to and validate against
    pub recommended_fee: u32,
    pub capacity_usage: f64,
    pub congestion: Congestion,
}

impl Default for FeeStats {
    fn default() -> Self {
        Self {
            base_fee: BASE_FEE,
            recommended_fee: BASE_FEE,
            capacity_usage: 0.0,
            congestion: Congestion::Low,
        }
    }
}

impl FeeStats {
    pub fn from_response(response: &FeeStatsResponse) -> Result<Self, ViewerError> {
        let parse_u32 = |value: &str| -> Result<u32, ViewerError> {
            value
                .parse()
                .map_err(|_| ViewerError::Network(format!("invalid fee value '{}'", value)))
        };
        let base_fee = parse_u32(&response.last_ledger_base_fee)?;
        let mode = parse_u32(&response.fee_charged.mode)?;
        let capacity_usage: f64 = response.ledger_capacity_usage.parse().map_err(|_| {
            ViewerError::Network(format!(
                "invalid capacity usage '{}'",
                response.ledger_capacity_usage
            ))
        })?;

        let congestion = if capacity_usage > 0.75 {
            Congestion::High
        } else if capacity_usage > 0.5 {
            Congestion::Medium
        } else {
            Congestion::Low
        };

        Ok(Self {
            base_fee,
            recommended_fee: base_fee.max(mode).max(BASE_FEE),
            capacity_usage,
            congestion,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, ViewerError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ViewerError::Network(format!("invalid timestamp '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::horizon::types::{BalanceLine, FeeDistribution};
    use crate::keys::Keypair;

    fn account_response(id: &PublicKey, native: &str, subentries: u32) -> AccountResponse {
        AccountResponse {
            account_id: id.account_id(),
            sequence: "103720918407102567".to_string(),
            subentry_count: subentries,
            num_sponsoring: 0,
            num_sponsored: 0,
            thresholds: Thresholds::default(),
            flags: AccountFlags::default(),
            balances: vec![BalanceLine {
                balance: native.to_string(),
                asset_type: "native".to_string(),
                asset_code: None,
                asset_issuer: None,
                limit: None,
                buying_liabilities: Some("0.0000000".to_string()),
                selling_liabilities: Some("1.0000000".to_string()),
            }],
            signers: Vec::new(),
        }
    }

    #[test]
    fn test_available_balance_subtracts_reserve_and_liabilities() {
        let id = Keypair::from_seed_bytes([1u8; 32]).public_key();
        let info = AccountInfo::from_response(&account_response(&id, "100.0000000", 2)).unwrap();
        // 4 entries × 0.5 reserve = 2, plus 1 selling liability
        assert_eq!(info.native.reserve, Amount::from_units(2));
        assert_eq!(info.available_native(), Amount::from_units(97));
        assert_eq!(info.sequence, 103720918407102567);
        assert!(info.funded);
    }

    #[test]
    fn test_missing_native_line_is_an_error() {
        let id = Keypair::from_seed_bytes([1u8; 32]).public_key();
        let mut response = account_response(&id, "1", 0);
        response.balances.clear();
        assert!(AccountInfo::from_response(&response).is_err());
    }

    fn payment(kind: &str, from: &str, to: &str, amount: &str) -> PaymentRecord {
        PaymentRecord {
            id: "1".to_string(),
            paging_token: "1".to_string(),
            kind: kind.to_string(),
            created_at: "2024-01-02T03:04:05Z".to_string(),
            transaction_hash: "abc".to_string(),
            source_account: Some(from.to_string()),
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            amount: Some(amount.to_string()),
            asset_type: Some("native".to_string()),
            asset_code: None,
            asset_issuer: None,
            account: None,
            funder: None,
            starting_balance: None,
            into: None,
        }
    }

    #[test]
    fn test_history_direction_and_dust() {
        let me = Keypair::from_seed_bytes([1u8; 32]).public_key();
        let other = Keypair::from_seed_bytes([2u8; 32]).public_key().account_id();

        let entry = |from: &str, to: &str, amount: &str| {
            HistoryEntry::from_record(&payment("payment", from, to, amount), &me).unwrap()
        };
        let mine = me.account_id();

        let entries = vec![
            entry(&other, &mine, "0.0000100"),
            entry(&other, &mine, "0.5"),
            entry(&other, &mine, "0.5000001"),
            entry(&mine, &other, "0.0000001"),
        ];
        assert_eq!(entries[0].direction, Direction::Received);
        assert_eq!(entries[0].counterparty.as_deref(), Some(other.as_str()));
        assert_eq!(entries[3].direction, Direction::Sent);

        let kept = filter_dust(entries, Amount::from_stroops(5_000_000));
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].amount, Some(Amount::from_stroops(5_000_001)));
        assert_eq!(kept[1].direction, Direction::Sent);
    }

    #[test]
    fn test_predicate_from_json() {
        let json = r#"{"and":[{"not":{"abs_before":"2021-01-01T00:00:00Z"}},{"rel_before":"3600"}]}"#;
        let record: PredicateRecord = serde_json::from_str(json).unwrap();
        let predicate = predicate_from_record(&record).unwrap();
        assert_eq!(
            predicate,
            ClaimPredicate::And(
                Box::new(ClaimPredicate::Not(Box::new(ClaimPredicate::BeforeAbsoluteTime(
                    1_609_459_200
                )))),
                Box::new(ClaimPredicate::BeforeRelativeTime(3600)),
            )
        );

        let bad: PredicateRecord =
            serde_json::from_str(r#"{"and":[{"unconditional":true}]}"#).unwrap();
        assert!(predicate_from_record(&bad).is_err());
    }

    #[test]
    fn test_fee_stats_recommendation() {
        let response = FeeStatsResponse {
            last_ledger_base_fee: "100".to_string(),
            ledger_capacity_usage: "0.97".to_string(),
            fee_charged: FeeDistribution {
                min: "100".to_string(),
                mode: "250".to_string(),
                max: "5000".to_string(),
                p50: None,
                p90: None,
            },
            max_fee: None,
        };
        let stats = FeeStats::from_response(&response).unwrap();
        assert_eq!(stats.recommended_fee, 250);
        assert_eq!(stats.congestion, Congestion::High);
    }

    #[test]
    fn test_minimum_reserve_accounts_for_sponsorship() {
        assert_eq!(minimum_reserve(0, 0, 0), Amount::from_units(1));
        assert_eq!(minimum_reserve(3, 1, 0), Amount::from_stroops(30_000_000));
        assert_eq!(minimum_reserve(1, 0, 1), Amount::from_units(1));
    }
}
