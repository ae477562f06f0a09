//! Horizon API response shapes
//!
//! Field names match the JSON the API returns. Only the fields the viewer
//! reads are declared; everything else is ignored on deserialization.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub account_id: String,
    /// int64 sent as a string
    pub sequence: String,
    #[serde(default)]
    pub subentry_count: u32,
    #[serde(default)]
    pub num_sponsoring: u32,
    #[serde(default)]
    pub num_sponsored: u32,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub flags: AccountFlags,
    #[serde(default)]
    pub balances: Vec<BalanceLine>,
    #[serde(default)]
    pub signers: Vec<SignerResponse>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub low_threshold: u8,
    pub med_threshold: u8,
    pub high_threshold: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountFlags {
    #[serde(default)]
    pub auth_required: bool,
    #[serde(default)]
    pub auth_revocable: bool,
    #[serde(default)]
    pub auth_immutable: bool,
    #[serde(default)]
    pub auth_clawback_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceLine {
    pub balance: String,
    pub asset_type: String,
    #[serde(default)]
    pub asset_code: Option<String>,
    #[serde(default)]
    pub asset_issuer: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
    #[serde(default)]
    pub buying_liabilities: Option<String>,
    #[serde(default)]
    pub selling_liabilities: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerResponse {
    pub key: String,
    pub weight: u32,
    #[serde(rename = "type")]
    pub kind: String,
}

/// `{ "_embedded": { "records": [...] } }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection<T> {
    #[serde(rename = "_embedded")]
    pub embedded: Embedded<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedded<T> {
    pub records: Vec<T>,
}

/// Payment-like operation record (`/accounts/{id}/payments`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    pub paging_token: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: String,
    pub transaction_hash: String,
    #[serde(default)]
    pub source_account: Option<String>,
    // payment, path payments
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub asset_type: Option<String>,
    #[serde(default)]
    pub asset_code: Option<String>,
    #[serde(default)]
    pub asset_issuer: Option<String>,
    // create_account
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub funder: Option<String>,
    #[serde(default)]
    pub starting_balance: Option<String>,
    // account_merge
    #[serde(default)]
    pub into: Option<String>,
}

/// Generic operation record (`/accounts/{id}/operations`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRecord {
    pub id: String,
    pub paging_token: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: String,
    pub transaction_hash: String,
    pub source_account: String,
    #[serde(default)]
    pub transaction_successful: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimableBalanceRecord {
    pub id: String,
    pub asset: String,
    pub amount: String,
    #[serde(default)]
    pub sponsor: Option<String>,
    #[serde(default)]
    pub last_modified_time: Option<String>,
    pub claimants: Vec<ClaimantRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimantRecord {
    pub destination: String,
    pub predicate: PredicateRecord,
}

/// JSON claim predicate; exactly one field is set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredicateRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unconditional: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub and: Option<Vec<PredicateRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub or: Option<Vec<PredicateRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<PredicateRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abs_before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abs_before_epoch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel_before: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeStatsResponse {
    pub last_ledger_base_fee: String,
    pub ledger_capacity_usage: String,
    pub fee_charged: FeeDistribution,
    #[serde(default)]
    pub max_fee: Option<FeeDistribution>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeDistribution {
    pub min: String,
    pub mode: String,
    pub max: String,
    #[serde(default)]
    pub p50: Option<String>,
    #[serde(default)]
    pub p90: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub hash: String,
    #[serde(default)]
    pub ledger: Option<u64>,
    #[serde(default)]
    pub successful: Option<bool>,
}

/// RFC 7807 problem document returned on errors
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Problem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub extras: Option<ProblemExtras>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProblemExtras {
    #[serde(default)]
    pub result_codes: Option<ResultCodes>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultCodes {
    #[serde(default)]
    pub transaction: Option<String>,
    #[serde(default)]
    pub operations: Vec<String>,
}

impl ResultCodes {
    pub fn flatten(&self) -> Vec<String> {
        self.transaction
            .iter()
            .cloned()
            .chain(self.operations.iter().cloned())
            .collect()
    }
}
