/// Horizon API request and response types
///
/// Shapes follow the public Horizon JSON so the viewer's client can consume
/// them unchanged. Amounts are decimal strings with seven places.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceJson {
    pub balance: String,
    pub asset_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    pub buying_liabilities: String,
    pub selling_liabilities: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerJson {
    pub key: String,
    pub weight: u32,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdsJson {
    pub low_threshold: u8,
    pub med_threshold: u8,
    pub high_threshold: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountJson {
    pub id: String,
    pub account_id: String,
    pub sequence: String,
    pub subentry_count: u32,
    pub num_sponsoring: u32,
    pub num_sponsored: u32,
    pub thresholds: ThresholdsJson,
    pub flags: serde_json::Value,
    pub balances: Vec<BalanceJson>,
    pub signers: Vec<SignerJson>,
}

/// `{ "_embedded": { "records": [...] } }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionJson<T> {
    #[serde(rename = "_embedded")]
    pub embedded: EmbeddedJson<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedJson<T> {
    pub records: Vec<T>,
}

impl<T> CollectionJson<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self {
            embedded: EmbeddedJson { records },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeDistributionJson {
    pub min: String,
    pub mode: String,
    pub max: String,
    pub p50: String,
    pub p90: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeStatsJson {
    pub last_ledger: String,
    pub last_ledger_base_fee: String,
    pub ledger_capacity_usage: String,
    pub fee_charged: FeeDistributionJson,
    pub max_fee: FeeDistributionJson,
}

impl FeeStatsJson {
    pub fn new(base_fee: u32, mode: u32, capacity_usage: f64) -> Self {
        let distribution = FeeDistributionJson {
            min: base_fee.to_string(),
            mode: mode.to_string(),
            max: mode.max(base_fee).to_string(),
            p50: mode.to_string(),
            p90: mode.to_string(),
        };
        Self {
            last_ledger: "1".to_string(),
            last_ledger_base_fee: base_fee.to_string(),
            ledger_capacity_usage: format!("{:.2}", capacity_usage),
            fee_charged: distribution.clone(),
            max_fee: distribution,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitForm {
    pub tx: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub hash: String,
    pub ledger: u64,
    pub successful: bool,
    pub envelope_xdr: String,
}

/// RFC 7807 problem document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extras: Option<ProblemExtras>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemExtras {
    pub result_codes: ResultCodes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultCodes {
    pub transaction: String,
    #[serde(default)]
    pub operations: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<usize>,
    pub cursor: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClaimantQuery {
    pub claimant: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct FederationQuery {
    pub q: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederationJson {
    pub stellar_address: String,
    pub account_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryRecord {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub tags: Vec<String>,
}

/// Payment-like operation as served by `/accounts/:id/payments`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentJson {
    pub id: String,
    pub paging_token: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: String,
    pub transaction_hash: String,
    pub source_account: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starting_balance: Option<String>,
}

impl PaymentJson {
    /// Native payment `from -> to`
    pub fn native(id: u64, from: &str, to: &str, amount: &str, created_at: &str) -> Self {
        Self {
            id: id.to_string(),
            paging_token: id.to_string(),
            kind: "payment".to_string(),
            created_at: created_at.to_string(),
            transaction_hash: format!("{:064x}", id),
            source_account: from.to_string(),
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            amount: Some(amount.to_string()),
            asset_type: Some("native".to_string()),
            account: None,
            funder: None,
            starting_balance: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationJson {
    pub id: String,
    pub paging_token: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: String,
    pub transaction_hash: String,
    pub source_account: String,
    pub transaction_successful: bool,
}

impl From<&PaymentJson> for OperationJson {
    fn from(payment: &PaymentJson) -> Self {
        Self {
            id: payment.id.clone(),
            paging_token: payment.paging_token.clone(),
            kind: payment.kind.clone(),
            created_at: payment.created_at.clone(),
            transaction_hash: payment.transaction_hash.clone(),
            source_account: payment.source_account.clone(),
            transaction_successful: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimantJson {
    pub destination: String,
    /// Horizon predicate object, e.g. `{"unconditional": true}`
    pub predicate: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimableBalanceJson {
    /// `00000000` followed by the 32-byte balance hash in hex
    pub id: String,
    /// `native` or `CODE:ISSUER`
    pub asset: String,
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sponsor: Option<String>,
    pub last_modified_time: String,
    pub claimants: Vec<ClaimantJson>,
}
