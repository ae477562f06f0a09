/// In-memory ledger behind the mock server
///
/// Tests seed accounts, payments and directory entries through the builder
/// methods, then inspect what the client submitted.
use base64::{engine::general_purpose::STANDARD, Engine};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::types::*;

#[derive(Debug, Clone)]
pub struct Submission {
    /// Base64 envelope exactly as posted
    pub envelope_xdr: String,
    pub hash: String,
}

#[derive(Debug)]
struct LedgerState {
    accounts: HashMap<String, AccountJson>,
    payments: HashMap<String, Vec<PaymentJson>>,
    claimable: Vec<ClaimableBalanceJson>,
    fee_stats: FeeStatsJson,
    pending_rejection: Option<Problem>,
    submissions: Vec<Submission>,
    directory: Vec<DirectoryRecord>,
    directory_available: bool,
    directory_requests: usize,
    federation: HashMap<String, FederationJson>,
    next_ledger: u64,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self {
            accounts: HashMap::new(),
            payments: HashMap::new(),
            claimable: Vec::new(),
            fee_stats: FeeStatsJson::new(100, 100, 0.1),
            pending_rejection: None,
            submissions: Vec::new(),
            directory: Vec::new(),
            directory_available: true,
            directory_requests: 0,
            federation: HashMap::new(),
            next_ledger: 1000,
        }
    }
}

/// Cheap to clone; all clones share one ledger
#[derive(Debug, Clone, Default)]
pub struct MockLedger {
    inner: Arc<RwLock<LedgerState>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Funded account with a single native balance
    pub async fn add_account(&self, id: &str, balance: &str, sequence: i64) {
        let account = AccountJson {
            id: id.to_string(),
            account_id: id.to_string(),
            sequence: sequence.to_string(),
            subentry_count: 0,
            num_sponsoring: 0,
            num_sponsored: 0,
            thresholds: ThresholdsJson {
                low_threshold: 0,
                med_threshold: 0,
                high_threshold: 0,
            },
            flags: serde_json::json!({
                "auth_required": false,
                "auth_revocable": false,
                "auth_immutable": false,
                "auth_clawback_enabled": false
            }),
            balances: vec![BalanceJson {
                balance: balance.to_string(),
                asset_type: "native".to_string(),
                asset_code: None,
                asset_issuer: None,
                limit: None,
                buying_liabilities: "0.0000000".to_string(),
                selling_liabilities: "0.0000000".to_string(),
            }],
            signers: vec![SignerJson {
                key: id.to_string(),
                weight: 1,
                kind: "ed25519_public_key".to_string(),
            }],
        };
        self.inner
            .write()
            .await
            .accounts
            .insert(id.to_string(), account);
    }

    /// Adds a credit trustline and bumps the subentry count
    pub async fn add_trustline(&self, id: &str, code: &str, issuer: &str, balance: &str) {
        let mut state = self.inner.write().await;
        if let Some(account) = state.accounts.get_mut(id) {
            let asset_type = if code.len() <= 4 {
                "credit_alphanum4"
            } else {
                "credit_alphanum12"
            };
            account.balances.insert(
                0,
                BalanceJson {
                    balance: balance.to_string(),
                    asset_type: asset_type.to_string(),
                    asset_code: Some(code.to_string()),
                    asset_issuer: Some(issuer.to_string()),
                    limit: Some("922337203685.4775807".to_string()),
                    buying_liabilities: "0.0000000".to_string(),
                    selling_liabilities: "0.0000000".to_string(),
                },
            );
            account.subentry_count += 1;
        }
    }

    /// Records the payment in both parties' histories
    pub async fn add_payment(&self, payment: PaymentJson) {
        let mut state = self.inner.write().await;
        let parties: Vec<String> = [payment.from.clone(), payment.to.clone()]
            .into_iter()
            .flatten()
            .collect();
        for party in parties {
            let history = state.payments.entry(party.clone()).or_default();
            if !history.iter().any(|p| p.id == payment.id) {
                history.push(payment.clone());
            }
        }
    }

    pub async fn set_fee_stats(&self, base_fee: u32, mode: u32, capacity_usage: f64) {
        self.inner.write().await.fee_stats = FeeStatsJson::new(base_fee, mode, capacity_usage);
    }

    pub async fn add_claimable_balance(&self, balance: ClaimableBalanceJson) {
        self.inner.write().await.claimable.push(balance);
    }

    /// The next POST /transactions fails with these result codes
    pub async fn reject_next_submission(&self, title: &str, tx_code: &str, op_codes: &[&str]) {
        self.inner.write().await.pending_rejection = Some(Problem {
            kind: "https://stellar.org/horizon-errors/transaction_failed".to_string(),
            title: title.to_string(),
            status: 400,
            detail: "The transaction failed when submitted to the ledger.".to_string(),
            extras: Some(ProblemExtras {
                result_codes: ResultCodes {
                    transaction: tx_code.to_string(),
                    operations: op_codes.iter().map(|c| c.to_string()).collect(),
                },
            }),
        });
    }

    pub async fn submissions(&self) -> Vec<Submission> {
        self.inner.read().await.submissions.clone()
    }

    pub async fn add_directory_entry(&self, address: &str, name: &str, tags: &[&str]) {
        self.inner.write().await.directory.push(DirectoryRecord {
            address: address.to_string(),
            name: Some(name.to_string()),
            domain: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        });
    }

    /// While unavailable the directory endpoint answers 503
    pub async fn set_directory_available(&self, available: bool) {
        self.inner.write().await.directory_available = available;
    }

    pub async fn directory_requests(&self) -> usize {
        self.inner.read().await.directory_requests
    }

    pub async fn add_federation(
        &self,
        address: &str,
        account_id: &str,
        memo: Option<(&str, &str)>,
    ) {
        let record = FederationJson {
            stellar_address: address.to_string(),
            account_id: account_id.to_string(),
            memo_type: memo.map(|(kind, _)| kind.to_string()),
            memo: memo.map(|(_, value)| value.to_string()),
        };
        self.inner
            .write()
            .await
            .federation
            .insert(address.to_string(), record);
    }

    pub(crate) async fn account(&self, id: &str) -> Option<AccountJson> {
        self.inner.read().await.accounts.get(id).cloned()
    }

    /// Newest first, strictly older than `cursor`
    pub(crate) async fn payments_page(
        &self,
        id: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Option<Vec<PaymentJson>> {
        let state = self.inner.read().await;
        if !state.accounts.contains_key(id) && !state.payments.contains_key(id) {
            return None;
        }
        let before = cursor.and_then(|c| c.parse::<u64>().ok());
        let mut records: Vec<PaymentJson> = state
            .payments
            .get(id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|p| match (before, p.paging_token.parse::<u64>()) {
                (Some(before), Ok(token)) => token < before,
                _ => true,
            })
            .collect();
        records.sort_by_key(|p| std::cmp::Reverse(p.paging_token.parse::<u64>().unwrap_or(0)));
        records.truncate(limit);
        Some(records)
    }

    pub(crate) async fn claimable_for(
        &self,
        claimant: &str,
        limit: usize,
    ) -> Vec<ClaimableBalanceJson> {
        self.inner
            .read()
            .await
            .claimable
            .iter()
            .filter(|b| b.claimants.iter().any(|c| c.destination == claimant))
            .take(limit)
            .cloned()
            .collect()
    }

    pub(crate) async fn fee_stats(&self) -> FeeStatsJson {
        self.inner.read().await.fee_stats.clone()
    }

    /// Accepts the envelope unless a rejection is queued
    pub(crate) async fn submit(&self, envelope_xdr: &str) -> Result<SubmitResponse, Problem> {
        let bytes = STANDARD.decode(envelope_xdr.trim()).map_err(|e| Problem {
            kind: "https://stellar.org/horizon-errors/transaction_malformed".to_string(),
            title: "Transaction Malformed".to_string(),
            status: 400,
            detail: format!("tx is not valid base64: {}", e),
            extras: None,
        })?;

        let mut state = self.inner.write().await;
        if let Some(problem) = state.pending_rejection.take() {
            return Err(problem);
        }

        let hash = hex::encode(Sha256::digest(&bytes));
        let ledger = state.next_ledger;
        state.next_ledger += 1;
        state.submissions.push(Submission {
            envelope_xdr: envelope_xdr.to_string(),
            hash: hash.clone(),
        });

        Ok(SubmitResponse {
            hash,
            ledger,
            successful: true,
            envelope_xdr: envelope_xdr.to_string(),
        })
    }

    /// `None` while the directory is unavailable
    pub(crate) async fn directory(
        &self,
        tags: &[String],
        limit: usize,
    ) -> Option<Vec<DirectoryRecord>> {
        let mut state = self.inner.write().await;
        state.directory_requests += 1;
        if !state.directory_available {
            return None;
        }
        Some(
            state
                .directory
                .iter()
                .filter(|entry| tags.is_empty() || entry.tags.iter().any(|t| tags.contains(t)))
                .take(limit)
                .cloned()
                .collect(),
        )
    }

    pub(crate) async fn federation(&self, address: &str) -> Option<FederationJson> {
        self.inner.read().await.federation.get(address).cloned()
    }
}
