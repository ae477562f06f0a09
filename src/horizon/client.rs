use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::types::{
    AccountResponse, ClaimableBalanceRecord, Collection, FeeStatsResponse, OperationRecord,
    PaymentRecord, Problem, SubmitResponse,
};
use super::view::{
    AccountInfo, ClaimableBalance, FeeStats, HistoryEntry, OperationEntry, Page,
    HISTORY_PAGE_SIZE,
};
use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::keys::PublicKey;
use crate::xdr::TransactionEnvelope;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResult {
    pub hash: String,
    pub ledger: Option<u64>,
}

/// Read and submit access to the ledger
///
/// Implementations hold no state besides their connection settings and never
/// retry; a failed call is reported to the caller as is.
#[async_trait]
pub trait LedgerApi: Send + Sync {
    /// Load an account. An id that is not on the ledger yields an unfunded account.
    async fn account(&self, id: &PublicKey) -> Result<AccountInfo, ViewerError>;

    async fn claimable_balances(
        &self,
        claimant: &PublicKey,
        limit: u32,
    ) -> Result<Vec<ClaimableBalance>, ViewerError>;

    /// Payment-like operations, newest first
    async fn payments(
        &self,
        id: &PublicKey,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<Page<HistoryEntry>, ViewerError>;

    /// All operations, newest first
    async fn operations(
        &self,
        id: &PublicKey,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<Page<OperationEntry>, ViewerError>;

    async fn fee_stats(&self) -> Result<FeeStats, ViewerError>;

    async fn submit(&self, envelope: &TransactionEnvelope) -> Result<SubmitResult, ViewerError>;

    async fn account_exists(&self, id: &PublicKey) -> Result<bool, ViewerError> {
        Ok(self.account(id).await?.funded)
    }
}

/// Horizon HTTP client
#[derive(Clone)]
pub struct HorizonClient {
    client: reqwest::Client,
    base_url: String,
}

impl HorizonClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::new(&config.horizon_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ViewerError> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("GET {} {:?}", url, query);

        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            let problem: Problem = response.json().await.unwrap_or_default();
            return Err(ViewerError::Horizon {
                status: status.as_u16(),
                detail: problem
                    .detail
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| non_empty_or(problem.title, status.to_string())),
            });
        }

        Ok(response.json::<T>().await?)
    }

    fn page_query(cursor: Option<&str>, limit: u32) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("limit", limit.clamp(1, HISTORY_PAGE_SIZE).to_string()),
            ("order", "desc".to_string()),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        query
    }
}

fn non_empty_or(value: String, fallback: String) -> String {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

fn next_cursor<T>(records: &[T], token: impl Fn(&T) -> &str) -> Option<String> {
    records.last().map(|r| token(r).to_string())
}

#[async_trait]
impl LedgerApi for HorizonClient {
    async fn account(&self, id: &PublicKey) -> Result<AccountInfo, ViewerError> {
        match self
            .get_json::<AccountResponse>(&format!("/accounts/{}", id), &[])
            .await
        {
            Ok(response) => AccountInfo::from_response(&response),
            Err(e) if e.is_not_found() => {
                log::debug!("Account {} is not funded", id);
                Ok(AccountInfo::unfunded(*id))
            }
            Err(e) => Err(e),
        }
    }

    async fn claimable_balances(
        &self,
        claimant: &PublicKey,
        limit: u32,
    ) -> Result<Vec<ClaimableBalance>, ViewerError> {
        let query = [
            ("claimant", claimant.account_id()),
            ("limit", limit.clamp(1, HISTORY_PAGE_SIZE).to_string()),
            ("order", "desc".to_string()),
        ];
        let collection: Collection<ClaimableBalanceRecord> =
            self.get_json("/claimable_balances", &query).await?;

        collection
            .embedded
            .records
            .iter()
            .map(|record| ClaimableBalance::from_record(record, claimant))
            .collect()
    }

    async fn payments(
        &self,
        id: &PublicKey,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<Page<HistoryEntry>, ViewerError> {
        let result: Result<Collection<PaymentRecord>, _> = self
            .get_json(
                &format!("/accounts/{}/payments", id),
                &Self::page_query(cursor, limit),
            )
            .await;
        let records = match result {
            Ok(collection) => collection.embedded.records,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e),
        };

        let entries = records
            .iter()
            .map(|record| HistoryEntry::from_record(record, id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page {
            next_cursor: next_cursor(&entries, |e| &e.paging_token),
            records: entries,
        })
    }

    async fn operations(
        &self,
        id: &PublicKey,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<Page<OperationEntry>, ViewerError> {
        let result: Result<Collection<OperationRecord>, _> = self
            .get_json(
                &format!("/accounts/{}/operations", id),
                &Self::page_query(cursor, limit),
            )
            .await;
        let records = match result {
            Ok(collection) => collection.embedded.records,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e),
        };

        let entries = records
            .iter()
            .map(OperationEntry::from_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page {
            next_cursor: next_cursor(&entries, |e| &e.paging_token),
            records: entries,
        })
    }

    async fn fee_stats(&self) -> Result<FeeStats, ViewerError> {
        let response: FeeStatsResponse = self.get_json("/fee_stats", &[]).await?;
        FeeStats::from_response(&response)
    }

    async fn submit(&self, envelope: &TransactionEnvelope) -> Result<SubmitResult, ViewerError> {
        let url = format!("{}/transactions", self.base_url);
        log::info!(
            "Submitting transaction from {} (seq {})",
            envelope.tx.source,
            envelope.tx.sequence
        );

        let response = self
            .client
            .post(&url)
            .form(&[("tx", envelope.to_base64())])
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let problem: Problem = response.json().await.unwrap_or_default();
            let codes = problem
                .extras
                .as_ref()
                .and_then(|extras| extras.result_codes.as_ref())
                .map(|codes| codes.flatten())
                .unwrap_or_default();
            let message = if codes.is_empty() {
                problem.detail.filter(|d| !d.is_empty()).unwrap_or(problem.title)
            } else {
                problem.title
            };
            log::warn!("Transaction rejected ({}): {} {:?}", status, message, codes);
            return Err(ViewerError::submission(
                non_empty_or(message, format!("Submission failed with status {}", status)),
                codes,
            ));
        }

        let body: SubmitResponse = response.json().await?;
        log::info!("Transaction accepted: {}", body.hash);
        Ok(SubmitResult {
            hash: body.hash,
            ledger: body.ledger,
        })
    }
}
