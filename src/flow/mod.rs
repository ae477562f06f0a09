//! Transaction flow controller
//!
//! A flow walks `Create -> Confirm -> Success | Error`. Field edits only
//! happen in `Create`; `Confirm` is only reached with a validated draft and a
//! built, unsigned envelope. Results of async lookups carry a
//! [`RequestTicket`] and are dropped when the flow or the field has moved on.

pub mod claim;
pub mod send;

use std::collections::BTreeMap;
use std::fmt;

use crate::amount::Amount;
use crate::horizon::FeeStats;
use crate::xdr::TransactionEnvelope;

pub use claim::{ClaimDraft, ClaimFlow};
pub use send::{DestinationCheck, DestinationStatus, SendDraft, SendEdit, SendFlow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowStage {
    #[default]
    Create,
    Confirm,
    Success,
    Error,
}

/// Identifies the flow instance and field revision an async request was started for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    pub flow_id: u64,
    pub revision: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Destination,
    Amount,
    Memo,
    Fee,
    /// The claimable balance picked in a claim flow
    Balance,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Destination => "destination",
            Field::Amount => "amount",
            Field::Memo => "memo",
            Field::Fee => "fee",
            Field::Balance => "balance",
        };
        f.write_str(name)
    }
}

/// Validation messages keyed by field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the first message per field
    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn clear(&mut self, field: Field) {
        self.0.remove(&field);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    Success { hash: String },
    Error { message: String },
}

/// State shared by the send and claim flows: stage, fee, built envelope and
/// submission result
#[derive(Debug, Clone, PartialEq)]
pub struct FlowCore {
    flow_id: u64,
    stage: FlowStage,
    errors: FieldErrors,
    fee: String,
    fee_edited: bool,
    fee_revision: u64,
    fee_stats: FeeStats,
    transaction: Option<TransactionEnvelope>,
    submitting: bool,
    outcome: Option<FlowOutcome>,
}

impl FlowCore {
    pub fn new(flow_id: u64, fee_stats: FeeStats) -> Self {
        Self {
            flow_id,
            stage: FlowStage::Create,
            errors: FieldErrors::new(),
            fee: fee_text(fee_stats.recommended_fee),
            fee_edited: false,
            fee_revision: 0,
            fee_stats,
            transaction: None,
            submitting: false,
            outcome: None,
        }
    }

    pub fn flow_id(&self) -> u64 {
        self.flow_id
    }

    pub fn stage(&self) -> FlowStage {
        self.stage
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Fee per operation as typed, in native units
    pub fn fee(&self) -> &str {
        &self.fee
    }

    pub fn fee_stats(&self) -> &FeeStats {
        &self.fee_stats
    }

    pub fn recommended_fee(&self) -> u32 {
        self.fee_stats.recommended_fee
    }

    pub fn transaction(&self) -> Option<&TransactionEnvelope> {
        self.transaction.as_ref()
    }

    pub fn outcome(&self) -> Option<&FlowOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub(crate) fn is_editable(&self) -> bool {
        self.stage == FlowStage::Create
    }

    pub fn fee_ticket(&self) -> RequestTicket {
        RequestTicket {
            flow_id: self.flow_id,
            revision: self.fee_revision,
        }
    }

    pub(crate) fn edit_fee(&mut self, fee: String) {
        self.fee = fee;
        self.fee_edited = true;
        self.fee_revision += 1;
        self.errors.clear(Field::Fee);
    }

    /// Record fresh fee stats. The recommended minimum always updates; the
    /// fee field is only filled in if the user has not typed one.
    pub fn apply_fee_stats(&mut self, ticket: RequestTicket, stats: FeeStats) -> bool {
        if ticket.flow_id != self.flow_id {
            log::debug!("Dropping fee stats for closed flow {}", ticket.flow_id);
            return false;
        }
        if !self.fee_edited && ticket.revision == self.fee_revision {
            self.fee = fee_text(stats.recommended_fee);
        }
        self.fee_stats = stats;
        true
    }

    /// Parse the fee field against the latest recommended minimum
    pub(crate) fn validate_fee(&self, errors: &mut FieldErrors) -> Option<u32> {
        let minimum = self.recommended_fee();
        let fee: Amount = match self.fee.parse() {
            Ok(fee) => fee,
            Err(_) => {
                errors.insert(Field::Fee, "Enter a valid fee");
                return None;
            }
        };
        let stroops = match u32::try_from(fee.stroops()) {
            Ok(stroops) => stroops,
            Err(_) => {
                errors.insert(Field::Fee, "Fee is out of range");
                return None;
            }
        };
        if stroops < minimum {
            errors.insert(
                Field::Fee,
                format!(
                    "Fee must be at least {} ({} stroops)",
                    fee_text(minimum),
                    minimum
                ),
            );
            return None;
        }
        Some(stroops)
    }

    pub(crate) fn fail_validation(&mut self, errors: FieldErrors) {
        self.errors = errors;
    }

    pub(crate) fn enter_confirm(&mut self, envelope: TransactionEnvelope) {
        self.errors = FieldErrors::new();
        self.transaction = Some(envelope);
        self.stage = FlowStage::Confirm;
    }

    /// Mark the flow as submitting and hand out the envelope to sign
    pub(crate) fn begin_submit(&mut self, allowed: bool) -> Option<TransactionEnvelope> {
        if !allowed || self.stage != FlowStage::Confirm || self.submitting {
            return None;
        }
        let envelope = self.transaction.clone()?;
        self.submitting = true;
        Some(envelope)
    }

    pub fn finish_submit(&mut self, flow_id: u64, result: Result<String, String>) -> bool {
        if flow_id != self.flow_id || !self.submitting {
            return false;
        }
        self.submitting = false;
        match result {
            Ok(hash) => {
                self.stage = FlowStage::Success;
                self.outcome = Some(FlowOutcome::Success { hash });
            }
            Err(message) => {
                self.stage = FlowStage::Error;
                self.outcome = Some(FlowOutcome::Error { message });
            }
        }
        true
    }

    /// Back to `Create` from `Confirm` or `Error`, keeping the draft
    pub fn back(&mut self) -> bool {
        if self.submitting || !matches!(self.stage, FlowStage::Confirm | FlowStage::Error) {
            return false;
        }
        self.stage = FlowStage::Create;
        self.transaction = None;
        self.outcome = None;
        true
    }
}

/// Fee in native units for the form, e.g. 100 stroops -> "0.00001"
pub fn fee_text(stroops: u32) -> String {
    Amount::from_stroops(stroops as i64).to_trimmed_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::horizon::Congestion;

    fn stats(recommended: u32) -> FeeStats {
        FeeStats {
            base_fee: 100,
            recommended_fee: recommended,
            capacity_usage: 0.9,
            congestion: Congestion::High,
        }
    }

    #[test]
    fn test_fee_stats_do_not_overwrite_edited_fee() {
        let mut core = FlowCore::new(1, FeeStats::default());
        assert_eq!(core.fee(), "0.00001");

        let ticket = core.fee_ticket();
        core.edit_fee("0.0001".to_string());
        assert!(core.apply_fee_stats(ticket, stats(500)));

        assert_eq!(core.fee(), "0.0001");
        assert_eq!(core.recommended_fee(), 500);
    }

    #[test]
    fn test_fee_stats_fill_untouched_fee() {
        let mut core = FlowCore::new(1, FeeStats::default());
        let ticket = core.fee_ticket();
        assert!(core.apply_fee_stats(ticket, stats(300)));
        assert_eq!(core.fee(), "0.00003");
    }

    #[test]
    fn test_fee_stats_for_other_flow_are_dropped() {
        let mut core = FlowCore::new(2, FeeStats::default());
        let stale = RequestTicket {
            flow_id: 1,
            revision: 0,
        };
        assert!(!core.apply_fee_stats(stale, stats(900)));
        assert_eq!(core.recommended_fee(), 100);
    }

    #[test]
    fn test_fee_validation_against_recommended() {
        let mut core = FlowCore::new(1, stats(200));
        let mut errors = FieldErrors::new();
        assert_eq!(core.validate_fee(&mut errors), Some(200));

        core.edit_fee("0.00001".to_string());
        let mut errors = FieldErrors::new();
        assert_eq!(core.validate_fee(&mut errors), None);
        assert!(errors.get(Field::Fee).unwrap().contains("at least"));
    }

    #[test]
    fn test_field_errors_keep_first_message() {
        let mut errors = FieldErrors::new();
        errors.insert(Field::Amount, "first");
        errors.insert(Field::Amount, "second");
        assert_eq!(errors.get(Field::Amount), Some("first"));
    }
}
