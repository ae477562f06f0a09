//! Send payment flow

use crate::amount::Amount;
use crate::directory::KnownAccounts;
use crate::horizon::{AccountInfo, FeeStats, MIN_ACCOUNT_BALANCE};
use crate::keys::{is_federation_address, PublicKey};
use crate::memo::{Memo, MemoKind};
use crate::transaction::{TransactionBuilder, DEFAULT_TIMEOUT_SECS};
use crate::xdr::{Asset, Operation, OperationBody, TransactionEnvelope};

use super::{Field, FieldErrors, FlowCore, FlowStage, RequestTicket};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DestinationStatus {
    /// Not looked up yet, or the destination changed since
    #[default]
    Unknown,
    Funded,
    Unfunded,
}

/// Fields as the user typed them, plus what lookups found out about the destination
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendDraft {
    pub destination: String,
    pub resolved_destination: Option<PublicKey>,
    pub amount: String,
    pub memo_kind: MemoKind,
    pub memo_content: String,
    pub destination_status: DestinationStatus,
    /// Tagged malicious or unsafe in the account directory
    pub destination_flagged: bool,
    pub destination_memo_required: bool,
    /// Why the last destination lookup failed
    pub destination_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendEdit {
    Destination(String),
    Amount(String),
    MemoKind(MemoKind),
    MemoContent(String),
    /// Fee per operation in native units
    Fee(String),
}

/// Result of looking up a destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationCheck {
    pub account: PublicKey,
    pub funded: bool,
    pub flagged: bool,
    pub memo_required: bool,
    /// Memo a federation server asked for
    pub memo: Memo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SendFlow {
    core: FlowCore,
    draft: SendDraft,
    destination_revision: u64,
    memo_edited: bool,
}

impl SendFlow {
    pub fn new(flow_id: u64, fee_stats: FeeStats) -> Self {
        Self {
            core: FlowCore::new(flow_id, fee_stats),
            draft: SendDraft::default(),
            destination_revision: 0,
            memo_edited: false,
        }
    }

    pub fn core(&self) -> &FlowCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut FlowCore {
        &mut self.core
    }

    pub fn draft(&self) -> &SendDraft {
        &self.draft
    }

    pub fn stage(&self) -> FlowStage {
        self.core.stage()
    }

    pub fn errors(&self) -> &FieldErrors {
        self.core.errors()
    }

    pub fn destination_ticket(&self) -> RequestTicket {
        RequestTicket {
            flow_id: self.core.flow_id(),
            revision: self.destination_revision,
        }
    }

    /// Apply a field edit. Ignored outside `Create`.
    pub fn edit(&mut self, edit: SendEdit) -> bool {
        if !self.core.is_editable() {
            return false;
        }

        match edit {
            SendEdit::Destination(destination) => {
                self.destination_revision += 1;
                self.draft.resolved_destination =
                    PublicKey::from_account_id(destination.trim()).ok();
                self.draft.destination = destination;
                self.draft.destination_status = DestinationStatus::Unknown;
                self.draft.destination_flagged = false;
                self.draft.destination_memo_required = false;
                self.draft.destination_error = None;
                self.core.errors.clear(Field::Destination);
            }
            SendEdit::Amount(amount) => {
                self.draft.amount = amount;
                self.core.errors.clear(Field::Amount);
            }
            SendEdit::MemoKind(kind) => {
                self.draft.memo_kind = kind;
                self.memo_edited = true;
                self.core.errors.clear(Field::Memo);
            }
            SendEdit::MemoContent(content) => {
                self.draft.memo_content = content;
                self.memo_edited = true;
                self.core.errors.clear(Field::Memo);
            }
            SendEdit::Fee(fee) => self.core.edit_fee(fee),
        }
        true
    }

    /// Store a destination lookup if the destination has not changed since `ticket`
    pub fn apply_destination(&mut self, ticket: RequestTicket, check: DestinationCheck) -> bool {
        if ticket != self.destination_ticket() {
            log::debug!("Dropping stale destination lookup {:?}", ticket);
            return false;
        }

        self.draft.resolved_destination = Some(check.account);
        self.draft.destination_status = if check.funded {
            DestinationStatus::Funded
        } else {
            DestinationStatus::Unfunded
        };
        self.draft.destination_flagged = check.flagged;
        self.draft.destination_memo_required = check.memo_required;
        self.draft.destination_error = None;

        if !check.memo.is_none() && !self.memo_edited {
            self.draft.memo_kind = check.memo.kind();
            self.draft.memo_content = check.memo.content();
        }
        self.core.errors.clear(Field::Destination);
        true
    }

    /// Record a failed lookup. A well-formed account id stays resolved; the
    /// lookup error is what validation reports until the destination is checked.
    pub fn apply_destination_error(&mut self, ticket: RequestTicket, message: String) -> bool {
        if ticket != self.destination_ticket() {
            return false;
        }
        self.draft.destination_status = DestinationStatus::Unknown;
        self.draft.destination_error = Some(message.clone());
        self.core.errors.insert(Field::Destination, message);
        true
    }

    /// Re-read the directory flags for the resolved destination
    pub fn apply_known_accounts(&mut self, known: &KnownAccounts) {
        if let Some(account) = self.draft.resolved_destination {
            let account_id = account.account_id();
            self.draft.destination_flagged = known.is_flagged(&account_id);
            self.draft.destination_memo_required = known.requires_memo(&account_id);
        }
    }

    /// Validate the draft and build the unsigned envelope; moves to `Confirm` on success
    pub fn continue_to_confirm(&mut self, account: &AccountInfo, now_secs: u64) -> bool {
        if !self.core.is_editable() {
            return false;
        }

        let (operation, memo, fee) = match self.build(account) {
            Ok(parts) => parts,
            Err(errors) => {
                self.core.fail_validation(errors);
                return false;
            }
        };

        let built = TransactionBuilder::new(account.public_key, account.sequence)
            .fee_per_operation(fee)
            .memo(memo)
            .operation(operation)
            .timeout(now_secs, DEFAULT_TIMEOUT_SECS)
            .build();
        match built {
            Ok(envelope) => {
                self.core.enter_confirm(envelope);
                true
            }
            Err(e) => {
                let mut errors = FieldErrors::new();
                errors.insert(Field::Amount, e.to_string());
                self.core.fail_validation(errors);
                false
            }
        }
    }

    /// Submission is refused while the destination is flagged
    pub fn can_submit(&self) -> bool {
        self.stage() == FlowStage::Confirm
            && self.core.transaction().is_some()
            && !self.draft.destination_flagged
            && !self.core.is_submitting()
    }

    pub(crate) fn begin_submit(&mut self) -> Option<TransactionEnvelope> {
        let allowed = self.can_submit();
        self.core.begin_submit(allowed)
    }

    pub fn back(&mut self) -> bool {
        self.core.back()
    }

    fn build(&self, account: &AccountInfo) -> Result<(Operation, Memo, u32), FieldErrors> {
        let mut errors = FieldErrors::new();
        let draft = &self.draft;

        let destination = self.validate_destination(account, &mut errors);
        let amount = validate_amount(&draft.amount, &mut errors);
        let fee = self.core.validate_fee(&mut errors);

        let memo = match Memo::parse(draft.memo_kind, &draft.memo_content) {
            Ok(memo) => Some(memo),
            Err(e) => {
                errors.insert(Field::Memo, memo_message(&e));
                None
            }
        };
        if draft.destination_memo_required && memo.as_ref().is_some_and(Memo::is_none) {
            errors.insert(Field::Memo, "The destination requires a memo");
        }

        if let Some(amount) = amount {
            if draft.destination_status == DestinationStatus::Unfunded
                && amount < MIN_ACCOUNT_BALANCE
            {
                errors.insert(
                    Field::Amount,
                    format!(
                        "Destination account is not funded; send at least {} to create it",
                        MIN_ACCOUNT_BALANCE.to_trimmed_string()
                    ),
                );
            }
            if let Some(fee) = fee {
                let total = amount.checked_add(Amount::from_stroops(fee as i64));
                let available = account.available_native();
                if total.map_or(true, |total| total > available) {
                    errors.insert(
                        Field::Amount,
                        format!(
                            "Insufficient balance: {} available",
                            available.to_trimmed_string()
                        ),
                    );
                }
            }
        }

        match (destination, amount, fee, memo) {
            (Some(destination), Some(amount), Some(fee), Some(memo)) if errors.is_empty() => {
                let body = match draft.destination_status {
                    DestinationStatus::Unfunded => OperationBody::CreateAccount {
                        destination,
                        starting_balance: amount,
                    },
                    _ => OperationBody::Payment {
                        destination,
                        asset: Asset::Native,
                        amount,
                    },
                };
                Ok((Operation::new(body), memo, fee))
            }
            _ => Err(errors),
        }
    }

    fn validate_destination(
        &self,
        account: &AccountInfo,
        errors: &mut FieldErrors,
    ) -> Option<PublicKey> {
        let draft = &self.draft;
        let typed = draft.destination.trim();

        if typed.is_empty() {
            errors.insert(Field::Destination, "Destination is required");
            return None;
        }
        let Some(resolved) = draft.resolved_destination else {
            let message = match &draft.destination_error {
                Some(message) => message.as_str(),
                None if is_federation_address(typed) => "Federation address could not be resolved",
                None => "Enter a valid account ID or federation address",
            };
            errors.insert(Field::Destination, message);
            return None;
        };
        if resolved == account.public_key {
            errors.insert(Field::Destination, "You cannot send to your own account");
            return None;
        }
        if draft.destination_status == DestinationStatus::Unknown {
            let message = draft
                .destination_error
                .as_deref()
                .unwrap_or("Destination account has not been checked");
            errors.insert(Field::Destination, message);
            return None;
        }
        Some(resolved)
    }
}

fn validate_amount(typed: &str, errors: &mut FieldErrors) -> Option<Amount> {
    if typed.trim().is_empty() {
        errors.insert(Field::Amount, "Amount is required");
        return None;
    }
    match typed.parse::<Amount>() {
        Ok(amount) if amount.is_positive() => Some(amount),
        Ok(_) => {
            errors.insert(Field::Amount, "Amount must be larger than 0");
            None
        }
        Err(_) => {
            errors.insert(
                Field::Amount,
                "Enter a valid amount with at most 7 decimal places",
            );
            None
        }
    }
}

fn memo_message(err: &crate::error::ViewerError) -> String {
    match err {
        crate::error::ViewerError::InvalidMemo(message) => {
            let mut chars = message.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::horizon::{Congestion, NativeBalance};
    use crate::keys::Keypair;

    fn sender() -> PublicKey {
        Keypair::from_seed_bytes([1u8; 32]).public_key()
    }

    fn receiver() -> PublicKey {
        Keypair::from_seed_bytes([2u8; 32]).public_key()
    }

    fn account_with(balance: i64) -> AccountInfo {
        let mut account = AccountInfo::unfunded(sender());
        account.funded = true;
        account.sequence = 100;
        account.native = NativeBalance {
            balance: Amount::from_units(balance),
            reserve: Amount::from_units(1),
            buying_liabilities: Amount::ZERO,
            selling_liabilities: Amount::ZERO,
        };
        account
    }

    fn checked_flow(funded: bool, flagged: bool, memo_required: bool) -> SendFlow {
        let mut flow = SendFlow::new(1, FeeStats::default());
        flow.edit(SendEdit::Destination(receiver().account_id()));
        let ticket = flow.destination_ticket();
        assert!(flow.apply_destination(
            ticket,
            DestinationCheck {
                account: receiver(),
                funded,
                flagged,
                memo_required,
                memo: Memo::None,
            }
        ));
        flow
    }

    #[test]
    fn test_amount_must_be_positive() {
        for amount in ["0", "-5", "0.0000000"] {
            let mut flow = checked_flow(true, false, false);
            flow.edit(SendEdit::Amount(amount.to_string()));
            assert!(!flow.continue_to_confirm(&account_with(100), 0));
            assert_eq!(flow.stage(), FlowStage::Create);
            assert!(flow
                .errors()
                .get(Field::Amount)
                .unwrap()
                .contains("must be larger than 0"));
        }
    }

    #[test]
    fn test_amount_above_available_is_insufficient() {
        let mut flow = checked_flow(true, false, false);
        // 10 units minus 1 unit reserve leaves 9 spendable; the fee tips it over
        flow.edit(SendEdit::Amount("9".to_string()));
        assert!(!flow.continue_to_confirm(&account_with(10), 0));
        assert!(flow
            .errors()
            .get(Field::Amount)
            .unwrap()
            .to_lowercase()
            .contains("insufficient balance"));

        flow.edit(SendEdit::Amount("8.9999".to_string()));
        assert!(flow.continue_to_confirm(&account_with(10), 0));
    }

    #[test]
    fn test_unfunded_destination_needs_minimum() {
        let mut flow = checked_flow(false, false, false);
        flow.edit(SendEdit::Amount("0.5".to_string()));
        assert!(!flow.continue_to_confirm(&account_with(100), 0));
        assert!(flow.errors().get(Field::Amount).is_some());

        flow.edit(SendEdit::Amount("1".to_string()));
        assert!(flow.continue_to_confirm(&account_with(100), 0));
        let envelope = flow.core().transaction().unwrap();
        assert!(matches!(
            envelope.tx.operations[0].body,
            OperationBody::CreateAccount { .. }
        ));
    }

    #[test]
    fn test_fee_below_recommended_is_rejected() {
        let mut flow = checked_flow(true, false, false);
        let ticket = flow.core().fee_ticket();
        flow.core_mut().apply_fee_stats(
            ticket,
            FeeStats {
                base_fee: 100,
                recommended_fee: 250,
                capacity_usage: 0.6,
                congestion: Congestion::Medium,
            },
        );
        flow.edit(SendEdit::Amount("1".to_string()));

        flow.edit(SendEdit::Fee("0.0000249".to_string()));
        assert!(!flow.continue_to_confirm(&account_with(100), 0));
        assert!(flow.errors().get(Field::Fee).is_some());

        flow.edit(SendEdit::Fee("0.000025".to_string()));
        assert!(flow.continue_to_confirm(&account_with(100), 0));
        assert_eq!(flow.core().transaction().unwrap().tx.fee, 250);
    }

    #[test]
    fn test_text_memo_survives_encoding() {
        let mut flow = checked_flow(true, false, false);
        flow.edit(SendEdit::Amount("1".to_string()));
        flow.edit(SendEdit::MemoKind(MemoKind::Text));
        flow.edit(SendEdit::MemoContent("hello".to_string()));
        assert!(flow.continue_to_confirm(&account_with(100), 1_000));

        let encoded = flow.core().transaction().unwrap().to_base64();
        let decoded = TransactionEnvelope::from_base64(&encoded).unwrap();
        assert_eq!(decoded.tx.memo, Memo::Text("hello".to_string()));
        assert_eq!(decoded.tx.sequence, 101);
    }

    #[test]
    fn test_memo_required_destination() {
        let mut flow = checked_flow(true, false, true);
        flow.edit(SendEdit::Amount("1".to_string()));
        assert!(!flow.continue_to_confirm(&account_with(100), 0));
        assert_eq!(
            flow.errors().get(Field::Memo),
            Some("The destination requires a memo")
        );

        flow.edit(SendEdit::MemoKind(MemoKind::Id));
        flow.edit(SendEdit::MemoContent("42".to_string()));
        assert!(flow.continue_to_confirm(&account_with(100), 0));
    }

    #[test]
    fn test_flagged_destination_blocks_submission() {
        let mut flow = checked_flow(true, true, false);
        flow.edit(SendEdit::Amount("1".to_string()));
        assert!(flow.continue_to_confirm(&account_with(100), 0));
        assert_eq!(flow.stage(), FlowStage::Confirm);
        assert!(!flow.can_submit());
        assert!(flow.begin_submit().is_none());
    }

    #[test]
    fn test_cannot_send_to_self() {
        let mut flow = SendFlow::new(1, FeeStats::default());
        flow.edit(SendEdit::Destination(sender().account_id()));
        flow.edit(SendEdit::Amount("1".to_string()));
        assert!(!flow.continue_to_confirm(&account_with(100), 0));
        assert_eq!(
            flow.errors().get(Field::Destination),
            Some("You cannot send to your own account")
        );
    }

    #[test]
    fn test_stale_destination_lookup_is_dropped() {
        let mut flow = SendFlow::new(1, FeeStats::default());
        flow.edit(SendEdit::Destination("alice*example.com".to_string()));
        let ticket = flow.destination_ticket();
        flow.edit(SendEdit::Destination(receiver().account_id()));

        let applied = flow.apply_destination(
            ticket,
            DestinationCheck {
                account: sender(),
                funded: true,
                flagged: true,
                memo_required: false,
                memo: Memo::Id(7),
            },
        );
        assert!(!applied);
        assert_eq!(flow.draft().resolved_destination, Some(receiver()));
        assert!(!flow.draft().destination_flagged);
        assert_eq!(flow.draft().memo_kind, MemoKind::None);
    }

    #[test]
    fn test_federation_memo_prefills_untouched_memo() {
        let mut flow = SendFlow::new(1, FeeStats::default());
        flow.edit(SendEdit::Destination("alice*example.com".to_string()));
        let ticket = flow.destination_ticket();
        flow.apply_destination(
            ticket,
            DestinationCheck {
                account: receiver(),
                funded: true,
                flagged: false,
                memo_required: false,
                memo: Memo::Id(7),
            },
        );
        assert_eq!(flow.draft().memo_kind, MemoKind::Id);
        assert_eq!(flow.draft().memo_content, "7");
    }

    #[test]
    fn test_back_keeps_draft_and_finish_ignores_other_flows() {
        let mut flow = checked_flow(true, false, false);
        flow.edit(SendEdit::Amount("2".to_string()));
        assert!(flow.continue_to_confirm(&account_with(100), 0));
        assert!(!flow.edit(SendEdit::Amount("3".to_string())));

        assert!(flow.begin_submit().is_some());
        assert!(!flow.core_mut().finish_submit(99, Ok("abc".to_string())));
        assert!(flow
            .core_mut()
            .finish_submit(1, Err("tx_bad_seq".to_string())));
        assert_eq!(flow.stage(), FlowStage::Error);

        assert!(flow.back());
        assert_eq!(flow.stage(), FlowStage::Create);
        assert_eq!(flow.draft().amount, "2");
        assert!(flow.core().transaction().is_none());
    }

    #[test]
    fn test_lookup_error_survives_continue() {
        let mut flow = SendFlow::new(1, FeeStats::default());
        flow.edit(SendEdit::Destination(receiver().account_id()));
        flow.edit(SendEdit::Amount("1".to_string()));
        let ticket = flow.destination_ticket();
        let message = "Horizon returned 503: Service Unavailable".to_string();
        assert!(flow.apply_destination_error(ticket, message.clone()));
        assert_eq!(flow.draft().resolved_destination, Some(receiver()));

        assert!(!flow.continue_to_confirm(&account_with(100), 0));
        assert_eq!(flow.errors().get(Field::Destination), Some(message.as_str()));

        // A fresh edit forgets the old lookup error
        flow.edit(SendEdit::Destination(receiver().account_id()));
        assert!(flow.draft().destination_error.is_none());
    }

    #[test]
    fn test_known_accounts_update_resolved_destination() {
        let mut flow = checked_flow(true, false, false);
        let entry = crate::directory::DirectoryEntry {
            address: receiver().account_id(),
            name: Some("scam".to_string()),
            domain: None,
            tags: vec!["malicious".to_string()],
        };
        let known = KnownAccounts {
            flagged: vec![entry.clone()],
            memo_required: vec![entry],
        };

        flow.apply_known_accounts(&known);
        assert!(flow.draft().destination_flagged);
        assert!(flow.draft().destination_memo_required);

        flow.apply_known_accounts(&KnownAccounts::default());
        assert!(!flow.draft().destination_flagged);
    }
}
