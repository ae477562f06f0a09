//! Claim claimable balance flow

use crate::amount::Amount;
use crate::horizon::{AccountInfo, ClaimableBalance, FeeStats};
use crate::transaction::{TransactionBuilder, DEFAULT_TIMEOUT_SECS};
use crate::xdr::{Operation, OperationBody, TransactionEnvelope};

use super::{Field, FieldErrors, FlowCore, FlowStage};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimDraft {
    pub balance: Option<ClaimableBalance>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClaimFlow {
    core: FlowCore,
    draft: ClaimDraft,
}

impl ClaimFlow {
    pub fn new(flow_id: u64, fee_stats: FeeStats) -> Self {
        Self {
            core: FlowCore::new(flow_id, fee_stats),
            draft: ClaimDraft::default(),
        }
    }

    pub fn core(&self) -> &FlowCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut FlowCore {
        &mut self.core
    }

    pub fn draft(&self) -> &ClaimDraft {
        &self.draft
    }

    pub fn stage(&self) -> FlowStage {
        self.core.stage()
    }

    pub fn errors(&self) -> &FieldErrors {
        self.core.errors()
    }

    pub fn select(&mut self, balance: ClaimableBalance) -> bool {
        if !self.core.is_editable() {
            return false;
        }
        self.draft.balance = Some(balance);
        self.core.errors.clear(Field::Balance);
        true
    }

    pub fn edit_fee(&mut self, fee: String) -> bool {
        if !self.core.is_editable() {
            return false;
        }
        self.core.edit_fee(fee);
        true
    }

    pub fn continue_to_confirm(&mut self, account: &AccountInfo, now_secs: u64) -> bool {
        if !self.core.is_editable() {
            return false;
        }

        let mut errors = FieldErrors::new();
        let fee = self.core.validate_fee(&mut errors);

        if !account.funded {
            errors.insert(Field::Balance, "The account must be funded to claim balances");
        }
        match &self.draft.balance {
            None => errors.insert(Field::Balance, "Select a balance to claim"),
            Some(balance) => {
                if !balance.is_claimable_at(now_secs as i64) {
                    errors.insert(Field::Balance, "This balance cannot be claimed right now");
                }
                if !account.has_trustline(&balance.asset) {
                    errors.insert(
                        Field::Balance,
                        format!(
                            "Add a trustline for {} before claiming",
                            balance.asset.canonical()
                        ),
                    );
                }
            }
        }
        if let Some(fee) = fee {
            if Amount::from_stroops(fee as i64) > account.available_native() {
                errors.insert(Field::Fee, "Insufficient balance to pay the fee");
            }
        }

        let (Some(balance), Some(fee)) = (&self.draft.balance, fee) else {
            self.core.fail_validation(errors);
            return false;
        };
        if !errors.is_empty() {
            self.core.fail_validation(errors);
            return false;
        }

        let built = TransactionBuilder::new(account.public_key, account.sequence)
            .fee_per_operation(fee)
            .operation(Operation::new(OperationBody::ClaimClaimableBalance {
                balance_id: balance.id,
            }))
            .timeout(now_secs, DEFAULT_TIMEOUT_SECS)
            .build();
        match built {
            Ok(envelope) => {
                self.core.enter_confirm(envelope);
                true
            }
            Err(e) => {
                let mut errors = FieldErrors::new();
                errors.insert(Field::Balance, e.to_string());
                self.core.fail_validation(errors);
                false
            }
        }
    }

    pub fn can_submit(&self) -> bool {
        self.stage() == FlowStage::Confirm
            && self.core.transaction().is_some()
            && !self.core.is_submitting()
    }

    pub(crate) fn begin_submit(&mut self) -> Option<TransactionEnvelope> {
        let allowed = self.can_submit();
        self.core.begin_submit(allowed)
    }

    pub fn back(&mut self) -> bool {
        self.core.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::horizon::NativeBalance;
    use crate::keys::Keypair;
    use crate::xdr::{Asset, ClaimPredicate, ClaimableBalanceId};

    fn account(funded: bool) -> AccountInfo {
        let mut account = AccountInfo::unfunded(Keypair::from_seed_bytes([1u8; 32]).public_key());
        if funded {
            account.funded = true;
            account.sequence = 7;
            account.native = NativeBalance {
                balance: Amount::from_units(5),
                reserve: Amount::from_units(1),
                buying_liabilities: Amount::ZERO,
                selling_liabilities: Amount::ZERO,
            };
        }
        account
    }

    fn balance(asset: Asset, predicate: ClaimPredicate) -> ClaimableBalance {
        ClaimableBalance {
            id: ClaimableBalanceId([9u8; 32]),
            asset,
            amount: Amount::from_units(3),
            sponsor: None,
            predicate,
            last_modified: None,
        }
    }

    #[test]
    fn test_claim_builds_claim_operation() {
        let mut flow = ClaimFlow::new(3, FeeStats::default());
        flow.select(balance(Asset::Native, ClaimPredicate::Unconditional));
        assert!(flow.continue_to_confirm(&account(true), 100));

        let tx = &flow.core().transaction().unwrap().tx;
        assert_eq!(tx.sequence, 8);
        assert_eq!(
            tx.operations[0].body,
            OperationBody::ClaimClaimableBalance {
                balance_id: ClaimableBalanceId([9u8; 32])
            }
        );
        assert!(flow.can_submit());
    }

    #[test]
    fn test_claim_requires_selection_and_funding() {
        let mut flow = ClaimFlow::new(3, FeeStats::default());
        assert!(!flow.continue_to_confirm(&account(true), 0));
        assert_eq!(
            flow.errors().get(Field::Balance),
            Some("Select a balance to claim")
        );

        flow.select(balance(Asset::Native, ClaimPredicate::Unconditional));
        assert!(!flow.continue_to_confirm(&account(false), 0));
        assert_eq!(flow.stage(), FlowStage::Create);
    }

    #[test]
    fn test_claim_checks_trustline_and_predicate() {
        let issuer = Keypair::from_seed_bytes([8u8; 32]).public_key();
        let usd = Asset::credit("USD", issuer).unwrap();

        let mut flow = ClaimFlow::new(3, FeeStats::default());
        flow.select(balance(usd, ClaimPredicate::Unconditional));
        assert!(!flow.continue_to_confirm(&account(true), 0));
        assert!(flow
            .errors()
            .get(Field::Balance)
            .unwrap()
            .contains("trustline"));

        let mut flow = ClaimFlow::new(4, FeeStats::default());
        flow.select(balance(
            Asset::Native,
            ClaimPredicate::BeforeAbsoluteTime(50),
        ));
        assert!(!flow.continue_to_confirm(&account(true), 60));
        assert!(flow.continue_to_confirm(&account(true), 40));
    }
}
