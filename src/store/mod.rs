//! Application state store
//!
//! All state lives in [`AppState`] and only changes through
//! [`AppState::reduce`]. Reducing is pure: network calls, signing and storage
//! happen in [`crate::session::Session`], which dispatches their results here.

pub mod slices;

use crate::config::Network;
use crate::connector::{ConnectionMethod, ConnectionState};
use crate::directory::KnownAccounts;
use crate::flow::{ClaimFlow, DestinationCheck, RequestTicket, SendEdit, SendFlow};
use crate::horizon::{
    filter_dust, AccountInfo, ClaimableBalance, FeeStats, HistoryEntry, OperationEntry, Page,
    HISTORY_PAGE_SIZE,
};
use crate::keys::PublicKey;

pub use slices::{
    AccountSlice, ClaimableSlice, HistorySlice, OperationsSlice, PagedSlice, Settings, Theme,
    WalletSlice, THEME_KEY,
};

#[derive(Debug, Clone)]
pub enum Action {
    // settings
    SetTheme(Theme),
    SetHideDust(bool),

    // sign-in
    SignInStarted(ConnectionMethod),
    SignInSucceeded {
        attempt: u64,
        public_key: PublicKey,
        path: Option<String>,
    },
    SignInFailed {
        attempt: u64,
        message: String,
    },
    SecretKeyRejected {
        message: String,
        now_millis: i64,
    },
    SecretKeyAccepted,
    /// The sign-in dialog was closed
    ResetSignIn,

    // account data
    AccountLoading,
    AccountLoaded(AccountInfo),
    AccountFailed(String),
    HistoryLoading,
    HistoryLoaded {
        page: Page<HistoryEntry>,
        append: bool,
    },
    HistoryFailed(String),
    OperationsLoading,
    OperationsLoaded {
        page: Page<OperationEntry>,
        append: bool,
    },
    OperationsFailed(String),
    ClaimableLoading,
    ClaimableLoaded(Vec<ClaimableBalance>),
    ClaimableFailed(String),
    KnownAccountsLoaded(KnownAccounts),
    FeeStatsLoaded(FeeStats),

    // send flow
    OpenSend,
    EditSend(SendEdit),
    SendFeeStats {
        ticket: RequestTicket,
        stats: FeeStats,
    },
    SendDestinationChecked {
        ticket: RequestTicket,
        check: DestinationCheck,
    },
    SendDestinationFailed {
        ticket: RequestTicket,
        message: String,
    },
    ContinueSend {
        now_secs: u64,
    },
    SubmitSendStarted,
    SubmitSendFinished {
        flow_id: u64,
        result: Result<String, String>,
    },
    BackSend,
    CloseSend,

    // claim flow
    OpenClaim,
    SelectClaim(ClaimableBalance),
    EditClaimFee(String),
    ClaimFeeStats {
        ticket: RequestTicket,
        stats: FeeStats,
    },
    ContinueClaim {
        now_secs: u64,
    },
    SubmitClaimStarted,
    SubmitClaimFinished {
        flow_id: u64,
        result: Result<String, String>,
    },
    BackClaim,
    CloseClaim,

    SignOut,
    SwitchNetwork(Network),
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub settings: Settings,
    pub account: AccountSlice,
    pub history: HistorySlice,
    pub operations: OperationsSlice,
    pub claimable: ClaimableSlice,
    pub known_accounts: KnownAccounts,
    pub fee_stats: FeeStats,
    pub wallet: WalletSlice,
    pub send: Option<SendFlow>,
    pub claim: Option<ClaimFlow>,
    next_flow_id: u64,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Account key of the signed-in wallet
    pub fn public_key(&self) -> Option<PublicKey> {
        self.wallet.connection.public_key()
    }

    /// History with the dust filter applied when enabled
    pub fn visible_history(&self) -> Vec<HistoryEntry> {
        if self.settings.hide_dust {
            filter_dust(self.history.entries.clone(), self.settings.dust_threshold)
        } else {
            self.history.entries.clone()
        }
    }

    fn take_flow_id(&mut self) -> u64 {
        self.next_flow_id += 1;
        self.next_flow_id
    }

    pub fn reduce(&mut self, action: Action) {
        match action {
            Action::SetTheme(theme) => self.settings.theme = theme,
            Action::SetHideDust(hide) => self.settings.hide_dust = hide,

            Action::SignInStarted(method) => {
                self.wallet.attempt += 1;
                self.wallet.method = Some(method);
                self.wallet.connection = ConnectionState::Pending;
            }
            Action::SignInSucceeded {
                attempt,
                public_key,
                path,
            } => {
                if attempt == self.wallet.attempt {
                    self.wallet.connection = ConnectionState::Connected { public_key, path };
                }
            }
            Action::SignInFailed { attempt, message } => {
                if attempt == self.wallet.attempt {
                    self.wallet.connection = ConnectionState::Error(message);
                }
            }
            Action::SecretKeyRejected {
                message,
                now_millis,
            } => {
                self.wallet.method = Some(ConnectionMethod::SecretKey);
                self.wallet.limiter.record_failure(now_millis);
                self.wallet.connection = ConnectionState::Error(message);
            }
            Action::SecretKeyAccepted => self.wallet.limiter.record_success(),
            Action::ResetSignIn => {
                if !matches!(self.wallet.connection, ConnectionState::Connected { .. }) {
                    self.wallet.attempt += 1;
                    self.wallet.connection = ConnectionState::Idle;
                    self.wallet.method = None;
                }
            }

            Action::AccountLoading => {
                self.account.loading = true;
                self.account.error = None;
            }
            Action::AccountLoaded(info) => {
                self.account = AccountSlice {
                    info: Some(info),
                    loading: false,
                    error: None,
                };
            }
            Action::AccountFailed(message) => {
                self.account.loading = false;
                self.account.error = Some(message);
            }
            Action::HistoryLoading => self.history.start_loading(),
            Action::HistoryLoaded { page, append } => {
                self.history.apply_page(page, append, HISTORY_PAGE_SIZE)
            }
            Action::HistoryFailed(message) => self.history.fail(message),
            Action::OperationsLoading => self.operations.start_loading(),
            Action::OperationsLoaded { page, append } => {
                self.operations.apply_page(page, append, HISTORY_PAGE_SIZE)
            }
            Action::OperationsFailed(message) => self.operations.fail(message),
            Action::ClaimableLoading => {
                self.claimable.loading = true;
                self.claimable.error = None;
            }
            Action::ClaimableLoaded(balances) => {
                self.claimable = ClaimableSlice {
                    balances,
                    loading: false,
                    error: None,
                };
            }
            Action::ClaimableFailed(message) => {
                self.claimable.loading = false;
                self.claimable.error = Some(message);
            }
            Action::KnownAccountsLoaded(known) => {
                self.known_accounts = known;
                self.sync_send_directory_flags();
            }
            Action::FeeStatsLoaded(stats) => self.fee_stats = stats,

            Action::OpenSend => {
                let flow_id = self.take_flow_id();
                self.send = Some(SendFlow::new(flow_id, self.fee_stats.clone()));
            }
            Action::EditSend(edit) => {
                if let Some(flow) = self.send.as_mut() {
                    flow.edit(edit);
                }
                self.sync_send_directory_flags();
            }
            Action::SendFeeStats { ticket, stats } => {
                if let Some(flow) = self.send.as_mut() {
                    if flow.core_mut().apply_fee_stats(ticket, stats.clone()) {
                        self.fee_stats = stats;
                    }
                }
            }
            Action::SendDestinationChecked { ticket, check } => {
                if let Some(flow) = self.send.as_mut() {
                    flow.apply_destination(ticket, check);
                }
                self.sync_send_directory_flags();
            }
            Action::SendDestinationFailed { ticket, message } => {
                if let Some(flow) = self.send.as_mut() {
                    flow.apply_destination_error(ticket, message);
                }
            }
            Action::ContinueSend { now_secs } => {
                self.sync_send_directory_flags();
                if let (Some(flow), Some(account)) = (self.send.as_mut(), &self.account.info) {
                    flow.continue_to_confirm(account, now_secs);
                }
            }
            Action::SubmitSendStarted => {
                if let Some(flow) = self.send.as_mut() {
                    flow.begin_submit();
                }
            }
            Action::SubmitSendFinished { flow_id, result } => {
                if let Some(flow) = self.send.as_mut() {
                    flow.core_mut().finish_submit(flow_id, result);
                }
            }
            Action::BackSend => {
                if let Some(flow) = self.send.as_mut() {
                    flow.back();
                }
            }
            Action::CloseSend => self.send = None,

            Action::OpenClaim => {
                let flow_id = self.take_flow_id();
                self.claim = Some(ClaimFlow::new(flow_id, self.fee_stats.clone()));
            }
            Action::SelectClaim(balance) => {
                if let Some(flow) = self.claim.as_mut() {
                    flow.select(balance);
                }
            }
            Action::EditClaimFee(fee) => {
                if let Some(flow) = self.claim.as_mut() {
                    flow.edit_fee(fee);
                }
            }
            Action::ClaimFeeStats { ticket, stats } => {
                if let Some(flow) = self.claim.as_mut() {
                    if flow.core_mut().apply_fee_stats(ticket, stats.clone()) {
                        self.fee_stats = stats;
                    }
                }
            }
            Action::ContinueClaim { now_secs } => {
                if let (Some(flow), Some(account)) = (self.claim.as_mut(), &self.account.info) {
                    flow.continue_to_confirm(account, now_secs);
                }
            }
            Action::SubmitClaimStarted => {
                if let Some(flow) = self.claim.as_mut() {
                    flow.begin_submit();
                }
            }
            Action::SubmitClaimFinished { flow_id, result } => {
                if let Some(flow) = self.claim.as_mut() {
                    flow.core_mut().finish_submit(flow_id, result);
                }
            }
            Action::BackClaim => {
                if let Some(flow) = self.claim.as_mut() {
                    flow.back();
                }
            }
            Action::CloseClaim => self.claim = None,

            Action::SignOut => self.reset_keeping_settings(),
            Action::SwitchNetwork(network) => {
                self.reset_keeping_settings();
                self.settings.network = network;
            }
        }
    }

    /// The open draft's directory flags follow the latest known accounts,
    /// whichever of the directory load and the destination lookup lands last
    fn sync_send_directory_flags(&mut self) {
        if let Some(flow) = self.send.as_mut() {
            flow.apply_known_accounts(&self.known_accounts);
        }
    }

    /// Everything back to defaults except settings, the sign-in limiter and
    /// the flow and sign-in counters (so late responses for old flows and
    /// attempts stay stale)
    fn reset_keeping_settings(&mut self) {
        let settings = self.settings.clone();
        let limiter = self.wallet.limiter.clone();
        let attempt = self.wallet.attempt;
        let next_flow_id = self.next_flow_id;

        *self = Self {
            settings,
            next_flow_id,
            ..Self::default()
        };
        self.wallet.limiter = limiter;
        self.wallet.attempt = attempt + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::Amount;
    use crate::flow::FlowStage;
    use crate::horizon::{Direction, HistoryKind};
    use crate::keys::Keypair;
    use crate::memo::MemoKind;

    fn key(seed: u8) -> PublicKey {
        Keypair::from_seed_bytes([seed; 32]).public_key()
    }

    fn entry(id: &str, direction: Direction, amount: &str) -> HistoryEntry {
        HistoryEntry {
            id: id.to_string(),
            paging_token: id.to_string(),
            kind: HistoryKind::Payment,
            direction,
            counterparty: Some(key(2).account_id()),
            amount: Some(amount.parse().unwrap()),
            asset: "native".to_string(),
            created_at: chrono::DateTime::<chrono::Utc>::from_timestamp(0, 0).unwrap(),
            transaction_hash: "00".to_string(),
        }
    }

    fn signed_in() -> AppState {
        let mut state = AppState::default();
        state.reduce(Action::SignInStarted(ConnectionMethod::SecretKey));
        state.reduce(Action::SignInSucceeded {
            attempt: state.wallet.attempt,
            public_key: key(1),
            path: None,
        });
        state
    }

    #[test]
    fn test_close_discards_draft() {
        let mut state = signed_in();
        state.reduce(Action::OpenSend);
        state.reduce(Action::EditSend(SendEdit::Destination(key(2).account_id())));
        state.reduce(Action::EditSend(SendEdit::Amount("12".to_string())));
        state.reduce(Action::EditSend(SendEdit::MemoKind(MemoKind::Text)));
        state.reduce(Action::EditSend(SendEdit::MemoContent("hi".to_string())));
        state.reduce(Action::EditSend(SendEdit::Fee("0.001".to_string())));

        state.reduce(Action::CloseSend);
        assert!(state.send.is_none());

        state.reduce(Action::OpenSend);
        let flow = state.send.as_ref().unwrap();
        assert_eq!(flow.draft(), &crate::flow::SendDraft::default());
        assert_eq!(flow.core().fee(), "0.00001");
        assert_eq!(flow.stage(), FlowStage::Create);
    }

    #[test]
    fn test_response_for_closed_flow_is_dropped() {
        let mut state = signed_in();
        state.reduce(Action::OpenSend);
        let old_ticket = state.send.as_ref().unwrap().destination_ticket();
        state.reduce(Action::CloseSend);
        state.reduce(Action::OpenSend);
        state.reduce(Action::EditSend(SendEdit::Destination(key(2).account_id())));

        state.reduce(Action::SendDestinationChecked {
            ticket: RequestTicket {
                flow_id: old_ticket.flow_id,
                revision: 1,
            },
            check: DestinationCheck {
                account: key(2),
                funded: true,
                flagged: true,
                memo_required: false,
                memo: crate::memo::Memo::None,
            },
        });
        assert!(!state.send.as_ref().unwrap().draft().destination_flagged);
    }

    #[test]
    fn test_sign_out_keeps_settings_and_limiter() {
        let mut state = signed_in();
        state.reduce(Action::SetTheme(Theme::Dark));
        state.reduce(Action::SecretKeyRejected {
            message: "bad".to_string(),
            now_millis: 0,
        });
        state.reduce(Action::OpenSend);
        state.reduce(Action::HistoryLoaded {
            page: Page {
                records: vec![entry("1", Direction::Received, "3")],
                next_cursor: Some("1".to_string()),
            },
            append: false,
        });

        state.reduce(Action::SignOut);
        assert_eq!(state.settings.theme, Theme::Dark);
        assert_eq!(state.wallet.limiter.failures(), 1);
        assert!(state.send.is_none());
        assert!(state.history.entries.is_empty());
        assert!(state.public_key().is_none());
    }

    #[test]
    fn test_switch_network_resets_everything_else() {
        let mut state = signed_in();
        state.reduce(Action::OpenClaim);
        state.reduce(Action::SwitchNetwork(Network::Public));
        assert_eq!(state.settings.network, Network::Public);
        assert!(state.claim.is_none());
        assert_eq!(state.wallet.connection, ConnectionState::Idle);
    }

    #[test]
    fn test_reset_sign_in_keeps_limiter() {
        let mut state = AppState::default();
        for _ in 0..9 {
            state.reduce(Action::SecretKeyRejected {
                message: "Invalid secret key".to_string(),
                now_millis: 0,
            });
        }
        state.reduce(Action::ResetSignIn);
        assert_eq!(state.wallet.connection, ConnectionState::Idle);
        assert!(state.wallet.limiter.is_locked(500));
    }

    #[test]
    fn test_visible_history_applies_dust_filter() {
        let mut state = signed_in();
        state.reduce(Action::HistoryLoaded {
            page: Page {
                records: vec![
                    entry("1", Direction::Received, "0.1"),
                    entry("2", Direction::Sent, "0.1"),
                    entry("3", Direction::Received, "0.5000001"),
                ],
                next_cursor: Some("3".to_string()),
            },
            append: false,
        });

        let visible: Vec<_> = state.visible_history().into_iter().map(|e| e.id).collect();
        assert_eq!(visible, vec!["2", "3"]);

        state.reduce(Action::SetHideDust(false));
        assert_eq!(state.visible_history().len(), 3);
        assert_eq!(state.settings.dust_threshold, Amount::from_stroops(5_000_000));
    }

    #[test]
    fn test_closed_sign_in_ignores_late_result() {
        let mut state = AppState::default();
        state.reduce(Action::SignInStarted(ConnectionMethod::Ledger));
        let attempt = state.wallet.attempt;
        state.reduce(Action::ResetSignIn);

        state.reduce(Action::SignInSucceeded {
            attempt,
            public_key: key(1),
            path: None,
        });
        assert_eq!(state.wallet.connection, ConnectionState::Idle);

        state.reduce(Action::SignInFailed {
            attempt,
            message: "device unplugged".to_string(),
        });
        assert_eq!(state.wallet.connection, ConnectionState::Idle);
        assert!(state.wallet.can_start_sign_in());
    }

    #[test]
    fn test_directory_arriving_after_lookup_flags_draft() {
        let mut state = signed_in();
        state.reduce(Action::OpenSend);
        state.reduce(Action::EditSend(SendEdit::Destination(key(2).account_id())));
        let ticket = state.send.as_ref().unwrap().destination_ticket();
        state.reduce(Action::SendDestinationChecked {
            ticket,
            check: DestinationCheck {
                account: key(2),
                funded: true,
                flagged: false,
                memo_required: false,
                memo: crate::memo::Memo::None,
            },
        });
        assert!(!state.send.as_ref().unwrap().draft().destination_flagged);

        state.reduce(Action::KnownAccountsLoaded(KnownAccounts {
            flagged: vec![crate::directory::DirectoryEntry {
                address: key(2).account_id(),
                name: None,
                domain: None,
                tags: vec!["malicious".to_string()],
            }],
            memo_required: Vec::new(),
        }));
        assert!(state.send.as_ref().unwrap().draft().destination_flagged);
    }

    #[test]
    fn test_destination_lookup_error_survives_continue() {
        let mut state = signed_in();
        let mut info = AccountInfo::unfunded(key(1));
        info.funded = true;
        info.native.balance = Amount::from_units(100);
        state.reduce(Action::AccountLoaded(info));
        state.reduce(Action::OpenSend);
        state.reduce(Action::EditSend(SendEdit::Destination(key(2).account_id())));
        state.reduce(Action::EditSend(SendEdit::Amount("1".to_string())));

        let ticket = state.send.as_ref().unwrap().destination_ticket();
        state.reduce(Action::SendDestinationFailed {
            ticket,
            message: "Horizon returned 503: Service Unavailable".to_string(),
        });
        state.reduce(Action::ContinueSend { now_secs: 0 });

        let flow = state.send.as_ref().unwrap();
        assert_eq!(flow.stage(), FlowStage::Create);
        assert_eq!(
            flow.errors().get(crate::flow::Field::Destination),
            Some("Horizon returned 503: Service Unavailable")
        );
    }
}
