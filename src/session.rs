//! Async orchestration
//!
//! `Session` performs the side effects (ledger calls, signing, directory and
//! federation lookups, preference storage) and feeds their results into the
//! store as actions. The store lock is never held across an await: each
//! operation reads what it needs, releases the lock, awaits, then dispatches.

use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::clock::{Clock, SystemClock};
use crate::config::{Network, ViewerConfig};
use crate::connector::{ConnectionState, SecretKeyProvider, SigningProvider, WalletConnector};
use crate::directory::{
    CachedDirectory, DirectoryClient, DirectorySource, FileStore, KeyValueStore, KnownAccounts,
};
use crate::error::ViewerError;
use crate::federation::{FederationResolver, HttpFederationResolver};
use crate::flow::{DestinationCheck, DestinationStatus, FlowStage, SendEdit};
use crate::horizon::{
    AccountInfo, ClaimableBalance, FeeStats, HorizonClient, LedgerApi, SubmitResult,
    HISTORY_PAGE_SIZE,
};
use crate::keys::{is_federation_address, Keypair, PublicKey};
use crate::memo::Memo;
use crate::store::{Action, AppState, Settings, Theme, THEME_KEY};
use crate::xdr::{ClaimableBalanceId, TransactionEnvelope};
use crate::Result;

/// Collaborators a session talks to besides the ledger
pub struct SessionParts {
    pub storage: Arc<dyn KeyValueStore>,
    pub directory: Box<dyn DirectorySource>,
    pub federation: Arc<dyn FederationResolver>,
    pub clock: Arc<dyn Clock>,
}

impl SessionParts {
    /// Production collaborators: file cache, HTTP directory and federation, system clock
    pub fn from_config(config: &ViewerConfig) -> Result<Self> {
        Ok(Self {
            storage: Arc::new(FileStore::new(config.storage_dir.clone())),
            directory: Box::new(DirectoryClient::new(&config.directory_url)?),
            federation: Arc::new(HttpFederationResolver::new(&config.federation_scheme)),
            clock: Arc::new(SystemClock),
        })
    }
}

pub struct Session<L: LedgerApi> {
    state: Mutex<AppState>,
    config: RwLock<ViewerConfig>,
    ledger: RwLock<Arc<L>>,
    connector: Mutex<Option<WalletConnector>>,
    storage: Arc<dyn KeyValueStore>,
    directory: CachedDirectory<Box<dyn DirectorySource>>,
    federation: Arc<dyn FederationResolver>,
    clock: Arc<dyn Clock>,
}

impl<L: LedgerApi> Session<L> {
    pub fn new(config: ViewerConfig, ledger: L, parts: SessionParts) -> Self {
        let mut settings = Settings::from_config(&config);
        match parts.storage.get(THEME_KEY) {
            Ok(Some(raw)) => match raw.parse::<Theme>() {
                Ok(theme) => settings.theme = theme,
                Err(e) => log::warn!("Ignoring stored theme: {}", e),
            },
            Ok(None) => {}
            Err(e) => log::warn!("Could not read theme preference: {}", e),
        }

        log::info!(
            "Session on {:?} network via {}",
            config.network,
            config.horizon_url
        );

        Self {
            state: Mutex::new(AppState::new(settings)),
            config: RwLock::new(config),
            ledger: RwLock::new(Arc::new(ledger)),
            connector: Mutex::new(None),
            directory: CachedDirectory::new(
                parts.directory,
                parts.storage.clone(),
                parts.clock.clone(),
            ),
            storage: parts.storage,
            federation: parts.federation,
            clock: parts.clock,
        }
    }

    /// Copy of the current state for rendering
    pub async fn snapshot(&self) -> AppState {
        self.state.lock().await.clone()
    }

    pub async fn config(&self) -> ViewerConfig {
        self.config.read().await.clone()
    }

    async fn dispatch(&self, action: Action) {
        self.state.lock().await.reduce(action);
    }

    /// Dispatch only if `account` is still the signed-in account
    async fn dispatch_for(&self, account: PublicKey, action: Action) -> bool {
        let mut state = self.state.lock().await;
        if state.public_key() != Some(account) {
            log::debug!("Dropping result for {} after account change", account);
            return false;
        }
        state.reduce(action);
        true
    }

    /// Dispatch a sign-in result unless the dialog was closed or a newer
    /// attempt started in the meantime
    async fn dispatch_sign_in(&self, attempt: u64, action: Action) -> bool {
        let mut state = self.state.lock().await;
        if state.wallet.attempt != attempt {
            log::debug!("Dropping result of cancelled sign-in attempt {}", attempt);
            return false;
        }
        state.reduce(action);
        true
    }

    async fn ledger(&self) -> Arc<L> {
        self.ledger.read().await.clone()
    }

    async fn require_public_key(&self) -> Result<PublicKey> {
        self.state
            .lock()
            .await
            .public_key()
            .ok_or_else(|| ViewerError::InvalidState("no wallet is signed in".to_string()))
    }

    fn now_secs(&self) -> u64 {
        self.clock.now_secs().max(0) as u64
    }

    // --- sign-in -----------------------------------------------------------

    /// Connect through an external signer and load the account
    pub async fn sign_in(
        &self,
        provider: Arc<dyn SigningProvider>,
        path: Option<String>,
    ) -> Result<PublicKey> {
        let method = provider.method();
        let attempt = {
            let mut state = self.state.lock().await;
            if !state.wallet.can_start_sign_in() {
                return Err(ViewerError::InvalidState(
                    "a wallet is already connected or connecting".to_string(),
                ));
            }
            state.reduce(Action::SignInStarted(method));
            state.wallet.attempt
        };

        let mut connector = WalletConnector::new(provider);
        match connector.connect(path).await {
            Ok(public_key) => {
                let path = match connector.state() {
                    ConnectionState::Connected { path, .. } => path.clone(),
                    _ => None,
                };
                // Connector slot first, so a concurrent sign-out cannot interleave
                let mut slot = self.connector.lock().await;
                let accepted = self
                    .dispatch_sign_in(
                        attempt,
                        Action::SignInSucceeded {
                            attempt,
                            public_key,
                            path,
                        },
                    )
                    .await;
                if !accepted {
                    return Err(sign_in_cancelled());
                }
                *slot = Some(connector);
                drop(slot);

                if let Err(e) = self.refresh_account().await {
                    log::warn!("Could not load account after sign-in: {}", e);
                }
                Ok(public_key)
            }
            Err(e) => {
                let message = match &e {
                    ViewerError::Connector(message) => message.clone(),
                    other => other.to_string(),
                };
                if self
                    .dispatch_sign_in(attempt, Action::SignInFailed { attempt, message })
                    .await
                {
                    Err(e)
                } else {
                    Err(sign_in_cancelled())
                }
            }
        }
    }

    /// Sign in with an `S...` secret seed.
    ///
    /// Parse failures count towards the sign-in cool-down; attempts during the
    /// cool-down are refused before the input is looked at.
    pub async fn sign_in_with_secret(&self, secret: &str) -> Result<PublicKey> {
        let now = self.clock.now_millis();
        let keypair = {
            let mut state = self.state.lock().await;
            if let Some(remaining) = state.wallet.limiter.remaining(now) {
                let secs = (remaining.as_millis() as u64).div_ceil(1000);
                return Err(ViewerError::Connector(format!(
                    "Too many failed attempts. Try again in {} seconds",
                    secs
                )));
            }
            if !state.wallet.can_start_sign_in() {
                return Err(ViewerError::InvalidState(
                    "a wallet is already connected or connecting".to_string(),
                ));
            }

            match Keypair::from_secret_seed(secret) {
                Ok(keypair) => {
                    state.reduce(Action::SecretKeyAccepted);
                    keypair
                }
                Err(_) => {
                    let message = "Invalid secret key".to_string();
                    state.reduce(Action::SecretKeyRejected {
                        message: message.clone(),
                        now_millis: now,
                    });
                    return Err(ViewerError::InvalidKey(message));
                }
            }
        };

        self.sign_in(Arc::new(SecretKeyProvider::new(keypair)), None)
            .await
    }

    /// The sign-in dialog was closed without connecting
    pub async fn close_sign_in(&self) {
        self.dispatch(Action::ResetSignIn).await;
    }

    pub async fn sign_out(&self) {
        *self.connector.lock().await = None;
        self.dispatch(Action::SignOut).await;
        log::info!("Signed out");
    }

    /// Point the session at another network; all state except settings is reset
    pub async fn switch_network(&self, network: Network, ledger: L) {
        {
            let mut config = self.config.write().await;
            *config = config.switch_network(network);
        }
        *self.ledger.write().await = Arc::new(ledger);
        *self.connector.lock().await = None;
        self.dispatch(Action::SwitchNetwork(network)).await;
        log::info!("Switched to {:?} network", network);
    }

    // --- settings ----------------------------------------------------------

    pub async fn set_theme(&self, theme: Theme) -> Result<()> {
        self.dispatch(Action::SetTheme(theme)).await;
        self.storage.set(THEME_KEY, &theme.to_string())?;
        Ok(())
    }

    pub async fn set_hide_dust(&self, hide: bool) {
        self.dispatch(Action::SetHideDust(hide)).await;
    }

    // --- account data ------------------------------------------------------

    pub async fn refresh_account(&self) -> Result<AccountInfo> {
        let public_key = self.require_public_key().await?;
        self.dispatch(Action::AccountLoading).await;

        match self.ledger().await.account(&public_key).await {
            Ok(info) => {
                self.dispatch_for(public_key, Action::AccountLoaded(info.clone()))
                    .await;
                Ok(info)
            }
            Err(e) => {
                self.dispatch_for(public_key, Action::AccountFailed(e.display_message()))
                    .await;
                Err(e)
            }
        }
    }

    /// Load the newest page of payments, or the next older page when `more` is set
    pub async fn load_history(&self, more: bool) -> Result<()> {
        let public_key = self.require_public_key().await?;
        let cursor = {
            let state = self.state.lock().await;
            if more {
                match &state.history.next_cursor {
                    Some(cursor) if !state.history.complete => Some(cursor.clone()),
                    _ => return Ok(()),
                }
            } else {
                None
            }
        };
        self.dispatch(Action::HistoryLoading).await;

        match self
            .ledger()
            .await
            .payments(&public_key, cursor.as_deref(), HISTORY_PAGE_SIZE)
            .await
        {
            Ok(page) => {
                self.dispatch_for(public_key, Action::HistoryLoaded { page, append: more })
                    .await;
                Ok(())
            }
            Err(e) => {
                self.dispatch_for(public_key, Action::HistoryFailed(e.display_message()))
                    .await;
                Err(e)
            }
        }
    }

    /// Load the newest page of all operations, or the next older page when `more` is set
    pub async fn load_operations(&self, more: bool) -> Result<()> {
        let public_key = self.require_public_key().await?;
        let cursor = {
            let state = self.state.lock().await;
            match (more, state.operations.more_cursor()) {
                (false, _) => None,
                (true, Some(cursor)) => Some(cursor.to_string()),
                (true, None) => return Ok(()),
            }
        };
        self.dispatch(Action::OperationsLoading).await;

        match self
            .ledger()
            .await
            .operations(&public_key, cursor.as_deref(), HISTORY_PAGE_SIZE)
            .await
        {
            Ok(page) => {
                self.dispatch_for(public_key, Action::OperationsLoaded { page, append: more })
                    .await;
                Ok(())
            }
            Err(e) => {
                self.dispatch_for(public_key, Action::OperationsFailed(e.display_message()))
                    .await;
                Err(e)
            }
        }
    }

    pub async fn load_claimable_balances(&self) -> Result<Vec<ClaimableBalance>> {
        let public_key = self.require_public_key().await?;
        self.dispatch(Action::ClaimableLoading).await;

        match self
            .ledger()
            .await
            .claimable_balances(&public_key, HISTORY_PAGE_SIZE)
            .await
        {
            Ok(balances) => {
                self.dispatch_for(public_key, Action::ClaimableLoaded(balances.clone()))
                    .await;
                Ok(balances)
            }
            Err(e) => {
                self.dispatch_for(public_key, Action::ClaimableFailed(e.display_message()))
                    .await;
                Err(e)
            }
        }
    }

    /// Flagged and memo-required directories, from cache when fresh
    pub async fn refresh_known_accounts(&self) -> KnownAccounts {
        let known = self.directory.known_accounts().await;
        self.dispatch(Action::KnownAccountsLoaded(known.clone()))
            .await;
        known
    }

    /// Current network fee level, for the congestion indicator
    pub async fn refresh_fee_stats(&self) -> Result<FeeStats> {
        let stats = self.ledger().await.fee_stats().await?;
        self.dispatch(Action::FeeStatsLoaded(stats.clone())).await;
        Ok(stats)
    }

    // --- send flow -----------------------------------------------------------

    /// Open a fresh send form and start the fee and directory lookups
    pub async fn open_send(&self) {
        self.dispatch(Action::OpenSend).await;
        self.refresh_known_accounts().await;
        if let Err(e) = self.refresh_send_fee().await {
            log::warn!("Keeping default fee: {}", e);
        }
    }

    pub async fn edit_send(&self, edit: SendEdit) {
        self.dispatch(Action::EditSend(edit)).await;
    }

    pub async fn refresh_send_fee(&self) -> Result<()> {
        let ticket = {
            let state = self.state.lock().await;
            state
                .send
                .as_ref()
                .map(|flow| flow.core().fee_ticket())
                .ok_or_else(flow_closed)?
        };

        let stats = self.ledger().await.fee_stats().await?;
        log::debug!(
            "Recommended fee {} ({:?} congestion)",
            stats.recommended_fee,
            stats.congestion
        );
        self.dispatch(Action::SendFeeStats { ticket, stats }).await;
        Ok(())
    }

    /// Resolve the typed destination and look up its funded and directory status
    pub async fn check_send_destination(&self) -> Result<()> {
        let (ticket, destination, known) = {
            let state = self.state.lock().await;
            let flow = state.send.as_ref().ok_or_else(flow_closed)?;
            (
                flow.destination_ticket(),
                flow.draft().destination.trim().to_string(),
                state.known_accounts.clone(),
            )
        };
        if destination.is_empty() {
            return Ok(());
        }

        match self.lookup_destination(&destination, &known).await {
            Ok(check) => {
                self.dispatch(Action::SendDestinationChecked { ticket, check })
                    .await;
                Ok(())
            }
            Err(e) => {
                let message = match &e {
                    ViewerError::InvalidKey(_) => {
                        "Enter a valid account ID or federation address".to_string()
                    }
                    other => other.display_message(),
                };
                self.dispatch(Action::SendDestinationFailed { ticket, message })
                    .await;
                Err(e)
            }
        }
    }

    async fn lookup_destination(
        &self,
        destination: &str,
        known: &KnownAccounts,
    ) -> Result<DestinationCheck> {
        let (account, memo) = if is_federation_address(destination) {
            let record = self.federation.resolve(destination).await?;
            (record.account, record.memo)
        } else {
            (PublicKey::from_account_id(destination)?, Memo::None)
        };

        let funded = self.ledger().await.account_exists(&account).await?;
        let account_id = account.account_id();
        Ok(DestinationCheck {
            account,
            funded,
            flagged: known.is_flagged(&account_id),
            memo_required: known.requires_memo(&account_id),
            memo,
        })
    }

    /// Validate the draft and move to confirmation. Returns whether the flow is
    /// now in `Confirm`.
    pub async fn continue_send(&self) -> Result<bool> {
        let needs_check = {
            let state = self.state.lock().await;
            let flow = state.send.as_ref().ok_or_else(flow_closed)?;
            if state.account.info.is_none() {
                return Err(ViewerError::InvalidState(
                    "account is not loaded".to_string(),
                ));
            }
            flow.draft().destination_status == DestinationStatus::Unknown
                && !flow.draft().destination.trim().is_empty()
        };
        if needs_check {
            if let Err(e) = self.check_send_destination().await {
                log::debug!("Destination check failed: {}", e);
            }
        }

        let now_secs = self.now_secs();
        let mut state = self.state.lock().await;
        state.reduce(Action::ContinueSend { now_secs });
        Ok(state
            .send
            .as_ref()
            .is_some_and(|flow| flow.stage() == FlowStage::Confirm))
    }

    /// Sign the confirmed transaction with the connected wallet and submit it
    pub async fn submit_send(&self) -> Result<String> {
        let (flow_id, envelope) = {
            let mut state = self.state.lock().await;
            let flow = state.send.as_ref().ok_or_else(flow_closed)?;
            if !flow.can_submit() {
                return Err(ViewerError::InvalidState(
                    "the transaction cannot be submitted".to_string(),
                ));
            }
            let flow_id = flow.core().flow_id();
            let envelope = flow.core().transaction().cloned().ok_or_else(flow_closed)?;
            state.reduce(Action::SubmitSendStarted);
            (flow_id, envelope)
        };

        let result = self.sign_and_submit(&envelope).await;
        self.dispatch(Action::SubmitSendFinished {
            flow_id,
            result: outcome(&result),
        })
        .await;

        let submitted = result?;
        self.after_submit().await;
        Ok(submitted.hash)
    }

    pub async fn back_send(&self) {
        self.dispatch(Action::BackSend).await;
    }

    pub async fn close_send(&self) {
        self.dispatch(Action::CloseSend).await;
    }

    // --- claim flow --------------------------------------------------------

    pub async fn open_claim(&self) {
        self.dispatch(Action::OpenClaim).await;
        if let Err(e) = self.refresh_claim_fee().await {
            log::warn!("Keeping default fee: {}", e);
        }
    }

    /// Pick one of the loaded claimable balances
    pub async fn select_claim(&self, id: &ClaimableBalanceId) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.claim.is_none() {
            return Err(flow_closed());
        }
        let balance = state
            .claimable
            .balances
            .iter()
            .find(|b| &b.id == id)
            .cloned()
            .ok_or_else(|| {
                ViewerError::InvalidState(format!("unknown claimable balance {}", id.to_hex()))
            })?;
        state.reduce(Action::SelectClaim(balance));
        Ok(())
    }

    pub async fn edit_claim_fee(&self, fee: String) {
        self.dispatch(Action::EditClaimFee(fee)).await;
    }

    pub async fn refresh_claim_fee(&self) -> Result<()> {
        let ticket = {
            let state = self.state.lock().await;
            state
                .claim
                .as_ref()
                .map(|flow| flow.core().fee_ticket())
                .ok_or_else(flow_closed)?
        };

        let stats = self.ledger().await.fee_stats().await?;
        self.dispatch(Action::ClaimFeeStats { ticket, stats }).await;
        Ok(())
    }

    pub async fn continue_claim(&self) -> Result<bool> {
        let now_secs = self.now_secs();
        let mut state = self.state.lock().await;
        if state.claim.is_none() {
            return Err(flow_closed());
        }
        if state.account.info.is_none() {
            return Err(ViewerError::InvalidState(
                "account is not loaded".to_string(),
            ));
        }
        state.reduce(Action::ContinueClaim { now_secs });
        Ok(state
            .claim
            .as_ref()
            .is_some_and(|flow| flow.stage() == FlowStage::Confirm))
    }

    pub async fn submit_claim(&self) -> Result<String> {
        let (flow_id, envelope) = {
            let mut state = self.state.lock().await;
            let flow = state.claim.as_ref().ok_or_else(flow_closed)?;
            if !flow.can_submit() {
                return Err(ViewerError::InvalidState(
                    "the transaction cannot be submitted".to_string(),
                ));
            }
            let flow_id = flow.core().flow_id();
            let envelope = flow.core().transaction().cloned().ok_or_else(flow_closed)?;
            state.reduce(Action::SubmitClaimStarted);
            (flow_id, envelope)
        };

        let result = self.sign_and_submit(&envelope).await;
        self.dispatch(Action::SubmitClaimFinished {
            flow_id,
            result: outcome(&result),
        })
        .await;

        let submitted = result?;
        if let Err(e) = self.load_claimable_balances().await {
            log::warn!("Could not reload claimable balances: {}", e);
        }
        self.after_submit().await;
        Ok(submitted.hash)
    }

    pub async fn back_claim(&self) {
        self.dispatch(Action::BackClaim).await;
    }

    pub async fn close_claim(&self) {
        self.dispatch(Action::CloseClaim).await;
    }

    // --- shared ------------------------------------------------------------

    async fn sign_and_submit(&self, envelope: &TransactionEnvelope) -> Result<SubmitResult> {
        let connector = self
            .connector
            .lock()
            .await
            .clone()
            .ok_or_else(|| ViewerError::InvalidState("wallet is not connected".to_string()))?;
        let network = self.state.lock().await.settings.network;

        let signed = connector.sign(envelope, network).await?;
        log::info!("Submitting {}", signed.hash_hex(network));
        self.ledger().await.submit(&signed).await
    }

    async fn after_submit(&self) {
        if let Err(e) = self.refresh_account().await {
            log::warn!("Could not refresh account: {}", e);
        }
        if let Err(e) = self.load_history(false).await {
            log::warn!("Could not refresh history: {}", e);
        }
    }
}

impl Session<HorizonClient> {
    /// Session against Horizon with the production collaborators
    pub fn from_config(config: ViewerConfig) -> Result<Self> {
        let parts = SessionParts::from_config(&config)?;
        let ledger = HorizonClient::from_config(&config);
        Ok(Self::new(config, ledger, parts))
    }

    /// Switch to `network` with its default Horizon endpoint
    pub async fn switch_to(&self, network: Network) {
        let config = self.config.read().await.switch_network(network);
        self.switch_network(network, HorizonClient::from_config(&config))
            .await;
    }

    /// Apply a `testnet=true|false` query from the page URL. Returns whether
    /// the network changed.
    pub async fn apply_query(&self, url_or_query: &str) -> bool {
        let Some(network) = Network::from_query(url_or_query) else {
            return false;
        };
        if self.config.read().await.network == network {
            return false;
        }
        self.switch_to(network).await;
        true
    }
}

fn sign_in_cancelled() -> ViewerError {
    ViewerError::InvalidState("sign-in was cancelled".to_string())
}

fn flow_closed() -> ViewerError {
    ViewerError::InvalidState("the flow is not open".to_string())
}

/// Submission result as stored on the flow: hash, or the message to show
fn outcome(result: &Result<SubmitResult>) -> std::result::Result<String, String> {
    match result {
        Ok(submitted) => Ok(submitted.hash.clone()),
        Err(e) => Err(e.display_message()),
    }
}
