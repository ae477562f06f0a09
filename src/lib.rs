//! Account Viewer: wallet core for a ledger account viewer
//!
//! Signs in through pluggable signers, reads account state from a Horizon
//! ledger API, and walks send and claim transactions through an explicit
//! state store. Rendering is left to the caller, which reads [`AppState`]
//! snapshots and calls [`Session`] operations.
//!
//! # Architecture
//!
//! - **Session**: performs network, signing and storage calls and dispatches results
//! - **Store**: named state slices changed only through a pure reducer
//! - **Flows**: send and claim state machines with validation and request tickets
//! - **Connectors**: one connector type over secret key, hardware and extension signers
//! - **Horizon / Directory / Federation**: ledger, reputation and address lookups
//!
//! # Example
//!
//! ```ignore
//! use account_viewer::{Session, SendEdit, ViewerConfig};
//!
//! let session = Session::from_config(ViewerConfig::from_env()?)?;
//! session.sign_in_with_secret("SA...").await?;
//!
//! session.open_send().await;
//! session.edit_send(SendEdit::Destination("GB...".to_string())).await;
//! session.edit_send(SendEdit::Amount("12.5".to_string())).await;
//! if session.continue_send().await? {
//!     let hash = session.submit_send().await?;
//! }
//! ```

// Public modules
pub mod amount;
pub mod clock;
pub mod config;
pub mod connector;
pub mod directory;
pub mod error;
pub mod federation;
pub mod flow;
pub mod horizon;
pub mod keys;
pub mod memo;
pub mod session;
pub mod store;
pub mod transaction;
pub mod xdr;

// Re-exports for convenience
pub use amount::Amount;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Network, ViewerConfig};
pub use connector::{
    ConnectionMethod, ConnectionState, RateLimiter, SecretKeyProvider, SignedPayload,
    SigningProvider, WalletConnector,
};
pub use directory::{
    CachedDirectory, DirectoryClient, DirectoryEntry, DirectoryList, FileStore, KeyValueStore,
    KnownAccounts, MemoryStore,
};
pub use error::{StorageError, ViewerError};
pub use federation::{FederationRecord, FederationResolver, HttpFederationResolver};
pub use flow::{
    ClaimFlow, DestinationStatus, Field, FieldErrors, FlowOutcome, FlowStage, RequestTicket,
    SendDraft, SendEdit, SendFlow,
};
pub use horizon::{
    filter_dust, AccountInfo, ClaimableBalance, FeeStats, HistoryEntry, HorizonClient, LedgerApi,
};
pub use keys::{Keypair, PublicKey};
pub use memo::{Memo, MemoKind};
pub use session::{Session, SessionParts};
pub use store::{Action, AppState, Settings, Theme};
pub use transaction::TransactionBuilder;
pub use xdr::TransactionEnvelope;

// Common result type
pub type Result<T> = std::result::Result<T, ViewerError>;
