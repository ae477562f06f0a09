//! Ledger data access
//!
//! - `client` - `LedgerApi` trait and the Horizon HTTP client
//! - `types` - raw response shapes
//! - `view` - account, history, claimable balance and fee views

pub mod client;
pub mod types;
pub mod view;

pub use client::{HorizonClient, LedgerApi, SubmitResult};
pub use view::{
    filter_dust, AccountInfo, ClaimableBalance, Congestion, Direction, FeeStats, HistoryEntry,
    HistoryKind, NativeBalance, OperationEntry, Page, HISTORY_PAGE_SIZE, MIN_ACCOUNT_BALANCE,
};
