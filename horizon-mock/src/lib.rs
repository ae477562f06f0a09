/// Horizon Mock Server Library
///
/// Serves the slice of the Horizon API, federation and account directory
/// endpoints that the account viewer talks to, backed by an in-memory ledger.
pub mod handlers;
pub mod server;
pub mod state;
pub mod types;

pub use server::{create_router, run_server, spawn};
pub use state::{MockLedger, Submission};
pub use types::{ClaimableBalanceJson, ClaimantJson, PaymentJson};
