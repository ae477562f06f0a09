//! Error types for account viewer operations
//!
//! Validation problems are not errors here: they are collected as
//! [`crate::flow::FieldErrors`] and attached to the draft. Everything below is
//! a failure of a network call, a codec, a signer or local storage.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Horizon returned {status}: {detail}")]
    Horizon { status: u16, detail: String },

    #[error("{message}")]
    Submission {
        message: String,
        result_codes: Vec<String>,
    },

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid memo: {0}")]
    InvalidMemo(String),

    #[error("XDR error: {0}")]
    Xdr(String),

    #[error("{0}")]
    Signing(String),

    #[error("Federation error: {0}")]
    Federation(String),

    #[error("Connector error: {0}")]
    Connector(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

impl From<reqwest::Error> for ViewerError {
    fn from(err: reqwest::Error) -> Self {
        ViewerError::Network(err.to_string())
    }
}

impl ViewerError {
    /// Create a submission error from a ledger rejection
    pub fn submission(message: impl Into<String>, result_codes: Vec<String>) -> Self {
        Self::Submission {
            message: message.into(),
            result_codes,
        }
    }

    /// True when the ledger reported the resource as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, ViewerError::Horizon { status: 404, .. })
    }

    /// Message suitable for showing next to the control that triggered the call
    pub fn display_message(&self) -> String {
        match self {
            ViewerError::Submission {
                message,
                result_codes,
            } if !result_codes.is_empty() => {
                format!("{} ({})", message, result_codes.join(", "))
            }
            other => other.to_string(),
        }
    }
}
