use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::amount::Amount;
use crate::config::{Network, ViewerConfig};
use crate::connector::{ConnectionMethod, ConnectionState, RateLimiter};
use crate::error::ViewerError;
use crate::horizon::{AccountInfo, ClaimableBalance, HistoryEntry, OperationEntry, Page};

/// Storage key the theme preference is kept under
pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        })
    }
}

impl FromStr for Theme {
    type Err = ViewerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(ViewerError::Config(format!("unknown theme '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub network: Network,
    pub theme: Theme,
    pub hide_dust: bool,
    pub dust_threshold: Amount,
}

impl Settings {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            network: config.network,
            theme: Theme::default(),
            hide_dust: true,
            dust_threshold: config.dust_threshold,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(&ViewerConfig::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountSlice {
    pub info: Option<AccountInfo>,
    pub loading: bool,
    pub error: Option<String>,
}

/// A newest-first listing loaded one page at a time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagedSlice<T> {
    /// Newest first, unfiltered
    pub entries: Vec<T>,
    pub next_cursor: Option<String>,
    /// The last page came back short
    pub complete: bool,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for PagedSlice<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_cursor: None,
            complete: false,
            loading: false,
            error: None,
        }
    }
}

impl<T> PagedSlice<T> {
    pub(crate) fn start_loading(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Replace the entries, or append an older page when `append` is set
    pub(crate) fn apply_page(&mut self, page: Page<T>, append: bool, page_size: u32) {
        let short = page.records.len() < page_size as usize;
        if append {
            self.entries.extend(page.records);
            if page.next_cursor.is_some() {
                self.next_cursor = page.next_cursor;
            }
        } else {
            self.entries = page.records;
            self.next_cursor = page.next_cursor;
        }
        self.complete = short;
        self.loading = false;
        self.error = None;
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.loading = false;
        self.error = Some(message);
    }

    /// Cursor for the next older page, if there is one
    pub fn more_cursor(&self) -> Option<&str> {
        match &self.next_cursor {
            Some(cursor) if !self.complete => Some(cursor.as_str()),
            _ => None,
        }
    }
}

/// Payment history
pub type HistorySlice = PagedSlice<HistoryEntry>;

/// Full operation listing
pub type OperationsSlice = PagedSlice<OperationEntry>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimableSlice {
    pub balances: Vec<ClaimableBalance>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletSlice {
    pub method: Option<ConnectionMethod>,
    pub connection: ConnectionState,
    /// Current sign-in attempt; results of older attempts are dropped
    pub attempt: u64,
    /// Secret key attempts; survives closing the sign-in dialog and sign-out
    pub limiter: RateLimiter,
}

impl WalletSlice {
    /// A new sign-in may start unless one is running or the wallet is connected
    pub fn can_start_sign_in(&self) -> bool {
        matches!(
            self.connection,
            ConnectionState::Idle | ConnectionState::Error(_)
        )
    }
}
