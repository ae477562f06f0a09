//! Fixed-point native amounts
//!
//! Amounts are carried as whole stroops. 10,000,000 stroops make one unit of
//! the native asset, so decimal strings have at most 7 fractional digits.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ViewerError;

pub const STROOPS_PER_UNIT: i64 = 10_000_000;
const DECIMALS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_stroops(stroops: i64) -> Self {
        Self(stroops)
    }

    pub const fn from_units(units: i64) -> Self {
        Self(units * STROOPS_PER_UNIT)
    }

    pub const fn stroops(self) -> i64 {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Subtraction clamped at zero, for "what is left to spend" style math
    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0).max(0))
    }

    /// Decimal form without trailing zeros ("1.5", "100")
    pub fn to_trimmed_string(self) -> String {
        let full = self.to_string();
        let trimmed = full.trim_end_matches('0').trim_end_matches('.');
        trimmed.to_string()
    }
}

impl fmt::Display for Amount {
    /// Seven-decimal form, the way the ledger API prints amounts
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let unit = STROOPS_PER_UNIT as u64;
        write!(f, "{}{}.{:07}", sign, abs / unit, abs % unit)
    }
}

impl FromStr for Amount {
    type Err = ViewerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() {
            return Err(ViewerError::InvalidAmount("amount is empty".to_string()));
        }

        let (negative, body) = match input.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, input.strip_prefix('+').unwrap_or(input)),
        };

        let (whole, fraction) = match body.split_once('.') {
            Some((w, f)) => (w, f),
            None => (body, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(ViewerError::InvalidAmount(format!("'{}' is not a number", s)));
        }
        if !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ViewerError::InvalidAmount(format!("'{}' is not a number", s)));
        }
        if fraction.len() > DECIMALS {
            return Err(ViewerError::InvalidAmount(format!(
                "at most {} decimal places are allowed",
                DECIMALS
            )));
        }

        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| ViewerError::InvalidAmount(format!("'{}' is too large", s)))?
        };
        let fraction_value: i64 = if fraction.is_empty() {
            0
        } else {
            format!("{:0<7}", fraction)
                .parse()
                .map_err(|_| ViewerError::InvalidAmount(format!("'{}' is not a number", s)))?
        };

        let stroops = whole_value
            .checked_mul(STROOPS_PER_UNIT)
            .and_then(|v| v.checked_add(fraction_value))
            .ok_or_else(|| ViewerError::InvalidAmount(format!("'{}' is too large", s)))?;

        Ok(Amount(if negative { -stroops } else { stroops }))
    }
}

// The ledger API sends amounts as decimal strings ("100.0000000")
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
