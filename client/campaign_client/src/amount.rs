//! Fixed-point monetary amounts.
//!
//! A [`MonetaryAmount`] is an integer count of the ledger's smallest unit
//! (wei). The display unit (ether) is that integer shifted by
//! [`DISPLAY_DECIMALS`] places. Conversion into base units is exact; display
//! formatting truncates toward zero when fewer digits are requested.

use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Number of fractional digits in the display unit.
pub const DISPLAY_DECIMALS: u32 = 18;

const BASE_UNITS_PER_DISPLAY_UNIT: u128 = 10u128.pow(DISPLAY_DECIMALS);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("amount is negative: {0}")]
    Negative(String),

    #[error("not a number: {0}")]
    NotNumeric(String),

    #[error("more than 18 fractional digits: {0}")]
    TooPrecise(String),

    #[error("amount out of range: {0}")]
    Overflow(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonetaryAmount(u128);

impl MonetaryAmount {
    pub const ZERO: MonetaryAmount = MonetaryAmount(0);

    pub const fn from_base_units(units: u128) -> Self {
        MonetaryAmount(units)
    }

    pub const fn base_units(&self) -> u128 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: MonetaryAmount) -> Option<MonetaryAmount> {
        self.0.checked_add(other.0).map(MonetaryAmount)
    }

    /// Parse the ledger's native representation: a base-10 unsigned integer
    /// of base units.
    pub fn parse_base_units(raw: &str) -> Result<Self, AmountError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AmountError::Empty);
        }
        if !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::NotNumeric(raw.to_string()));
        }
        raw.parse::<u128>()
            .map(MonetaryAmount)
            .map_err(|_| AmountError::Overflow(raw.to_string()))
    }

    /// Parse a user-entered display-unit quantity such as `"0.001"`.
    pub fn parse_display(raw: &str) -> Result<Self, AmountError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AmountError::Empty);
        }
        if raw.starts_with('-') {
            return Err(AmountError::Negative(raw.to_string()));
        }

        let (whole, fraction) = match raw.split_once('.') {
            Some((w, f)) => (w, f),
            None => (raw, ""),
        };
        let digits_only = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !digits_only(whole) || !digits_only(fraction)
        {
            return Err(AmountError::NotNumeric(raw.to_string()));
        }
        if fraction.len() > DISPLAY_DECIMALS as usize {
            return Err(AmountError::TooPrecise(raw.to_string()));
        }

        let overflow = || AmountError::Overflow(raw.to_string());
        let whole_units = if whole.is_empty() {
            0
        } else {
            whole.parse::<u128>().map_err(|_| overflow())?
        };
        let fraction_units = if fraction.is_empty() {
            0
        } else {
            let scale = 10u128.pow(DISPLAY_DECIMALS - fraction.len() as u32);
            fraction.parse::<u128>().map_err(|_| overflow())? * scale
        };

        whole_units
            .checked_mul(BASE_UNITS_PER_DISPLAY_UNIT)
            .and_then(|w| w.checked_add(fraction_units))
            .map(MonetaryAmount)
            .ok_or_else(overflow)
    }

    /// Render with exactly `places` fractional digits, truncating toward zero.
    pub fn format_truncated(&self, places: u32) -> String {
        let whole = self.0 / BASE_UNITS_PER_DISPLAY_UNIT;
        if places == 0 {
            return whole.to_string();
        }
        let places = places.min(DISPLAY_DECIMALS);
        let fraction = self.0 % BASE_UNITS_PER_DISPLAY_UNIT;
        let kept = fraction / 10u128.pow(DISPLAY_DECIMALS - places);
        format!("{whole}.{kept:0width$}", width = places as usize)
    }
}

/// Full-precision display-unit rendering: trailing zeros trimmed, at least
/// one fractional digit (`1.0`, `0.001`).
impl fmt::Display for MonetaryAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / BASE_UNITS_PER_DISPLAY_UNIT;
        let fraction = self.0 % BASE_UNITS_PER_DISPLAY_UNIT;
        let padded = format!("{fraction:0width$}", width = DISPLAY_DECIMALS as usize);
        let trimmed = padded.trim_end_matches('0');
        let trimmed = if trimmed.is_empty() { "0" } else { trimmed };
        write!(f, "{whole}.{trimmed}")
    }
}

impl Serialize for MonetaryAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
