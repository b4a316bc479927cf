//! Amounts in the ledger's native unit.
//!
//! Users speak decimal SOL; the wire speaks integer lamports. [`Amount`]
//! stores lamports and converts by splitting the decimal string, so no
//! float ever touches a balance.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{LAMPORTS_PER_SOL, SOL_DECIMALS};
use crate::error::{Result, WalletError};

/// Non-negative amount of the ledger's native currency.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Amount {
    lamports: u64,
}

impl Amount {
    /// Zero.
    pub const ZERO: Amount = Amount { lamports: 0 };

    /// Creates an amount from lamports.
    pub fn from_lamports(lamports: u64) -> Self {
        Self { lamports }
    }

    /// Parses a decimal SOL string such as `"1.5"`.
    ///
    /// # Errors
    /// `InvalidParameters` for negative or malformed values, more than nine
    /// significant fractional digits, or values that overflow `u64` lamports.
    pub fn parse_sol(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.starts_with('-') {
            return Err(WalletError::invalid(format!("negative amount: {s}")));
        }

        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty()) || !digits(whole) || !digits(frac) {
            return Err(WalletError::invalid(format!("invalid amount '{s}'")));
        }
        let frac = frac.trim_end_matches('0');
        if frac.len() > SOL_DECIMALS as usize {
            return Err(WalletError::invalid(format!(
                "amount {s} has more than {SOL_DECIMALS} decimal places"
            )));
        }

        let too_large = || WalletError::invalid(format!("amount {s} is too large"));
        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| too_large())?
        };
        let frac: u64 = if frac.is_empty() {
            0
        } else {
            format!("{frac:0<width$}", width = SOL_DECIMALS as usize)
                .parse()
                .map_err(|_| too_large())?
        };

        let lamports = whole
            .checked_mul(LAMPORTS_PER_SOL)
            .and_then(|l| l.checked_add(frac))
            .ok_or_else(too_large)?;
        Ok(Self { lamports })
    }

    /// Amount in lamports.
    pub fn lamports(&self) -> u64 {
        self.lamports
    }

    /// Returns true for zero.
    pub fn is_zero(&self) -> bool {
        self.lamports == 0
    }

    /// Checked addition.
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.lamports.checked_add(other.lamports).map(Amount::from_lamports)
    }

    /// Checked subtraction.
    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.lamports.checked_sub(other.lamports).map(Amount::from_lamports)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.lamports / LAMPORTS_PER_SOL;
        let frac = self.lamports % LAMPORTS_PER_SOL;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let frac = format!("{frac:0width$}", width = SOL_DECIMALS as usize);
        write!(f, "{whole}.{}", frac.trim_end_matches('0'))
    }
}

impl FromStr for Amount {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_sol(s)
    }
}

// Stored as a decimal SOL string so exports stay readable
impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse_sol(&s).map_err(serde::de::Error::custom)
    }
}
