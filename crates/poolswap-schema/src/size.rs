//! Human-readable byte sizes (`4G`, `512M`, `1073741824`).
//!
//! Suffixes are binary: `K` = 1024, `M` = 1024², `G` = 1024³, `T` = 1024⁴.
//! A trailing `B` or `iB` after a unit letter is accepted and ignored, so
//! `4G`, `4GB` and `4GiB` are the same size. A bare `4B` is rejected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const UNITS: [(char, u64); 4] = [
    ('T', 1 << 40),
    ('G', 1 << 30),
    ('M', 1 << 20),
    ('K', 1 << 10),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SizeError {
    #[error("size must not be empty")]
    Empty,
    #[error("invalid size '{0}': expected a byte count or a number with K/M/G/T suffix")]
    Invalid(String),
    #[error("size '{0}' does not fit in 64 bits")]
    Overflow(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SwapSize(u64);

impl SwapSize {
    pub const fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    pub const fn bytes(self) -> u64 {
        self.0
    }
}

impl FromStr for SwapSize {
    type Err = SizeError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(SizeError::Empty);
        }

        let upper = trimmed.to_ascii_uppercase();
        let without_b = ["IB", "B"]
            .into_iter()
            .find_map(|suffix| upper.strip_suffix(suffix))
            .filter(|rest| rest.ends_with(|c: char| UNITS.iter().any(|(unit, _)| *unit == c)))
            .unwrap_or(&upper);

        let (digits, multiplier) = match without_b.chars().last() {
            Some(c) if c.is_ascii_digit() => (without_b, 1),
            Some(c) => {
                let Some((_, mult)) = UNITS.iter().find(|(unit, _)| *unit == c) else {
                    return Err(SizeError::Invalid(input.to_owned()));
                };
                (&without_b[..without_b.len() - 1], *mult)
            }
            None => return Err(SizeError::Invalid(input.to_owned())),
        };

        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(SizeError::Invalid(input.to_owned()));
        }
        let value: u64 = digits
            .parse()
            .map_err(|_| SizeError::Overflow(input.to_owned()))?;
        value
            .checked_mul(multiplier)
            .map(Self)
            .ok_or_else(|| SizeError::Overflow(input.to_owned()))
    }
}

impl TryFrom<String> for SwapSize {
    type Error = SizeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SwapSize> for String {
    fn from(size: SwapSize) -> Self {
        size.to_string()
    }
}

impl fmt::Display for SwapSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 > 0 {
            for (unit, mult) in UNITS {
                if self.0 % mult == 0 {
                    return write!(f, "{}{unit}", self.0 / mult);
                }
            }
        }
        write!(f, "{}", self.0)
    }
}
