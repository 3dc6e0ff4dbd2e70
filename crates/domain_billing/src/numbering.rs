//! Bill numbering sequence
//!
//! Bill numbers look like `BILL-0007`. Older records may use the unseparated
//! form `BILL0007`; both are read by taking the run of digits at the end of
//! the number. The next number is one more than the largest suffix found.
//!
//! Reading the existing numbers and inserting the new bill must happen in the
//! same transaction while the numbering lock is held, otherwise two
//! concurrent creations could compute the same number.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BillingError;

/// Prefix used when none is configured
pub const DEFAULT_PREFIX: &str = "BILL";

/// Minimum number of digits in the suffix
pub const DEFAULT_WIDTH: usize = 4;

/// A formatted bill number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillNumber {
    prefix: String,
    sequence: u64,
    width: usize,
}

impl BillNumber {
    /// Numeric suffix
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Prefix before the separator
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl fmt::Display for BillNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The suffix grows past `width` digits once the sequence needs it
        write!(f, "{}-{:0width$}", self.prefix, self.sequence, width = self.width)
    }
}

/// Generator of bill numbers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberingSequence {
    prefix: String,
    width: usize,
}

impl Default for NumberingSequence {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl NumberingSequence {
    /// Creates a sequence with the given prefix and the default width
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            width: DEFAULT_WIDTH,
        }
    }

    /// Sets the minimum suffix width
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(1);
        self
    }

    /// Configured prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Extracts the trailing numeric suffix of a bill number
    ///
    /// Returns `None` when the number does not end in a digit or the suffix
    /// does not fit in a `u64`.
    pub fn suffix_of(number: &str) -> Option<u64> {
        let number = number.trim_end();
        let start = number
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_digit())
            .last()
            .map(|(index, _)| index)?;
        number[start..].parse().ok()
    }

    /// Formats a specific sequence value
    pub fn format(&self, sequence: u64) -> BillNumber {
        BillNumber {
            prefix: self.prefix.clone(),
            sequence,
            width: self.width,
        }
    }

    /// Derives the number following every existing one
    ///
    /// # Arguments
    ///
    /// * `existing` - Every bill number currently stored, in any format
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the sequence is exhausted
    pub fn next<'a, I>(&self, existing: I) -> Result<BillNumber, BillingError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let max = existing
            .into_iter()
            .filter_map(Self::suffix_of)
            .max()
            .unwrap_or(0);

        let sequence = max
            .checked_add(1)
            .ok_or_else(|| BillingError::Internal("bill number sequence exhausted".to_string()))?;

        Ok(self.format(sequence))
    }
}
