//! Significance gate for emitted rows
//!
//! Decides whether a balance or aggregate is large enough to be written. It
//! never decides whether a ledger mutation happens.

use crate::value::ExactValue;

/// Inclusive minimum on presentation-scale magnitudes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignificanceFilter {
    threshold: f64,
}

impl SignificanceFilter {
    /// Create new filter
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Configured minimum
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// True if `balance` scaled by `decimals` is at least the threshold
    pub fn meets_threshold(&self, balance: &ExactValue, decimals: u8) -> bool {
        self.is_significant(balance.to_scaled_magnitude(decimals))
    }

    /// True if an already-scaled magnitude is at least the threshold
    pub fn is_significant(&self, magnitude: f64) -> bool {
        magnitude >= self.threshold
    }
}
