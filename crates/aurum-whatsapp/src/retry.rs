// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Explicit retry policy for provider sends.
//!
//! Retry behavior is a value, not control flow buried in the send loop:
//! whether to retry is a pure function of (error, attempt), and the backoff
//! schedule is a pure function of the attempt number, so both are testable
//! without a clock or a provider.

use std::time::Duration;

use aurum_core::types::SendError;

/// Retry schedule for transient provider failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total send attempts per message, first try included.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent retry.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Whether another attempt should follow the given failed one (1-based).
    ///
    /// Permanent errors are never retried, regardless of budget.
    pub fn should_retry(&self, error: &SendError, attempt: u32) -> bool {
        error.is_transient() && attempt < self.max_attempts
    }

    /// Backoff delay after the given failed attempt (1-based), doubling
    /// per attempt: base, 2*base, 4*base, ...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay * 2u32.pow(exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}
