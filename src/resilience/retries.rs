//! Retry budget for stale-sequence recovery.
//!
//! # Responsibilities
//! - Bound the number of resync attempts per logical transaction
//! - Sleep a fixed interval before each attempt
//! - Track the total delay spent, for logging
//!
//! # Design Decisions
//! - The budget spans the whole transaction, including resubmissions
//! - Fixed interval between attempts, no exponential growth

use std::time::Duration;

use crate::config::RetryConfig;

/// Retry settings shared by every transaction of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_RETRIES: u32 = 10;
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

    pub fn new(max_retries: u32, interval: Duration) -> Self {
        Self {
            max_retries,
            interval,
        }
    }

    /// Fresh budget for one logical transaction.
    pub fn budget(&self) -> RetryBudget {
        RetryBudget {
            remaining: self.max_retries,
            interval: self.interval,
            waited: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_RETRIES, Self::DEFAULT_INTERVAL)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, Duration::from_millis(config.interval_ms))
    }
}

/// Remaining retries of one transaction.
#[derive(Debug, Clone)]
pub struct RetryBudget {
    remaining: u32,
    interval: Duration,
    waited: Duration,
}

impl RetryBudget {
    /// Consume one retry and sleep the interval.
    ///
    /// Returns false without sleeping once the budget is spent.
    pub async fn wait(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        tokio::time::sleep(self.interval).await;
        self.waited += self.interval;
        true
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Total time slept so far.
    pub fn waited(&self) -> Duration {
        self.waited
    }
}
