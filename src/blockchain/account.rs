//! Account number and sequence tracking for the session address.

use crate::blockchain::client::RestClient;
use crate::blockchain::types::{AccountState, BluzelleError, BluzelleResult};
use crate::observability::metrics;

/// Latest known account state of one address.
///
/// Only the transaction worker mutates it, so it needs no synchronization of
/// its own.
#[derive(Debug, Clone)]
pub struct AccountTracker {
    address: String,
    state: AccountState,
}

impl AccountTracker {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            state: AccountState::default(),
        }
    }

    /// Resynchronize from the network.
    ///
    /// Returns whether the sequence changed. The account number is always
    /// overwritten.
    pub async fn refresh(&mut self, client: &RestClient) -> BluzelleResult<bool> {
        let data = client.get_account(&self.address).await.map_err(|e| match e {
            BluzelleError::Initialization(_) => e,
            other => BluzelleError::Initialization(other.to_string()),
        })?;

        metrics::record_account_refresh();
        Ok(self.apply(data.state()))
    }

    /// Store a freshly fetched state; true when the sequence moved.
    pub(crate) fn apply(&mut self, fetched: AccountState) -> bool {
        let changed = fetched.sequence != self.state.sequence;
        if changed {
            tracing::debug!(
                address = %self.address,
                old_sequence = self.state.sequence,
                new_sequence = fetched.sequence,
                "Account sequence updated"
            );
        }
        self.state = fetched;
        changed
    }

    /// Record a committed transaction.
    pub fn increment_sequence(&mut self) {
        self.state.sequence += 1;
    }

    pub fn state(&self) -> AccountState {
        self.state
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}
