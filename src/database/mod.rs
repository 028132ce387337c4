//! Key-value database facade.
//!
//! # Data Flow
//! ```text
//! BluzelleClient method
//!     → operation.rs (command, path args, payload, verb)
//!     → Mode::Query        → RestClient::query (concurrent)
//!     → Mode::Transaction  → SerialQueue → TxExecutor::execute
//!     → types.rs (typed result: value, bool, keys, leases)
//! ```

pub mod client;
pub mod operation;
pub mod types;

pub use client::BluzelleClient;
pub use operation::{Mode, Operation};
pub use types::{KeyLease, KeyValue, Lease, BLOCK_TIME_SECS};
