//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Transaction submitted:
//!     → chain reports "signature verification failed"
//!     → retries.rs (consume budget, wait fixed interval)
//!     → account resync; resubmit when the sequence moved
//!
//! Concurrent callers:
//!     → queue.rs (single worker, FIFO, one transaction in flight)
//! ```
//!
//! # Design Decisions
//! - Every transaction owns its budget; nothing is shared between them
//! - Ordering comes from the queue, so session state needs no lock
//! - Timeouts are left to the HTTP client

pub mod queue;
pub mod retries;

pub use queue::SerialQueue;
pub use retries::{RetryBudget, RetryPolicy};
