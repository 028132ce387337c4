//! Client library for the Bluzelle key-value database chain.

pub mod blockchain;
pub mod config;
pub mod database;
pub mod observability;
pub mod resilience;

pub use blockchain::{BluzelleError, BluzelleResult, GasInfo};
pub use config::schema::ClientConfig;
pub use database::{BluzelleClient, KeyLease, Lease};
