//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Mnemonic (config or BLUZELLE_MNEMONIC)
//!     → wallet.rs (key derivation, address check)
//!     → account.rs (account number and sequence)
//!     → transaction.rs (template, gas, sign, broadcast, interpret)
//!         ├→ gas.rs (fee and gas limits)
//!         ├→ signer.rs + canonical.rs (sign document)
//!         └→ client.rs (REST gateway)
//! ```
//!
//! # Security Constraints
//! - Mnemonics and private keys are never logged
//! - Every REST call is bounded by the configured request timeout

pub mod account;
pub mod canonical;
pub mod client;
pub mod gas;
pub mod signer;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use account::AccountTracker;
pub use client::{RestClient, TxMethod};
pub use gas::GasInfo;
pub use transaction::TxExecutor;
pub use types::{AccountData, AccountState, BluzelleError, BluzelleResult, TxOutcome};
pub use wallet::Wallet;
