//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (structured fields, no secrets)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → logging.rs subscriber installed by the CLI
//!     → any `metrics` recorder the embedding application installs
//! ```

pub mod logging;
pub mod metrics;
