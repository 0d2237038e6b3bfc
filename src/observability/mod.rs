//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Compilation stages produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters via the `metrics` facade)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → whatever recorder the embedding process installs
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event (pattern, kind, function, digest)
//! - `info!` per compiled table and pipeline, `debug!` per behavior and handler
//! - Metrics are counters only; compilation is not latency-sensitive

pub mod logging;
pub mod metrics;
