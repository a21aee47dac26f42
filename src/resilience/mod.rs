//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Upstream attempt completes:
//!     → retries.rs (429/5xx or transport error? budget left?)
//!     → backoff.rs (optional delay, zero by default)
//!     → next attempt, or surface the last outcome verbatim
//! ```
//!
//! # Design Decisions
//! - Bounded attempts: default one retry (two attempts total)
//! - Upstream statuses are never translated, even after exhausting retries
//! - Per-attempt timeouts live in the transport

pub mod backoff;
pub mod retries;

pub use retries::{is_retryable_status, RetryPolicy};
