//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → OPTIONS preflight answered before authentication
//!     → auth.rs (header or query shared secret, strip query credential)
//!     → Pass to routing
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject when neither credential matches
//! - The query credential never survives past the gate

pub mod auth;

pub use auth::AuthGate;
