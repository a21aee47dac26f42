//! Cache policy and in-flight coalescing.
//!
//! # Data Flow
//! ```text
//! (route kind, bypass)
//!     → policy.rs (Override with TTL/SWR/SIE, or Pass)
//!
//! canonical key + producer
//!     → coalescer.rs (join running fetch, or start one)
//!     → shared result to every caller
//! ```
//!
//! # Design Decisions
//! - No response storage here; the edge cache is external
//! - Coalescer is owned by the server state and injected, never global

pub mod coalescer;
pub mod policy;

pub use coalescer::{Coalesced, InflightCoalescer, ProducerAborted, Role};
pub use policy::{CacheDisposition, CachePolicy, PolicySelector};
