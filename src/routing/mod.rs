//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path, query)
//!     → router.rs (classify: health / route / unmatched)
//!     → matcher.rs (anchored path patterns, numeric id capture)
//!     → canonical.rs (sorted query, canonical key)
//!     → Return: UpstreamTarget { url, key, bypass }
//!
//! Route Compilation (at startup and on reload):
//!     ProxyConfig
//!     → fixed RouteDescriptor set
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path
//! - Deterministic: same input always matches same route and key

pub mod canonical;
pub mod matcher;
pub mod router;

pub use canonical::{CanonicalKey, QueryParams};
pub use matcher::{PathPattern, RouteKind};
pub use router::{QueryMode, RouteDescriptor, RouteMatch, Router, UpstreamTarget};
