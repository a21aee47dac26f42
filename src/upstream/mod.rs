//! Upstream subsystem.
//!
//! # Data Flow
//! ```text
//! UpstreamRequest { url, cache policy, backend }
//!     → fetcher.rs (attempt loop, retry budget)
//!     → transport.rs (one HTTP GET per attempt)
//!     → UpstreamOutcome { status, body, attempts } or FetchError
//! ```

pub mod fetcher;
pub mod transport;

pub use fetcher::{FetchError, FetchResult, OutcomeClass, UpstreamFetcher, UpstreamOutcome};
pub use transport::{HttpTransport, Transport, TransportError, UpstreamRequest, UpstreamResponse};
