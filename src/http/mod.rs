//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, serving snapshot)
//!     → request.rs (request ID)
//!     → handler.rs (auth, routing, policy, coalesced fetch)
//!     → response.rs (passthrough or synthetic body, CORS + diagnostics)
//!     → Send to client
//! ```

pub mod handler;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use response::{header_names, ResponseComposer};
pub use server::{AppState, HttpServer, ServerError, ServingState};
