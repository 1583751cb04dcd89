//! HTTP front end.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, timeout/request-id/trace layers)
//!     → request.rs (request ID assigned or propagated)
//!     → RewriteStage (rules evaluated, chain invoked)
//!     → upstream.rs (rewritten request forwarded, callback completed)
//!     → response sent to client
//! ```

pub mod request;
pub mod server;
pub mod upstream;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::HttpServer;
pub use upstream::UpstreamHandler;
