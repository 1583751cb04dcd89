//! Rewrite Proxy Library
//!
//! An HTTP front end whose requests pass through a chain of rewrite rules
//! before reaching the upstream server.
//!
//! ```text
//!     Client Request
//!     ─────▶ http::server ─▶ rewrite::RewriteStage ─▶ rules (container order)
//!                                  │
//!                                  ├─ no match ───────────▶ http::upstream
//!                                  ├─ rewritten ──────────▶ http::upstream
//!                                  └─ redirect / response ─▶ answered here
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod matching;
pub mod observability;
pub mod rewrite;
pub mod rules;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::{Lifecycle, Shutdown};
pub use rewrite::{RewriteStage, Rule, RuleContainer};
