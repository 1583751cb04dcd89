//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! RewriteStage / RuleChain / HttpServer produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (outcome counters, loaded rule gauge)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every log line of a request
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
