//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Build rules → Start RewriteStage
//!         → start RuleContainer → start nested containers
//!     → Bind listener → Accept traffic
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain in-flight requests
//!     → Stop RewriteStage (declines anything still arriving)
//! ```
//!
//! # Design Decisions
//! - The stage only handles requests while started
//! - Components own their children's lifecycle (stage → container → nested)

pub mod shutdown;

pub use shutdown::Shutdown;

/// Start/stop state of a long-lived component.
pub trait Lifecycle {
    fn start(&self);
    fn stop(&self);
    fn is_started(&self) -> bool;
}
