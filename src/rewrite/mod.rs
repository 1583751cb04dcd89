//! Request rewrite subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (parts + body)
//!     → stage.rs (RewriteStage::handle, lifecycle gate)
//!     → chain.rs (head RuleHandler wraps the original parts)
//!     → container.rs (rules evaluated in insertion order)
//!         → each matching rule wraps the current RuleHandler
//!         → a terminating match stops its own container only
//!     → No match: original request dispatched untouched
//!     → Match: downstream bound as terminal of the last RuleHandler
//!         → node effects run head first (may short-circuit)
//!         → terminal dispatches the rewritten request
//!     → handler.rs (Callback completed exactly once)
//! ```
//!
//! # Design Decisions
//! - Requests are wrapped, never mutated in place
//! - Rule lists are copy-on-write snapshots; evaluation never locks
//! - Rule evaluation is synchronous; suspension only happens downstream
//! - Completion travels through a oneshot channel, consumed by move

pub mod chain;
pub mod container;
pub mod error;
pub mod gated;
pub mod handler;
pub mod rule;
pub mod stage;

pub use chain::{Attributes, Flow, Interceptor, RuleChain, RuleHandler};
pub use container::RuleContainer;
pub use error::{RewriteError, RuleError};
pub use gated::{Gate, GatedRuleContainer, VirtualHosts};
pub use handler::{Callback, Completion, Handled, Handler};
pub use rule::{Applied, Rule};
pub use stage::RewriteStage;
