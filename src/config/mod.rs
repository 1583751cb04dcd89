//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, every rule built once)
//!     → ProxyConfig (validated, immutable)
//!     → rules.rs builds the live RuleContainer for the rewrite stage
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server swaps the new rule list into the live container
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Only the rules are hot-reloaded; listener and upstream need a restart

pub mod loader;
pub mod rules;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use rules::RuleConfig;
pub use schema::ProxyConfig;
pub use watcher::ConfigWatcher;
