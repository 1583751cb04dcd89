//! Request path matching strategies.
//!
//! # Data Flow
//! ```text
//! Rule evaluation (current request path)
//!     → matcher.rs (Matcher trait, MatchResult with captures)
//!     → pattern.rs (servlet-style: exact, /prefix/*, *.ext, /)
//!     → regex.rs (regular expressions, positional + named groups)
//!     → Return: MatchResult or None
//! ```
//!
//! # Design Decisions
//! - Matchers are compiled at configuration time; bad patterns fail there
//! - Matching is case-sensitive on the path
//! - Captures are owned so rules can use them after the request is moved

pub mod matcher;
pub mod pattern;
pub mod regex;

pub use matcher::{MatchResult, Matcher};
pub use pattern::PathPattern;
pub use self::regex::{expand_empty, PathRegex};
