//! The rule contract.

use std::fmt;

use crate::lifecycle::Lifecycle;
use crate::rewrite::{RewriteError, RuleHandler};

/// Outcome of offering a request to a rule.
#[derive(Debug)]
pub enum Applied {
    /// The rule matched; this handler is the new head of the chain. It may be
    /// the input itself when the rule only touched attributes.
    Matched(RuleHandler),
    /// The rule did not match; the input is handed back untouched.
    Unmatched(RuleHandler),
}

impl Applied {
    pub fn is_match(&self) -> bool {
        matches!(self, Applied::Matched(_))
    }

    pub fn into_handler(self) -> RuleHandler {
        match self {
            Applied::Matched(handler) | Applied::Unmatched(handler) => handler,
        }
    }
}

/// A unit of request matching and rewriting.
///
/// Rules are built at configuration time and shared read-only between every
/// request in flight.
pub trait Rule: Send + Sync + fmt::Debug {
    /// Whether a match stops evaluation of the remaining rules of the
    /// enclosing container.
    fn is_terminating(&self) -> bool {
        false
    }

    fn match_and_apply(&self, input: RuleHandler) -> Result<Applied, RewriteError>;

    /// Composite rules expose their lifecycle so enclosing containers can
    /// start and stop them.
    fn lifecycle(&self) -> Option<&dyn Lifecycle> {
        None
    }
}
