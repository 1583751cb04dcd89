//! Rules built from closures.

use std::fmt;

use crate::rewrite::{Applied, Rule, RewriteError, RuleHandler};

/// A rule from a predicate and an action.
///
/// The action receives a fresh node wrapping the current request and returns
/// it with its overrides applied.
///
/// ```ignore
/// let rule = FnRule::new(
///     |request| request.path().starts_with("/legacy"),
///     |node| Ok(node.with_attribute("legacy", "true")),
/// );
/// ```
pub struct FnRule<P, A> {
    predicate: P,
    action: A,
    terminating: bool,
}

impl<P, A> FnRule<P, A>
where
    P: Fn(&RuleHandler) -> bool + Send + Sync,
    A: Fn(RuleHandler) -> Result<RuleHandler, RewriteError> + Send + Sync,
{
    pub fn new(predicate: P, action: A) -> Self {
        Self {
            predicate,
            action,
            terminating: false,
        }
    }

    pub fn terminating(mut self, terminating: bool) -> Self {
        self.terminating = terminating;
        self
    }
}

impl<P, A> fmt::Debug for FnRule<P, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRule")
            .field("terminating", &self.terminating)
            .finish_non_exhaustive()
    }
}

impl<P, A> Rule for FnRule<P, A>
where
    P: Fn(&RuleHandler) -> bool + Send + Sync,
    A: Fn(RuleHandler) -> Result<RuleHandler, RewriteError> + Send + Sync,
{
    fn is_terminating(&self) -> bool {
        self.terminating
    }

    fn match_and_apply(&self, input: RuleHandler) -> Result<Applied, RewriteError> {
        if !(self.predicate)(&input) {
            return Ok(Applied::Unmatched(input));
        }
        Ok(Applied::Matched((self.action)(RuleHandler::wrap(input))?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;

    fn head(uri: &str) -> RuleHandler {
        let (parts, _) = Request::builder().uri(uri).body(Body::empty()).unwrap().into_parts();
        RuleHandler::new(parts)
    }

    #[test]
    fn test_predicate_and_action() {
        let rule = FnRule::new(
            |request: &RuleHandler| request.path().starts_with("/legacy"),
            |node: RuleHandler| Ok(node.with_attribute("legacy", "true")),
        );

        let handler = rule.match_and_apply(head("/legacy/page")).unwrap().into_handler();
        assert_eq!(handler.attribute("legacy"), Some("true"));
        assert!(!rule.match_and_apply(head("/modern")).unwrap().is_match());
    }

    #[test]
    fn test_action_errors_propagate() {
        let rule = FnRule::new(
            |_: &RuleHandler| true,
            |_: RuleHandler| Err(RewriteError::Rule("rejected".into())),
        )
        .terminating(true);

        assert!(rule.is_terminating());
        assert!(rule.match_and_apply(head("/")).is_err());
    }
}
