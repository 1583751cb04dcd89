//! Collapse repeated slashes in the request path.

use crate::rewrite::{Applied, Rule, RewriteError, RuleHandler};

/// `//a///b` becomes `/a/b`; the query is kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactPathRule {
    terminating: bool,
}

impl CompactPathRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn terminating(mut self, terminating: bool) -> Self {
        self.terminating = terminating;
        self
    }
}

impl Rule for CompactPathRule {
    fn is_terminating(&self) -> bool {
        self.terminating
    }

    fn match_and_apply(&self, input: RuleHandler) -> Result<Applied, RewriteError> {
        if !input.path().contains("//") {
            return Ok(Applied::Unmatched(input));
        }
        let compacted = compact(input.path());
        Ok(Applied::Matched(RuleHandler::wrap(input).with_path(&compacted)?))
    }
}

fn compact(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;

    #[test]
    fn test_compacts_slashes_and_keeps_query() {
        let (parts, _) = Request::builder()
            .uri("//a///b/?q=1")
            .body(Body::empty())
            .unwrap()
            .into_parts();

        let applied = CompactPathRule::new().match_and_apply(RuleHandler::new(parts)).unwrap();
        assert!(applied.is_match());
        assert_eq!(applied.into_handler().uri().to_string(), "/a/b/?q=1");
    }

    #[test]
    fn test_clean_path_untouched() {
        let (parts, _) = Request::builder().uri("/a/b").body(Body::empty()).unwrap().into_parts();
        assert!(!CompactPathRule::new().match_and_apply(RuleHandler::new(parts)).unwrap().is_match());
        assert_eq!(compact("a//b"), "a/b");
    }
}
