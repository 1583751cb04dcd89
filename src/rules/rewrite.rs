//! Path and query rewriting.

use axum::http::uri::PathAndQuery;

use super::{Action, MatchRule, Replacement};
use crate::matching::{expand_empty, MatchResult, PathPattern, PathRegex};
use crate::rewrite::{RewriteError, RuleError, RuleHandler};

/// Replace the path, and optionally merge extra query parameters.
///
/// A `?` in the replacement splits it: the part after it is appended to the
/// request query (`original&added`). Without one the request query is kept.
#[derive(Debug, Clone)]
pub struct RewritePath {
    path: Replacement,
    query: Option<Replacement>,
}

impl RewritePath {
    /// Literal replacement; the path info of a prefix match is appended.
    pub fn pattern(replacement: &str) -> Result<Self, RuleError> {
        validate(replacement)?;
        let (path, query) = split(replacement);
        Ok(Self {
            path: Replacement::path_info(path),
            query: query.map(|q| Replacement::Literal(q.to_owned())),
        })
    }

    /// Replacement expanding `$n` / `${name}` regex captures.
    pub fn regex(replacement: &str) -> Result<Self, RuleError> {
        let (path, query) = split(replacement);
        if path.is_empty() {
            return Err(RuleError::InvalidReplacement {
                replacement: replacement.to_owned(),
                reason: "path part is empty",
            });
        }
        validate_template(replacement)?;
        Ok(Self {
            path: Replacement::Template(path.to_owned()),
            query: query.map(|q| Replacement::Template(q.to_owned())),
        })
    }
}

impl Action for RewritePath {
    fn apply(&self, input: RuleHandler, result: &MatchResult) -> Result<RuleHandler, RewriteError> {
        let path = self.path.render(result);
        let query = match (&self.query, input.query()) {
            (None, original) => original.map(str::to_owned),
            (Some(added), None) => Some(added.render(result)),
            (Some(added), Some(original)) => Some(format!("{original}&{}", added.render(result))),
        };
        RuleHandler::wrap(input).with_path_and_query(&path, query.as_deref())
    }
}

fn split(replacement: &str) -> (&str, Option<&str>) {
    match replacement.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (replacement, None),
    }
}

fn validate(replacement: &str) -> Result<(), RuleError> {
    if !replacement.starts_with('/') {
        return Err(RuleError::InvalidReplacement {
            replacement: replacement.to_owned(),
            reason: "must start with '/'",
        });
    }
    PathAndQuery::try_from(replacement).map_err(|_| RuleError::InvalidReplacement {
        replacement: replacement.to_owned(),
        reason: "not a valid path",
    })?;
    Ok(())
}

/// Captures come from a valid request path, so the template is valid once
/// its literal parts are.
fn validate_template(replacement: &str) -> Result<(), RuleError> {
    let expanded = expand_empty(replacement)?;
    let target = if expanded.starts_with('/') {
        expanded
    } else {
        format!("/{expanded}")
    };
    PathAndQuery::try_from(target).map_err(|_| RuleError::InvalidReplacement {
        replacement: replacement.to_owned(),
        reason: "not a valid path once expanded",
    })?;
    Ok(())
}

pub type RewritePatternRule = MatchRule<PathPattern, RewritePath>;
pub type RewriteRegexRule = MatchRule<PathRegex, RewritePath>;

impl MatchRule<PathPattern, RewritePath> {
    pub fn new(pattern: &str, replacement: &str) -> Result<Self, RuleError> {
        Self::pattern(pattern, RewritePath::pattern(replacement)?)
    }
}

impl MatchRule<PathRegex, RewritePath> {
    pub fn new(regex: &str, replacement: &str) -> Result<Self, RuleError> {
        Self::regex(regex, RewritePath::regex(replacement)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::{Applied, Rule};
    use axum::body::Body;
    use axum::http::Request;

    fn head(uri: &str) -> RuleHandler {
        let (parts, _) = Request::builder().uri(uri).body(Body::empty()).unwrap().into_parts();
        RuleHandler::new(parts)
    }

    fn rewrite(rule: &dyn Rule, uri: &str) -> Option<String> {
        match rule.match_and_apply(head(uri)).unwrap() {
            Applied::Matched(handler) => Some(handler.uri().to_string()),
            Applied::Unmatched(_) => None,
        }
    }

    #[test]
    fn test_old_to_new_prefix() {
        let rule = RewritePatternRule::new("/old/*", "/new/*").unwrap();

        assert_eq!(rewrite(&rule, "/old/42").as_deref(), Some("/new/42"));
        assert_eq!(rewrite(&rule, "/old/a/b?x=1").as_deref(), Some("/new/a/b?x=1"));
        assert_eq!(rewrite(&rule, "/other"), None);
    }

    #[test]
    fn test_pattern_query_merge() {
        let rule = RewritePatternRule::new("/search", "/find?engine=local").unwrap();

        assert_eq!(rewrite(&rule, "/search").as_deref(), Some("/find?engine=local"));
        assert_eq!(rewrite(&rule, "/search?q=rust").as_deref(), Some("/find?q=rust&engine=local"));
    }

    #[test]
    fn test_regex_captures() {
        let rule = RewriteRegexRule::new(r"^/blog/(\d{4})/(?P<slug>[a-z-]+)$", "/posts/${slug}?year=$1").unwrap();

        assert_eq!(rewrite(&rule, "/blog/2024/hello-world").as_deref(), Some("/posts/hello-world?year=2024"));
        assert_eq!(rewrite(&rule, "/blog/latest"), None);
    }

    #[test]
    fn test_invalid_replacements() {
        assert!(RewritePatternRule::new("/a", "relative").is_err());
        assert!(RewritePatternRule::new("/a", "/with space").is_err());
        assert!(RewritePatternRule::new("/a/*/b", "/x").is_err());
        assert!(RewriteRegexRule::new("(", "/x").is_err());
        assert!(RewriteRegexRule::new("^/a", "?only=query").is_err());
        assert!(RewriteRegexRule::new(r"^/a/(\w+)$", "/with space/$1").is_err());
        assert!(RewriteRegexRule::new(r"^/a/(\w+)$", "/b/$1?q=a b").is_err());
        assert!(RewriteRegexRule::new(r"^/a/(\w+)$", "$1/tail").is_ok());
    }

    #[test]
    fn test_template_rejected_before_any_request() {
        let err = RewriteRegexRule::new(r"^/a/(\w+)$", "/with space/$1").unwrap_err();
        assert!(matches!(err, RuleError::InvalidReplacement { .. }));
    }

    #[test]
    fn test_rewrite_is_not_terminating_by_default() {
        let rule = RewritePatternRule::new("/a", "/b").unwrap();
        assert!(!rule.is_terminating());
        assert!(rule.terminating(true).is_terminating());
    }
}
