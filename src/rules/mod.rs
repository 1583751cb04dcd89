//! Built-in rules.
//!
//! # Data Flow
//! ```text
//! RuleHandler (current request state)
//!     → MatchRule: matcher (pattern or regex) against the current path
//!     → on match: Action builds the next RuleHandler
//!         - rewrite.rs (path and query)
//!         - redirect.rs / response.rs (answer the request)
//!         - header.rs / cookie.rs (response decoration, request headers)
//!         - terminating.rs (stop, change nothing)
//!     → standalone rules: compact.rs, custom.rs
//! ```
//!
//! # Design Decisions
//! - Constructors validate everything (status codes, header names, patterns)
//! - Pattern replacements are literal unless they end in `/*`, where the path
//!   info of the match goes; regex replacements expand captures
//! - Redirects and responses default to terminating

pub mod compact;
pub mod cookie;
pub mod custom;
pub mod header;
pub mod redirect;
pub mod response;
pub mod rewrite;
pub mod terminating;

use std::fmt;

use crate::matching::{MatchResult, Matcher, PathPattern, PathRegex};
use crate::rewrite::{Applied, RewriteError, Rule, RuleError, RuleHandler};

pub use compact::CompactPathRule;
pub use cookie::CookiePatternRule;
pub use custom::FnRule;
pub use header::{ForceRequestHeaderRule, HeaderPatternRule, HeaderRegexRule, ResponseHeader};
pub use redirect::{Redirect, RedirectPatternRule, RedirectRegexRule};
pub use response::{Respond, ResponsePatternRule};
pub use rewrite::{RewritePath, RewritePatternRule, RewriteRegexRule};
pub use terminating::{Terminate, TerminatingPatternRule, TerminatingRegexRule};

/// What a matching rule does once its matcher accepted the request.
pub trait Action: Send + Sync + fmt::Debug {
    fn apply(&self, input: RuleHandler, result: &MatchResult) -> Result<RuleHandler, RewriteError>;
}

/// A rule made of a path matcher and an action.
#[derive(Debug)]
pub struct MatchRule<M, A> {
    matcher: M,
    action: A,
    terminating: bool,
}

impl<M: Matcher, A: Action> MatchRule<M, A> {
    pub fn from_parts(matcher: M, action: A) -> Self {
        Self {
            matcher,
            action,
            terminating: false,
        }
    }

    pub fn terminating(mut self, terminating: bool) -> Self {
        self.terminating = terminating;
        self
    }

    pub fn matcher(&self) -> &M {
        &self.matcher
    }

    pub fn action(&self) -> &A {
        &self.action
    }
}

impl<A: Action> MatchRule<PathPattern, A> {
    pub fn pattern(pattern: &str, action: A) -> Result<Self, RuleError> {
        Ok(Self::from_parts(PathPattern::parse(pattern)?, action))
    }
}

impl<A: Action> MatchRule<PathRegex, A> {
    pub fn regex(regex: &str, action: A) -> Result<Self, RuleError> {
        Ok(Self::from_parts(PathRegex::new(regex)?, action))
    }
}

impl<M: Matcher, A: Action> Rule for MatchRule<M, A> {
    fn is_terminating(&self) -> bool {
        self.terminating
    }

    fn match_and_apply(&self, input: RuleHandler) -> Result<Applied, RewriteError> {
        match self.matcher.matches(input.path()) {
            Some(result) => Ok(Applied::Matched(self.action.apply(input, &result)?)),
            None => Ok(Applied::Unmatched(input)),
        }
    }
}

/// How a configured replacement string turns into a value for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    /// Used as is.
    Literal(String),
    /// Used as a base path; the path info of a prefix match is appended.
    AppendPathInfo(String),
    /// `$1`, `${name}` are expanded from the match captures.
    Template(String),
}

impl Replacement {
    /// Replacement for a pattern rule rewriting paths. A trailing `/*` in
    /// `replacement` is where the path info goes; anything else is literal.
    pub fn path_info(replacement: &str) -> Self {
        match replacement.strip_suffix("/*") {
            Some(base) => Replacement::AppendPathInfo(base.to_owned()),
            None => Replacement::Literal(replacement.to_owned()),
        }
    }

    pub fn render(&self, result: &MatchResult) -> String {
        match self {
            Replacement::Literal(value) => value.clone(),
            Replacement::AppendPathInfo(base) => match result.path_info() {
                Some(info) => format!("{}{}", base.trim_end_matches('/'), info),
                None => base.clone(),
            },
            Replacement::Template(template) => result.expand(template),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_info_replacement() {
        let result = PathPattern::parse("/old/*").unwrap().matches("/old/42").unwrap();

        assert_eq!(Replacement::path_info("/new/*").render(&result), "/new/42");
        assert_eq!(Replacement::path_info("/*").render(&result), "/42");
        assert_eq!(Replacement::path_info("/fixed").render(&result), "/fixed");

        let bare = PathPattern::parse("/old/*").unwrap().matches("/old").unwrap();
        assert_eq!(Replacement::path_info("/new/*").render(&bare), "/new");
    }
}
