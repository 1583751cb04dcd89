//! Set a response cookie on matching requests.

use axum::http::{header, HeaderValue};

use crate::matching::{Matcher, PathPattern};
use crate::rewrite::{Applied, Callback, Flow, Interceptor, Rule, RewriteError, RuleError, RuleHandler};

/// Adds `Set-Cookie: name=value` when the path matches, unless the request
/// already carries the cookie with that value.
#[derive(Debug)]
pub struct CookiePatternRule {
    pattern: PathPattern,
    name: String,
    set_cookie: HeaderValue,
    value: String,
    terminating: bool,
}

impl CookiePatternRule {
    pub fn new(pattern: &str, name: &str, value: &str) -> Result<Self, RuleError> {
        if name.is_empty() || name.contains(|c: char| c == '=' || c == ';' || c.is_whitespace()) {
            return Err(RuleError::InvalidCookieName(name.to_owned()));
        }
        Ok(Self {
            pattern: PathPattern::parse(pattern)?,
            name: name.to_owned(),
            set_cookie: HeaderValue::try_from(format!("{name}={value}"))?,
            value: value.to_owned(),
            terminating: false,
        })
    }

    pub fn terminating(mut self, terminating: bool) -> Self {
        self.terminating = terminating;
        self
    }
}

impl Rule for CookiePatternRule {
    fn is_terminating(&self) -> bool {
        self.terminating
    }

    fn match_and_apply(&self, input: RuleHandler) -> Result<Applied, RewriteError> {
        if self.pattern.matches(input.path()).is_none() {
            return Ok(Applied::Unmatched(input));
        }
        if input.cookie(&self.name) == Some(self.value.as_str()) {
            return Ok(Applied::Unmatched(input));
        }
        let node = RuleHandler::wrap(input).with_interceptor(SetCookie(self.set_cookie.clone()));
        Ok(Applied::Matched(node))
    }
}

#[derive(Debug)]
struct SetCookie(HeaderValue);

impl Interceptor for SetCookie {
    fn intercept(&self, _request: &RuleHandler, callback: &mut Callback) -> Result<Flow, RewriteError> {
        callback.add_response_header(header::SET_COOKIE, self.0.clone());
        Ok(Flow::Continue)
    }
}
