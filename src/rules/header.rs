//! Header rules.
//!
//! `HeaderPatternRule` / `HeaderRegexRule` decorate the response that
//! eventually completes the request. `ForceRequestHeaderRule` changes what the
//! downstream handler sees.

use axum::http::{HeaderName, HeaderValue};

use super::{Action, MatchRule, Replacement};
use crate::matching::{expand_empty, MatchResult, PathPattern, PathRegex};
use crate::rewrite::{Applied, Callback, Flow, Interceptor, Rule, RewriteError, RuleError, RuleHandler};

/// Add or set a response header.
#[derive(Debug, Clone)]
pub struct ResponseHeader {
    name: HeaderName,
    value: Replacement,
    add: bool,
}

impl ResponseHeader {
    pub fn new(name: &str, value: Replacement, add: bool) -> Result<Self, RuleError> {
        let name = HeaderName::try_from(name)?;
        match &value {
            Replacement::Literal(literal) | Replacement::AppendPathInfo(literal) => {
                HeaderValue::try_from(literal.as_str())?;
            }
            Replacement::Template(template) => {
                HeaderValue::try_from(expand_empty(template)?).map_err(|_| RuleError::InvalidReplacement {
                    replacement: template.clone(),
                    reason: "not a valid header value once expanded",
                })?;
            }
        }
        Ok(Self { name, value, add })
    }
}

impl Action for ResponseHeader {
    fn apply(&self, input: RuleHandler, result: &MatchResult) -> Result<RuleHandler, RewriteError> {
        let value = HeaderValue::try_from(self.value.render(result))?;
        Ok(RuleHandler::wrap(input).with_interceptor(DecorateResponse {
            name: self.name.clone(),
            value,
            add: self.add,
        }))
    }
}

#[derive(Debug)]
struct DecorateResponse {
    name: HeaderName,
    value: HeaderValue,
    add: bool,
}

impl Interceptor for DecorateResponse {
    fn intercept(&self, _request: &RuleHandler, callback: &mut Callback) -> Result<Flow, RewriteError> {
        if self.add {
            callback.add_response_header(self.name.clone(), self.value.clone());
        } else {
            callback.set_response_header(self.name.clone(), self.value.clone());
        }
        Ok(Flow::Continue)
    }
}

pub type HeaderPatternRule = MatchRule<PathPattern, ResponseHeader>;
pub type HeaderRegexRule = MatchRule<PathRegex, ResponseHeader>;

impl MatchRule<PathPattern, ResponseHeader> {
    pub fn new(pattern: &str, name: &str, value: &str, add: bool) -> Result<Self, RuleError> {
        let header = ResponseHeader::new(name, Replacement::Literal(value.to_owned()), add)?;
        Self::pattern(pattern, header)
    }
}

impl MatchRule<PathRegex, ResponseHeader> {
    /// `value` may reference regex captures.
    pub fn new(regex: &str, name: &str, value: &str, add: bool) -> Result<Self, RuleError> {
        let header = ResponseHeader::new(name, Replacement::Template(value.to_owned()), add)?;
        Self::regex(regex, header)
    }
}

/// Force a request header to a value, on every request.
///
/// Requests already carrying exactly that value are left alone and count as
/// no match.
#[derive(Debug)]
pub struct ForceRequestHeaderRule {
    name: HeaderName,
    value: HeaderValue,
    terminating: bool,
}

impl ForceRequestHeaderRule {
    pub fn new(name: &str, value: &str) -> Result<Self, RuleError> {
        Ok(Self {
            name: HeaderName::try_from(name)?,
            value: HeaderValue::try_from(value)?,
            terminating: false,
        })
    }

    pub fn terminating(mut self, terminating: bool) -> Self {
        self.terminating = terminating;
        self
    }
}

impl Rule for ForceRequestHeaderRule {
    fn is_terminating(&self) -> bool {
        self.terminating
    }

    fn match_and_apply(&self, input: RuleHandler) -> Result<Applied, RewriteError> {
        let current = input.headers().get_all(&self.name);
        let mut values = current.iter();
        if values.next() == Some(&self.value) && values.next().is_none() {
            return Ok(Applied::Unmatched(input));
        }
        let forced = RuleHandler::wrap(input).with_header(self.name.clone(), self.value.clone());
        Ok(Applied::Matched(forced))
    }
}
