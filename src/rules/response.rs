//! Answer matching requests with a fixed status.

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};

use super::{Action, MatchRule};
use crate::matching::{MatchResult, PathPattern};
use crate::rewrite::{Callback, Flow, Interceptor, RewriteError, RuleError, RuleHandler};

#[derive(Debug, Clone)]
pub struct Respond {
    status: StatusCode,
    body: Option<String>,
}

impl Respond {
    pub fn new(code: u16, body: Option<String>) -> Result<Self, RuleError> {
        let status = StatusCode::from_u16(code)
            .ok()
            .filter(|status| !status.is_informational())
            .ok_or(RuleError::InvalidStatus {
                code,
                expected: "final (2xx-5xx)",
            })?;
        Ok(Self { status, body })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl Action for Respond {
    fn apply(&self, input: RuleHandler, _result: &MatchResult) -> Result<RuleHandler, RewriteError> {
        Ok(RuleHandler::wrap(input).with_interceptor(self.clone()))
    }
}

impl Interceptor for Respond {
    fn intercept(&self, request: &RuleHandler, _callback: &mut Callback) -> Result<Flow, RewriteError> {
        tracing::debug!(path = %request.path(), status = %self.status, "Responding from rule");
        let response = match &self.body {
            Some(body) => Response::builder()
                .status(self.status)
                .header(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))
                .body(Body::from(body.clone()))?,
            None => Response::builder().status(self.status).body(Body::empty())?,
        };
        Ok(Flow::Respond(response))
    }
}

pub type ResponsePatternRule = MatchRule<PathPattern, Respond>;

impl MatchRule<PathPattern, Respond> {
    /// Terminating rule answering with `code` and an optional plain text body.
    pub fn new(pattern: &str, code: u16, body: Option<String>) -> Result<Self, RuleError> {
        Ok(Self::pattern(pattern, Respond::new(code, body)?)?.terminating(true))
    }
}
