//! Redirect rules: answer the request with a 3xx and a `Location`.

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};

use super::{Action, MatchRule, Replacement};
use crate::matching::{MatchResult, PathPattern, PathRegex};
use crate::rewrite::{Callback, Flow, Interceptor, RewriteError, RuleError, RuleHandler};

#[derive(Debug, Clone)]
pub struct Redirect {
    location: Replacement,
    status: StatusCode,
}

impl Redirect {
    pub fn new(location: Replacement) -> Self {
        Self {
            location,
            status: StatusCode::FOUND,
        }
    }

    /// Use `code` instead of `302 Found`.
    pub fn with_status(mut self, code: u16) -> Result<Self, RuleError> {
        self.status = StatusCode::from_u16(code)
            .ok()
            .filter(StatusCode::is_redirection)
            .ok_or(RuleError::InvalidStatus {
                code,
                expected: "3xx redirect",
            })?;
        Ok(self)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl Action for Redirect {
    fn apply(&self, input: RuleHandler, result: &MatchResult) -> Result<RuleHandler, RewriteError> {
        let location = HeaderValue::try_from(self.location.render(result))?;
        Ok(RuleHandler::wrap(input).with_interceptor(SendRedirect {
            status: self.status,
            location,
        }))
    }
}

/// Short-circuits the chain with the redirect response.
#[derive(Debug)]
struct SendRedirect {
    status: StatusCode,
    location: HeaderValue,
}

impl Interceptor for SendRedirect {
    fn intercept(&self, request: &RuleHandler, _callback: &mut Callback) -> Result<Flow, RewriteError> {
        tracing::debug!(
            path = %request.path(),
            location = ?self.location,
            status = %self.status,
            "Redirecting"
        );
        let response = Response::builder()
            .status(self.status)
            .header(header::LOCATION, self.location.clone())
            .body(Body::empty())?;
        Ok(Flow::Respond(response))
    }
}

pub type RedirectPatternRule = MatchRule<PathPattern, Redirect>;
pub type RedirectRegexRule = MatchRule<PathRegex, Redirect>;

impl MatchRule<PathPattern, Redirect> {
    /// Redirect to a fixed `location`. Terminating.
    pub fn new(pattern: &str, location: &str) -> Result<Self, RuleError> {
        let location = validate(location)?;
        Ok(Self::pattern(pattern, Redirect::new(Replacement::Literal(location)))?.terminating(true))
    }
}

impl MatchRule<PathRegex, Redirect> {
    /// Redirect to `location` with regex captures expanded. Terminating.
    pub fn new(regex: &str, location: &str) -> Result<Self, RuleError> {
        let location = validate(location)?;
        Ok(Self::regex(regex, Redirect::new(Replacement::Template(location)))?.terminating(true))
    }
}

impl<M> MatchRule<M, Redirect> {
    pub fn with_status(self, code: u16) -> Result<Self, RuleError> {
        let MatchRule {
            matcher,
            action,
            terminating,
        } = self;
        Ok(MatchRule {
            matcher,
            action: action.with_status(code)?,
            terminating,
        })
    }
}

fn validate(location: &str) -> Result<String, RuleError> {
    if location.is_empty() {
        return Err(RuleError::InvalidReplacement {
            replacement: location.to_owned(),
            reason: "redirect location is empty",
        });
    }
    HeaderValue::try_from(location)?;
    Ok(location.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::{Handled, Handler, Rule};
    use axum::http::Request;
    use std::sync::Arc;

    fn head(uri: &str) -> RuleHandler {
        let (parts, _) = Request::builder().uri(uri).body(Body::empty()).unwrap().into_parts();
        RuleHandler::new(parts)
    }

    fn unreachable_terminal() -> Arc<dyn Handler> {
        Arc::new(|_request: Request<Body>, _callback: Callback| -> Handled {
            panic!("redirect must answer before the terminal");
        })
    }

    async fn invoke(rule: &dyn Rule, uri: &str) -> Response<Body> {
        let handler = rule.match_and_apply(head(uri)).unwrap().into_handler();
        let (callback, completion) = Callback::new();
        let handled = handler.bind_terminal(unreachable_terminal()).invoke(Body::empty(), callback);
        assert!(handled.is_accepted());
        completion.await.unwrap()
    }

    #[tokio::test]
    async fn test_pattern_redirect() {
        let rule = RedirectPatternRule::new("/old/*", "https://example.com/new").unwrap();
        assert!(rule.is_terminating());

        let response = invoke(&rule, "/old/page").await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "https://example.com/new");
    }

    #[tokio::test]
    async fn test_regex_redirect_with_status() {
        let rule = RedirectRegexRule::new(r"^/u/(\w+)$", "/users/$1")
            .unwrap()
            .with_status(301)
            .unwrap();

        let response = invoke(&rule, "/u/alice").await;
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "/users/alice");
    }

    #[test]
    fn test_rejects_non_redirect_status() {
        let rule = RedirectPatternRule::new("/a", "/b").unwrap();
        let err = rule.with_status(200).unwrap_err();
        assert!(matches!(err, RuleError::InvalidStatus { code: 200, .. }));

        assert!(Redirect::new(Replacement::Literal("/b".into())).with_status(999).is_err());
        assert!(RedirectPatternRule::new("/a", "").is_err());
        assert!(RedirectRegexRule::new(r"^/u/(\w+)$", "/users/$1\r\n").is_err());
    }
}
