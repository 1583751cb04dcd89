//! Error types for rule configuration and request rewriting.

use axum::http::header::{InvalidHeaderName, InvalidHeaderValue};
use axum::http::uri::{InvalidUri, InvalidUriParts};
use axum::http::StatusCode;
use thiserror::Error;

/// Errors raised while constructing a rule, before any traffic is served.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid path pattern {pattern:?}: {reason}")]
    InvalidPattern {
        pattern: String,
        reason: &'static str,
    },

    #[error("invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("status {code} is not a valid {expected} status")]
    InvalidStatus { code: u16, expected: &'static str },

    #[error("invalid header name: {0}")]
    InvalidHeaderName(#[from] InvalidHeaderName),

    #[error("invalid header value: {0}")]
    InvalidHeaderValue(#[from] InvalidHeaderValue),

    #[error("invalid virtual host {0:?}")]
    InvalidVirtualHost(String),

    #[error("invalid replacement {replacement:?}: {reason}")]
    InvalidReplacement {
        replacement: String,
        reason: &'static str,
    },

    #[error("invalid cookie name {0:?}")]
    InvalidCookieName(String),
}

/// Errors raised while a request travels through the rewrite chain.
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("rewritten uri is invalid: {0}")]
    InvalidUri(#[from] InvalidUri),

    #[error("rewritten uri is invalid: {0}")]
    InvalidUriParts(#[from] InvalidUriParts),

    #[error("rewritten header value is invalid: {0}")]
    InvalidHeaderValue(#[from] InvalidHeaderValue),

    #[error("failed to build response: {0}")]
    Http(#[from] axum::http::Error),

    #[error("rule failed: {0}")]
    Rule(String),

    #[error("upstream request failed: {0}")]
    Upstream(String),

    #[error("upstream did not answer within {0} seconds")]
    UpstreamTimeout(u64),

    #[error("connection aborted before the response was written")]
    Aborted,

    #[error("request was dropped without being completed")]
    Abandoned,
}

impl RewriteError {
    /// Status code reported to the client when a request fails with this error.
    pub fn status(&self) -> StatusCode {
        match self {
            RewriteError::Upstream(_) => StatusCode::BAD_GATEWAY,
            RewriteError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
