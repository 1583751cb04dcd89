//! Downstream handler forwarding rewritten requests to the upstream server.
//!
//! # Responsibilities
//! - Point the rewritten request at the configured upstream
//! - Forward it with the hyper-util client on its own task
//! - Complete the callback with the upstream response or a failure
//!
//! # Design Decisions
//! - The rewritten path and query are forwarded as is; headers, including
//!   `Host`, are kept from the client request
//! - Upstream errors complete the callback with `Upstream` (502),
//!   timeouts with `UpstreamTimeout` (504)

use std::str::FromStr;
use std::time::Duration;

use axum::body::Body;
use axum::http::uri::{Authority, InvalidUri, PathAndQuery, Scheme};
use axum::http::{Request, Response, Uri, Version};
use hyper::body::Incoming;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::config::schema::TimeoutConfig;
use crate::http::request::request_id;
use crate::rewrite::{Callback, Handled, Handler, RewriteError};

#[derive(Clone)]
pub struct UpstreamHandler {
    client: Client<HttpConnector, Body>,
    authority: Authority,
    timeout: Duration,
}

impl UpstreamHandler {
    pub fn new(address: &str, timeouts: &TimeoutConfig) -> Result<Self, InvalidUri> {
        let authority = Authority::from_str(address)?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            client,
            authority,
            timeout: Duration::from_secs(timeouts.request_secs),
        })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    fn target(&self, uri: &Uri) -> Result<Uri, RewriteError> {
        let mut parts = uri.clone().into_parts();
        parts.scheme = Some(Scheme::HTTP);
        parts.authority = Some(self.authority.clone());
        if parts.path_and_query.is_none() {
            parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        Ok(Uri::from_parts(parts)?)
    }
}

impl std::fmt::Debug for UpstreamHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamHandler")
            .field("authority", &self.authority)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Handler for UpstreamHandler {
    fn handle(&self, request: Request<Body>, callback: Callback) -> Handled {
        if callback.is_aborted() {
            callback.failed(RewriteError::Aborted);
            return Handled::Accepted;
        }

        let (mut parts, body) = request.into_parts();
        parts.uri = match self.target(&parts.uri) {
            Ok(uri) => uri,
            Err(error) => {
                callback.failed(error);
                return Handled::Accepted;
            }
        };
        parts.version = Version::HTTP_11;
        let request = Request::from_parts(parts, body);

        let client = self.client.clone();
        let timeout = self.timeout;
        tokio::spawn(async move {
            let id = request_id(request.headers()).unwrap_or("unknown").to_owned();
            let target = request.uri().clone();
            tracing::debug!(request_id = %id, target = %target, "Forwarding to upstream");

            match tokio::time::timeout(timeout, client.request(request)).await {
                Ok(Ok(response)) => callback.succeeded(into_axum(response)),
                Ok(Err(e)) => {
                    tracing::error!(request_id = %id, target = %target, error = %e, "Upstream error");
                    callback.failed(RewriteError::Upstream(e.to_string()));
                }
                Err(_) => {
                    tracing::error!(request_id = %id, target = %target, "Upstream timed out");
                    callback.failed(RewriteError::UpstreamTimeout(timeout.as_secs()));
                }
            }
        });
        Handled::Accepted
    }
}

fn into_axum(response: Response<Incoming>) -> Response<Body> {
    let (parts, body) = response.into_parts();
    Response::from_parts(parts, Body::new(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_target_points_at_upstream() {
        let handler = UpstreamHandler::new("127.0.0.1:3000", &TimeoutConfig::default()).unwrap();
        let uri: Uri = "/new/42?x=1".parse().unwrap();

        assert_eq!(handler.target(&uri).unwrap().to_string(), "http://127.0.0.1:3000/new/42?x=1");
        assert_eq!(handler.authority().port_u16(), Some(3000));
    }

    #[test]
    fn test_rejects_bad_address() {
        assert!(UpstreamHandler::new("not a host", &TimeoutConfig::default()).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_upstream_fails_with_bad_gateway() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let handler = UpstreamHandler::new(&address, &TimeoutConfig::default()).unwrap();
        let (callback, completion) = Callback::new();
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert!(handler.handle(request, callback).is_accepted());

        let err = completion.await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }
}
