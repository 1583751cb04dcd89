//! Downstream handler contract and the per-request completion callback.
//!
//! # Responsibilities
//! - Define what the rewrite stage dispatches to (`Handler`)
//! - Carry the single completion signal of a request (`Callback`)
//! - Collect response decorations added by rules on the way through
//!
//! # Design Decisions
//! - `Callback` is consumed by `succeeded`/`failed`, so it completes at most once
//! - A `Callback` dropped without completing reports `Abandoned`
//! - A declining handler hands request and callback back to its caller

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request, Response};
use tokio::sync::oneshot;

use crate::rewrite::RewriteError;

/// Result of offering a request to a handler.
#[must_use]
#[derive(Debug)]
pub enum Handled {
    /// The handler took responsibility and will complete the callback.
    Accepted,
    /// The handler did not take the request; the caller must route it elsewhere.
    Declined {
        request: Request<Body>,
        callback: Callback,
    },
}

impl Handled {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Handled::Accepted)
    }
}

/// The next stage after rewriting.
///
/// Implementations either complete `callback` (now or later, from any task)
/// and return [`Handled::Accepted`], or give both back through
/// [`Handled::Declined`].
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, request: Request<Body>, callback: Callback) -> Handled;
}

impl<F> Handler for F
where
    F: Fn(Request<Body>, Callback) -> Handled + Send + Sync + 'static,
{
    fn handle(&self, request: Request<Body>, callback: Callback) -> Handled {
        self(request, callback)
    }
}

#[derive(Debug)]
struct ResponseHeader {
    name: HeaderName,
    value: HeaderValue,
    append: bool,
}

/// Completion signal of one request.
#[derive(Debug)]
pub struct Callback {
    tx: Option<oneshot::Sender<Result<Response<Body>, RewriteError>>>,
    response_headers: Vec<ResponseHeader>,
}

impl Callback {
    /// Create a callback and the future that resolves once it completes.
    pub fn new() -> (Self, Completion) {
        let (tx, rx) = oneshot::channel();
        let callback = Self {
            tx: Some(tx),
            response_headers: Vec::new(),
        };
        (callback, Completion { rx })
    }

    /// True once nobody is waiting for the outcome anymore (client went away).
    pub fn is_aborted(&self) -> bool {
        self.tx.as_ref().map_or(true, |tx| tx.is_closed())
    }

    /// Append a header to whatever response eventually completes this request.
    pub fn add_response_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.response_headers.push(ResponseHeader {
            name,
            value,
            append: true,
        });
    }

    /// Set (replace) a header on whatever response eventually completes this request.
    pub fn set_response_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.response_headers.push(ResponseHeader {
            name,
            value,
            append: false,
        });
    }

    /// Complete the request with a response.
    pub fn succeeded(mut self, mut response: Response<Body>) {
        let headers = response.headers_mut();
        for header in std::mem::take(&mut self.response_headers) {
            if header.append {
                headers.append(header.name, header.value);
            } else {
                headers.insert(header.name, header.value);
            }
        }
        self.complete(Ok(response));
    }

    /// Complete the request with a failure.
    pub fn failed(mut self, error: RewriteError) {
        self.complete(Err(error));
    }

    fn complete(&mut self, outcome: Result<Response<Body>, RewriteError>) {
        if let Some(tx) = self.tx.take() {
            if tx.send(outcome).is_err() {
                tracing::debug!("request completed after the client went away");
            }
        }
    }
}

impl Drop for Callback {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            tracing::warn!("callback dropped without completing the request");
            let _ = tx.send(Err(RewriteError::Abandoned));
        }
    }
}

/// Resolves with the outcome passed to the matching [`Callback`].
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<Result<Response<Body>, RewriteError>>,
}

impl Future for Completion {
    type Output = Result<Response<Body>, RewriteError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map(|outcome| outcome.unwrap_or(Err(RewriteError::Abandoned)))
    }
}
