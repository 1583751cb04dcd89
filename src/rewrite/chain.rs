//! Per-request rule chain.
//!
//! Every rule that matches wraps the current [`RuleHandler`] in a new one
//! that overrides part of the request state (uri, headers, attributes) and
//! shares everything else with the node it wraps. The head node owns the
//! original request parts; the last node owns the whole sequence.
//!
//! Once evaluation is over the stage binds the downstream handler as the
//! terminal of the last node ([`RuleHandler::bind_terminal`]) and invokes the
//! resulting [`RuleChain`]: node effects run in the order the nodes were
//! created, head first, and either one of them answers the request itself or
//! the terminal dispatches the rewritten request.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::request::Parts;
use axum::http::uri::PathAndQuery;
use axum::http::{Method, Request, Response, Uri};

use crate::observability::metrics::{self, RewriteOutcome};
use crate::rewrite::{Callback, Handled, Handler, RewriteError};

/// Named values attached to a request by rules, visible downstream through
/// the request extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(HashMap<String, String>);

impl Attributes {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// What a node decided when the chain was invoked.
#[derive(Debug)]
pub enum Flow {
    /// Keep going towards the terminal.
    Continue,
    /// Answer the request with this response; later nodes and the terminal never run.
    Respond(Response<Body>),
}

/// Invoke-time effect of a node: decorate the eventual response, or answer
/// the request directly.
pub trait Interceptor: Send + Sync + fmt::Debug {
    fn intercept(&self, request: &RuleHandler, callback: &mut Callback) -> Result<Flow, RewriteError>;
}

enum Link {
    Origin(Box<Parts>),
    Wrapped(Box<RuleHandler>),
}

/// Effective request state at one node. Every field is shared with the node
/// below until a rule overrides it.
#[derive(Clone)]
struct View {
    method: Method,
    original_uri: Arc<Uri>,
    uri: Arc<Uri>,
    headers: Arc<HeaderMap>,
    attributes: Option<Arc<Attributes>>,
}

/// One link of the per-request chain.
pub struct RuleHandler {
    wrapped: Link,
    view: View,
    depth: usize,
    interceptor: Option<Arc<dyn Interceptor>>,
}

impl RuleHandler {
    /// Head of a chain, wrapping the original request parts.
    pub fn new(mut parts: Parts) -> Self {
        let uri = Arc::new(std::mem::take(&mut parts.uri));
        let view = View {
            method: parts.method.clone(),
            original_uri: Arc::clone(&uri),
            uri,
            headers: Arc::new(std::mem::take(&mut parts.headers)),
            attributes: parts.extensions.get::<Attributes>().cloned().map(Arc::new),
        };
        Self {
            wrapped: Link::Origin(Box::new(parts)),
            view,
            depth: 0,
            interceptor: None,
        }
    }

    /// New node on top of `input`, with nothing overridden yet.
    pub fn wrap(input: RuleHandler) -> Self {
        Self {
            view: input.view.clone(),
            depth: input.depth + 1,
            wrapped: Link::Wrapped(Box::new(input)),
            interceptor: None,
        }
    }

    fn previous(&self) -> Option<&RuleHandler> {
        match &self.wrapped {
            Link::Origin(_) => None,
            Link::Wrapped(previous) => Some(previous),
        }
    }

    /// The request uri as it arrived, before any rule touched it.
    pub fn original_uri(&self) -> &Uri {
        &self.view.original_uri
    }

    /// Number of nodes wrapped beneath this one.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn method(&self) -> &Method {
        &self.view.method
    }

    pub fn uri(&self) -> &Uri {
        &self.view.uri
    }

    pub fn path(&self) -> &str {
        self.uri().path()
    }

    pub fn query(&self) -> Option<&str> {
        self.uri().query()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.view.headers
    }

    /// Host the request is addressed to, without port, as sent by the client.
    pub fn host(&self) -> Option<&str> {
        self.headers()
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .or_else(|| self.uri().authority().map(|authority| authority.as_str()))
            .map(strip_port)
    }

    /// Value of a request cookie.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        cookie_pairs(self.headers()).find(|(key, _)| *key == name).map(|(_, value)| value)
    }

    pub fn attributes(&self) -> Option<&Attributes> {
        self.view.attributes.as_deref()
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes().and_then(|attributes| attributes.get(name))
    }

    /// Override path and query. An empty or missing query drops it.
    pub fn with_path_and_query(mut self, path: &str, query: Option<&str>) -> Result<Self, RewriteError> {
        let mut target = String::with_capacity(path.len() + 1);
        if !path.starts_with('/') {
            target.push('/');
        }
        target.push_str(path);
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            target.push('?');
            target.push_str(query);
        }

        let mut parts = self.uri().clone().into_parts();
        parts.path_and_query = Some(PathAndQuery::try_from(target)?);
        self.view.uri = Arc::new(Uri::from_parts(parts)?);
        Ok(self)
    }

    /// Override the path, keeping the current query.
    pub fn with_path(self, path: &str) -> Result<Self, RewriteError> {
        let query = self.query().map(str::to_owned);
        self.with_path_and_query(path, query.as_deref())
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.view.headers = Arc::new(headers);
        self
    }

    /// Set a request header, replacing any previous values.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        Arc::make_mut(&mut self.view.headers).insert(name, value);
        self
    }

    pub fn without_header(mut self, name: &HeaderName) -> Self {
        Arc::make_mut(&mut self.view.headers).remove(name);
        self
    }

    /// Add or replace a request cookie.
    pub fn with_cookie(self, name: &str, value: &str) -> Result<Self, RewriteError> {
        let mut pairs: Vec<String> = cookie_pairs(self.headers())
            .filter(|(key, _)| *key != name)
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        pairs.push(format!("{name}={value}"));
        let value = HeaderValue::try_from(pairs.join("; "))?;
        Ok(self.with_header(header::COOKIE, value))
    }

    pub fn without_cookie(self, name: &str) -> Result<Self, RewriteError> {
        let pairs: Vec<String> = cookie_pairs(self.headers())
            .filter(|(key, _)| *key != name)
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        if pairs.is_empty() {
            return Ok(self.without_header(&header::COOKIE));
        }
        let value = HeaderValue::try_from(pairs.join("; "))?;
        Ok(self.with_header(header::COOKIE, value))
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let attributes = self.view.attributes.get_or_insert_with(Default::default);
        Arc::make_mut(attributes).insert(name, value);
        self
    }

    pub fn with_interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptor = Some(Arc::new(interceptor));
        self
    }

    /// Make `terminal` the action run after this node. Consumes the node, so
    /// a chain is bound exactly once.
    pub fn bind_terminal(self, terminal: Arc<dyn Handler>) -> RuleChain {
        RuleChain { last: self, terminal }
    }

    /// Run node effects from the head of the chain up to this node.
    fn run(&self, callback: &mut Callback) -> Result<Flow, RewriteError> {
        let mut nodes = Vec::with_capacity(self.depth + 1);
        let mut node = Some(self);
        while let Some(current) = node {
            nodes.push(current);
            node = current.previous();
        }

        for node in nodes.into_iter().rev() {
            if let Some(interceptor) = &node.interceptor {
                if let Flow::Respond(response) = interceptor.intercept(node, callback)? {
                    return Ok(Flow::Respond(response));
                }
            }
        }
        Ok(Flow::Continue)
    }

    /// Collapse the chain back into request parts carrying every override.
    pub fn into_parts(self) -> Parts {
        let RuleHandler { mut wrapped, view, .. } = self;

        // Dropping the nodes below releases their share of the view.
        let mut parts = loop {
            match wrapped {
                Link::Origin(parts) => break *parts,
                Link::Wrapped(previous) => {
                    let RuleHandler { wrapped: below, .. } = *previous;
                    wrapped = below;
                }
            }
        };

        let View {
            original_uri,
            uri,
            headers,
            attributes,
            ..
        } = view;
        drop(original_uri);

        parts.uri = Arc::unwrap_or_clone(uri);
        parts.headers = Arc::unwrap_or_clone(headers);
        if let Some(attributes) = attributes {
            parts.extensions.insert(Arc::unwrap_or_clone(attributes));
        }
        parts
    }

    pub fn into_request(self, body: Body) -> Request<Body> {
        Request::from_parts(self.into_parts(), body)
    }
}

impl fmt::Debug for RuleHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleHandler")
            .field("method", self.method())
            .field("uri", self.uri())
            .field("depth", &self.depth)
            .field("interceptor", &self.interceptor)
            .finish()
    }
}

/// A fully evaluated chain with its terminal bound.
pub struct RuleChain {
    last: RuleHandler,
    terminal: Arc<dyn Handler>,
}

impl fmt::Debug for RuleChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleChain").field("last", &self.last).finish_non_exhaustive()
    }
}

impl RuleChain {
    /// Run the chain. Either a node answers and completes `callback`, or the
    /// rewritten request is handed to the terminal.
    pub fn invoke(self, body: Body, mut callback: Callback) -> Handled {
        match self.last.run(&mut callback) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Respond(response)) => {
                if callback.is_aborted() {
                    tracing::debug!(path = %self.last.path(), "client went away before rule response");
                    callback.failed(RewriteError::Aborted);
                } else {
                    tracing::debug!(
                        path = %self.last.original_uri().path(),
                        status = %response.status(),
                        "Rule answered request"
                    );
                    callback.succeeded(response);
                }
                metrics::record_outcome(RewriteOutcome::ShortCircuit);
                return Handled::Accepted;
            }
            Err(error) => {
                tracing::error!(path = %self.last.original_uri().path(), error = %error, "Rewrite chain failed");
                metrics::record_outcome(RewriteOutcome::Failed);
                callback.failed(error);
                return Handled::Accepted;
            }
        }

        metrics::record_outcome(RewriteOutcome::Rewritten);
        let request = self.last.into_request(body);
        self.terminal.handle(request, callback)
    }
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

fn cookie_pairs(headers: &HeaderMap) -> impl Iterator<Item = (&str, &str)> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            Some((key.trim(), value.trim()))
        })
}
