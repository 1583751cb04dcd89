//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router; every request goes to the rewrite stage
//! - Wire up middleware (timeout, request ID, tracing)
//! - Bind server to listener
//! - Swap reloaded rules into the live stage
//! - Graceful shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::loader::ConfigError;
use crate::config::rules::build_container;
use crate::config::validation::ValidationError;
use crate::config::ProxyConfig;
use crate::http::request::{request_id, MakeRequestUuid, X_REQUEST_ID};
use crate::http::upstream::UpstreamHandler;
use crate::lifecycle::Lifecycle;
use crate::rewrite::{Callback, Handled, Handler, RewriteStage};

/// HTTP server for the rewrite proxy.
pub struct HttpServer {
    router: Router,
    stage: Arc<RewriteStage>,
    config: ProxyConfig,
}

impl HttpServer {
    /// Build the server from configuration: the rules from `[rewrite]`, the
    /// downstream handler from `[upstream]`.
    pub fn new(config: ProxyConfig) -> Result<Self, ConfigError> {
        let handler: Arc<dyn Handler> = match &config.upstream.address {
            Some(address) => Arc::new(
                UpstreamHandler::new(address, &config.timeouts)
                    .map_err(|_| ConfigError::Validation(vec![ValidationError::InvalidUpstream(address.clone())]))?,
            ),
            None => {
                tracing::warn!("No upstream configured, unanswered requests will get 404");
                Arc::new(decline)
            }
        };
        Self::with_handler(config, handler)
    }

    /// Build the server around a custom downstream handler.
    pub fn with_handler(config: ProxyConfig, handler: Arc<dyn Handler>) -> Result<Self, ConfigError> {
        let container = build_container(&config.rewrite)?;
        let stage = Arc::new(RewriteStage::with_container(handler, container));
        let router = Self::build_router(&config, stage.clone());
        Ok(Self { router, stage, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, stage: Arc<RewriteStage>) -> Router {
        Router::new()
            .fallback(rewrite_entry)
            .with_state(stage)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
    }

    /// Router serving requests through the stage. The stage must be started
    /// for requests to be rewritten.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn stage(&self) -> Arc<RewriteStage> {
        self.stage.clone()
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires. Configs received on
    /// `config_updates` replace the live rules.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        self.stage.start();
        let reload = tokio::spawn(reload_rules(self.stage.clone(), config_updates, shutdown.resubscribe()));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reload.abort();
        self.stage.stop();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Apply reloaded configurations until shutdown or until the sender is gone.
async fn reload_rules(
    stage: Arc<RewriteStage>,
    mut updates: mpsc::UnboundedReceiver<ProxyConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(config) = update else { break };
                match build_container(&config.rewrite) {
                    Ok(container) => {
                        let rules = container.len();
                        stage.set_rule_container(container);
                        tracing::info!(rules, "Rewrite rules reloaded");
                    }
                    Err(e) => tracing::error!(error = %e, "Rejected reloaded rules, keeping current ones"),
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}

/// Fallback for every request: offer it to the stage and wait for completion.
async fn rewrite_entry(State(stage): State<Arc<RewriteStage>>, request: Request<Body>) -> Response {
    let id = request_id(request.headers()).unwrap_or("unknown").to_owned();
    let (callback, completion) = Callback::new();

    if let Handled::Declined { request, callback } = stage.handle(request, callback) {
        tracing::debug!(request_id = %id, path = %request.uri().path(), "Request declined");
        callback.succeeded(not_found());
    }

    match completion.await {
        Ok(response) => response,
        Err(error) => {
            tracing::warn!(request_id = %id, error = %error, "Request failed");
            (error.status(), error.to_string()).into_response()
        }
    }
}

fn decline(request: Request<Body>, callback: Callback) -> Handled {
    Handled::Declined { request, callback }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}
