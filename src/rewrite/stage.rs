//! Rewrite stage: entry point of the rewrite subsystem.
//!
//! # States (per request)
//! ```text
//! RECEIVED → EVALUATING → PASSTHROUGH → DISPATCHED
//!                       → REWRITTEN   → DISPATCHED
//! ```
//!
//! # Responsibilities
//! - Decline requests while not started
//! - Evaluate the rule container against a fresh chain head
//! - Dispatch the original request untouched when nothing matched
//! - Otherwise bind the downstream handler to the chain and invoke it
//!
//! # Design Decisions
//! - The stage never waits for completion; it only reports acceptance
//! - Evaluation errors complete the callback with a failure
//! - A downstream that declines is reported upward unchanged

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::Request;

use crate::lifecycle::Lifecycle;
use crate::observability::metrics::{self, RewriteOutcome};
use crate::rewrite::{Applied, Callback, Handled, Handler, Rule, RuleContainer, RuleHandler};

pub struct RewriteStage {
    rules: ArcSwap<RuleContainer>,
    handler: Arc<dyn Handler>,
    started: AtomicBool,
}

impl RewriteStage {
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self::with_container(handler, RuleContainer::new())
    }

    pub fn with_container(handler: Arc<dyn Handler>, rules: RuleContainer) -> Self {
        Self {
            rules: ArcSwap::from_pointee(rules),
            handler,
            started: AtomicBool::new(false),
        }
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    pub fn rule_container(&self) -> Arc<RuleContainer> {
        self.rules.load_full()
    }

    /// Swap in a whole new container. Requests already evaluating keep the
    /// container they started with.
    pub fn set_rule_container(&self, rules: RuleContainer) {
        if self.is_started() {
            rules.start();
            metrics::record_rules_loaded(rules.len());
        }
        let previous = self.rules.swap(Arc::new(rules));
        previous.stop();
    }

    pub fn rules(&self) -> Arc<Vec<Arc<dyn Rule>>> {
        self.rules.load().rules()
    }

    pub fn set_rules(&self, rules: Vec<Arc<dyn Rule>>) {
        self.rules.load().set_rules(rules);
    }

    pub fn add_rule(&self, rule: Arc<dyn Rule>) {
        self.rules.load().add_rule(rule);
    }

    pub fn clear(&self) {
        self.rules.load().clear();
    }

    pub fn original_path_attribute(&self) -> Option<String> {
        self.rules.load().original_path_attribute()
    }

    pub fn set_original_path_attribute(&self, name: Option<String>) {
        self.rules.load().set_original_path_attribute(name);
    }

    /// Offer a request to the stage.
    pub fn handle(&self, request: Request<Body>, callback: Callback) -> Handled {
        if !self.is_started() {
            metrics::record_outcome(RewriteOutcome::Declined);
            return Handled::Declined { request, callback };
        }

        let (parts, body) = request.into_parts();
        let head = RuleHandler::new(parts);
        let rules = self.rules.load_full();

        match rules.match_and_apply(head) {
            Ok(Applied::Unmatched(head)) => {
                tracing::trace!(path = %head.path(), "No rule matched, passing through");
                metrics::record_outcome(RewriteOutcome::Passthrough);
                self.handler.handle(Request::from_parts(head.into_parts(), body), callback)
            }
            Ok(Applied::Matched(last)) => {
                tracing::debug!(
                    from = %last.original_uri(),
                    to = %last.uri(),
                    nodes = last.depth(),
                    "Request rewritten"
                );
                last.bind_terminal(Arc::clone(&self.handler)).invoke(body, callback)
            }
            Err(error) => {
                tracing::error!(error = %error, "Rule evaluation failed");
                metrics::record_outcome(RewriteOutcome::Failed);
                callback.failed(error);
                Handled::Accepted
            }
        }
    }
}

impl Lifecycle for RewriteStage {
    fn start(&self) {
        if !self.started.swap(true, Ordering::AcqRel) {
            let rules = self.rules.load();
            rules.start();
            metrics::record_rules_loaded(rules.len());
            tracing::info!(rules = rules.len(), "Rewrite stage started");
        }
    }

    fn stop(&self) {
        if self.started.swap(false, Ordering::AcqRel) {
            self.rules.load().stop();
            tracing::info!("Rewrite stage stopped");
        }
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }
}
