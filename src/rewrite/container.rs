//! Ordered, composable rule container.
//!
//! # Responsibilities
//! - Hold rules in insertion order (evaluation order)
//! - Stop at the first terminating match
//! - Record the pre-rewrite path under a configured attribute
//!
//! # Design Decisions
//! - Rule list is an `ArcSwap` snapshot: mutation publishes a new list,
//!   evaluation reads the one it loaded at the start
//! - A container is itself a `Rule`, so containers nest freely

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};

use crate::lifecycle::Lifecycle;
use crate::rewrite::{Applied, RewriteError, Rule, RuleHandler};

pub struct RuleContainer {
    rules: ArcSwap<Vec<Arc<dyn Rule>>>,
    original_path_attribute: ArcSwapOption<String>,
    started: AtomicBool,
}

impl RuleContainer {
    pub fn new() -> Self {
        Self::with_rules(Vec::new())
    }

    pub fn with_rules(rules: Vec<Arc<dyn Rule>>) -> Self {
        Self {
            rules: ArcSwap::from_pointee(rules),
            original_path_attribute: ArcSwapOption::empty(),
            started: AtomicBool::new(false),
        }
    }

    /// Snapshot of the current rules, in evaluation order.
    pub fn rules(&self) -> Arc<Vec<Arc<dyn Rule>>> {
        self.rules.load_full()
    }

    pub fn len(&self) -> usize {
        self.rules.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.load().is_empty()
    }

    /// Replace every rule at once, discarding the previous ones.
    pub fn set_rules(&self, rules: Vec<Arc<dyn Rule>>) {
        if self.is_started() {
            start_all(&rules);
        }
        let previous = self.rules.swap(Arc::new(rules));
        if self.is_started() {
            stop_all(&previous);
        }
    }

    /// Append a rule after the existing ones.
    pub fn add_rule(&self, rule: Arc<dyn Rule>) {
        if self.is_started() {
            start_all(std::slice::from_ref(&rule));
        }
        self.rules.rcu(|rules| {
            let mut next = Vec::clone(rules);
            next.push(Arc::clone(&rule));
            next
        });
    }

    pub fn clear(&self) {
        self.set_rules(Vec::new());
    }

    /// Attribute name under which the pre-rewrite path is recorded.
    pub fn original_path_attribute(&self) -> Option<String> {
        self.original_path_attribute
            .load()
            .as_ref()
            .map(|name| name.as_str().to_owned())
    }

    pub fn set_original_path_attribute(&self, name: Option<String>) {
        self.original_path_attribute.store(name.map(Arc::new));
    }
}

impl Default for RuleContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RuleContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleContainer")
            .field("rules", &self.len())
            .field("original_path_attribute", &self.original_path_attribute())
            .finish()
    }
}

impl Rule for RuleContainer {
    fn match_and_apply(&self, input: RuleHandler) -> Result<Applied, RewriteError> {
        let rules = self.rules.load_full();

        // Taken from this container's input; a value already on the input wins.
        let original_path = self
            .original_path_attribute
            .load_full()
            .filter(|name| input.attribute(name).is_none())
            .map(|name| (name, input.path().to_owned()));

        let mut current = input;
        let mut matched = false;
        for rule in rules.iter() {
            match rule.match_and_apply(current)? {
                Applied::Matched(next) => {
                    matched = true;
                    current = next;
                    tracing::trace!(rule = ?rule, path = %current.path(), "Rule matched");
                    if rule.is_terminating() {
                        break;
                    }
                }
                Applied::Unmatched(same) => current = same,
            }
        }

        if !matched {
            return Ok(Applied::Unmatched(current));
        }

        if let Some((name, path)) = original_path {
            current = current.with_attribute(name.as_str(), path);
        }
        Ok(Applied::Matched(current))
    }

    fn lifecycle(&self) -> Option<&dyn Lifecycle> {
        Some(self)
    }
}

impl Lifecycle for RuleContainer {
    fn start(&self) {
        if !self.started.swap(true, Ordering::AcqRel) {
            start_all(&self.rules.load());
        }
    }

    fn stop(&self) {
        if self.started.swap(false, Ordering::AcqRel) {
            stop_all(&self.rules.load());
        }
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }
}

fn start_all(rules: &[Arc<dyn Rule>]) {
    for lifecycle in rules.iter().filter_map(|rule| rule.lifecycle()) {
        lifecycle.start();
    }
}

fn stop_all(rules: &[Arc<dyn Rule>]) {
    for lifecycle in rules.iter().filter_map(|rule| rule.lifecycle()) {
        lifecycle.stop();
    }
}
