//! Rule containers guarded by a predicate.
//!
//! # Responsibilities
//! - Consult the gate before any contained rule
//! - Report no match, without touching children, when the gate fails
//! - Virtual host gating (exact and `*.suffix` host names)
//!
//! # Design Decisions
//! - Host matching is case-insensitive and ignores the port
//! - An empty host list admits every request
//! - Host lists are swapped atomically, like rule lists

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::lifecycle::Lifecycle;
use crate::rewrite::{Applied, RewriteError, Rule, RuleContainer, RuleError, RuleHandler};

/// Predicate deciding whether a gated container applies to a request.
pub trait Gate: Send + Sync {
    fn admits(&self, request: &RuleHandler) -> bool;
}

impl<F> Gate for F
where
    F: Fn(&RuleHandler) -> bool + Send + Sync,
{
    fn admits(&self, request: &RuleHandler) -> bool {
        self(request)
    }
}

/// Admits requests addressed to one of a set of virtual hosts.
#[derive(Debug, Default)]
pub struct VirtualHosts {
    hosts: ArcSwap<Vec<String>>,
}

impl VirtualHosts {
    pub fn new<I, S>(hosts: I) -> Result<Self, RuleError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let gate = Self::default();
        gate.set_hosts(hosts)?;
        Ok(gate)
    }

    pub fn hosts(&self) -> Arc<Vec<String>> {
        self.hosts.load_full()
    }

    pub fn set_hosts<I, S>(&self, hosts: I) -> Result<(), RuleError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let hosts = hosts
            .into_iter()
            .map(|host| normalize(host.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        self.hosts.store(Arc::new(hosts));
        Ok(())
    }

    pub fn add_host(&self, host: &str) -> Result<(), RuleError> {
        let host = normalize(host)?;
        self.hosts.rcu(|hosts| {
            let mut next = Vec::clone(hosts);
            next.push(host.clone());
            next
        });
        Ok(())
    }

    fn matches(&self, host: &str) -> bool {
        let hosts = self.hosts.load();
        if hosts.is_empty() {
            return true;
        }
        let host = host.to_ascii_lowercase();
        hosts.iter().any(|candidate| match candidate.strip_prefix("*.") {
            Some(suffix) => host
                .strip_suffix(suffix)
                .and_then(|label| label.strip_suffix('.'))
                .is_some_and(|label| !label.is_empty()),
            None => *candidate == host,
        })
    }
}

impl Gate for VirtualHosts {
    fn admits(&self, request: &RuleHandler) -> bool {
        if self.hosts.load().is_empty() {
            return true;
        }
        request.host().is_some_and(|host| self.matches(host))
    }
}

fn normalize(host: &str) -> Result<String, RuleError> {
    let host = host.trim();
    let name = host.strip_prefix("*.").unwrap_or(host);
    if name.is_empty() || name.contains(['*', '/', ' ']) {
        return Err(RuleError::InvalidVirtualHost(host.to_owned()));
    }
    Ok(host.to_ascii_lowercase())
}

/// A [`RuleContainer`] whose rules only apply when `gate` admits the request.
pub struct GatedRuleContainer<G = VirtualHosts> {
    gate: G,
    rules: RuleContainer,
    terminating: bool,
}

impl<G: Gate> GatedRuleContainer<G> {
    pub fn new(gate: G) -> Self {
        Self {
            gate,
            rules: RuleContainer::new(),
            terminating: false,
        }
    }

    pub fn gate(&self) -> &G {
        &self.gate
    }

    /// Stop the enclosing container once this one has matched.
    pub fn terminating(mut self, terminating: bool) -> Self {
        self.terminating = terminating;
        self
    }
}

impl GatedRuleContainer<VirtualHosts> {
    pub fn virtual_hosts<I, S>(hosts: I) -> Result<Self, RuleError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self::new(VirtualHosts::new(hosts)?))
    }
}

impl<G> Deref for GatedRuleContainer<G> {
    type Target = RuleContainer;

    fn deref(&self) -> &Self::Target {
        &self.rules
    }
}

impl<G> fmt::Debug for GatedRuleContainer<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatedRuleContainer")
            .field("gate", &std::any::type_name::<G>())
            .field("rules", &self.rules)
            .field("terminating", &self.terminating)
            .finish()
    }
}

impl<G: Gate> Rule for GatedRuleContainer<G> {
    fn is_terminating(&self) -> bool {
        self.terminating
    }

    fn match_and_apply(&self, input: RuleHandler) -> Result<Applied, RewriteError> {
        if !self.gate.admits(&input) {
            tracing::trace!(host = ?input.host(), "Gate closed, skipping contained rules");
            return Ok(Applied::Unmatched(input));
        }
        self.rules.match_and_apply(input)
    }

    fn lifecycle(&self) -> Option<&dyn Lifecycle> {
        Some(&self.rules)
    }
}
