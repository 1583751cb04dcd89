//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Build every configured rule once, so bad patterns are caught at load time
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::uri::Authority;
use thiserror::Error;

use crate::config::rules::RuleConfig;
use crate::config::schema::ProxyConfig;
use crate::rewrite::{RuleError, VirtualHosts};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    InvalidBindAddress(String),

    #[error("upstream.address {0:?} must look like host:port")]
    InvalidUpstream(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("{path} ({kind}): {source}")]
    Rule {
        path: String,
        kind: &'static str,
        #[source]
        source: RuleError,
    },
}

pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(config.listener.bind_address.clone()));
    }

    if let Some(address) = &config.upstream.address {
        let valid = address
            .parse::<Authority>()
            .is_ok_and(|authority| authority.port_u16().is_some());
        if !valid {
            errors.push(ValidationError::InvalidUpstream(address.clone()));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }

    validate_rules("rewrite.rules", &config.rewrite.rules, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_rules(prefix: &str, rules: &[RuleConfig], errors: &mut Vec<ValidationError>) {
    for (index, rule) in rules.iter().enumerate() {
        let path = format!("{prefix}[{index}]");
        let result = match rule {
            RuleConfig::VirtualHost { hosts, rules, .. } => {
                validate_rules(&format!("{path}.rules"), rules, errors);
                VirtualHosts::new(hosts).map(|_| ())
            }
            other => other.build().map(|_| ()),
        };
        if let Err(source) = result {
            errors.push(ValidationError::Rule {
                path,
                kind: rule.kind(),
                source,
            });
        }
    }
}
