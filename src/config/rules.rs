//! Rule definitions in configuration files, and building live rules from them.
//!
//! ```toml
//! [[rewrite.rules]]
//! type = "rewrite_pattern"
//! pattern = "/old/*"
//! replacement = "/new/*"
//!
//! [[rewrite.rules]]
//! type = "virtual_host"
//! hosts = ["maintenance.example.com"]
//!
//!   [[rewrite.rules.rules]]
//!   type = "response_pattern"
//!   pattern = "/"
//!   status = 503
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::schema::RewriteConfig;
use crate::rewrite::{GatedRuleContainer, Rule, RuleContainer, RuleError};
use crate::rules::{
    CompactPathRule, CookiePatternRule, ForceRequestHeaderRule, HeaderPatternRule, HeaderRegexRule,
    RedirectPatternRule, RedirectRegexRule, ResponsePatternRule, RewritePatternRule, RewriteRegexRule,
    TerminatingPatternRule, TerminatingRegexRule,
};

fn default_redirect_status() -> u16 {
    302
}

fn default_true() -> bool {
    true
}

/// One configured rule. The `type` key selects the variant.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleConfig {
    RewritePattern {
        pattern: String,
        replacement: String,
        #[serde(default)]
        terminating: bool,
    },
    RewriteRegex {
        regex: String,
        replacement: String,
        #[serde(default)]
        terminating: bool,
    },
    RedirectPattern {
        pattern: String,
        location: String,
        #[serde(default = "default_redirect_status")]
        status: u16,
        #[serde(default = "default_true")]
        terminating: bool,
    },
    RedirectRegex {
        regex: String,
        location: String,
        #[serde(default = "default_redirect_status")]
        status: u16,
        #[serde(default = "default_true")]
        terminating: bool,
    },
    ResponsePattern {
        pattern: String,
        status: u16,
        #[serde(default)]
        body: Option<String>,
        #[serde(default = "default_true")]
        terminating: bool,
    },
    HeaderPattern {
        pattern: String,
        name: String,
        value: String,
        /// Append instead of replacing existing values.
        #[serde(default)]
        add: bool,
        #[serde(default)]
        terminating: bool,
    },
    HeaderRegex {
        regex: String,
        name: String,
        value: String,
        #[serde(default)]
        add: bool,
        #[serde(default)]
        terminating: bool,
    },
    ForceRequestHeader {
        name: String,
        value: String,
        #[serde(default)]
        terminating: bool,
    },
    CookiePattern {
        pattern: String,
        name: String,
        value: String,
        #[serde(default)]
        terminating: bool,
    },
    TerminatingPattern {
        pattern: String,
    },
    TerminatingRegex {
        regex: String,
    },
    CompactPath {
        #[serde(default)]
        terminating: bool,
    },
    VirtualHost {
        #[serde(default)]
        hosts: Vec<String>,
        #[serde(default)]
        original_path_attribute: Option<String>,
        #[serde(default)]
        terminating: bool,
        #[serde(default)]
        rules: Vec<RuleConfig>,
    },
}

impl RuleConfig {
    /// Build the live rule. Every pattern, status and header is validated here.
    pub fn build(&self) -> Result<Arc<dyn Rule>, RuleError> {
        let rule: Arc<dyn Rule> = match self {
            RuleConfig::RewritePattern {
                pattern,
                replacement,
                terminating,
            } => Arc::new(RewritePatternRule::new(pattern, replacement)?.terminating(*terminating)),
            RuleConfig::RewriteRegex {
                regex,
                replacement,
                terminating,
            } => Arc::new(RewriteRegexRule::new(regex, replacement)?.terminating(*terminating)),
            RuleConfig::RedirectPattern {
                pattern,
                location,
                status,
                terminating,
            } => Arc::new(
                RedirectPatternRule::new(pattern, location)?
                    .with_status(*status)?
                    .terminating(*terminating),
            ),
            RuleConfig::RedirectRegex {
                regex,
                location,
                status,
                terminating,
            } => Arc::new(
                RedirectRegexRule::new(regex, location)?
                    .with_status(*status)?
                    .terminating(*terminating),
            ),
            RuleConfig::ResponsePattern {
                pattern,
                status,
                body,
                terminating,
            } => Arc::new(ResponsePatternRule::new(pattern, *status, body.clone())?.terminating(*terminating)),
            RuleConfig::HeaderPattern {
                pattern,
                name,
                value,
                add,
                terminating,
            } => Arc::new(HeaderPatternRule::new(pattern, name, value, *add)?.terminating(*terminating)),
            RuleConfig::HeaderRegex {
                regex,
                name,
                value,
                add,
                terminating,
            } => Arc::new(HeaderRegexRule::new(regex, name, value, *add)?.terminating(*terminating)),
            RuleConfig::ForceRequestHeader {
                name,
                value,
                terminating,
            } => Arc::new(ForceRequestHeaderRule::new(name, value)?.terminating(*terminating)),
            RuleConfig::CookiePattern {
                pattern,
                name,
                value,
                terminating,
            } => Arc::new(CookiePatternRule::new(pattern, name, value)?.terminating(*terminating)),
            RuleConfig::TerminatingPattern { pattern } => Arc::new(TerminatingPatternRule::new(pattern)?),
            RuleConfig::TerminatingRegex { regex } => Arc::new(TerminatingRegexRule::new(regex)?),
            RuleConfig::CompactPath { terminating } => Arc::new(CompactPathRule::new().terminating(*terminating)),
            RuleConfig::VirtualHost {
                hosts,
                original_path_attribute,
                terminating,
                rules,
            } => {
                let container = GatedRuleContainer::virtual_hosts(hosts)?.terminating(*terminating);
                container.set_rules(build_rules(rules)?);
                container.set_original_path_attribute(original_path_attribute.clone());
                Arc::new(container)
            }
        };
        Ok(rule)
    }

    /// Short name of the rule kind, as written in the `type` key.
    pub fn kind(&self) -> &'static str {
        match self {
            RuleConfig::RewritePattern { .. } => "rewrite_pattern",
            RuleConfig::RewriteRegex { .. } => "rewrite_regex",
            RuleConfig::RedirectPattern { .. } => "redirect_pattern",
            RuleConfig::RedirectRegex { .. } => "redirect_regex",
            RuleConfig::ResponsePattern { .. } => "response_pattern",
            RuleConfig::HeaderPattern { .. } => "header_pattern",
            RuleConfig::HeaderRegex { .. } => "header_regex",
            RuleConfig::ForceRequestHeader { .. } => "force_request_header",
            RuleConfig::CookiePattern { .. } => "cookie_pattern",
            RuleConfig::TerminatingPattern { .. } => "terminating_pattern",
            RuleConfig::TerminatingRegex { .. } => "terminating_regex",
            RuleConfig::CompactPath { .. } => "compact_path",
            RuleConfig::VirtualHost { .. } => "virtual_host",
        }
    }
}

pub fn build_rules(configs: &[RuleConfig]) -> Result<Vec<Arc<dyn Rule>>, RuleError> {
    configs.iter().map(RuleConfig::build).collect()
}

/// Build the stage's top-level container from the `[rewrite]` section.
pub fn build_container(config: &RewriteConfig) -> Result<RuleContainer, RuleError> {
    let container = RuleContainer::with_rules(build_rules(&config.rules)?);
    container.set_original_path_attribute(config.original_path_attribute.clone());
    Ok(container)
}
