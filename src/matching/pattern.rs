//! Servlet-style path patterns.
//!
//! # Syntax
//! - `/exact/path`: the path must be equal
//! - `/prefix/*`: the prefix itself or anything below it; the remainder is the path info
//! - `/*`: every path; the whole path is the path info
//! - `*.ext`: last path segment ends with `.ext`
//! - `/`: default pattern, every path

use std::fmt;

use crate::matching::{MatchResult, Matcher};
use crate::rewrite::RuleError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Exact(String),
    Prefix(String),
    Suffix(String),
    Default,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self, RuleError> {
        let invalid = |reason| RuleError::InvalidPattern {
            pattern: pattern.to_owned(),
            reason,
        };

        if pattern.is_empty() {
            return Err(invalid("pattern is empty"));
        }
        if pattern == "/" {
            return Ok(PathPattern::Default);
        }
        if let Some(prefix) = pattern.strip_suffix("/*") {
            if prefix.contains('*') || !(prefix.is_empty() || prefix.starts_with('/')) {
                return Err(invalid("prefix patterns look like /path/*"));
            }
            return Ok(PathPattern::Prefix(prefix.to_owned()));
        }
        if let Some(extension) = pattern.strip_prefix("*.") {
            if extension.is_empty() || extension.contains(['*', '/']) {
                return Err(invalid("suffix patterns look like *.ext"));
            }
            return Ok(PathPattern::Suffix(format!(".{extension}")));
        }
        if !pattern.starts_with('/') {
            return Err(invalid("pattern must start with '/' or '*.'"));
        }
        if pattern.contains('*') {
            return Err(invalid("'*' is only allowed as a trailing '/*' or a leading '*.'"));
        }
        Ok(PathPattern::Exact(pattern.to_owned()))
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathPattern::Exact(path) => f.write_str(path),
            PathPattern::Prefix(prefix) => write!(f, "{prefix}/*"),
            PathPattern::Suffix(extension) => write!(f, "*{extension}"),
            PathPattern::Default => f.write_str("/"),
        }
    }
}

impl Matcher for PathPattern {
    fn matches(&self, path: &str) -> Option<MatchResult> {
        let path_info = match self {
            PathPattern::Exact(expected) => {
                if path != expected {
                    return None;
                }
                None
            }
            PathPattern::Prefix(prefix) => {
                let rest = path.strip_prefix(prefix.as_str())?;
                if !rest.is_empty() && !rest.starts_with('/') {
                    return None;
                }
                Some(rest).filter(|rest| !rest.is_empty()).map(str::to_owned)
            }
            PathPattern::Suffix(extension) => {
                let segment = path.rsplit('/').next().unwrap_or(path);
                if segment.len() <= extension.len() || !segment.ends_with(extension.as_str()) {
                    return None;
                }
                None
            }
            PathPattern::Default => None,
        };
        Some(MatchResult::pattern(path, path_info))
    }
}
