//! Matching contract shared by every path matcher.

use std::fmt;

use regex::{Captures, Regex};

/// Trait for matching a request path.
pub trait Matcher: Send + Sync + fmt::Debug {
    /// Returns the captures when `path` matches.
    fn matches(&self, path: &str) -> Option<MatchResult>;
}

/// Outcome of a successful match.
///
/// Pattern matchers report the servlet path info (what a `/prefix/*`
/// pattern left over). Regex matchers keep the expression, so captures are
/// read and expanded through the `regex` crate.
#[derive(Debug, Clone)]
pub struct MatchResult {
    path: String,
    path_info: Option<String>,
    regex: Option<Regex>,
}

impl MatchResult {
    pub fn pattern(path: &str, path_info: Option<String>) -> Self {
        Self {
            path: path.to_owned(),
            path_info,
            regex: None,
        }
    }

    /// `regex` must match `path`.
    pub fn regex(regex: &Regex, path: &str) -> Self {
        Self {
            path: path.to_owned(),
            path_info: None,
            regex: Some(regex.clone()),
        }
    }

    fn captures(&self) -> Option<Captures<'_>> {
        self.regex.as_ref()?.captures(&self.path)
    }

    /// Group 0 is the whole match.
    pub fn group(&self, index: usize) -> Option<&str> {
        match &self.regex {
            None => (index == 0).then_some(self.path.as_str()),
            Some(_) => self.captures()?.get(index).map(|m| m.as_str()),
        }
    }

    pub fn name(&self, name: &str) -> Option<&str> {
        self.captures()?.name(name).map(|m| m.as_str())
    }

    pub fn path_info(&self) -> Option<&str> {
        self.path_info.as_deref()
    }

    /// Substitute `$1`, `$name`, `${name}` and `$$` in `template` with
    /// [`Captures::expand`]. Unknown groups expand to nothing; without
    /// regex captures the template is returned as is.
    pub fn expand(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        match self.captures() {
            Some(captures) => captures.expand(template, &mut out),
            None => out.push_str(template),
        }
        out
    }
}
