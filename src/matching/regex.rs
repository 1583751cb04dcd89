//! Regular expression path matching.

use regex::Regex;

use crate::matching::{MatchResult, Matcher};
use crate::rewrite::RuleError;

/// Match the request path against a regular expression. Unanchored unless
/// the expression says otherwise.
#[derive(Debug, Clone)]
pub struct PathRegex {
    regex: Regex,
}

impl PathRegex {
    pub fn new(pattern: &str) -> Result<Self, RuleError> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// What `template` expands to when every capture is empty, so the literal
/// parts of a replacement can be checked before any request matches.
pub fn expand_empty(template: &str) -> Result<String, RuleError> {
    let mut out = String::with_capacity(template.len());
    if let Some(captures) = Regex::new("")?.captures("") {
        captures.expand(template, &mut out);
    }
    Ok(out)
}

impl Matcher for PathRegex {
    fn matches(&self, path: &str) -> Option<MatchResult> {
        self.regex
            .is_match(path)
            .then(|| MatchResult::regex(&self.regex, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captures() {
        let regex = PathRegex::new(r"^/blog/(\d{4})/(?P<slug>[a-z-]+)$").unwrap();

        let result = regex.matches("/blog/2024/hello-world").unwrap();
        assert_eq!(result.group(1), Some("2024"));
        assert_eq!(result.name("slug"), Some("hello-world"));
        assert_eq!(result.expand("/posts/${slug}?year=$1"), "/posts/hello-world?year=2024");

        assert!(regex.matches("/blog/24/x").is_none());
    }

    #[test]
    fn test_expand_empty() {
        assert_eq!(expand_empty("/posts/${slug}?year=$1").unwrap(), "/posts/?year=");
        assert_eq!(expand_empty("/with space/$1").unwrap(), "/with space/");
        assert_eq!(expand_empty("$$1").unwrap(), "$1");
    }

    #[test]
    fn test_invalid_regex() {
        assert!(matches!(PathRegex::new("(unclosed"), Err(RuleError::InvalidRegex(_))));
    }
}
