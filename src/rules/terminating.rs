//! Rules that match and stop evaluation without changing the request.

use super::{Action, MatchRule};
use crate::matching::{MatchResult, PathPattern, PathRegex};
use crate::rewrite::{RewriteError, RuleError, RuleHandler};

/// Matches and hands the request on unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Terminate;

impl Action for Terminate {
    fn apply(&self, input: RuleHandler, _result: &MatchResult) -> Result<RuleHandler, RewriteError> {
        Ok(input)
    }
}

pub type TerminatingPatternRule = MatchRule<PathPattern, Terminate>;
pub type TerminatingRegexRule = MatchRule<PathRegex, Terminate>;

impl MatchRule<PathPattern, Terminate> {
    pub fn new(pattern: &str) -> Result<Self, RuleError> {
        Ok(Self::pattern(pattern, Terminate)?.terminating(true))
    }
}

impl MatchRule<PathRegex, Terminate> {
    pub fn new(regex: &str) -> Result<Self, RuleError> {
        Ok(Self::regex(regex, Terminate)?.terminating(true))
    }
}
