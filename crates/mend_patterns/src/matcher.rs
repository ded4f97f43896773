//! Line-level error matching.

use serde::{Deserialize, Serialize};

use crate::catalog::{ErrorCategory, PatternCatalog};
use crate::fix::Fix;

/// Outcome of matching one line against the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Key of the matched pattern
    pub key: String,
    pub category: ErrorCategory,
    /// Capture groups; index 0 is the matched text
    pub captured_groups: Vec<String>,
    /// Candidate fixes in catalog order
    pub fixes: Vec<Fix>,
}

impl MatchResult {
    /// Candidate fixes ordered by confidence, highest first.
    pub fn ranked_fixes(&self) -> Vec<&Fix> {
        Fix::rank(&self.fixes)
    }

    /// The highest-confidence fix, if the pattern carries any.
    pub fn top_fix(&self) -> Option<&Fix> {
        self.ranked_fixes().into_iter().next()
    }
}

/// Match a single log line against the built-in catalog.
///
/// Pure and deterministic: the same line always yields the same result.
pub fn match_error_pattern(line: &str) -> Option<MatchResult> {
    PatternCatalog::builtin().match_line(line)
}
