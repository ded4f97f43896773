//! Candidate fixes attached to error patterns.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// A candidate fix for a matched error.
///
/// `confidence` is an authored score, never learned. `template` is rendered
/// against the match's capture groups, where `{N}` stands for group `N`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub name: String,
    pub confidence: f64,
    pub template: String,
    /// Name of the pluggable remediation that applies this fix, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl Fix {
    pub fn new(name: impl Into<String>, confidence: f64, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            confidence,
            template: template.into(),
            remediation: None,
        }
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }

    /// Describe the fix for a concrete match.
    pub fn describe(&self, groups: &[String]) -> String {
        render_template(&self.template, groups)
    }

    /// Order fixes by confidence, highest first.
    ///
    /// The sort is stable: equally confident fixes keep catalog order.
    pub fn rank(fixes: &[Fix]) -> Vec<&Fix> {
        let mut ranked: Vec<&Fix> = fixes.iter().collect();
        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        ranked
    }
}

#[allow(clippy::expect_used)]
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\d+)\}").expect("valid placeholder regex"));

/// Substitute `{N}` placeholders with capture groups.
///
/// Placeholders referring to a group that does not exist are left untouched.
pub fn render_template(template: &str, groups: &[String]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|index| groups.get(index))
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
