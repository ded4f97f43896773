//! Mid-build failure analysis.
//!
//! The Surgeon reads the captured output of a failed build, classifies every
//! line against the pattern catalog and decides whether a retry is worth it.
//! Known signatures reuse the fix remembered in Repair Memory; new ones get
//! the highest-confidence candidate fix, which is then remembered.

use std::collections::HashSet;
use std::path::PathBuf;

use mend_memory::{normalize_signature, FixRecord, MemoryRepository, RepairMemory};
use mend_patterns::{ErrorCategory, MatchResult, PatternCatalog};
use mend_prophet::Issue;
use mend_runner::{RemediationRegistry, RunnerResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::CoreResult;

/// How one matched line was handled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub line: String,
    pub pattern_key: String,
    pub category: ErrorCategory,
    pub memory_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The signature was already in Repair Memory
    pub known: bool,
    /// A registered remediation ran successfully for this line
    pub remediated: bool,
}

/// Outcome of one Surgeon analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurgeonResult {
    /// True when a fix was recorded and the build should be retried
    pub fix_applied: bool,
    pub matched_errors: Vec<Issue>,
    pub diagnoses: Vec<Diagnosis>,
}

impl SurgeonResult {
    /// One-line summary for logs and the audit trail.
    pub fn summary(&self) -> String {
        if self.diagnoses.is_empty() {
            return "no recognized error pattern".to_string();
        }
        let fixes: Vec<String> = self
            .diagnoses
            .iter()
            .filter_map(|d| {
                d.fix_name
                    .as_ref()
                    .map(|f| format!("{}{}", f, if d.known { " (remembered)" } else { "" }))
            })
            .collect();
        format!(
            "{} matched error(s), fix_applied={}, fixes=[{}]",
            self.diagnoses.len(),
            self.fix_applied,
            fixes.join(", ")
        )
    }
}

/// Failure analyzer bound to one Repair Memory.
pub struct Surgeon<R: MemoryRepository> {
    memory: RepairMemory<R>,
    remediations: RemediationRegistry,
    project_root: PathBuf,
    catalog: &'static PatternCatalog,
}

impl<R: MemoryRepository> Surgeon<R> {
    pub fn new(memory: RepairMemory<R>, remediations: RemediationRegistry, project_root: impl Into<PathBuf>) -> Self {
        Self {
            memory,
            remediations,
            project_root: project_root.into(),
            catalog: PatternCatalog::builtin(),
        }
    }

    pub fn memory(&self) -> &RepairMemory<R> {
        &self.memory
    }

    /// Analyze captured build output.
    ///
    /// Each distinct signature is handled once per analysis. `fix_applied`
    /// is true iff at least one matched line resolved to a fix that was
    /// recorded in Repair Memory.
    pub async fn analyze(&mut self, output: &str) -> CoreResult<SurgeonResult> {
        let mut result = SurgeonResult::default();
        let mut seen = HashSet::new();

        for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let Some(matched) = self.catalog.match_line(line) else {
                continue;
            };
            let signature = normalize_signature(&matched.key, line);
            if !seen.insert(signature.key.clone()) {
                debug!("Duplicate signature {} in this output, skipping", signature.key);
                continue;
            }

            let mut diagnosis = Diagnosis {
                line: line.to_string(),
                pattern_key: matched.key.clone(),
                category: matched.category,
                memory_key: signature.key.clone(),
                fix_name: None,
                description: None,
                known: false,
                remediated: false,
            };

            let record = match self.memory.lookup(&signature.key) {
                Some(entry) => {
                    info!(
                        "Known failure {} ({}): reusing fix '{}' (seen {} time(s))",
                        entry.key, entry.category, entry.fix_name, entry.use_count
                    );
                    diagnosis.known = true;
                    // Normalization drops values such as port numbers; describe
                    // the remembered fix with this line's captures.
                    let description = matched
                        .fixes
                        .iter()
                        .find(|fix| fix.name == entry.fix_name)
                        .map(|fix| fix.describe(&matched.captured_groups))
                        .unwrap_or_else(|| entry.description.clone());
                    Some(FixRecord {
                        pattern_key: entry.pattern_key.clone(),
                        fix_name: entry.fix_name.clone(),
                        confidence: entry.confidence,
                        category: entry.category,
                        description,
                        remediation: entry.remediation.clone(),
                    })
                }
                None => top_fix_record(&matched),
            };

            let Some(record) = record else {
                info!("Matched '{}' ({}) but the pattern carries no fixes", matched.key, matched.category);
                result.matched_errors.push(Issue::critical(line));
                result.diagnoses.push(diagnosis);
                continue;
            };

            diagnosis.fix_name = Some(record.fix_name.clone());
            diagnosis.description = Some(record.description.clone());

            match self.remediate(record.remediation.as_deref(), &matched.captured_groups).await {
                Ok(remediated) => diagnosis.remediated = remediated,
                Err(e) => {
                    warn!("Remediation for '{}' failed, not recording fix: {}", record.fix_name, e);
                    result.matched_errors.push(Issue::critical(line).auto_fixable());
                    result.diagnoses.push(diagnosis);
                    continue;
                }
            }

            let entry = self.memory.record(&signature, record)?;
            info!(
                "Recorded fix '{}' for {} (use_count={}): {}",
                entry.fix_name,
                entry.key,
                entry.use_count,
                diagnosis.description.as_deref().unwrap_or_default()
            );
            result.fix_applied = true;
            result.matched_errors.push(Issue::critical(line).auto_fixable().resolved());
            result.diagnoses.push(diagnosis);
        }

        if result.diagnoses.is_empty() {
            info!("No line matched a known error pattern");
        }
        Ok(result)
    }

    /// Run the named remediation if one is registered.
    ///
    /// Returns whether a remediation actually ran.
    async fn remediate(&self, name: Option<&str>, groups: &[String]) -> RunnerResult<bool> {
        let Some(name) = name else {
            return Ok(false);
        };
        let Some(remediation) = self.remediations.get(name) else {
            debug!("No remediation registered for '{}'; recording fix only", name);
            return Ok(false);
        };
        remediation.apply(&self.project_root, groups).await?;
        Ok(true)
    }
}

fn top_fix_record(matched: &MatchResult) -> Option<FixRecord> {
    matched.top_fix().map(|fix| FixRecord {
        pattern_key: matched.key.clone(),
        fix_name: fix.name.clone(),
        confidence: fix.confidence,
        category: matched.category,
        description: fix.describe(&matched.captured_groups),
        remediation: fix.remediation.clone(),
    })
}
