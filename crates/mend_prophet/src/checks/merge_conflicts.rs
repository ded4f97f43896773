use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use glob::Pattern;
use regex::bytes::Regex;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::check::{Check, CheckResult, Issue, ScanContext};
use crate::error::{ScanError, ScanResult};

#[allow(clippy::expect_used)]
static OPEN_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^<{7}(?: |\r?$)").expect("valid conflict marker regex"));

#[allow(clippy::expect_used)]
static CLOSE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^>{7}(?: |\r?$)").expect("valid conflict marker regex"));

const MAX_REPORTED_FILES: usize = 20;

/// Source files containing unresolved merge conflict markers.
///
/// Resolving a conflict needs a human, so findings are critical and never
/// auto-fixed.
pub struct MergeConflictCheck;

#[async_trait]
impl Check for MergeConflictCheck {
    fn name(&self) -> &str {
        "merge-conflicts"
    }

    async fn run(&self, ctx: &ScanContext) -> ScanResult<CheckResult> {
        let ignore = ctx
            .config
            .ignore
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|source| ScanError::InvalidIgnore {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<ScanResult<Vec<_>>>()?;

        let root = ctx.project_root.clone();
        let max_bytes = ctx.config.max_scan_bytes;
        let summary = tokio::task::spawn_blocking(move || {
            let walker = WalkDir::new(&root)
                .follow_links(false)
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_ignored(e, &root, &ignore));
            scan(walker, &root, max_bytes)
        })
        .await
        .map_err(|e| ScanError::Failed(e.to_string()))?;

        let mut result = CheckResult::new(self.name()).with_detail("files_scanned", summary.scanned.to_string());
        if summary.skipped > 0 {
            result = result.with_detail("skipped_entries", summary.skipped.to_string());
        }
        for path in summary.conflicted.iter().take(MAX_REPORTED_FILES) {
            result.push(Issue::critical(format!(
                "Unresolved merge conflict markers in {}",
                path.display()
            )));
        }
        if summary.conflicted.len() > MAX_REPORTED_FILES {
            result = result.with_detail("conflicted_files_total", summary.conflicted.len().to_string());
        }
        Ok(result)
    }
}

fn is_ignored(entry: &DirEntry, root: &Path, ignore: &[Pattern]) -> bool {
    let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
    let name = entry.file_name().to_string_lossy();
    ignore
        .iter()
        .any(|p| p.matches_path(relative) || p.matches(&name))
}

#[derive(Debug, Default)]
struct ScanSummary {
    conflicted: Vec<PathBuf>,
    scanned: usize,
    skipped: usize,
}

/// Scan walked entries for conflict markers.
///
/// Unreadable entries are skipped and counted; they never abort the walk.
fn scan<I, E>(entries: I, root: &Path, max_bytes: u64) -> ScanSummary
where
    I: IntoIterator<Item = Result<DirEntry, E>>,
    E: Display,
{
    let mut summary = ScanSummary::default();

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                summary.skipped += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.metadata().map(|m| m.len() > max_bytes).unwrap_or(true) {
            continue;
        }

        let content = match std::fs::read(entry.path()) {
            Ok(content) => content,
            Err(e) => {
                debug!("Skipping {:?}: {}", entry.path(), e);
                summary.skipped += 1;
                continue;
            }
        };
        // Binary
        if content.contains(&0) {
            continue;
        }
        summary.scanned += 1;

        if OPEN_MARKER.is_match(&content) && CLOSE_MARKER.is_match(&content) {
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            summary.conflicted.push(relative.to_path_buf());
        }
    }

    summary.conflicted.sort();
    summary
}
