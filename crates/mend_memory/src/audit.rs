//! Append-only audit trail shared by all phases.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tracing::warn;

use crate::error::MemoryResult;

/// File name of the audit log inside the state directory.
pub const AUDIT_LOG_FILE_NAME: &str = "pipeline.log";

/// Plain-text, timestamped, append-only log.
///
/// Each line reads `<rfc3339> [<phase>] <message>`.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Audit log at `<state_dir>/pipeline.log`.
    pub fn for_state_dir(state_dir: impl AsRef<Path>) -> Self {
        Self::new(state_dir.as_ref().join(AUDIT_LOG_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line.
    pub fn append(&self, phase: &str, message: impl AsRef<str>) -> MemoryResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let message = message.as_ref().replace(['\r', '\n'], " | ");
        writeln!(
            file,
            "{} [{}] {}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            phase,
            message
        )?;
        Ok(())
    }

    /// Append one line, logging instead of failing.
    pub fn record(&self, phase: &str, message: impl AsRef<str>) {
        if let Err(e) = self.append(phase, message) {
            warn!("Failed to write audit log {:?}: {}", self.path, e);
        }
    }

    /// Read all lines written so far.
    pub fn read_lines(&self) -> MemoryResult<Vec<String>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        Ok(fs::read_to_string(&self.path)?.lines().map(String::from).collect())
    }
}
