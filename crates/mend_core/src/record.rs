//! Persisted record of one orchestrator run.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use mend_runner::HealthStatus;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::{CoreResult, TerminalFailure};
use crate::orchestrator::PipelineState;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// Build and deploy succeeded; health degradation is only a warning.
    Succeeded {
        #[serde(skip_serializing_if = "Option::is_none")]
        health_warning: Option<String>,
    },
    Failed { failure: TerminalFailure },
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Succeeded { .. } => 0,
            Self::Failed { .. } => 1,
        }
    }

    /// Escalation message for a terminal failure.
    pub fn escalation(&self) -> Option<String> {
        match self {
            Self::Succeeded { .. } => None,
            Self::Failed { failure } => Some(failure.to_string()),
        }
    }
}

/// A state transition taken during a run.
#[derive(Debug, Clone, Serialize)]
pub struct Transition {
    pub from: PipelineState,
    pub to: PipelineState,
    pub at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Everything worth keeping about one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub project_root: PathBuf,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Build attempts made
    pub attempts: u32,
    pub max_retries: u32,
    pub skip_prophet: bool,
    pub transitions: Vec<Transition>,
    pub outcome: PipelineOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthStatus>,
}

impl RunRecord {
    /// The sequence of states visited, starting with `Init`.
    pub fn states(&self) -> Vec<PipelineState> {
        let mut states = Vec::with_capacity(self.transitions.len() + 1);
        if let Some(first) = self.transitions.first() {
            states.push(first.from);
        }
        states.extend(self.transitions.iter().map(|t| t.to));
        states
    }

    pub fn final_state(&self) -> Option<PipelineState> {
        self.transitions.last().map(|t| t.to)
    }

    pub fn exit_code(&self) -> u8 {
        self.outcome.exit_code()
    }

    /// Save atomically to `path`.
    pub fn save(&self, path: &std::path::Path) -> CoreResult<()> {
        mend_memory::write_json_atomic(path, self)?;
        debug!("Saved run record to {:?}", path);
        Ok(())
    }
}
