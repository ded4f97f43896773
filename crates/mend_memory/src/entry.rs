//! Repair memory document model.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use mend_patterns::ErrorCategory;
use serde::{Deserialize, Serialize};

/// Current on-disk document version.
pub const MEMORY_DOCUMENT_VERSION: u32 = 1;

/// A remembered resolution for one normalized error signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairMemoryEntry {
    /// Normalized signature hash (unique)
    pub key: String,
    /// Catalog pattern that produced the match
    pub pattern_key: String,
    /// Normalized text the key was derived from
    pub signature: String,
    pub fix_name: String,
    pub confidence: f64,
    pub category: ErrorCategory,
    pub description: String,
    /// Remediation capability applied for this fix, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    pub first_seen_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub use_count: u64,
}

/// The fix chosen for a signature, as handed to `RepairMemory::record`.
#[derive(Debug, Clone, PartialEq)]
pub struct FixRecord {
    pub pattern_key: String,
    pub fix_name: String,
    pub confidence: f64,
    pub category: ErrorCategory,
    pub description: String,
    pub remediation: Option<String>,
}

/// The whole persisted repair memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryDocument {
    pub version: u32,
    #[serde(default)]
    pub entries: HashMap<String, RepairMemoryEntry>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self {
            version: MEMORY_DOCUMENT_VERSION,
            entries: HashMap::new(),
        }
    }
}
