//! Storage backends for repair memory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::atomic::write_json_atomic;
use crate::entry::{MemoryDocument, MEMORY_DOCUMENT_VERSION};
use crate::error::{MemoryError, MemoryResult};

/// File name of the repair memory document inside the state directory.
pub const MEMORY_FILE_NAME: &str = "repair-memory.json";

/// Load/save access to the repair memory document.
pub trait MemoryRepository: Send + Sync {
    /// Load the current document, or an empty one if none exists yet.
    fn load(&self) -> MemoryResult<MemoryDocument>;

    /// Replace the stored document in one atomic step.
    fn save_atomic(&self, document: &MemoryDocument) -> MemoryResult<()>;
}

/// JSON file repository with write-to-temp-then-rename saves.
#[derive(Debug, Clone)]
pub struct FileRepository {
    path: PathBuf,
}

impl FileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Repository at `<state_dir>/repair-memory.json`.
    pub fn for_state_dir(state_dir: impl AsRef<Path>) -> Self {
        Self::new(state_dir.as_ref().join(MEMORY_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move an unreadable document aside so a fresh one can be started.
    fn quarantine(&self, reason: &serde_json::Error) -> MemoryResult<()> {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| MEMORY_FILE_NAME.to_string());
        let target = self.path.with_file_name(format!(
            "{}.corrupt-{}",
            file_name,
            Utc::now().format("%Y%m%dT%H%M%S")
        ));
        fs::rename(&self.path, &target)?;
        warn!(
            "Repair memory at {:?} is unreadable ({}); moved to {:?} and starting empty",
            self.path, reason, target
        );
        Ok(())
    }
}

impl MemoryRepository for FileRepository {
    fn load(&self) -> MemoryResult<MemoryDocument> {
        if !self.path.exists() {
            debug!("No repair memory at {:?}, starting empty", self.path);
            return Ok(MemoryDocument::default());
        }

        let content = fs::read_to_string(&self.path)?;
        let document: MemoryDocument = match serde_json::from_str(&content) {
            Ok(document) => document,
            Err(e) => {
                self.quarantine(&e)?;
                return Ok(MemoryDocument::default());
            }
        };

        if document.version > MEMORY_DOCUMENT_VERSION {
            return Err(MemoryError::UnsupportedVersion {
                found: document.version,
                supported: MEMORY_DOCUMENT_VERSION,
            });
        }

        debug!("Loaded {} repair memory entries from {:?}", document.entries.len(), self.path);
        Ok(document)
    }

    fn save_atomic(&self, document: &MemoryDocument) -> MemoryResult<()> {
        write_json_atomic(&self.path, document)
    }
}

/// In-process repository for tests.
///
/// Clones share the same document, so a clone can stand in for a later
/// process reopening the store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    document: Arc<Mutex<MemoryDocument>>,
    saves: Arc<Mutex<usize>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed saves.
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

impl MemoryRepository for InMemoryRepository {
    fn load(&self) -> MemoryResult<MemoryDocument> {
        Ok(self.document.lock().clone())
    }

    fn save_atomic(&self, document: &MemoryDocument) -> MemoryResult<()> {
        *self.document.lock() = document.clone();
        *self.saves.lock() += 1;
        Ok(())
    }
}
