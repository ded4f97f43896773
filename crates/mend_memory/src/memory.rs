//! The repair memory cache.

use chrono::Utc;
use tracing::{debug, info};

use crate::entry::{FixRecord, MemoryDocument, RepairMemoryEntry};
use crate::error::MemoryResult;
use crate::normalize::ErrorSignature;
use crate::repository::MemoryRepository;

/// Durable key → fix cache.
///
/// Every write is persisted before it returns; there is no state that only
/// lives in memory.
pub struct RepairMemory<R: MemoryRepository> {
    repository: R,
    document: MemoryDocument,
}

impl<R: MemoryRepository> RepairMemory<R> {
    /// Open the memory by loading the current document from the repository.
    pub fn open(repository: R) -> MemoryResult<Self> {
        let document = repository.load()?;
        Ok(Self { repository, document })
    }

    /// Look up a remembered fix by normalized key.
    pub fn lookup(&self, key: &str) -> Option<&RepairMemoryEntry> {
        self.document.entries.get(key)
    }

    /// Record a fix for a signature.
    ///
    /// Upsert: an existing entry keeps its fix and gets `use_count`
    /// incremented and `last_used_at` refreshed; otherwise a new entry is
    /// inserted with `use_count = 1`. The document is saved atomically
    /// before returning; on a failed save the in-memory change is undone.
    pub fn record(&mut self, signature: &ErrorSignature, fix: FixRecord) -> MemoryResult<RepairMemoryEntry> {
        let now = Utc::now();
        let previous = self.document.entries.get(&signature.key).cloned();

        let entry = match &previous {
            Some(existing) => {
                let mut updated = existing.clone();
                updated.use_count += 1;
                updated.last_used_at = now;
                debug!("Repair memory hit for {} (use_count={})", signature.key, updated.use_count);
                updated
            }
            None => {
                info!("Remembering fix '{}' for {}", fix.fix_name, signature.key);
                RepairMemoryEntry {
                    key: signature.key.clone(),
                    pattern_key: fix.pattern_key,
                    signature: signature.template.clone(),
                    fix_name: fix.fix_name,
                    confidence: fix.confidence,
                    category: fix.category,
                    description: fix.description,
                    remediation: fix.remediation,
                    first_seen_at: now,
                    last_used_at: now,
                    use_count: 1,
                }
            }
        };

        self.document.entries.insert(signature.key.clone(), entry.clone());

        if let Err(e) = self.repository.save_atomic(&self.document) {
            match previous {
                Some(existing) => self.document.entries.insert(signature.key.clone(), existing),
                None => self.document.entries.remove(&signature.key),
            };
            return Err(e);
        }

        Ok(entry)
    }

    /// Remove an entry, returning it if it existed.
    pub fn forget(&mut self, key: &str) -> MemoryResult<Option<RepairMemoryEntry>> {
        let removed = self.document.entries.remove(key);
        if let Some(entry) = &removed {
            if let Err(e) = self.repository.save_atomic(&self.document) {
                self.document.entries.insert(key.to_string(), entry.clone());
                return Err(e);
            }
            info!("Forgot repair memory entry {}", key);
        }
        Ok(removed)
    }

    /// All entries, most recently used first.
    pub fn entries(&self) -> Vec<&RepairMemoryEntry> {
        let mut entries: Vec<&RepairMemoryEntry> = self.document.entries.values().collect();
        entries.sort_by(|a, b| b.last_used_at.cmp(&a.last_used_at).then_with(|| a.key.cmp(&b.key)));
        entries
    }

    pub fn len(&self) -> usize {
        self.document.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document.entries.is_empty()
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MemoryError;
    use crate::normalize::normalize_signature;
    use crate::repository::{FileRepository, InMemoryRepository};
    use mend_patterns::ErrorCategory;
    use tempfile::tempdir;

    fn fix_record(name: &str) -> FixRecord {
        FixRecord {
            pattern_key: "missing-module".to_string(),
            fix_name: name.to_string(),
            confidence: 0.9,
            category: ErrorCategory::MissingDependency,
            description: "Install missing dependency `left-pad`".to_string(),
            remediation: Some("install-dependency".to_string()),
        }
    }

    #[test]
    fn test_record_is_upsert() {
        let repo = InMemoryRepository::new();
        let mut memory = RepairMemory::open(repo.clone()).unwrap();
        let signature = normalize_signature("missing-module", "Cannot find module 'left-pad'");

        let first = memory.record(&signature, fix_record("install-dependency")).unwrap();
        assert_eq!(first.use_count, 1);

        let second = memory.record(&signature, fix_record("something-else")).unwrap();
        assert_eq!(second.use_count, 2);
        assert_eq!(second.fix_name, "install-dependency");
        assert_eq!(second.first_seen_at, first.first_seen_at);

        assert_eq!(memory.len(), 1);
        assert_eq!(repo.save_count(), 2);
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp = tempdir().unwrap();
        let signature = normalize_signature("missing-module", "Cannot find module 'left-pad'");

        {
            let mut memory = RepairMemory::open(FileRepository::for_state_dir(temp.path())).unwrap();
            memory.record(&signature, fix_record("install-dependency")).unwrap();
        }

        let mut reopened = RepairMemory::open(FileRepository::for_state_dir(temp.path())).unwrap();
        assert_eq!(reopened.lookup(&signature.key).unwrap().use_count, 1);

        reopened.record(&signature, fix_record("install-dependency")).unwrap();
        let again = RepairMemory::open(FileRepository::for_state_dir(temp.path())).unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again.lookup(&signature.key).unwrap().use_count, 2);
    }

    struct FailingRepository;

    impl MemoryRepository for FailingRepository {
        fn load(&self) -> MemoryResult<MemoryDocument> {
            Ok(MemoryDocument::default())
        }

        fn save_atomic(&self, _document: &MemoryDocument) -> MemoryResult<()> {
            Err(MemoryError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")))
        }
    }

    #[test]
    fn test_failed_save_rolls_back() {
        let mut memory = RepairMemory::open(FailingRepository).unwrap();
        let signature = normalize_signature("p", "line");

        assert!(memory.record(&signature, fix_record("f")).is_err());
        assert!(memory.lookup(&signature.key).is_none());
    }

    #[test]
    fn test_forget() {
        let repo = InMemoryRepository::new();
        let mut memory = RepairMemory::open(repo).unwrap();
        let signature = normalize_signature("p", "line");
        memory.record(&signature, fix_record("f")).unwrap();

        assert!(memory.forget(&signature.key).unwrap().is_some());
        assert!(memory.forget(&signature.key).unwrap().is_none());
        assert!(memory.is_empty());
    }
}
