//! Crash-safe document writes.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{MemoryError, MemoryResult};

/// Serialize `value` as JSON and atomically replace `path` with it.
///
/// The document is written to a temporary file in the same directory,
/// flushed to disk, then renamed over the target. Readers observe either the
/// previous document or the complete new one.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> MemoryResult<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| MemoryError::Io(e.error))?;

    debug!("Atomically wrote {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_creates_parent_and_replaces() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("doc.json");

        write_json_atomic(&path, &serde_json::json!({"v": 1})).unwrap();
        write_json_atomic(&path, &serde_json::json!({"v": 2})).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["v"], 2);

        // Only the target remains; no temp files are left behind.
        let files: Vec<_> = fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }
}
