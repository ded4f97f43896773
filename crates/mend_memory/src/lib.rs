//! # mend_memory
//!
//! Durable state shared between otherwise independent pipeline phases.
//!
//! Each phase of a mend pipeline runs as its own process, so nothing learned
//! in one phase survives unless it is written to disk. This crate owns that
//! state:
//!
//! - **Signature normalization**: collapse superficially different error
//!   lines (timestamps, absolute paths, addresses) to one stable key
//! - **Repair Memory**: an upserting key → fix cache behind a repository
//!   abstraction with crash-safe atomic saves
//! - **Audit log**: an append-only plain-text trail of every phase
//!
//! ## Example
//!
//! ```rust,ignore
//! use mend_memory::{normalize_signature, FileRepository, FixRecord, RepairMemory};
//!
//! let mut memory = RepairMemory::open(FileRepository::for_state_dir(".mend"))?;
//! let signature = normalize_signature("missing-module", line);
//! if memory.lookup(&signature.key).is_none() {
//!     memory.record(&signature, fix_record)?;
//! }
//! ```

pub mod atomic;
pub mod audit;
pub mod entry;
pub mod error;
pub mod memory;
pub mod normalize;
pub mod repository;

pub use atomic::write_json_atomic;
pub use audit::{AuditLog, AUDIT_LOG_FILE_NAME};
pub use entry::{FixRecord, MemoryDocument, RepairMemoryEntry, MEMORY_DOCUMENT_VERSION};
pub use error::{MemoryError, MemoryResult};
pub use memory::RepairMemory;
pub use normalize::{normalize_signature, ErrorSignature};
pub use repository::{FileRepository, InMemoryRepository, MemoryRepository, MEMORY_FILE_NAME};
