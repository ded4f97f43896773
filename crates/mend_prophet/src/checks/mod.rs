//! Standard Prophet checks.

mod dependencies;
mod env_file;
mod lockfile;
mod manifest;
mod merge_conflicts;
mod project_root;

use std::sync::Arc;

use crate::check::Check;

pub use dependencies::DependencyDirectoryCheck;
pub use env_file::EnvFileCheck;
pub use lockfile::LockfileCheck;
pub use manifest::ManifestCheck;
pub use merge_conflicts::MergeConflictCheck;
pub use project_root::ProjectRootCheck;

/// The standard check set, in report order.
pub fn standard() -> Vec<Arc<dyn Check>> {
    vec![
        Arc::new(ProjectRootCheck),
        Arc::new(ManifestCheck),
        Arc::new(DependencyDirectoryCheck),
        Arc::new(LockfileCheck),
        Arc::new(EnvFileCheck),
        Arc::new(MergeConflictCheck),
    ]
}
