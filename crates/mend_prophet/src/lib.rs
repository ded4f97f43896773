//! # mend_prophet
//!
//! Pre-build diagnostics for mend.
//!
//! Prophet runs a fixed set of independent checks against a project before
//! a build is attempted. Checks may apply idempotent, non-destructive fixes
//! (installing a provably missing dependency directory, seeding `.env` from
//! its example); anything else is reported as unfixed. An unfixed critical
//! issue blocks the pipeline.
//!
//! Prophet never fails: a check that errors or panics is recorded on its
//! own result and the remaining checks still run.
//!
//! ## Example
//!
//! ```rust,ignore
//! use mend_prophet::{ProphetConfig, ProphetScanner, ScanContext};
//!
//! let ctx = ScanContext::new("/srv/app", ProphetConfig::default());
//! let result = ProphetScanner::standard().run(ctx).await;
//! if result.blocked {
//!     eprintln!("{}", result.report());
//! }
//! ```

pub mod check;
pub mod checks;
pub mod error;
pub mod scanner;

pub use check::{Check, CheckResult, Detail, Issue, ProphetConfig, ScanContext, Severity, INSTALL_REMEDIATION};
pub use error::{ScanError, ScanResult};
pub use scanner::{ProphetResult, ProphetScanner};
