//! # mend_patterns
//!
//! Known build/runtime error signatures for mend.
//!
//! This crate provides:
//! - **Pattern Catalog**: a typed table of error signatures, compiled once and
//!   ordered most-specific-first
//! - **Fixes**: ranked candidate remediations with static confidence scores
//! - **Error Matcher**: a pure function from one log line to a match
//!
//! Nothing here performs I/O, so every behavior can be exercised with literal
//! strings.
//!
//! ## Example
//!
//! ```rust
//! use mend_patterns::{match_error_pattern, ErrorCategory};
//!
//! let matched = match_error_pattern("Error: Cannot find module 'left-pad'").unwrap();
//! assert_eq!(matched.category, ErrorCategory::MissingDependency);
//! assert_eq!(matched.captured_groups[1], "left-pad");
//! ```

pub mod builtin;
pub mod catalog;
pub mod error;
pub mod fix;
pub mod matcher;

pub use catalog::{ErrorCategory, ErrorPattern, Matcher, PatternCatalog, PatternDefinition};
pub use error::{PatternError, PatternResult};
pub use fix::{render_template, Fix};
pub use matcher::{match_error_pattern, MatchResult};
