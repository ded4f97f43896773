//! Built-in error signatures.
//!
//! Order matters: entries are listed most-specific-first so that a generic
//! signature never shadows a precise one.

use crate::catalog::{ErrorCategory, PatternDefinition};
use crate::fix::Fix;

/// Definitions for the built-in catalog, in evaluation order.
pub fn builtin_definitions() -> Vec<PatternDefinition> {
    vec![
        // Relative imports look like missing packages but are source bugs.
        PatternDefinition::regex(
            "relative-import",
            ErrorCategory::BrokenImport,
            r"Cannot find module '(\.{1,2}/[^']+)'",
        )
        .fix(Fix::new(
            "verify-import-path",
            0.35,
            "Verify the relative import `{1}` points at an existing file",
        )),
        PatternDefinition::regex(
            "missing-module",
            ErrorCategory::MissingDependency,
            r"Cannot find module '([^']+)'",
        )
        .fix(
            Fix::new("install-dependency", 0.9, "Install missing dependency `{1}`")
                .with_remediation("install-dependency"),
        )
        .fix(
            Fix::new(
                "reinstall-dependencies",
                0.5,
                "Reinstall all dependencies to restore `{1}`",
            )
            .with_remediation("reinstall-dependencies"),
        ),
        PatternDefinition::regex(
            "python-module-not-found",
            ErrorCategory::MissingDependency,
            r"ModuleNotFoundError: No module named '([^']+)'",
        )
        .fix(
            Fix::new("install-python-package", 0.85, "Install missing Python package `{1}`")
                .with_remediation("install-python-package"),
        ),
        PatternDefinition::regex(
            "rust-unresolved-import",
            ErrorCategory::UnresolvedImport,
            r"error\[E0432\]: unresolved import `([^`]+)`",
        )
        .fix(
            Fix::new(
                "add-crate-dependency",
                0.4,
                "Declare the crate providing `{1}` as a dependency",
            )
            .with_remediation("add-crate-dependency"),
        ),
        PatternDefinition::literal(
            "npm-peer-conflict",
            ErrorCategory::DependencyConflict,
            "npm ERR! code ERESOLVE",
        )
        .fix(
            Fix::new(
                "install-legacy-peer-deps",
                0.7,
                "Reinstall dependencies with legacy peer dependency resolution",
            )
            .with_remediation("install-legacy-peer-deps"),
        )
        .fix(
            Fix::new("regenerate-lockfile", 0.45, "Regenerate the dependency lockfile")
                .with_remediation("regenerate-lockfile"),
        ),
        PatternDefinition::regex(
            "port-in-use",
            ErrorCategory::PortConflict,
            r"(?:EADDRINUSE|[Aa]ddress already in use).*?:(\d{2,5})\b",
        )
        .fix(
            Fix::new("release-port", 0.6, "Release port {1} held by a stale process")
                .with_remediation("release-port"),
        ),
        PatternDefinition::literal(
            "js-heap-exhausted",
            ErrorCategory::ResourceExhaustion,
            "JavaScript heap out of memory",
        )
        .fix(
            Fix::new("raise-heap-limit", 0.75, "Raise the Node.js heap limit for the build")
                .with_remediation("raise-heap-limit"),
        ),
        // Recognized but never auto-fixable: these need a human.
        PatternDefinition::regex(
            "typescript-error",
            ErrorCategory::TypeError,
            r"error TS(\d+): (.+)",
        ),
        PatternDefinition::regex(
            "permission-denied",
            ErrorCategory::Permissions,
            r"EACCES: permission denied(?:, \w+ '([^']+)')?",
        ),
        PatternDefinition::regex(
            "missing-file",
            ErrorCategory::MissingFile,
            r"ENOENT: no such file or directory(?:, \w+ '([^']+)')?",
        )
        .fix(
            Fix::new("clean-build-cache", 0.4, "Clear cached build output referencing `{1}`")
                .with_remediation("clean-build-cache"),
        ),
        PatternDefinition::regex("syntax-error", ErrorCategory::Syntax, r"SyntaxError: (.+)"),
        PatternDefinition::regex(
            "generic-error",
            ErrorCategory::Unknown,
            r"(?i)^\s*(?:error|fatal)(?:\[[^\]]*\])?:\s*(.+)",
        ),
    ]
}
