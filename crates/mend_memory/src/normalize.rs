//! Error signature normalization.
//!
//! Strips: timestamps, UUIDs, memory addresses, absolute paths, line:col
//! positions and long numbers. The normalized template is then hashed so
//! that repeated occurrences of the same logical failure share one key.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        #[allow(clippy::expect_used)]
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($pattern).expect("valid regex"));
    };
}

static_regex!(
    RE_ISO_TIMESTAMP,
    r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:[.,]\d+)?(?:Z|[+-]\d{2}:?\d{2})?"
);
static_regex!(RE_CLOCK, r"\b\d{1,2}:\d{2}:\d{2}(?:\.\d+)?\b");
static_regex!(
    RE_UUID,
    r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b"
);
static_regex!(RE_ADDRESS, r"\b0x[0-9a-fA-F]+\b");
static_regex!(RE_WINDOWS_PATH, r#"\b[A-Za-z]:\\[^\s'"`,)]+"#);
static_regex!(RE_POSIX_PATH, r#"(^|[\s'"`(=\[])/[^\s'"`,)\]]+"#);
static_regex!(RE_LINE_COL, r":\d+:\d+");
static_regex!(RE_PAREN_POSITION, r"\(\d+,\d+\)");
static_regex!(RE_LONG_NUMBER, r"\b\d{4,}\b");
static_regex!(RE_WHITESPACE, r"\s+");

/// A normalized, hashed error signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorSignature {
    /// Hex digest used as the repair memory key
    pub key: String,
    /// Normalized text the key was derived from
    pub template: String,
}

/// Normalize a matched line into a stable signature.
///
/// The pattern key is folded into the hash so identical text matched by
/// different patterns never collides.
pub fn normalize_signature(pattern_key: &str, line: &str) -> ErrorSignature {
    let normalized = RE_ISO_TIMESTAMP.replace_all(line, "<TS>");
    let normalized = RE_CLOCK.replace_all(&normalized, "<TS>");
    let normalized = RE_UUID.replace_all(&normalized, "<ID>");
    let normalized = RE_ADDRESS.replace_all(&normalized, "<ADDR>");
    let normalized = RE_WINDOWS_PATH.replace_all(&normalized, "<PATH>");
    let normalized = RE_POSIX_PATH.replace_all(&normalized, "${1}<PATH>");
    let normalized = RE_LINE_COL.replace_all(&normalized, ":<N>:<N>");
    let normalized = RE_PAREN_POSITION.replace_all(&normalized, "(<N>,<N>)");
    let normalized = RE_LONG_NUMBER.replace_all(&normalized, "<N>");
    let normalized = RE_WHITESPACE.replace_all(&normalized, " ");

    let template = normalized.trim().to_lowercase();

    let mut hasher = Sha256::new();
    hasher.update(pattern_key.as_bytes());
    hasher.update(b":");
    hasher.update(template.as_bytes());
    let digest = hasher.finalize();
    let key = digest[..16].iter().map(|b| format!("{:02x}", b)).collect();

    ErrorSignature { key, template }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_collapse() {
        let a = normalize_signature("p", "2024-01-05T10:11:12.345Z Error: Cannot find module 'x'");
        let b = normalize_signature("p", "2025-07-30 23:59:01 Error: Cannot find module 'x'");
        assert_eq!(a.key, b.key);
        assert_eq!(a.template, "<ts> error: cannot find module 'x'");
    }

    #[test]
    fn test_absolute_paths_collapse() {
        let a = normalize_signature(
            "missing-file",
            "ENOENT: no such file or directory, open '/home/ci/run-17/app/dist/index.html'",
        );
        let b = normalize_signature(
            "missing-file",
            "ENOENT: no such file or directory, open '/tmp/build/dist/index.html'",
        );
        assert_eq!(a.key, b.key);
        assert!(a.template.contains("<path>"));

        let win = normalize_signature("p", r"failed to read C:\Users\ci\app\main.rs");
        assert_eq!(win.template, "failed to read <path>");
    }

    #[test]
    fn test_addresses_and_positions_collapse() {
        let a = normalize_signature("p", "segfault at 0x7ffd5e8c in worker (src/a.ts:12:7)");
        let b = normalize_signature("p", "segfault at 0x0000ab12 in worker (src/a.ts:98:1)");
        assert_eq!(a.key, b.key);
    }

    #[test]
    fn test_relative_paths_preserved() {
        let a = normalize_signature("p", "Cannot find module './a'");
        let b = normalize_signature("p", "Cannot find module './b'");
        assert_ne!(a.key, b.key);
    }

    #[test]
    fn test_pattern_key_in_hash() {
        let a = normalize_signature("one", "same text");
        let b = normalize_signature("two", "same text");
        assert_ne!(a.key, b.key);
        assert_eq!(a.template, b.template);
        assert_eq!(a.key.len(), 32);
    }
}
