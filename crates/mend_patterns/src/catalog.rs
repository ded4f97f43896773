//! The typed, compiled-once pattern catalog.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};

use crate::builtin::builtin_definitions;
use crate::error::{PatternError, PatternResult};
use crate::fix::Fix;
use crate::matcher::MatchResult;

#[allow(clippy::expect_used)]
static BUILTIN: LazyLock<PatternCatalog> = LazyLock::new(|| {
    PatternCatalog::compile(builtin_definitions()).expect("built-in pattern catalog is valid")
});

/// Broad class of a recognized failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    MissingDependency,
    BrokenImport,
    UnresolvedImport,
    DependencyConflict,
    PortConflict,
    ResourceExhaustion,
    TypeError,
    Permissions,
    MissingFile,
    Syntax,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingDependency => "missing-dependency",
            Self::BrokenImport => "broken-import",
            Self::UnresolvedImport => "unresolved-import",
            Self::DependencyConflict => "dependency-conflict",
            Self::PortConflict => "port-conflict",
            Self::ResourceExhaustion => "resource-exhaustion",
            Self::TypeError => "type-error",
            Self::Permissions => "permissions",
            Self::MissingFile => "missing-file",
            Self::Syntax => "syntax",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Source form of a matcher, before compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherSource {
    Literal(String),
    Regex(String),
}

/// Uncompiled pattern definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternDefinition {
    pub key: String,
    pub category: ErrorCategory,
    pub matcher: MatcherSource,
    #[serde(default)]
    pub fixes: Vec<Fix>,
}

impl PatternDefinition {
    pub fn regex(key: impl Into<String>, category: ErrorCategory, pattern: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            category,
            matcher: MatcherSource::Regex(pattern.into()),
            fixes: Vec::new(),
        }
    }

    pub fn literal(key: impl Into<String>, category: ErrorCategory, needle: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            category,
            matcher: MatcherSource::Literal(needle.into()),
            fixes: Vec::new(),
        }
    }

    pub fn fix(mut self, fix: Fix) -> Self {
        self.fixes.push(fix);
        self
    }
}

/// A compiled line matcher.
#[derive(Debug, Clone)]
pub enum Matcher {
    Literal(String),
    Regex(Regex),
}

impl Matcher {
    /// Match a line, returning capture groups on success.
    ///
    /// Group 0 is always the matched text. Optional regex groups that did
    /// not participate are returned as empty strings so indices stay stable.
    pub fn captures(&self, line: &str) -> Option<Vec<String>> {
        match self {
            Matcher::Literal(needle) => line.contains(needle.as_str()).then(|| vec![needle.clone()]),
            Matcher::Regex(regex) => regex.captures(line).map(|caps| {
                caps.iter()
                    .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
                    .collect()
            }),
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Matcher::Literal(needle) => needle,
            Matcher::Regex(regex) => regex.as_str(),
        }
    }
}

impl Serialize for Matcher {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Matcher::Literal(needle) => serializer.serialize_newtype_variant("Matcher", 0, "literal", needle),
            Matcher::Regex(regex) => serializer.serialize_newtype_variant("Matcher", 1, "regex", regex.as_str()),
        }
    }
}

/// A known error signature.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPattern {
    pub key: String,
    pub category: ErrorCategory,
    pub matcher: Matcher,
    pub fixes: Vec<Fix>,
}

impl ErrorPattern {
    fn compile(definition: PatternDefinition) -> PatternResult<Self> {
        if definition.key.trim().is_empty() {
            return Err(PatternError::EmptyKey);
        }

        for fix in &definition.fixes {
            if !(0.0..=1.0).contains(&fix.confidence) {
                return Err(PatternError::InvalidConfidence {
                    key: definition.key.clone(),
                    fix: fix.name.clone(),
                    confidence: fix.confidence,
                });
            }
        }

        let matcher = match definition.matcher {
            MatcherSource::Literal(needle) => Matcher::Literal(needle),
            MatcherSource::Regex(pattern) => {
                let regex = Regex::new(&pattern).map_err(|source| PatternError::InvalidRegex {
                    key: definition.key.clone(),
                    source,
                })?;
                Matcher::Regex(regex)
            }
        };

        Ok(Self {
            key: definition.key,
            category: definition.category,
            matcher,
            fixes: definition.fixes,
        })
    }
}

/// Ordered, immutable table of error patterns.
///
/// Patterns are evaluated in order and the first match wins, so more
/// specific signatures must precede generic ones.
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    patterns: Vec<ErrorPattern>,
}

impl PatternCatalog {
    /// Compile definitions into a catalog, preserving their order.
    pub fn compile(definitions: Vec<PatternDefinition>) -> PatternResult<Self> {
        let mut seen = HashSet::new();
        let mut patterns = Vec::with_capacity(definitions.len());

        for definition in definitions {
            if !seen.insert(definition.key.clone()) {
                return Err(PatternError::DuplicateKey(definition.key));
            }
            patterns.push(ErrorPattern::compile(definition)?);
        }

        Ok(Self { patterns })
    }

    /// The built-in catalog, compiled on first use.
    pub fn builtin() -> &'static PatternCatalog {
        &BUILTIN
    }

    pub fn patterns(&self) -> &[ErrorPattern] {
        &self.patterns
    }

    pub fn get(&self, key: &str) -> Option<&ErrorPattern> {
        self.patterns.iter().find(|p| p.key == key)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Match one line against the catalog in specificity order.
    pub fn match_line(&self, line: &str) -> Option<MatchResult> {
        self.patterns.iter().find_map(|pattern| {
            pattern.matcher.captures(line).map(|captured_groups| MatchResult {
                key: pattern.key.clone(),
                category: pattern.category,
                captured_groups,
                fixes: pattern.fixes.clone(),
            })
        })
    }
}
