//! Include and exclude rules for selecting source files.
//!
//! Rules are evaluated in the order they are given and the **last matching
//! rule wins**, the same model `.gitignore` uses. An exclude written after an
//! include therefore removes files the include selected, and an include
//! written after an exclude brings them back. Files no rule matches are left
//! out.
//!
//! Patterns are matched against root-relative POSIX paths:
//!
//! - a pattern without `/` matches the file name at any depth (`*.py`);
//! - a pattern containing `/` matches the whole relative path (`app/*.py`);
//!   a leading `/` is accepted and ignored;
//! - a trailing `/` selects everything below a directory (`tests/`);
//! - `*` never crosses a `/`, `**` does.

use crate::error::ManifestError;
use globset::{GlobBuilder, GlobMatcher};
use serde::Deserialize;
use std::fmt;

/// Pattern used when no rules are configured.
pub const DEFAULT_INCLUDE: &str = "*.py";

/// A single include or exclude rule.
///
/// In TOML configuration a rule is written as a one-key table:
///
/// ```toml
/// [[rules]]
/// include = "*.py"
/// [[rules]]
/// exclude = "tests/"
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Rule {
    /// Select files matching the pattern.
    Include(String),
    /// Drop files matching the pattern.
    Exclude(String),
}

impl Rule {
    /// Create an include rule.
    #[must_use]
    pub fn include(pattern: impl Into<String>) -> Self {
        Self::Include(pattern.into())
    }

    /// Create an exclude rule.
    #[must_use]
    pub fn exclude(pattern: impl Into<String>) -> Self {
        Self::Exclude(pattern.into())
    }

    /// The glob pattern as written.
    #[must_use]
    pub fn pattern(&self) -> &str {
        match self {
            Self::Include(pattern) | Self::Exclude(pattern) => pattern,
        }
    }

    /// Whether this rule selects the files it matches.
    #[must_use]
    pub const fn is_include(&self) -> bool {
        matches!(self, Self::Include(_))
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Include(pattern) => write!(f, "include {pattern}"),
            Self::Exclude(pattern) => write!(f, "exclude {pattern}"),
        }
    }
}

#[derive(Debug)]
struct CompiledRule {
    rule: Rule,
    matcher: GlobMatcher,
}

/// An ordered, compiled set of rules.
#[derive(Debug)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compile the rules, falling back to `include *.py` when none are given.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidPattern`] when a pattern is empty or
    /// is not a valid glob.
    pub fn compile(rules: &[Rule]) -> Result<Self, ManifestError> {
        let defaults = [Rule::include(DEFAULT_INCLUDE)];
        let source = if rules.is_empty() { &defaults[..] } else { rules };
        let compiled = source
            .iter()
            .map(|rule| {
                Ok(CompiledRule {
                    rule: rule.clone(),
                    matcher: compile_pattern(rule.pattern())?,
                })
            })
            .collect::<Result<Vec<_>, ManifestError>>()?;
        Ok(Self { rules: compiled })
    }

    /// Return the rule that decides `path`, if any rule matches it.
    #[must_use]
    pub fn deciding_rule(&self, path: &str) -> Option<&Rule> {
        self.rules
            .iter()
            .rev()
            .find(|compiled| compiled.matcher.is_match(path))
            .map(|compiled| &compiled.rule)
    }

    /// Whether `path` is selected by the rules.
    #[must_use]
    pub fn is_selected(&self, path: &str) -> bool {
        self.deciding_rule(path).is_some_and(Rule::is_include)
    }

    /// Number of compiled rules, including the default rule when applied.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set holds no rules. Never true for a compiled set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn compile_pattern(pattern: &str) -> Result<GlobMatcher, ManifestError> {
    let trimmed = pattern.trim();
    if trimmed.is_empty() {
        return Err(ManifestError::InvalidPattern {
            pattern: pattern.to_owned(),
            reason: "pattern is empty".to_owned(),
        });
    }

    let glob = normalise_pattern(trimmed);
    GlobBuilder::new(&glob)
        .literal_separator(true)
        .build()
        .map(|compiled| compiled.compile_matcher())
        .map_err(|err| ManifestError::InvalidPattern {
            pattern: pattern.to_owned(),
            reason: err.kind().to_string(),
        })
}

/// Rewrite a user pattern into the glob matched against relative paths.
fn normalise_pattern(pattern: &str) -> String {
    let anchored = pattern.trim_start_matches('/');
    let (body, directory) = match anchored.strip_suffix('/') {
        Some(stripped) => (stripped, true),
        None => (anchored, false),
    };

    let mut glob = if body.contains('/') || body.starts_with("**") {
        body.to_owned()
    } else {
        format!("**/{body}")
    };
    if directory {
        glob.push_str("/**");
    }
    glob
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod tests;
