//! Optional-check rule table
//!
//! Check names matching any rule are treated as optional and left out of the
//! required-check verdict. Rules are case-insensitive regexes searched anywhere
//! in the name and are evaluated in table order.

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};

/// Built-in optional-check patterns, in evaluation order
pub const DEFAULT_OPTIONAL_PATTERNS: &[&str] = &[
    "optional",
    "lint",
    "format",
    "style",
    "documentation",
    "docs",
    "spell",
    "typo",
    "check.*semver",
    "check.*prdoc",
    "check.*migration",
    "check.*runtime.*upgrade",
    "check.*weights",
    "zombienet",
    "benchmark",
    "performance",
    "perf",
    "clippy",
    "rustfmt",
    "cargo.*fmt",
    "coverage",
    "codecov",
    "deploy",
    "release",
    "publish",
];

/// A single compiled rule
#[derive(Debug, Clone)]
pub struct CheckRule {
    pattern: String,
    regex: Regex,
}

impl CheckRule {
    /// Compile a case-insensitive rule
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("Invalid optional-check pattern {:?}", pattern))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// The source pattern
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

/// Ordered table of optional-check rules
#[derive(Debug, Clone)]
pub struct CheckRuleTable {
    rules: Vec<CheckRule>,
}

impl Default for CheckRuleTable {
    fn default() -> Self {
        let rules = DEFAULT_OPTIONAL_PATTERNS
            .iter()
            .filter_map(|p| CheckRule::new(p).ok())
            .collect();
        Self { rules }
    }
}

impl CheckRuleTable {
    /// Table with no rules: every check is required
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Built-in rules followed by `extra` patterns
    ///
    /// Invalid extra patterns are skipped with a warning rather than failing
    /// startup over a typo in the config file.
    pub fn with_extra_patterns<S: AsRef<str>>(extra: &[S]) -> Self {
        let mut table = Self::default();
        for pattern in extra {
            match CheckRule::new(pattern.as_ref()) {
                Ok(rule) => table.rules.push(rule),
                Err(e) => log::warn!("{:#}", e),
            }
        }
        table
    }

    /// Build a table from exactly the given patterns
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let rules = patterns
            .iter()
            .map(|p| CheckRule::new(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// First rule matching `name`, if any
    pub fn matching_rule(&self, name: &str) -> Option<&CheckRule> {
        self.rules.iter().find(|rule| rule.matches(name))
    }

    /// Whether the check counts towards the required verdict
    pub fn is_required(&self, name: &str) -> bool {
        self.matching_rule(name).is_none()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_compiles_every_pattern() {
        assert_eq!(CheckRuleTable::default().len(), DEFAULT_OPTIONAL_PATTERNS.len());
    }

    #[test]
    fn test_optional_names() {
        let table = CheckRuleTable::default();
        for name in [
            "Lint",
            "cargo fmt --check",
            "check-semver",
            "Check runtime upgrade",
            "zombienet-polkadot-tests",
            "Codecov/patch",
            "Deploy preview",
            "publish-docs",
        ] {
            assert!(!table.is_required(name), "{} should be optional", name);
        }
    }

    #[test]
    fn test_required_names() {
        let table = CheckRuleTable::default();
        for name in ["build", "test (ubuntu-latest)", "ci/circleci: unit", "e2e"] {
            assert!(table.is_required(name), "{} should be required", name);
        }
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let table = CheckRuleTable::default();
        let rule = table.matching_rule("optional-lint").unwrap();
        assert_eq!(rule.pattern(), "optional");
    }

    #[test]
    fn test_extra_patterns_extend_table() {
        let table = CheckRuleTable::with_extra_patterns(&["nightly", "("]);
        assert_eq!(table.len(), DEFAULT_OPTIONAL_PATTERNS.len() + 1);
        assert!(!table.is_required("Nightly integration"));
    }

    #[test]
    fn test_from_patterns_rejects_invalid() {
        assert!(CheckRuleTable::from_patterns(&["ok", "[unclosed"]).is_err());
        assert!(CheckRuleTable::from_patterns::<&str>(&[]).unwrap().is_empty());
    }
}
