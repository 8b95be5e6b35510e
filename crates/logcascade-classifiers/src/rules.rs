//! Regex rule strategy (first stage)

use crate::strategy::Strategy;
use logcascade_core::{Error, Label, Result, Verdict};
use regex::{RegexSet, RegexSetBuilder};
use serde::{Deserialize, Serialize};

/// A pattern and the label it assigns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexRule {
    /// Regular expression matched anywhere in the message
    pub pattern: String,

    /// Label assigned when the pattern matches
    pub label: String,
}

impl RegexRule {
    /// Create a new rule
    pub fn new(pattern: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            label: label.into(),
        }
    }
}

/// Built-in rules for common, fully templated log lines
pub fn default_rules() -> Vec<RegexRule> {
    vec![
        RegexRule::new(r"User User\d+ logged (in|out)\.", "User Action"),
        RegexRule::new(r"Account with ID .* created by .*", "User Action"),
        RegexRule::new(r"Backup (started|ended) at .*", "System Notification"),
        RegexRule::new(r"Backup completed successfully\.", "System Notification"),
        RegexRule::new(r"System updated to version .*", "System Notification"),
        RegexRule::new(
            r"File .* uploaded successfully by user .*",
            "System Notification",
        ),
        RegexRule::new(r"Disk cleanup completed successfully\.", "System Notification"),
        RegexRule::new(r"System reboot initiated by user .*", "System Notification"),
    ]
}

/// Deterministic pattern-to-label lookup.
///
/// Rules are tried in declaration order and the first match wins. A message
/// no rule matches yields [`Verdict::NoOpinion`]; this strategy never reports
/// the sentinel.
pub struct RegexStrategy {
    name: String,
    set: RegexSet,
    labels: Vec<Label>,
}

impl RegexStrategy {
    /// Compile a rule table
    pub fn new(rules: Vec<RegexRule>, case_insensitive: bool) -> Result<Self> {
        let mut patterns = Vec::with_capacity(rules.len());
        let mut labels = Vec::with_capacity(rules.len());

        for rule in rules {
            let label = match Verdict::from_raw(&rule.label) {
                Verdict::Label(label) => label,
                _ => {
                    return Err(Error::config(format!(
                        "Rule '{}' must map to a concrete label, got '{}'",
                        rule.pattern, rule.label
                    )))
                }
            };
            patterns.push(rule.pattern);
            labels.push(label);
        }

        let set = RegexSetBuilder::new(&patterns)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| Error::config(format!("Failed to compile regex rules: {}", e)))?;

        Ok(Self {
            name: "regex".to_string(),
            set,
            labels,
        })
    }

    /// Compile the built-in rule table
    pub fn with_defaults() -> Result<Self> {
        Self::new(default_rules(), true)
    }

    /// Number of compiled rules
    pub fn rule_count(&self) -> usize {
        self.labels.len()
    }

    /// Label of the first rule matching `message`
    pub fn matching_label(&self, message: &str) -> Option<&Label> {
        self.set
            .matches(message)
            .iter()
            .next()
            .map(|idx| &self.labels[idx])
    }
}

#[async_trait::async_trait]
impl Strategy for RegexStrategy {
    async fn classify(&self, message: &str) -> Result<Verdict> {
        Ok(match self.matching_label(message) {
            Some(label) => Verdict::Label(label.clone()),
            None => Verdict::NoOpinion,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
