//! Diagnostic types produced by the analysis pipeline.

use serde::{Deserialize, Serialize};

use crate::span::Span;

/// Maximum number of replacement suggestions kept per finding.
pub const MAX_REPLACEMENTS: usize = 10;

/// Severity level for diagnostics.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Error - must be fixed.
    #[default]
    Error,
    /// Warning - should be reviewed.
    Warning,
    /// Info - informational message.
    Info,
}

impl Severity {
    /// Maps a checker category id to a severity.
    ///
    /// Categories that are usually a matter of taste are informational;
    /// unknown categories are errors.
    pub fn from_category(category: &str) -> Self {
        match category {
            "CASING"
            | "COLLOCATIONS"
            | "COMPOUNDING"
            | "CORRESPONDENCE"
            | "EINHEIT_LEERZEICHEN"
            | "GRAMMAR"
            | "HILFESTELLUNG_KOMMASETZUNG"
            | "MISC"
            | "MISUSED_TERMS_EU_PUBLICATIONS"
            | "PROPER_NOUNS"
            | "PUNCTUATION"
            | "REDUNDANCY"
            | "SEMANTICS"
            | "TYPOGRAPHY"
            | "TYPOS" => Severity::Warning,
            "COLLOQUIALISMS"
            | "CONFUSED_WORDS"
            | "EMPFOHLENE_RECHTSCHREIBUNG"
            | "FALSE_FRIENDS"
            | "GENDER_NEUTRALITY"
            | "IDIOMS"
            | "NONSTANDARD_PHRASES"
            | "PLAIN_ENGLISH"
            | "REGIONALISMS"
            | "REPETITIONS"
            | "STYLE"
            | "WIKIPEDIA" => Severity::Info,
            _ => Severity::Error,
        }
    }
}

/// A suggested replacement for the flagged text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub value: String,
    /// Short explanation shown next to the value, if the checker gave one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Replacement {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Title for a quick fix applying this replacement.
    pub fn title(&self) -> String {
        match &self.description {
            Some(description) => format!("{} ({})", self.value, description),
            None => self.value.clone(),
        }
    }
}

/// A finding reported by the checker, in filtered-text coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Rule that produced the finding (lower-case).
    pub rule_id: String,
    /// Category id, e.g. `TYPOS` or `STYLE`.
    pub category: String,
    pub message: String,
    pub severity: Severity,
    /// Byte span in the filtered text.
    pub span: Span,
    /// The filtered text the finding refers to.
    pub matched: String,
    /// Suggested replacements, best first.
    pub replacements: Vec<Replacement>,
}

/// A finding in original-document coordinates, ready to publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub rule_id: String,
    pub category: String,
    pub message: String,
    #[serde(default)]
    pub severity: Severity,

    /// Byte span in the original text.
    pub span: Span,

    /// Whether the span was snapped across filtered-out markup.
    #[serde(default)]
    pub approximate: bool,

    /// The filtered text the finding refers to.
    #[serde(default)]
    pub matched: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replacements: Vec<Replacement>,
}

impl Diagnostic {
    /// Creates a new diagnostic.
    pub fn new(rule_id: impl Into<String>, message: impl Into<String>, span: Span) -> Self {
        Self {
            rule_id: rule_id.into(),
            category: String::new(),
            message: message.into(),
            severity: Severity::Error,
            span,
            approximate: false,
            matched: String::new(),
            replacements: Vec::new(),
        }
    }

    /// Sets the severity level.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets the category id.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Builds a diagnostic from a checker finding and its mapped span.
    pub fn from_check(result: CheckResult, span: Span, approximate: bool) -> Self {
        Self {
            rule_id: result.rule_id,
            category: result.category,
            message: result.message,
            severity: result.severity,
            span,
            approximate,
            matched: result.matched,
            replacements: result.replacements,
        }
    }
}
