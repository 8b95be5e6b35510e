//! Core types for logcascade

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved label meaning no strategy produced a trustworthy answer.
pub const UNCLASSIFIED: &str = "Unclassified";

/// A single log line submitted for classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Originating system or application
    pub source: String,

    /// Free-text log message
    pub message: String,
}

impl LogRecord {
    /// Create a new log record
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
        }
    }
}

impl<S: Into<String>, M: Into<String>> From<(S, M)> for LogRecord {
    fn from((source, message): (S, M)) -> Self {
        Self::new(source, message)
    }
}

/// Category assigned to a log record.
///
/// The vocabulary is open: any non-empty string a strategy reports is a
/// valid label. `Unclassified` is the only reserved value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(String);

impl Label {
    /// Create a label from an already normalized value
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The sentinel label
    pub fn unclassified() -> Self {
        Self(UNCLASSIFIED.to_string())
    }

    /// Whether this is the sentinel label
    pub fn is_unclassified(&self) -> bool {
        self.0 == UNCLASSIFIED
    }

    /// Borrow the label text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the label, returning the text
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Label {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for Label {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Outcome of asking one strategy about one message.
///
/// `NoOpinion` means the strategy declined to look or found nothing to say;
/// `Unclassified` means it looked and could not decide with confidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The strategy has nothing to say about this message
    NoOpinion,

    /// The strategy looked and could not decide
    Unclassified,

    /// A concrete category
    Label(Label),
}

impl Verdict {
    /// Build a verdict from raw strategy output.
    ///
    /// Surrounding whitespace is trimmed, an empty string is `NoOpinion` and
    /// the sentinel is recognized case-insensitively. Other labels keep their
    /// original case.
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Self::NoOpinion
        } else if trimmed.eq_ignore_ascii_case(UNCLASSIFIED) {
            Self::Unclassified
        } else {
            Self::Label(Label::new(trimmed))
        }
    }

    /// Shorthand for a concrete label verdict
    pub fn label(value: impl AsRef<str>) -> Self {
        Self::from_raw(value.as_ref())
    }

    /// Whether the cascade should move on to the next strategy
    pub fn escalates(&self) -> bool {
        !matches!(self, Self::Label(_))
    }

    /// Short name used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoOpinion => "no_opinion",
            Self::Unclassified => "unclassified",
            Self::Label(_) => "label",
        }
    }

    /// Collapse into a final label; anything but a concrete label becomes the sentinel
    pub fn into_label(self) -> Label {
        match self {
            Self::Label(label) => label,
            Self::NoOpinion | Self::Unclassified => Label::unclassified(),
        }
    }
}

/// Runtime state of a strategy's dependencies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Availability {
    /// Initialization has not been attempted yet
    Pending,

    /// Initialized successfully
    Available,

    /// Initialization failed; stays this way for the process lifetime
    Unavailable { reason: String },
}

impl Availability {
    /// Whether the strategy can be invoked
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

/// A chat message sent to a remote model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a new chat message
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }
}
