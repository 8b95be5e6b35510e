//! logcascade Core
//!
//! Core types and utilities shared across logcascade components.
//!
//! This crate provides:
//! - The data model for log records, labels and strategy verdicts
//! - Strategy availability as tracked by the cascade
//! - Error types and result handling

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Availability, ChatMessage, Label, LogRecord, Verdict, UNCLASSIFIED};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{Availability, Label, LogRecord, Verdict, UNCLASSIFIED};
}
