//! Error types for logcascade

/// Result type alias using logcascade's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for logcascade operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Strategy execution errors
    #[error("strategy error: {0}")]
    Strategy(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Model loading or inference errors
    #[error("model error: {0}")]
    Model(String),

    /// Remote LLM call errors
    #[error("llm error: {0}")]
    Llm(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Timeout errors
    #[error("operation timed out")]
    Timeout,

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new strategy error
    pub fn strategy(msg: impl Into<String>) -> Self {
        Self::Strategy(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new model error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new LLM error
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::config("missing rules").to_string(),
            "configuration error: missing rules"
        );
        assert_eq!(Error::Timeout.to_string(), "operation timed out");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
