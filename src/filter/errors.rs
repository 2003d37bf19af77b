//! Filter compilation errors

use thiserror::Error;

/// Malformed filter text. Raised at compile time, never during iteration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Syntax error at position {position}: {message}")]
pub struct SyntaxError {
    /// Byte offset into the source text
    pub position: usize,
    /// Human-readable message
    pub message: String,
}

impl SyntaxError {
    pub fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        "GEO_FILTER_SYNTAX"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SyntaxError::new(5, "unexpected '>'");
        let display = format!("{}", err);
        assert!(display.contains("position 5"));
        assert!(display.contains("unexpected"));
        assert_eq!(err.code(), "GEO_FILTER_SYNTAX");
    }
}
