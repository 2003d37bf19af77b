//! Cursor errors
//!
//! Errors surface at the element that triggered them, never at cursor
//! construction.

use std::io;

use thiserror::Error;

use super::Mode;
use crate::proj::ProjError;

/// Result type for cursor operations
pub type CursorResult<T> = Result<T, CursorError>;

/// Failure while pulling from or writing through a cursor
#[derive(Debug, Error)]
pub enum CursorError {
    /// The cursor's mode (or the decorator) does not allow the operation
    #[error("Operation '{operation}' is not supported in {mode} mode")]
    UnsupportedOperation { operation: &'static str, mode: Mode },

    /// The backing resource failed mid-iteration
    #[error("I/O failure: {0}")]
    Io(#[from] io::Error),

    /// The reprojection collaborator rejected a CRS pair or a geometry
    #[error("Reprojection failed: {0}")]
    Reprojection(#[from] ProjError),

    /// A feature with geometry declared no source CRS
    #[error("Feature '{0}' has no CRS to reproject from")]
    MissingCrs(String),

    /// Pull after release
    #[error("Cursor is closed")]
    Closed,
}

impl CursorError {
    pub fn unsupported(operation: &'static str, mode: Mode) -> Self {
        CursorError::UnsupportedOperation { operation, mode }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            CursorError::UnsupportedOperation { .. } => "GEO_CURSOR_UNSUPPORTED_OPERATION",
            CursorError::Io(_) => "GEO_CURSOR_IO",
            CursorError::Reprojection(_) => "GEO_CURSOR_REPROJECTION",
            CursorError::MissingCrs(_) => "GEO_CURSOR_MISSING_CRS",
            CursorError::Closed => "GEO_CURSOR_CLOSED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            CursorError::unsupported("write", Mode::Read).code(),
            "GEO_CURSOR_UNSUPPORTED_OPERATION"
        );
        assert_eq!(CursorError::Closed.code(), "GEO_CURSOR_CLOSED");
    }

    #[test]
    fn test_error_display() {
        let err = CursorError::unsupported("remove", Mode::Append);
        assert_eq!(err.to_string(), "Operation 'remove' is not supported in Append mode");
    }

    #[test]
    fn test_from_io() {
        let err: CursorError = io::Error::new(io::ErrorKind::UnexpectedEof, "truncated").into();
        assert!(matches!(err, CursorError::Io(_)));
    }
}
