use thiserror::Error;

use crate::cursor::CursorError;

/// Result type for data access
pub type DataResult<T> = Result<T, DataError>;

/// Data access errors
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    #[error("Layer already exists: {0}")]
    LayerExists(String),

    #[error(transparent)]
    Cursor(#[from] CursorError),
}

impl DataError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            DataError::LayerNotFound(_) => "GEO_DATA_LAYER_NOT_FOUND",
            DataError::LayerExists(_) => "GEO_DATA_LAYER_EXISTS",
            DataError::Cursor(e) => e.code(),
        }
    }
}
