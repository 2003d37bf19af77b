//! Reprojection errors

use thiserror::Error;

/// Result type for reprojection operations
pub type ProjResult<T> = Result<T, ProjError>;

/// Reprojection errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjError {
    /// The reference system is not known
    #[error("Unknown crs: {0}")]
    UnknownCrs(String),

    /// The definition could not be parsed by the projection library
    #[error("Invalid crs definition for {crs}: {reason}")]
    InvalidDefinition { crs: String, reason: String },

    /// A coordinate could not be transformed
    #[error("Transform from {from} to {to} failed: {reason}")]
    Transform {
        from: String,
        to: String,
        reason: String,
    },
}

impl ProjError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ProjError::UnknownCrs(_) => "GEO_PROJ_UNKNOWN_CRS",
            ProjError::InvalidDefinition { .. } => "GEO_PROJ_INVALID_DEFINITION",
            ProjError::Transform { .. } => "GEO_PROJ_TRANSFORM_FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ProjError::UnknownCrs("x".into()).code(), "GEO_PROJ_UNKNOWN_CRS");
        let err = ProjError::Transform {
            from: "EPSG:4326".into(),
            to: "EPSG:3857".into(),
            reason: "out of range".into(),
        };
        assert!(err.to_string().contains("EPSG:3857"));
    }
}
