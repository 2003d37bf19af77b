//! Query construction errors

use thiserror::Error;

use crate::filter::SyntaxError;
use crate::proj::ProjError;

/// Query construction errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// Filter text did not compile
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// Target reference system could not be parsed
    #[error("Invalid reprojection target: {0}")]
    Crs(#[from] ProjError),

    /// An option was read with a type other than the one it was stored with
    #[error("Option '{key}' holds {actual}, not {expected}")]
    OptionType {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },
}

impl QueryError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::Syntax(e) => e.code(),
            QueryError::Crs(e) => e.code(),
            QueryError::OptionType { .. } => "GEO_QUERY_OPTION_TYPE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_delegate() {
        let err = QueryError::from(SyntaxError::new(3, "unexpected token"));
        assert_eq!(err.code(), "GEO_FILTER_SYNTAX");

        let err = QueryError::OptionType {
            key: "LIMIT".into(),
            expected: "f64",
            actual: "usize",
        };
        assert_eq!(err.code(), "GEO_QUERY_OPTION_TYPE");
        assert_eq!(err.to_string(), "Option 'LIMIT' holds usize, not f64");
    }
}
