//! Error type shared by every fallible operation of the crate.

use thiserror::Error;

/// Errors raised while building parameters, committing, opening or verifying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VortexError {
    #[error("shape mismatch in {what}: expected {expected}, got {actual}")]
    /// A vector, row or column does not have the expected length.
    Shape {
        /// Which object had the wrong length.
        what: String,
        /// Expected length.
        expected: usize,
        /// Length that was provided.
        actual: usize,
    },
    #[error("{what} index {index} out of range (bound {bound})")]
    /// An index or a count exceeds the supported bound.
    Range {
        /// Which index or count was out of range.
        what: String,
        /// Offending value.
        index: usize,
        /// Exclusive upper bound.
        bound: usize,
    },
    #[error("encoding error: {0}")]
    /// Internal precomputed data of the encoder is inconsistent.
    Encoding(String),
    #[error("coordinate {coordinate} is not a codeword: non-zero coefficient at degree {degree}")]
    /// A vector fails the Reed–Solomon membership test.
    NotCodeword {
        /// Base-field coordinate of the extension vector that failed.
        coordinate: usize,
        /// Degree of the first offending coefficient.
        degree: usize,
    },
    #[error("invalid proof: {0}")]
    /// A verification check failed.
    InvalidProof(String),
    #[error("invalid configuration: {0}")]
    /// Parameters or hasher settings are unsupported.
    Configuration(String),
    #[error("linear combination must be opened before the columns")]
    /// Columns were opened before the linear combination.
    MissingLinComb,
    #[error("decode error: {0}")]
    /// Hex or JSON input could not be parsed.
    Decode(String),
}

impl VortexError {
    pub(crate) fn shape(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        VortexError::Shape {
            what: what.into(),
            expected,
            actual,
        }
    }

    pub(crate) fn range(what: impl Into<String>, index: usize, bound: usize) -> Self {
        VortexError::Range {
            what: what.into(),
            index,
            bound,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, VortexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = VortexError::shape("row 3", 8, 7);
        assert_eq!(
            err.to_string(),
            "shape mismatch in row 3: expected 8, got 7"
        );
        let err = VortexError::range("column", 64, 32);
        assert_eq!(err.to_string(), "column index 64 out of range (bound 32)");
        let err = VortexError::NotCodeword {
            coordinate: 2,
            degree: 17,
        };
        assert!(err.to_string().contains("degree 17"));
    }
}
