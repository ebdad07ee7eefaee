//! Error types for operations and the transform engine

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OtError {
    /// The operation was applied to (or inverted against) text of the wrong length.
    #[error("operation expects text of length {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// `compose(a, b)` where a's output is not b's input.
    #[error("cannot compose: first operation produces length {first_target}, second expects {second_base}")]
    IncompatibleLengths {
        first_target: usize,
        second_base: usize,
    },

    /// `transform(a, b)` where a and b were not built against the same text.
    #[error("cannot transform: operations consume lengths {left} and {right}")]
    StructuralMismatch { left: usize, right: usize },

    #[error("malformed operation: {0}")]
    MalformedOperation(String),
}

impl OtError {
    /// Stable identifier used in command results.
    pub fn kind(&self) -> &'static str {
        match self {
            OtError::LengthMismatch { .. } => "lengthMismatch",
            OtError::IncompatibleLengths { .. } => "incompatibleLengths",
            OtError::StructuralMismatch { .. } => "structuralMismatch",
            OtError::MalformedOperation(_) => "malformedOperation",
        }
    }
}

impl From<serde_json::Error> for OtError {
    fn from(e: serde_json::Error) -> Self {
        OtError::MalformedOperation(e.to_string())
    }
}
