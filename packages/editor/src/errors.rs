//! Error types for the editor

use ftext_ot::{ClientId, OtError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    /// The operation claims a different author than the caller.
    #[error("Invalid client id: operation declares {declared}, caller is {caller}")]
    IdentityMismatch { declared: ClientId, caller: ClientId },

    #[error("Invalid operation data: {0}")]
    MalformedOperation(String),

    /// The client references a revision the server has not reached.
    #[error("Revision {known} is ahead of the document (at {current})")]
    FutureRevision { known: u64, current: u64 },

    /// History before `oldest` has been discarded.
    #[error("Revision {known} is no longer in history (oldest is {oldest})")]
    RevisionTrimmed { known: u64, oldest: u64 },

    /// A broadcast arrived out of sequence on the client side.
    #[error("Expected revision {expected}, got {got}")]
    UnexpectedRevision { expected: u64, got: u64 },

    /// An acknowledgement arrived while no operation was in flight.
    #[error("Acknowledgement for revision {revision} with nothing in flight")]
    UnexpectedAck { revision: u64 },

    /// The reconciled operation did not fit the document. Never caused by client
    /// input alone.
    #[error("Operation can't be applied: {0}")]
    ApplyFailed(#[source] OtError),

    #[error(transparent)]
    Operation(OtError),

    #[error("Stored blob {name} is not valid UTF-8")]
    InvalidUtf8 { name: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EditorError {
    /// Stable identifier used in command results.
    pub fn kind(&self) -> &'static str {
        match self {
            EditorError::IdentityMismatch { .. } => "identityMismatch",
            EditorError::MalformedOperation(_) => "malformedOperation",
            EditorError::FutureRevision { .. } => "futureRevision",
            EditorError::RevisionTrimmed { .. } => "revisionTrimmed",
            EditorError::UnexpectedRevision { .. } => "unexpectedRevision",
            EditorError::UnexpectedAck { .. } => "unexpectedAck",
            EditorError::ApplyFailed(_) => "applyFailed",
            EditorError::Operation(e) => e.kind(),
            EditorError::InvalidUtf8 { .. } => "invalidUtf8",
            EditorError::Io(_) => "io",
        }
    }
}

impl From<OtError> for EditorError {
    fn from(e: OtError) -> Self {
        match e {
            OtError::MalformedOperation(msg) => EditorError::MalformedOperation(msg),
            other => EditorError::Operation(other),
        }
    }
}
