use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ftext_editor::EditorError;
use ftext_ot::OtError;
use thiserror::Error;

use crate::server::CommandResult;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Invalid document id: {0:?}")]
    InvalidDocumentId(String),

    #[error("Missing client id")]
    MissingClientId,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Document {0} is closed")]
    DocumentClosed(String),

    #[error("Failed to persist document {id}: {message}")]
    Persist { id: String, message: String },

    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

impl WorkspaceError {
    pub fn kind(&self) -> &'static str {
        match self {
            WorkspaceError::InvalidDocumentId(_) => "invalidDocumentId",
            WorkspaceError::MissingClientId => "missingClientId",
            WorkspaceError::InvalidRequest(_) => "invalidRequest",
            WorkspaceError::DocumentClosed(_) => "documentClosed",
            WorkspaceError::Persist { .. } => "persist",
            WorkspaceError::Editor(e) => e.kind(),
            WorkspaceError::Join(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            WorkspaceError::InvalidDocumentId(_)
            | WorkspaceError::MissingClientId
            | WorkspaceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            WorkspaceError::DocumentClosed(_) => StatusCode::SERVICE_UNAVAILABLE,
            WorkspaceError::Persist { .. } | WorkspaceError::Join(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            WorkspaceError::Editor(e) => match e {
                EditorError::IdentityMismatch { .. } => StatusCode::FORBIDDEN,
                EditorError::MalformedOperation(_)
                | EditorError::UnexpectedRevision { .. }
                | EditorError::UnexpectedAck { .. } => StatusCode::BAD_REQUEST,
                EditorError::FutureRevision { .. } | EditorError::RevisionTrimmed { .. } => {
                    StatusCode::CONFLICT
                }
                EditorError::Operation(OtError::LengthMismatch { .. })
                | EditorError::Operation(OtError::IncompatibleLengths { .. })
                | EditorError::Operation(OtError::MalformedOperation(_)) => {
                    StatusCode::BAD_REQUEST
                }
                EditorError::Operation(OtError::StructuralMismatch { .. })
                | EditorError::ApplyFailed(_)
                | EditorError::InvalidUtf8 { .. }
                | EditorError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for WorkspaceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "request failed");
        } else {
            tracing::warn!(kind = self.kind(), error = %self, "request rejected");
        }
        (status, Json(CommandResult::failure(&self))).into_response()
    }
}
