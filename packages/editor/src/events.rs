use ftext_ot::AuthoredOperation;
use serde::{Deserialize, Serialize};

/// Notification fanned out to everyone subscribed to a document, in commit order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DocumentEvent {
    /// An operation was committed. Receivers apply it as-is; the submitter
    /// treats it as the acknowledgement of its own edit.
    #[serde(rename_all = "camelCase")]
    EditText {
        operation: AuthoredOperation,
        revision_id: u64,
    },

    /// The draft was published: draft == published now.
    ApplyDraftChanges,
}

impl DocumentEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DocumentEvent::EditText { .. } => "editText",
            DocumentEvent::ApplyDraftChanges => "applyDraftChanges",
        }
    }
}
