//! # Edit Client
//!
//! One client's view of a shared document.
//!
//! Local edits apply immediately and go to the server one at a time; while an
//! edit is in flight, further local edits are composed into a buffer. Remote
//! operations arrive already expressed against the server's next revision and
//! only need to be transformed past whatever this client has not had
//! acknowledged yet.
//!
//! ```text
//!                  local edit                    local edit
//! Synchronized ───────────────▶ AwaitingConfirm ───────────▶ AwaitingWithBuffer
//!      ▲                             │    ▲                        │      │ local edit
//!      └──────────── ack ────────────┘    └────── ack (send buffer) ┘      └──▶ (compose)
//! ```

use crate::{AssetSnapshot, DocumentEvent, EditorError};
use ftext_ot::{transform, AuthoredOperation, ClientId, Operation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Synchronized,
    /// One operation sent, not yet acknowledged
    AwaitingConfirm(Operation),
    /// Outstanding operation plus local edits made since it was sent
    AwaitingWithBuffer(Operation, Operation),
}

/// An edit ready to be submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub operation: AuthoredOperation,
    pub known_revision: u64,
}

impl Outgoing {
    pub fn to_bytes(&self) -> Result<Vec<u8>, EditorError> {
        Ok(self.operation.to_bytes()?)
    }
}

pub struct EditClient {
    id: ClientId,

    /// Text as shown locally, including unacknowledged edits
    text: String,

    /// Text at `revision` as the server has it
    confirmed: String,

    published: String,
    revision: u64,
    state: SyncState,
}

impl EditClient {
    pub fn new(id: impl Into<ClientId>, text: impl Into<String>, revision: u64) -> Self {
        let text = text.into();
        Self {
            id: id.into(),
            confirmed: text.clone(),
            published: text.clone(),
            text,
            revision,
            state: SyncState::Synchronized,
        }
    }

    /// Start from a server snapshot
    pub fn from_snapshot(id: impl Into<ClientId>, snapshot: &AssetSnapshot) -> Self {
        let mut client = Self::new(id, snapshot.draft.clone(), snapshot.revision_id);
        client.published = snapshot.text.clone();
        client
    }

    pub fn id(&self) -> &ClientId {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Server text at [`revision`](Self::revision)
    pub fn confirmed_text(&self) -> &str {
        &self.confirmed
    }

    pub fn published(&self) -> &str {
        &self.published
    }

    pub fn has_draft(&self) -> bool {
        self.published != self.confirmed
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// Apply an edit made locally. Returns what to send, if anything can be
    /// sent right now.
    pub fn apply_local(&mut self, operation: Operation) -> Result<Option<Outgoing>, EditorError> {
        let text = operation.apply(&self.text)?;

        let (state, outgoing) = match &self.state {
            SyncState::Synchronized => (
                SyncState::AwaitingConfirm(operation.clone()),
                Some(self.outgoing(operation)),
            ),
            SyncState::AwaitingConfirm(outstanding) => (
                SyncState::AwaitingWithBuffer(outstanding.clone(), operation),
                None,
            ),
            SyncState::AwaitingWithBuffer(outstanding, buffer) => (
                SyncState::AwaitingWithBuffer(outstanding.clone(), buffer.compose(&operation)?),
                None,
            ),
        };

        self.text = text;
        self.state = state;
        Ok(outgoing)
    }

    /// The server committed our outstanding edit as `revision`.
    pub fn server_ack(&mut self, revision: u64) -> Result<Option<Outgoing>, EditorError> {
        self.expect_next(revision)?;

        let (committed, state, outgoing) = match &self.state {
            SyncState::Synchronized => return Err(EditorError::UnexpectedAck { revision }),
            SyncState::AwaitingConfirm(outstanding) => {
                (outstanding.clone(), SyncState::Synchronized, None)
            }
            SyncState::AwaitingWithBuffer(outstanding, buffer) => (
                outstanding.clone(),
                SyncState::AwaitingConfirm(buffer.clone()),
                Some(buffer.clone()),
            ),
        };

        // The outstanding operation has been kept transformed against every
        // remote edit, so it is exactly what the server committed.
        self.confirmed = committed.apply(&self.confirmed)?;
        self.revision = revision;
        self.state = state;
        Ok(outgoing.map(|op| self.outgoing(op)))
    }

    /// Apply an operation another client committed as `revision`.
    pub fn apply_server(&mut self, operation: Operation, revision: u64) -> Result<(), EditorError> {
        self.expect_next(revision)?;

        // The server's operation was committed first, so it keeps insert priority.
        let (state, local) = match &self.state {
            SyncState::Synchronized => (SyncState::Synchronized, operation.clone()),
            SyncState::AwaitingConfirm(outstanding) => {
                let (remote, outstanding) = transform(&operation, outstanding)?;
                (SyncState::AwaitingConfirm(outstanding), remote)
            }
            SyncState::AwaitingWithBuffer(outstanding, buffer) => {
                let (remote, outstanding) = transform(&operation, outstanding)?;
                let (remote, buffer) = transform(&remote, buffer)?;
                (SyncState::AwaitingWithBuffer(outstanding, buffer), remote)
            }
        };

        let text = local.apply(&self.text)?;
        self.confirmed = operation.apply(&self.confirmed)?;
        self.text = text;
        self.state = state;
        self.revision = revision;
        Ok(())
    }

    /// Handle a broadcast notification
    pub fn receive(&mut self, event: &DocumentEvent) -> Result<Option<Outgoing>, EditorError> {
        match event {
            DocumentEvent::EditText {
                operation,
                revision_id,
            } if operation.author == self.id => self.server_ack(*revision_id),
            DocumentEvent::EditText {
                operation,
                revision_id,
            } => {
                self.apply_server(operation.operation.clone(), *revision_id)?;
                Ok(None)
            }
            DocumentEvent::ApplyDraftChanges => {
                self.published = self.confirmed.clone();
                Ok(None)
            }
        }
    }

    fn expect_next(&self, revision: u64) -> Result<(), EditorError> {
        if revision != self.revision + 1 {
            return Err(EditorError::UnexpectedRevision {
                expected: self.revision + 1,
                got: revision,
            });
        }
        Ok(())
    }

    fn outgoing(&self, operation: Operation) -> Outgoing {
        Outgoing {
            operation: AuthoredOperation::new(self.id.clone(), operation),
            known_revision: self.revision,
        }
    }
}
