//! # Asset Session
//!
//! Server-side wrapper that binds a [`Document`] to client identity, a
//! published/draft pair and storage.
//!
//! ```text
//!          edit (draft changes)
//!   Clean ───────────────────────▶ Dirty ──┐ edit
//!     ▲                              │ ◀───┘
//!     └────── publish_draft ─────────┘
//! ```
//!
//! The draft is the live collaborative text (the document). The published text
//! only moves when someone explicitly applies the draft changes.

use crate::storage::AssetStorage;
use crate::{CommittedEdit, Document, EditorError};
use ftext_ot::{AuthoredOperation, ClientId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Blob holding the published text
pub const PUBLISHED_BLOB: &str = "ftext.txt";

/// Blob holding the draft text; present only while the asset is dirty
pub const DRAFT_BLOB: &str = "draft.txt";

/// Derived from the text, not from edit history: the asset is dirty exactly
/// while the draft differs from the published text. An edit that changes
/// nothing leaves a clean asset clean, and an edit that restores the published
/// text makes it clean again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DraftState {
    Clean,
    Dirty,
}

/// Change of the user-visible "draft" indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftSignal {
    Raised,
    Cleared,
}

/// Result of a successful `submit_edit`
#[derive(Debug, Clone)]
pub struct EditOutcome {
    /// Committed operation, attributed to the submitter
    pub operation: AuthoredOperation,

    /// Revision assigned to the operation
    pub revision: u64,

    pub signal: Option<DraftSignal>,
}

impl EditOutcome {
    /// Wire form of the committed operation, for the submitter and for rebroadcast
    pub fn operation_bytes(&self) -> Result<Vec<u8>, EditorError> {
        Ok(self.operation.to_bytes()?)
    }
}

/// Serializable view of an asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSnapshot {
    /// Published text
    pub text: String,
    pub draft: String,
    pub revision_id: u64,
    pub has_draft: bool,
}

impl AssetSnapshot {
    /// Persist the published text, and the draft while dirty. A clean asset
    /// has no draft blob.
    pub fn save_to(&self, storage: &dyn AssetStorage) -> Result<(), EditorError> {
        storage.write(PUBLISHED_BLOB, self.text.as_bytes())?;
        if self.has_draft {
            storage.write(DRAFT_BLOB, self.draft.as_bytes())?;
        } else {
            storage.remove(DRAFT_BLOB)?;
        }
        tracing::debug!(
            revision = self.revision_id,
            has_draft = self.has_draft,
            "saved asset"
        );
        Ok(())
    }
}

/// One subscription of a client. A client may hold several at once (one per
/// open tab), each with its own view of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
struct Connection {
    client: ClientId,

    /// Oldest revision this connection may still submit against
    floor: u64,
}

pub struct AssetSession {
    document: Document,
    published: String,
    state: DraftState,
    connections: HashMap<ConnectionId, Connection>,
    next_connection: u64,
}

impl AssetSession {
    /// Freshly created asset: published and draft are both `text`
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::from_snapshots(text.clone(), text)
    }

    /// Asset restored from stored snapshots. Revision history starts over at 0.
    pub fn from_snapshots(published: String, draft: String) -> Self {
        let state = if published != draft {
            DraftState::Dirty
        } else {
            DraftState::Clean
        };
        Self {
            document: Document::new(draft),
            published,
            state,
            connections: HashMap::new(),
            next_connection: 1,
        }
    }

    pub fn with_history_limit(mut self, limit: Option<usize>) -> Self {
        self.document = self.document.with_history_limit(limit);
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn published(&self) -> &str {
        &self.published
    }

    pub fn draft(&self) -> &str {
        self.document.text()
    }

    pub fn revision(&self) -> u64 {
        self.document.revision()
    }

    pub fn state(&self) -> DraftState {
        self.state
    }

    pub fn has_draft(&self) -> bool {
        self.state == DraftState::Dirty
    }

    pub fn snapshot(&self) -> AssetSnapshot {
        AssetSnapshot {
            text: self.published.clone(),
            draft: self.draft().to_string(),
            revision_id: self.revision(),
            has_draft: self.has_draft(),
        }
    }

    /// Decode, authenticate and commit an edit from `caller`.
    pub fn submit_edit(
        &mut self,
        caller: &ClientId,
        operation_bytes: &[u8],
        known_revision: u64,
    ) -> Result<EditOutcome, EditorError> {
        self.submit_edit_from(caller, None, operation_bytes, known_revision)
    }

    /// [`submit_edit`](Self::submit_edit) on behalf of one of the caller's
    /// connections. Only that connection's floor moves. Without a connection
    /// the caller's floor moves only if it has exactly one connection.
    pub fn submit_edit_from(
        &mut self,
        caller: &ClientId,
        connection: Option<ConnectionId>,
        operation_bytes: &[u8],
        known_revision: u64,
    ) -> Result<EditOutcome, EditorError> {
        let submitted = AuthoredOperation::from_bytes(operation_bytes)?;
        if &submitted.author != caller {
            return Err(EditorError::IdentityMismatch {
                declared: submitted.author,
                caller: caller.clone(),
            });
        }

        let CommittedEdit {
            operation,
            revision,
        } = self.document.apply(submitted.operation, known_revision)?;

        let signal = self.refresh_state();

        self.advance_floor(caller, connection, revision);
        self.trim_history();

        Ok(EditOutcome {
            operation: AuthoredOperation::new(caller.clone(), operation),
            revision,
            signal,
        })
    }

    /// Make the draft the published text ("apply draft changes")
    pub fn publish_draft(&mut self) -> Option<DraftSignal> {
        self.published = self.document.text().to_string();
        let signal = self.refresh_state();
        tracing::info!(revision = self.revision(), "published draft");
        signal
    }

    /// Start tracking a connection of `client` that knows the document at
    /// `revision`. History it may still reference is kept until
    /// [`forget_connection`](Self::forget_connection).
    pub fn track_client(&mut self, client: ClientId, revision: u64) -> ConnectionId {
        let id = ConnectionId(self.next_connection);
        self.next_connection += 1;
        self.connections.insert(
            id,
            Connection {
                client,
                floor: revision,
            },
        );
        id
    }

    pub fn forget_connection(&mut self, connection: ConnectionId) {
        if self.connections.remove(&connection).is_some() {
            self.trim_history();
        }
    }

    /// Number of tracked connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn advance_floor(
        &mut self,
        caller: &ClientId,
        connection: Option<ConnectionId>,
        revision: u64,
    ) {
        let target = match connection {
            Some(id) => Some(id),
            None => {
                let mut owned = self
                    .connections
                    .iter()
                    .filter(|(_, c)| &c.client == caller)
                    .map(|(id, _)| *id);
                match (owned.next(), owned.next()) {
                    (Some(only), None) => Some(only),
                    _ => None,
                }
            }
        };
        if let Some(entry) = target.and_then(|id| self.connections.get_mut(&id)) {
            if &entry.client == caller && entry.floor < revision {
                entry.floor = revision;
            }
        }
    }

    fn trim_history(&mut self) {
        if let Some(oldest) = self.connections.values().map(|c| c.floor).min() {
            self.document.trim_history(oldest);
        }
    }

    fn refresh_state(&mut self) -> Option<DraftSignal> {
        let next = if self.published != self.document.text() {
            DraftState::Dirty
        } else {
            DraftState::Clean
        };
        let signal = match (self.state, next) {
            (DraftState::Clean, DraftState::Dirty) => Some(DraftSignal::Raised),
            (DraftState::Dirty, DraftState::Clean) => Some(DraftSignal::Cleared),
            _ => None,
        };
        self.state = next;
        signal
    }

    /// Load published and draft text. A missing published blob is a new,
    /// empty asset; a missing draft blob means the asset is clean.
    pub fn load_from(storage: &dyn AssetStorage) -> Result<Self, EditorError> {
        let published = read_text(storage, PUBLISHED_BLOB)?.unwrap_or_default();
        let draft = match read_text(storage, DRAFT_BLOB)? {
            Some(draft) => draft,
            None => published.clone(),
        };
        Ok(Self::from_snapshots(published, draft))
    }

    /// Persist the published text, and the draft while dirty
    pub fn save_to(&self, storage: &dyn AssetStorage) -> Result<(), EditorError> {
        self.snapshot().save_to(storage)
    }

    /// Write only the published text
    pub fn export_to(&self, storage: &dyn AssetStorage) -> Result<(), EditorError> {
        storage.write(PUBLISHED_BLOB, self.published.as_bytes())?;
        Ok(())
    }
}

fn read_text(storage: &dyn AssetStorage, name: &str) -> Result<Option<String>, EditorError> {
    match storage.read(name)? {
        Some(bytes) => String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| EditorError::InvalidUtf8 {
                name: name.to_string(),
            }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use ftext_ot::Operation;

    fn edit_bytes(author: &str, op: Operation) -> Vec<u8> {
        AuthoredOperation::new(author, op).to_bytes().unwrap()
    }

    fn alice() -> ClientId {
        ClientId::new("alice")
    }

    #[test]
    fn test_session_creation() {
        let session = AssetSession::new("hello");
        assert_eq!(session.published(), "hello");
        assert_eq!(session.draft(), "hello");
        assert_eq!(session.revision(), 0);
        assert_eq!(session.state(), DraftState::Clean);
    }

    #[test]
    fn test_first_edit_raises_draft() {
        let mut session = AssetSession::new("hello");

        let op = Operation::builder().retain(5).insert("!").build();
        let outcome = session
            .submit_edit(&alice(), &edit_bytes("alice", op.clone()), 0)
            .unwrap();
        assert_eq!(outcome.signal, Some(DraftSignal::Raised));
        assert_eq!(outcome.revision, 1);
        assert_eq!(outcome.operation.operation, op);
        assert!(session.has_draft());

        let op = Operation::builder().retain(6).insert("!").build();
        let outcome = session
            .submit_edit(&alice(), &edit_bytes("alice", op), 1)
            .unwrap();
        assert_eq!(outcome.signal, None);
        assert_eq!(session.draft(), "hello!!");
        assert_eq!(session.published(), "hello");
    }

    #[test]
    fn test_publish_clears_draft() {
        let mut session = AssetSession::new("a");
        let op = Operation::builder().retain(1).insert("b").build();
        session
            .submit_edit(&alice(), &edit_bytes("alice", op), 0)
            .unwrap();

        assert_eq!(session.publish_draft(), Some(DraftSignal::Cleared));
        assert_eq!(session.published(), "ab");
        assert_eq!(session.state(), DraftState::Clean);

        // Publishing a clean asset changes nothing
        assert_eq!(session.publish_draft(), None);
    }

    #[test]
    fn test_identity_mismatch() {
        let mut session = AssetSession::new("hello");
        let op = Operation::builder().retain(5).insert("!").build();
        let result = session.submit_edit(&alice(), &edit_bytes("mallory", op), 0);

        assert!(matches!(result, Err(EditorError::IdentityMismatch { .. })));
        assert_eq!(session.revision(), 0);
        assert_eq!(session.draft(), "hello");
    }

    #[test]
    fn test_malformed_operation() {
        let mut session = AssetSession::new("hello");
        let result = session.submit_edit(&alice(), b"{\"userId\":\"alice\"}", 0);
        assert!(matches!(result, Err(EditorError::MalformedOperation(_))));

        let result = session.submit_edit(&alice(), b"not json", 0);
        assert_eq!(result.unwrap_err().kind(), "malformedOperation");
    }

    #[test]
    fn test_save_and_load_dirty() {
        let storage = MemoryStorage::new();
        let mut session = AssetSession::new("v1");
        let op = Operation::builder().retain(2).insert("-draft").build();
        session
            .submit_edit(&alice(), &edit_bytes("alice", op), 0)
            .unwrap();
        session.save_to(&storage).unwrap();

        assert!(storage.contains(DRAFT_BLOB));
        let loaded = AssetSession::load_from(&storage).unwrap();
        assert_eq!(loaded.published(), "v1");
        assert_eq!(loaded.draft(), "v1-draft");
        assert_eq!(loaded.revision(), 0);
        assert_eq!(loaded.state(), DraftState::Dirty);
    }

    #[test]
    fn test_save_clean_removes_draft_blob() {
        let storage = MemoryStorage::new();
        storage.write(DRAFT_BLOB, b"stale").unwrap();

        let session = AssetSession::new("same");
        session.save_to(&storage).unwrap();

        assert!(!storage.contains(DRAFT_BLOB));
        let loaded = AssetSession::load_from(&storage).unwrap();
        assert_eq!(loaded.state(), DraftState::Clean);
        assert_eq!(loaded.draft(), "same");
    }

    #[test]
    fn test_load_missing_asset_is_empty() {
        let storage = MemoryStorage::new();
        let loaded = AssetSession::load_from(&storage).unwrap();
        assert_eq!(loaded.published(), "");
        assert_eq!(loaded.state(), DraftState::Clean);
    }

    #[test]
    fn test_load_invalid_utf8() {
        let storage = MemoryStorage::new();
        storage.write(PUBLISHED_BLOB, &[0xff, 0xfe]).unwrap();
        assert!(matches!(
            AssetSession::load_from(&storage),
            Err(EditorError::InvalidUtf8 { .. })
        ));
    }

    #[test]
    fn test_export_writes_published_only() {
        let storage = MemoryStorage::new();
        let session = AssetSession::from_snapshots("pub".to_string(), "draft".to_string());
        session.export_to(&storage).unwrap();
        assert_eq!(storage.read(PUBLISHED_BLOB).unwrap(), Some(b"pub".to_vec()));
        assert!(!storage.contains(DRAFT_BLOB));
    }

    #[test]
    fn test_history_trimmed_to_slowest_client() {
        let mut session = AssetSession::new("");
        session.track_client(alice(), 0);
        let bob = session.track_client(ClientId::new("bob"), 0);

        for i in 0..3 {
            let op = Operation::builder().retain(i).insert("a").build();
            session
                .submit_edit(&alice(), &edit_bytes("alice", op), i as u64)
                .unwrap();
        }
        // bob may still submit against revision 0
        assert_eq!(session.document().oldest_revision(), 0);

        session.forget_connection(bob);
        assert_eq!(session.document().oldest_revision(), 3);
    }

    #[test]
    fn test_second_connection_keeps_its_history() {
        let mut session = AssetSession::new("");
        let first_tab = session.track_client(alice(), 0);
        let second_tab = session.track_client(alice(), 0);
        let bob = session.track_client(ClientId::new("bob"), 0);
        assert_eq!(session.connection_count(), 3);

        session.forget_connection(first_tab);
        for i in 0..2 {
            let op = Operation::builder().retain(i).insert("b").build();
            session
                .submit_edit(&ClientId::new("bob"), &edit_bytes("bob", op), i as u64)
                .unwrap();
        }
        assert_eq!(session.document().oldest_revision(), 0);

        // The remaining tab still submits against revision 0
        let op = Operation::builder().insert("a").build();
        let outcome = session
            .submit_edit_from(&alice(), Some(second_tab), &edit_bytes("alice", op), 0)
            .unwrap();
        assert_eq!(outcome.revision, 3);
        assert_eq!(session.draft(), "bba");

        session.forget_connection(second_tab);
        session.forget_connection(bob);
        assert_eq!(session.connection_count(), 0);
    }

    #[test]
    fn test_ambiguous_submitter_moves_no_floor() {
        let mut session = AssetSession::new("");
        session.track_client(alice(), 0);
        let second_tab = session.track_client(alice(), 0);

        let op = Operation::builder().insert("x").build();
        session
            .submit_edit(&alice(), &edit_bytes("alice", op), 0)
            .unwrap();
        assert_eq!(session.document().oldest_revision(), 0);

        // A submission naming another client's connection moves nothing
        let op = Operation::builder().retain(1).insert("y").build();
        let bob = ClientId::new("bob");
        session
            .submit_edit_from(&bob, Some(second_tab), &edit_bytes("bob", op), 1)
            .unwrap();
        assert_eq!(session.document().oldest_revision(), 0);
    }

    #[test]
    fn test_no_op_edit_keeps_clean_asset_clean() {
        let mut session = AssetSession::new("same");
        let op = Operation::builder().retain(4).build();
        let outcome = session
            .submit_edit(&alice(), &edit_bytes("alice", op), 0)
            .unwrap();
        assert_eq!(outcome.revision, 1);
        assert_eq!(outcome.signal, None);
        assert_eq!(session.state(), DraftState::Clean);
    }

    #[test]
    fn test_untracked_clients_keep_full_history() {
        let mut session = AssetSession::new("");
        for i in 0..3 {
            let op = Operation::builder().retain(i).insert("a").build();
            session
                .submit_edit(&alice(), &edit_bytes("alice", op), i as u64)
                .unwrap();
        }
        assert_eq!(session.document().history_len(), 3);
    }
}
