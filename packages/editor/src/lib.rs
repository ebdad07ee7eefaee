//! # ftext Editor
//!
//! Revisioned documents and draft/published text assets for ftext.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ ot: Operation, compose, invert, transform   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: revisions + assets                  │
//! │  - Document: history, stale reconciliation  │
//! │  - AssetSession: identity, draft/published  │
//! │  - EditClient: client-side pending edits    │
//! │  - AssetStorage: blob persistence           │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ workspace: per-document actors, HTTP + SSE  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Server authority**: the revision order is whatever the server commits
//! 2. **Nothing partial**: a rejected edit leaves the document untouched
//! 3. **Optimistic clients**: local edits show immediately and are rebased on
//!    the server's operations
//!
//! ## Usage
//!
//! ```rust
//! use ftext_editor::{AssetSession, DraftSignal};
//! use ftext_ot::{AuthoredOperation, ClientId, Operation};
//!
//! let mut session = AssetSession::new("hello");
//! let alice = ClientId::new("alice");
//!
//! let op = Operation::builder().retain(5).insert("!").build();
//! let bytes = AuthoredOperation::new(alice.clone(), op).to_bytes().unwrap();
//!
//! let outcome = session.submit_edit(&alice, &bytes, 0).unwrap();
//! assert_eq!(outcome.revision, 1);
//! assert_eq!(outcome.signal, Some(DraftSignal::Raised));
//! assert_eq!(session.draft(), "hello!");
//! assert_eq!(session.published(), "hello");
//! ```

mod client;
mod document;
mod errors;
mod events;
mod session;
mod storage;

pub use client::{EditClient, Outgoing, SyncState};
pub use document::{CommittedEdit, Document};
pub use errors::EditorError;
pub use events::DocumentEvent;
pub use session::{
    AssetSession, AssetSnapshot, ConnectionId, DraftSignal, DraftState, EditOutcome, DRAFT_BLOB,
    PUBLISHED_BLOB,
};
pub use storage::{AssetStorage, DirStorage, MemoryStorage};
