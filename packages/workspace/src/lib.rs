//! # ftext Workspace
//!
//! Hosts many documents at once. Every document is a tokio task that owns its
//! [`AssetSession`](ftext_editor::AssetSession); the HTTP layer only ever
//! talks to it through a [`DocumentHandle`].

mod actor;
mod error;
mod persist;
mod registry;
pub mod server;

pub use actor::{DocumentHandle, EditAck, Subscription};
pub use error::{WorkspaceError, WorkspaceResult};
pub use registry::{validate_document_id, Workspace, WorkspaceConfig};
pub use server::{router, CommandResult, CLIENT_ID_HEADER};
