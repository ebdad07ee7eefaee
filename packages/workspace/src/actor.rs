//! # Document actor
//!
//! Each open document is owned by exactly one task. Everything that touches the
//! document goes through its mailbox, so edits are applied strictly one at a
//! time and in the order they arrive.
//!
//! ```text
//!  handlers ──mpsc──▶ DocumentActor ──broadcast──▶ subscribers (SSE)
//!     ▲                  │    │
//!     └────oneshot───────┘    └──watch──▶ persistence task ──▶ storage
//! ```

use ftext_editor::{AssetSession, AssetSnapshot, AssetStorage, ConnectionId, DocumentEvent};
use ftext_ot::{AuthoredOperation, ClientId};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::persist::Persister;
use crate::{WorkspaceConfig, WorkspaceError, WorkspaceResult};

/// Reply to a successful edit
#[derive(Debug, Clone)]
pub struct EditAck {
    /// The operation as committed, attributed to the submitter
    pub operation: AuthoredOperation,
    pub revision: u64,
}

/// A consistent starting point for a subscriber: every event on `events`
/// happened after `snapshot`.
pub struct Subscription {
    pub snapshot: AssetSnapshot,
    pub events: broadcast::Receiver<DocumentEvent>,

    /// Set when the subscriber named a client; hand it back on disconnect
    pub connection: Option<ConnectionId>,
}

enum Command {
    EditText {
        caller: ClientId,
        connection: Option<ConnectionId>,
        operation: Vec<u8>,
        known_revision: u64,
        reply: oneshot::Sender<WorkspaceResult<EditAck>>,
    },
    ApplyDraftChanges {
        reply: oneshot::Sender<AssetSnapshot>,
    },
    Subscribe {
        client: Option<ClientId>,
        reply: oneshot::Sender<Subscription>,
    },
    Snapshot {
        reply: oneshot::Sender<AssetSnapshot>,
    },
    Disconnect {
        connection: ConnectionId,
    },
    Connections {
        reply: oneshot::Sender<usize>,
    },
    Save {
        reply: oneshot::Sender<WorkspaceResult<()>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cheap, cloneable access to a running document actor
#[derive(Clone)]
pub struct DocumentHandle {
    id: Arc<str>,
    mailbox: mpsc::Sender<Command>,
}

impl DocumentHandle {
    /// Start an actor that owns `session` and persists into `storage`
    pub fn spawn(
        id: impl Into<String>,
        session: AssetSession,
        storage: Arc<dyn AssetStorage>,
        config: &WorkspaceConfig,
    ) -> Self {
        let id: String = id.into();
        let (mailbox, commands) = mpsc::channel(config.mailbox_capacity.max(1));
        let (events, _) = broadcast::channel(config.broadcast_capacity.max(1));
        let session = session.with_history_limit(config.history_limit);
        let persister = Persister::spawn(id.clone(), storage, session.snapshot());

        let actor = DocumentActor {
            id: id.clone(),
            session,
            events,
            persister,
        };
        tokio::spawn(actor.run(commands));

        Self {
            id: id.into(),
            mailbox,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The actor has stopped and will not accept commands
    pub fn is_closed(&self) -> bool {
        self.mailbox.is_closed()
    }

    /// Submit wire-encoded operation bytes written against `known_revision`
    pub async fn edit_text(
        &self,
        caller: ClientId,
        operation: Vec<u8>,
        known_revision: u64,
    ) -> WorkspaceResult<EditAck> {
        self.edit_text_from(caller, None, operation, known_revision).await
    }

    /// [`edit_text`](Self::edit_text) sent over one of the caller's
    /// subscriptions
    pub async fn edit_text_from(
        &self,
        caller: ClientId,
        connection: Option<ConnectionId>,
        operation: Vec<u8>,
        known_revision: u64,
    ) -> WorkspaceResult<EditAck> {
        self.request(|reply| Command::EditText {
            caller,
            connection,
            operation,
            known_revision,
            reply,
        })
        .await?
    }

    /// Publish the draft. Returns the state afterwards.
    pub async fn apply_draft_changes(&self) -> WorkspaceResult<AssetSnapshot> {
        self.request(|reply| Command::ApplyDraftChanges { reply }).await
    }

    /// Snapshot plus event stream, taken atomically. A `client` is tracked
    /// so history it may still reference is kept.
    pub async fn subscribe(&self, client: Option<ClientId>) -> WorkspaceResult<Subscription> {
        self.request(|reply| Command::Subscribe { client, reply }).await
    }

    pub async fn snapshot(&self) -> WorkspaceResult<AssetSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Stop tracking a subscription
    pub async fn disconnect(&self, connection: ConnectionId) -> WorkspaceResult<()> {
        self.mailbox
            .send(Command::Disconnect { connection })
            .await
            .map_err(|_| self.closed())
    }

    /// Same as [`disconnect`](Self::disconnect) for contexts that cannot await
    pub fn disconnect_later(&self, connection: ConnectionId) {
        match self.mailbox.try_send(Command::Disconnect { connection }) {
            Ok(()) | Err(mpsc::error::TrySendError::Closed(_)) => {}
            Err(mpsc::error::TrySendError::Full(command)) => {
                let mailbox = self.mailbox.clone();
                if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                    runtime.spawn(async move {
                        let _ = mailbox.send(command).await;
                    });
                }
            }
        }
    }

    /// Number of tracked subscriptions
    pub async fn connections(&self) -> WorkspaceResult<usize> {
        self.request(|reply| Command::Connections { reply }).await
    }

    /// Write the current state and wait until it is on storage
    pub async fn save(&self) -> WorkspaceResult<()> {
        self.request(|reply| Command::Save { reply }).await?
    }

    /// Stop the actor after flushing pending writes
    pub async fn shutdown(&self) -> WorkspaceResult<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> WorkspaceResult<T> {
        let (reply, response) = oneshot::channel();
        self.mailbox
            .send(command(reply))
            .await
            .map_err(|_| self.closed())?;
        response.await.map_err(|_| self.closed())
    }

    fn closed(&self) -> WorkspaceError {
        WorkspaceError::DocumentClosed(self.id.to_string())
    }
}

struct DocumentActor {
    id: String,
    session: AssetSession,
    events: broadcast::Sender<DocumentEvent>,
    persister: Persister,
}

impl DocumentActor {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        tracing::info!(document = %self.id, revision = self.session.revision(), "document opened");

        let mut shutdown_reply = None;
        while let Some(command) = commands.recv().await {
            match command {
                Command::EditText {
                    caller,
                    connection,
                    operation,
                    known_revision,
                    reply,
                } => {
                    let result = self.edit_text(&caller, connection, &operation, known_revision);
                    let _ = reply.send(result);
                }
                Command::ApplyDraftChanges { reply } => {
                    let _ = reply.send(self.apply_draft_changes());
                }
                Command::Subscribe { client, reply } => {
                    let snapshot = self.session.snapshot();
                    let connection = client
                        .map(|client| self.session.track_client(client, snapshot.revision_id));
                    let events = self.events.subscribe();
                    let _ = reply.send(Subscription {
                        snapshot,
                        events,
                        connection,
                    });
                }
                Command::Snapshot { reply } => {
                    let _ = reply.send(self.session.snapshot());
                }
                Command::Disconnect { connection } => {
                    tracing::debug!(document = %self.id, %connection, "subscriber disconnected");
                    self.session.forget_connection(connection);
                }
                Command::Connections { reply } => {
                    let _ = reply.send(self.session.connection_count());
                }
                Command::Save { reply } => {
                    let generation = self.persister.request(self.session.snapshot());
                    let flushed = self.persister.flushed(generation);
                    tokio::spawn(async move {
                        let _ = reply.send(flushed.await);
                    });
                }
                Command::Shutdown { reply } => {
                    shutdown_reply = Some(reply);
                    break;
                }
            }
        }

        drop(commands);
        self.persister.close().await;
        tracing::info!(document = %self.id, "document closed");
        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
    }

    fn edit_text(
        &mut self,
        caller: &ClientId,
        connection: Option<ConnectionId>,
        operation: &[u8],
        known_revision: u64,
    ) -> WorkspaceResult<EditAck> {
        let outcome = self
            .session
            .submit_edit_from(caller, connection, operation, known_revision)
            .map_err(|e| {
                tracing::debug!(
                    document = %self.id,
                    client = %caller,
                    known_revision,
                    kind = e.kind(),
                    "edit rejected"
                );
                e
            })?;

        if let Some(signal) = outcome.signal {
            tracing::info!(document = %self.id, ?signal, "draft state changed");
        }

        // No subscribers is fine
        let _ = self.events.send(DocumentEvent::EditText {
            operation: outcome.operation.clone(),
            revision_id: outcome.revision,
        });
        self.persister.request(self.session.snapshot());

        Ok(EditAck {
            operation: outcome.operation,
            revision: outcome.revision,
        })
    }

    fn apply_draft_changes(&mut self) -> AssetSnapshot {
        self.session.publish_draft();
        let _ = self.events.send(DocumentEvent::ApplyDraftChanges);

        let snapshot = self.session.snapshot();
        self.persister.request(snapshot.clone());
        snapshot
    }
}
