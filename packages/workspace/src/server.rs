//! HTTP command surface.
//!
//! Commands are plain JSON posts; updates stream back over server-sent events.
//! The caller's identity comes from the `x-client-id` header and is checked
//! against the `userId` inside every submitted operation.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequestParts, Path, Query, State},
    http::request::Parts,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use ftext_editor::{AssetSnapshot, ConnectionId, DocumentEvent, EditorError};
use ftext_ot::{AuthoredOperation, ClientId};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_stream::StreamExt;
use tower_http::cors::CorsLayer;

use crate::{DocumentHandle, Subscription, Workspace, WorkspaceError, WorkspaceResult};

pub const CLIENT_ID_HEADER: &str = "x-client-id";

pub fn router(workspace: Workspace) -> Router {
    Router::new()
        .route("/api/documents/:id", get(get_document))
        .route("/api/documents/:id/edit-text", post(edit_text))
        .route(
            "/api/documents/:id/apply-draft-changes",
            post(apply_draft_changes),
        )
        .route("/api/documents/:id/events", get(document_events))
        .with_state(workspace)
        .layer(CorsLayer::permissive())
}

/// Body of every command response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    pub operation: Option<AuthoredOperation>,
    pub revision_id: Option<u64>,
}

impl CommandResult {
    pub fn success(operation: Option<AuthoredOperation>, revision_id: u64) -> Self {
        Self {
            error: None,
            kind: None,
            operation,
            revision_id: Some(revision_id),
        }
    }

    pub fn failure(error: &WorkspaceError) -> Self {
        Self {
            error: Some(error.to_string()),
            kind: Some(error.kind()),
            operation: None,
            revision_id: None,
        }
    }
}

/// Identity of the caller, from the `x-client-id` header
pub struct Caller(pub ClientId);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = WorkspaceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(CLIENT_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| Caller(ClientId::new(id)))
            .ok_or(WorkspaceError::MissingClientId)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditTextRequest {
    /// Wire-encoded operation, decoded by the document
    pub operation: serde_json::Value,
    pub revision_id: u64,

    /// Subscription the edit was made in, from the `snapshot` event
    #[serde(default)]
    pub connection_id: Option<ConnectionId>,
}

async fn get_document(
    State(workspace): State<Workspace>,
    Path(id): Path<String>,
) -> WorkspaceResult<Json<AssetSnapshot>> {
    let handle = workspace.open(&id).await?;
    Ok(Json(handle.snapshot().await?))
}

async fn edit_text(
    State(workspace): State<Workspace>,
    Path(id): Path<String>,
    Caller(caller): Caller,
    request: Result<Json<EditTextRequest>, JsonRejection>,
) -> WorkspaceResult<Json<CommandResult>> {
    let Json(request) = request.map_err(|e| WorkspaceError::InvalidRequest(e.body_text()))?;
    let handle = workspace.open(&id).await?;
    let bytes = serde_json::to_vec(&request.operation)
        .map_err(|e| EditorError::MalformedOperation(e.to_string()))?;

    let ack = handle
        .edit_text_from(caller, request.connection_id, bytes, request.revision_id)
        .await?;
    Ok(Json(CommandResult::success(Some(ack.operation), ack.revision)))
}

async fn apply_draft_changes(
    State(workspace): State<Workspace>,
    Path(id): Path<String>,
    Caller(caller): Caller,
) -> WorkspaceResult<Json<CommandResult>> {
    let handle = workspace.open(&id).await?;
    let snapshot = handle.apply_draft_changes().await?;
    tracing::info!(document = %id, client = %caller, "applied draft changes");
    Ok(Json(CommandResult::success(None, snapshot.revision_id)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    pub client_id: Option<String>,
}

#[derive(Serialize)]
struct Stamped<'a, T: Serialize> {
    #[serde(flatten)]
    payload: &'a T,
    timestamp: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Welcome<'a> {
    #[serde(flatten)]
    snapshot: &'a AssetSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    connection_id: Option<ConnectionId>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Ack {
    revision_id: u64,
}

#[derive(Serialize)]
struct Resync {
    skipped: u64,
}

/// Forgets the subscription when the stream is dropped
struct ConnectionGuard {
    handle: DocumentHandle,
    client: ClientId,
    connection: ConnectionId,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.handle.disconnect_later(self.connection);
    }
}

struct EventCursor {
    events: Option<broadcast::Receiver<DocumentEvent>>,
    guard: Option<ConnectionGuard>,
}

/// SSE stream: a `snapshot` event (carrying the `connectionId` to send with
/// edits), then every change in commit order. The subscriber's own edits
/// arrive as `ack` events. A subscriber that falls behind gets `resync` and the
/// stream ends; it should reconnect.
async fn document_events(
    State(workspace): State<Workspace>,
    Path(id): Path<String>,
    Query(query): Query<EventsQuery>,
) -> WorkspaceResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let handle = workspace.open(&id).await?;
    let client = query
        .client_id
        .filter(|client| !client.is_empty())
        .map(ClientId::new);

    let Subscription {
        snapshot,
        events,
        connection,
    } = handle.subscribe(client.clone()).await?;
    tracing::info!(document = %id, client = ?client, revision = snapshot.revision_id, "subscriber connected");

    let welcome = stamped(
        "snapshot",
        &Welcome {
            snapshot: &snapshot,
            connection_id: connection,
        },
    );
    let initial = stream::once(async move { Ok(welcome) });

    let cursor = EventCursor {
        events: Some(events),
        guard: client.zip(connection).map(|(client, connection)| ConnectionGuard {
            handle,
            client,
            connection,
        }),
    };
    let updates = stream::unfold(cursor, move |mut cursor| {
        let document = id.clone();
        async move {
            let events = cursor.events.as_mut()?;
            match events.recv().await {
                Ok(event) => {
                    let sse = to_sse(&event, cursor.guard.as_ref().map(|g| &g.client));
                    Some((Ok(sse), cursor))
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(document = %document, skipped, "subscriber lagged");
                    cursor.events = None;
                    let resync = stamped("resync", &Resync { skipped });
                    Some((Ok(resync), cursor))
                }
                Err(RecvError::Closed) => None,
            }
        }
    });

    Ok(Sse::new(initial.chain(updates)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    ))
}

fn to_sse(event: &DocumentEvent, subscriber: Option<&ClientId>) -> Event {
    match event {
        DocumentEvent::EditText {
            operation,
            revision_id,
        } if Some(&operation.author) == subscriber => stamped(
            "ack",
            &Ack {
                revision_id: *revision_id,
            },
        ),
        _ => stamped(event.name(), event),
    }
}

fn stamped<T: Serialize>(name: &'static str, payload: &T) -> Event {
    let body = Stamped {
        payload,
        timestamp: chrono::Utc::now().timestamp_millis(),
    };
    match Event::default().event(name).json_data(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(event = name, error = %e, "failed to encode event");
            Event::default().event("error")
        }
    }
}
