//! Background persistence for one document.
//!
//! The actor publishes every new snapshot on a `watch` channel and moves on.
//! The writer task only ever sees the latest value, so a burst of edits
//! collapses into a single write.

use ftext_editor::{AssetSnapshot, AssetStorage};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{WorkspaceError, WorkspaceResult};

#[derive(Debug, Clone)]
struct Pending {
    generation: u64,
    snapshot: AssetSnapshot,
}

/// Outcome of the most recent write
#[derive(Debug, Clone, Default)]
struct Written {
    generation: u64,
    error: Option<String>,
}

pub(crate) struct Persister {
    id: String,
    generation: u64,
    pending: watch::Sender<Pending>,
    written: watch::Receiver<Written>,
    task: JoinHandle<()>,
}

impl Persister {
    /// Start the writer. `initial` is what storage already holds.
    pub fn spawn(id: String, storage: Arc<dyn AssetStorage>, initial: AssetSnapshot) -> Self {
        let (pending_tx, pending_rx) = watch::channel(Pending {
            generation: 0,
            snapshot: initial,
        });
        let (written_tx, written_rx) = watch::channel(Written::default());
        let task = tokio::spawn(write_loop(id.clone(), storage, pending_rx, written_tx));

        Self {
            id,
            generation: 0,
            pending: pending_tx,
            written: written_rx,
            task,
        }
    }

    /// Queue a snapshot for writing. Returns its generation.
    pub fn request(&mut self, snapshot: AssetSnapshot) -> u64 {
        self.generation += 1;
        let generation = self.generation;
        self.pending.send_replace(Pending {
            generation,
            snapshot,
        });
        generation
    }

    /// Resolves once `generation` (or something newer) has been written
    pub fn flushed(&self, generation: u64) -> impl std::future::Future<Output = WorkspaceResult<()>> {
        let mut written = self.written.clone();
        let id = self.id.clone();
        async move {
            loop {
                {
                    let current = written.borrow_and_update();
                    if current.generation >= generation {
                        return match &current.error {
                            None => Ok(()),
                            Some(message) => Err(WorkspaceError::Persist {
                                id,
                                message: message.clone(),
                            }),
                        };
                    }
                }
                if written.changed().await.is_err() {
                    return Err(WorkspaceError::DocumentClosed(id));
                }
            }
        }
    }

    /// Stop accepting snapshots and wait for the last one to be written
    pub async fn close(self) {
        drop(self.pending);
        if let Err(e) = self.task.await {
            tracing::error!(document = %self.id, error = %e, "persistence task failed");
        }
    }
}

async fn write_loop(
    id: String,
    storage: Arc<dyn AssetStorage>,
    mut pending: watch::Receiver<Pending>,
    written: watch::Sender<Written>,
) {
    // Returns an error only once the sender is gone and nothing is left unseen
    while pending.changed().await.is_ok() {
        let Pending {
            generation,
            snapshot,
        } = pending.borrow_and_update().clone();

        let storage = storage.clone();
        let revision = snapshot.revision_id;
        let result = tokio::task::spawn_blocking(move || snapshot.save_to(storage.as_ref())).await;

        let error = match result {
            Ok(Ok(())) => {
                tracing::debug!(document = %id, revision, "persisted");
                None
            }
            Ok(Err(e)) => {
                tracing::error!(document = %id, revision, error = %e, "failed to persist");
                Some(e.to_string())
            }
            Err(e) => {
                tracing::error!(document = %id, revision, error = %e, "persistence worker panicked");
                Some(e.to_string())
            }
        };
        written.send_replace(Written { generation, error });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ftext_editor::{MemoryStorage, DRAFT_BLOB, PUBLISHED_BLOB};

    fn snapshot(text: &str, draft: &str, revision_id: u64) -> AssetSnapshot {
        AssetSnapshot {
            text: text.to_string(),
            draft: draft.to_string(),
            revision_id,
            has_draft: text != draft,
        }
    }

    #[tokio::test]
    async fn test_latest_snapshot_is_written() {
        let storage = Arc::new(MemoryStorage::new());
        let mut persister = Persister::spawn("doc".into(), storage.clone(), snapshot("", "", 0));

        persister.request(snapshot("", "a", 1));
        persister.request(snapshot("", "ab", 2));
        let generation = persister.request(snapshot("", "abc", 3));
        persister.flushed(generation).await.unwrap();

        assert_eq!(storage.read(DRAFT_BLOB).unwrap(), Some(b"abc".to_vec()));
        assert_eq!(storage.read(PUBLISHED_BLOB).unwrap(), Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_close_flushes() {
        let storage = Arc::new(MemoryStorage::new());
        let mut persister = Persister::spawn("doc".into(), storage.clone(), snapshot("", "", 0));

        persister.request(snapshot("final", "final", 4));
        persister.close().await;

        assert_eq!(storage.read(PUBLISHED_BLOB).unwrap(), Some(b"final".to_vec()));
        assert!(!storage.contains(DRAFT_BLOB));
    }
}
