use ftext_editor::{AssetSession, DirStorage};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{DocumentHandle, WorkspaceError, WorkspaceResult};

const MAX_DOCUMENT_ID_LEN: usize = 128;

#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    /// Each document lives in `storage_dir/<document id>/`
    pub storage_dir: PathBuf,

    /// Committed operations kept per document (`None` = unbounded)
    pub history_limit: Option<usize>,

    pub broadcast_capacity: usize,
    pub mailbox_capacity: usize,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("documents"),
            history_limit: None,
            broadcast_capacity: 256,
            mailbox_capacity: 64,
        }
    }
}

/// All open documents, opened on first use
#[derive(Clone)]
pub struct Workspace {
    config: Arc<WorkspaceConfig>,
    documents: Arc<Mutex<HashMap<String, DocumentHandle>>>,
}

impl Workspace {
    pub fn new(config: WorkspaceConfig) -> Self {
        Self {
            config: Arc::new(config),
            documents: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// Handle for `id`, loading the document from storage if it is not open.
    /// The registry lock is not held while loading, so other documents stay
    /// reachable.
    pub async fn open(&self, id: &str) -> WorkspaceResult<DocumentHandle> {
        validate_document_id(id)?;

        if let Some(handle) = self.running(id).await {
            return Ok(handle);
        }

        let storage = Arc::new(DirStorage::new(self.config.storage_dir.join(id)));
        let loader = storage.clone();
        let session = tokio::task::spawn_blocking(move || AssetSession::load_from(loader.as_ref()))
            .await??;

        // Another request may have opened it while we were loading
        let mut documents = self.documents.lock().await;
        if let Some(handle) = documents.get(id).filter(|handle| !handle.is_closed()) {
            return Ok(handle.clone());
        }
        let handle = DocumentHandle::spawn(id, session, storage, &self.config);
        documents.insert(id.to_string(), handle.clone());
        Ok(handle)
    }

    async fn running(&self, id: &str) -> Option<DocumentHandle> {
        let documents = self.documents.lock().await;
        documents
            .get(id)
            .filter(|handle| !handle.is_closed())
            .cloned()
    }

    /// Ids of documents with a running actor
    pub async fn open_documents(&self) -> Vec<String> {
        let documents = self.documents.lock().await;
        let mut ids: Vec<String> = documents
            .iter()
            .filter(|(_, handle)| !handle.is_closed())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Stop every document, waiting for pending writes
    pub async fn shutdown(&self) {
        let handles: Vec<DocumentHandle> = {
            let mut documents = self.documents.lock().await;
            documents.drain().map(|(_, handle)| handle).collect()
        };
        for handle in handles {
            if let Err(e) = handle.shutdown().await {
                tracing::debug!(document = handle.id(), error = %e, "already closed");
            }
        }
        tracing::info!("workspace shut down");
    }
}

/// Ids name directories under the storage root, so only `[A-Za-z0-9_-]` is
/// allowed.
pub fn validate_document_id(id: &str) -> WorkspaceResult<()> {
    let valid = !id.is_empty()
        && id.len() <= MAX_DOCUMENT_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(WorkspaceError::InvalidDocumentId(id.to_string()))
    }
}
