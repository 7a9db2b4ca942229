//! Full re-index from a conversation source

use crate::error::{AppError, Result};
use crate::models::ConversationDocument;
use crate::search::store::DocumentIndexer;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Supplies every conversation that should be searchable
#[async_trait]
pub trait ConversationSource: Send + Sync {
    async fn all_conversations(&self) -> Result<Vec<ConversationDocument>>;
}

/// Conversations held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    conversations: Vec<ConversationDocument>,
}

impl StaticSource {
    pub fn new(conversations: Vec<ConversationDocument>) -> Self {
        Self { conversations }
    }
}

#[async_trait]
impl ConversationSource for StaticSource {
    async fn all_conversations(&self) -> Result<Vec<ConversationDocument>> {
        Ok(self.conversations.clone())
    }
}

/// Conversations read from a JSON file holding an array of documents
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ConversationSource for JsonFileSource {
    async fn all_conversations(&self) -> Result<Vec<ConversationDocument>> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            AppError::Internal(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Outcome of a sync run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub fetched: usize,
    pub indexed: usize,
    pub failed: usize,
}

/// Re-indexes every conversation from a source in one bulk request
pub struct SyncService {
    source: Arc<dyn ConversationSource>,
    indexer: Arc<dyn DocumentIndexer>,
    index: String,
}

impl SyncService {
    pub fn new(
        source: Arc<dyn ConversationSource>,
        indexer: Arc<dyn DocumentIndexer>,
        index: impl Into<String>,
    ) -> Self {
        Self {
            source,
            indexer,
            index: index.into(),
        }
    }

    pub async fn sync_all(&self) -> Result<SyncReport> {
        let conversations = self.source.all_conversations().await?;
        let fetched = conversations.len();

        let summary = self.indexer.bulk_index(&self.index, &conversations).await?;
        if summary.has_failures() {
            warn!(
                index = %self.index,
                failed = summary.failed,
                errors = ?summary.errors,
                "Some conversations failed to index"
            );
        }

        info!(index = %self.index, fetched, indexed = summary.indexed, "Sync completed");
        Ok(SyncReport {
            fetched,
            indexed: summary.indexed,
            failed: summary.failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::memory::InMemoryStore;
    use std::io::Write;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_sync_all_indexes_every_conversation() {
        let store = Arc::new(InMemoryStore::new());
        let user = Uuid::new_v4();
        let source = StaticSource::new(vec![
            ConversationDocument::new(user, "one"),
            ConversationDocument::new(user, "two"),
        ]);

        let sync = SyncService::new(Arc::new(source), store.clone(), "conversations");
        let report = sync.sync_all().await.unwrap();

        assert_eq!(report, SyncReport { fetched: 2, indexed: 2, failed: 0 });
        assert_eq!(store.count("conversations"), 2);
    }

    #[tokio::test]
    async fn test_empty_source() {
        let store = Arc::new(InMemoryStore::new());
        let sync = SyncService::new(Arc::new(StaticSource::default()), store, "conversations");
        assert_eq!(sync.sync_all().await.unwrap().fetched, 0);
    }

    #[tokio::test]
    async fn test_json_file_source() {
        let docs = vec![ConversationDocument::new(Uuid::new_v4(), "from file")];
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&docs).unwrap().as_bytes())
            .unwrap();

        let loaded = JsonFileSource::new(file.path()).all_conversations().await.unwrap();
        assert_eq!(loaded, docs);

        let missing = JsonFileSource::new("/definitely/missing.json").all_conversations().await;
        assert!(missing.is_err());
    }
}
