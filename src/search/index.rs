//! Index lifecycle management

use crate::config::IndexNames;
use crate::search::document::{conversation_mapping, message_mapping};
use crate::search::error::{SearchError, SearchResult};
use crate::search::health::{HealthChecker, HealthReport};
use crate::search::store::IndexAdmin;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Existence of one managed index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexState {
    pub name: String,
    pub exists: bool,
}

/// Index existence plus store health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStatus {
    pub indices: Vec<IndexState>,
    pub health: HealthReport,
}

/// Creates and recreates the conversation and message indices
pub struct IndexManager {
    admin: Arc<dyn IndexAdmin>,
    names: IndexNames,
}

impl IndexManager {
    pub fn new(admin: Arc<dyn IndexAdmin>, names: IndexNames) -> Self {
        Self { admin, names }
    }

    fn managed(&self) -> [(&str, Value); 2] {
        [
            (self.names.conversations.as_str(), conversation_mapping()),
            (self.names.messages.as_str(), message_mapping()),
        ]
    }

    /// Create any missing index. Existing indices are left untouched.
    pub async fn initialize(&self) -> SearchResult<()> {
        for (name, mapping) in self.managed() {
            if self.admin.index_exists(name).await? {
                info!(index = name, "Index already exists");
                continue;
            }
            self.admin.create_index(name, &mapping).await?;
            info!(index = name, "Created index");
        }
        Ok(())
    }

    /// Delete and create every managed index. All indexed data is lost.
    pub async fn recreate(&self) -> SearchResult<()> {
        for (name, mapping) in self.managed() {
            match self.admin.delete_index(name).await {
                Ok(()) => info!(index = name, "Deleted index"),
                Err(SearchError::IndexNotFound(_)) => {
                    warn!(index = name, "Index did not exist, creating it")
                }
                Err(e) => return Err(e),
            }
            self.admin.create_index(name, &mapping).await?;
            info!(index = name, "Created index");
        }
        Ok(())
    }

    /// Existence of each managed index and the current store health
    pub async fn status(&self) -> SearchResult<IndexStatus> {
        let health = HealthChecker::new(self.admin.clone()).check().await;

        let mut indices = Vec::new();
        for (name, _) in self.managed() {
            indices.push(IndexState {
                name: name.to_string(),
                exists: self.admin.index_exists(name).await?,
            });
        }

        Ok(IndexStatus { indices, health })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConversationDocument;
    use crate::search::memory::InMemoryStore;
    use crate::search::store::{DocumentIndexer, HealthStatus};
    use uuid::Uuid;

    fn manager(store: &Arc<InMemoryStore>) -> IndexManager {
        IndexManager::new(store.clone(), IndexNames::default())
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager(&store);

        manager.initialize().await.unwrap();
        manager.initialize().await.unwrap();

        let settings = store.index_settings("conversations").unwrap();
        assert_eq!(
            settings["mappings"]["properties"]["messages"]["type"],
            "nested"
        );
        assert!(store.index_settings("messages").is_some());
    }

    #[tokio::test]
    async fn test_initialize_keeps_existing_documents() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager(&store);
        manager.initialize().await.unwrap();

        let doc = ConversationDocument::new(Uuid::new_v4(), "kept");
        store.index_document("conversations", &doc).await.unwrap();
        manager.initialize().await.unwrap();
        assert_eq!(store.count("conversations"), 1);
    }

    #[tokio::test]
    async fn test_recreate_drops_documents() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager(&store);
        manager.initialize().await.unwrap();
        store
            .index_document("conversations", &ConversationDocument::new(Uuid::new_v4(), "gone"))
            .await
            .unwrap();

        manager.recreate().await.unwrap();
        assert_eq!(store.count("conversations"), 0);
        assert!(store.index_settings("conversations").is_some());
    }

    #[tokio::test]
    async fn test_recreate_without_existing_indices() {
        let store = Arc::new(InMemoryStore::new());
        manager(&store).recreate().await.unwrap();
        assert!(store.index_settings("messages").is_some());
    }

    #[tokio::test]
    async fn test_status() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager(&store);

        let before = manager.status().await.unwrap();
        assert!(before.indices.iter().all(|i| !i.exists));
        assert_eq!(before.health.status, HealthStatus::Healthy);

        manager.initialize().await.unwrap();
        let after = manager.status().await.unwrap();
        assert!(after.indices.iter().all(|i| i.exists));
    }
}
