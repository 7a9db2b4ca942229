//! Document store capabilities
//!
//! The search core only depends on these traits, so it runs the same way
//! against the HTTP client and against the in-memory store.

use crate::models::{ConversationDocument, MessageDocument};
use crate::search::error::SearchResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Executes raw query bodies
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run `body` against `index` and return the raw response
    async fn execute_query(&self, index: &str, body: &Value) -> SearchResult<Value>;
}

/// Writes conversation documents
#[async_trait]
pub trait DocumentIndexer: Send + Sync {
    /// Index (create or replace) a full conversation
    async fn index_document(&self, index: &str, doc: &ConversationDocument) -> SearchResult<()>;

    /// Update the conversation-level fields, leaving messages and tags alone
    async fn update_document(&self, index: &str, doc: &ConversationDocument) -> SearchResult<()>;

    async fn delete_document(&self, index: &str, id: Uuid) -> SearchResult<()>;

    /// Index many conversations in one request
    async fn bulk_index(&self, index: &str, docs: &[ConversationDocument]) -> SearchResult<BulkSummary>;

    async fn document_exists(&self, index: &str, id: Uuid) -> SearchResult<bool>;

    /// Append a message to a conversation's nested messages
    async fn add_message(
        &self,
        index: &str,
        conversation_id: Uuid,
        message: &MessageDocument,
    ) -> SearchResult<()>;

    /// Replace the nested message with the same ID
    async fn update_message(
        &self,
        index: &str,
        conversation_id: Uuid,
        message: &MessageDocument,
    ) -> SearchResult<()>;

    /// Remove the nested message with this ID
    async fn remove_message(
        &self,
        index: &str,
        conversation_id: Uuid,
        message_id: Uuid,
    ) -> SearchResult<()>;
}

/// Index lifecycle and cluster state
#[async_trait]
pub trait IndexAdmin: Send + Sync {
    async fn ping(&self) -> SearchResult<bool>;

    async fn cluster_health(&self) -> SearchResult<ClusterHealth>;

    async fn index_exists(&self, index: &str) -> SearchResult<bool>;

    /// Create `index` with the given settings and mappings body
    async fn create_index(&self, index: &str, body: &Value) -> SearchResult<()>;

    async fn delete_index(&self, index: &str) -> SearchResult<()>;
}

/// Outcome of a bulk request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkSummary {
    pub indexed: usize,
    pub failed: usize,

    /// Per-item failure reasons, as reported by the store
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl BulkSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Subset of the `_cluster/health` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterHealth {
    #[serde(default)]
    pub cluster_name: String,

    pub status: ClusterStatus,

    #[serde(default)]
    pub number_of_nodes: u32,

    #[serde(default)]
    pub active_shards: u32,
}

/// Cluster colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ClusterStatus {
    Green,
    Yellow,
    Red,
    #[serde(other)]
    Unknown,
}

/// Overall store health as reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

impl From<ClusterStatus> for HealthStatus {
    fn from(status: ClusterStatus) -> Self {
        match status {
            ClusterStatus::Green => HealthStatus::Healthy,
            ClusterStatus::Yellow => HealthStatus::Degraded,
            ClusterStatus::Red => HealthStatus::Unhealthy,
            ClusterStatus::Unknown => HealthStatus::Unknown,
        }
    }
}
