//! Main search service implementation

use crate::metrics::{
    SEARCH_DURATION_SECONDS, SEARCH_ENTRIES_SKIPPED_TOTAL, SEARCH_HITS_FILTERED_TOTAL,
    SEARCH_REQUESTS_TOTAL,
};
use crate::models::{ConversationDocument, MessageDocument, Role, TagDocument};
use crate::search::config::{SearchConfig, MAX_MATCHED_MESSAGES};
use crate::search::error::SearchResult;
use crate::search::highlight::{extract_matched_fields, has_message_match, message_fields, tag_fields, MatchedField};
use crate::search::matcher::filter_exact;
use crate::search::query::{QueryBuilder, QueryMode, SearchQuery};
use crate::search::ranking::rank;
use crate::search::response::{parse_search_response, SearchHit};
use crate::search::selection::select_messages;
use crate::search::store::{BulkSummary, DocumentIndexer, SearchBackend};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};
use uuid::Uuid;

/// A message attached to a search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: Role,

    /// Content, or the source content when the content is empty
    pub content: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_content: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// `["content"]` when a message field matched
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_fields: Vec<String>,
}

impl SearchMessage {
    fn from_document(doc: &MessageDocument, matched_fields: Vec<String>) -> Self {
        Self {
            id: doc.id,
            conversation_id: doc.conversation_id,
            role: doc.role,
            content: doc.effective_content().to_string(),
            source_id: doc.source_id.clone(),
            source_content: doc.source_content.clone(),
            created_at: doc.created_at,
            updated_at: doc.updated_at,
            matched_fields,
        }
    }
}

/// A tag attached to a search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchTag {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// `["name"]` when a tag name matched
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_fields: Vec<String>,
}

impl SearchTag {
    fn from_document(doc: &TagDocument, matched_fields: Vec<String>) -> Self {
        Self {
            id: doc.id,
            name: doc.name.clone(),
            created_at: doc.created_at,
            updated_at: doc.updated_at,
            matched_fields,
        }
    }
}

/// A matched conversation with its annotations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConversation {
    pub id: Uuid,
    pub user_id: Uuid,

    /// Title, or the source title when the title is empty
    pub title: String,

    pub provider: String,
    pub model: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_title: String,

    pub tags: Vec<SearchTag>,

    /// Up to `max_matched_messages` messages, empty when no message matched
    pub messages: Vec<SearchMessage>,

    /// Canonical fields that carried a highlight
    pub matched_fields: Vec<MatchedField>,

    /// Secondary relevance score
    pub score: u64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Search response with results and metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Trimmed search term, echoed for client-side highlighting
    pub query: String,

    /// Ranked results for the requested page
    pub conversations: Vec<SearchConversation>,

    /// Total reported by the store, before the exact-match filter
    pub total: u64,

    /// Hits on this page removed by the exact-match filter
    pub filtered_out: usize,

    /// Entries on this page that could not be decoded
    pub skipped: usize,

    /// Page actually served
    pub page: usize,

    /// Page size actually used
    pub limit: usize,

    /// Search execution time in milliseconds
    pub search_time_ms: u64,
}

/// Main search service
#[derive(Clone)]
pub struct SearchService {
    backend: Arc<dyn SearchBackend>,
    indexer: Arc<dyn DocumentIndexer>,
    query_builder: QueryBuilder,
    index: String,
    config: SearchConfig,
}

impl SearchService {
    /// Create a search service over `store`, searching `index`
    pub fn new<S>(store: Arc<S>, index: impl Into<String>, config: SearchConfig) -> Self
    where
        S: SearchBackend + DocumentIndexer + 'static,
    {
        Self {
            backend: store.clone(),
            indexer: store,
            query_builder: QueryBuilder::new(config.clone()),
            index: index.into(),
            config,
        }
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search conversations.
    ///
    /// Issues exactly one store request. Hits that do not literally contain
    /// the term are dropped, survivors are re-ranked by
    /// [`relevance_score`](crate::search::relevance_score) and annotated with
    /// their matched fields and up to `max_matched_messages` messages.
    pub async fn search(&self, query: &SearchQuery) -> SearchResult<SearchResponse> {
        let start_time = Instant::now();
        let mode = query.mode();
        let mode_label = match mode {
            QueryMode::FullText => "full_text",
            QueryMode::FilterOnly => "filter_only",
        };
        let keyword = query.keyword();
        let (from, limit) = self.query_builder.pagination(query);

        let body = self.query_builder.build(query);
        debug!(query = %keyword, mode = mode_label, from, limit, "Executing search");

        let raw = match self.backend.execute_query(&self.index, &body).await {
            Ok(raw) => raw,
            Err(e) => {
                SEARCH_REQUESTS_TOTAL.with_label_values(&[mode_label, "error"]).inc();
                error!(query = %keyword, index = %self.index, error = %e, "Search request failed");
                return Err(e);
            }
        };

        let parsed = match parse_search_response(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                SEARCH_REQUESTS_TOTAL.with_label_values(&[mode_label, "error"]).inc();
                error!(query = %keyword, error = %e, "Failed to decode search response");
                return Err(e);
            }
        };

        let (mut hits, filtered_out) = filter_exact(parsed.hits, keyword);
        if mode == QueryMode::FullText {
            rank(&mut hits, keyword, &self.config.weights);
        }

        let conversations: Vec<SearchConversation> =
            hits.iter().map(|hit| self.annotate(hit, keyword)).collect();

        let elapsed = start_time.elapsed();
        SEARCH_REQUESTS_TOTAL.with_label_values(&[mode_label, "success"]).inc();
        SEARCH_DURATION_SECONDS.observe(elapsed.as_secs_f64());
        SEARCH_HITS_FILTERED_TOTAL.inc_by(filtered_out as f64);
        SEARCH_ENTRIES_SKIPPED_TOTAL.inc_by(parsed.skipped as f64);

        info!(
            query = %keyword,
            mode = mode_label,
            total = parsed.total,
            returned = conversations.len(),
            filtered_out,
            skipped = parsed.skipped,
            elapsed_ms = elapsed.as_millis() as u64,
            "Search completed"
        );

        Ok(SearchResponse {
            query: keyword.to_string(),
            conversations,
            total: parsed.total,
            filtered_out,
            skipped: parsed.skipped,
            page: from / limit + 1,
            limit,
            search_time_ms: elapsed.as_millis() as u64,
        })
    }

    fn annotate(&self, hit: &SearchHit, keyword: &str) -> SearchConversation {
        let doc = &hit.document;
        let matched = extract_matched_fields(&hit.highlights);

        let messages = select_messages(
            doc,
            keyword,
            has_message_match(&matched),
            self.config.max_matched_messages.min(MAX_MATCHED_MESSAGES),
        )
        .into_iter()
        .map(|m| SearchMessage::from_document(m, message_fields(&matched)))
        .collect();

        let tags = doc
            .tags
            .iter()
            .map(|t| SearchTag::from_document(t, tag_fields(&matched)))
            .collect();

        debug!(
            conversation_id = %doc.id,
            score = hit.relevance,
            matched_fields = ?matched,
            "Annotated search hit"
        );

        SearchConversation {
            id: doc.id,
            user_id: doc.user_id,
            title: doc.display_title().to_string(),
            provider: doc.provider.clone(),
            model: doc.model.clone(),
            source_id: doc.source_id.clone(),
            source_title: doc.source_title.clone(),
            tags,
            messages,
            matched_fields: matched,
            score: hit.relevance,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }

    /// Index a conversation
    pub async fn index_conversation(&self, doc: &ConversationDocument) -> SearchResult<()> {
        self.indexer.index_document(&self.index, doc).await
    }

    /// Index many conversations in one request
    pub async fn index_conversations(&self, docs: &[ConversationDocument]) -> SearchResult<BulkSummary> {
        self.indexer.bulk_index(&self.index, docs).await
    }

    /// Update conversation-level fields
    pub async fn update_conversation(&self, doc: &ConversationDocument) -> SearchResult<()> {
        self.indexer.update_document(&self.index, doc).await
    }

    pub async fn delete_conversation(&self, id: Uuid) -> SearchResult<()> {
        self.indexer.delete_document(&self.index, id).await
    }

    pub async fn conversation_exists(&self, id: Uuid) -> SearchResult<bool> {
        self.indexer.document_exists(&self.index, id).await
    }

    pub async fn add_message(&self, conversation_id: Uuid, message: &MessageDocument) -> SearchResult<()> {
        self.indexer.add_message(&self.index, conversation_id, message).await
    }

    pub async fn update_message(&self, conversation_id: Uuid, message: &MessageDocument) -> SearchResult<()> {
        self.indexer.update_message(&self.index, conversation_id, message).await
    }

    pub async fn remove_message(&self, conversation_id: Uuid, message_id: Uuid) -> SearchResult<()> {
        self.indexer.remove_message(&self.index, conversation_id, message_id).await
    }
}
