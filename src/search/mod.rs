//! Conversation search over an Elasticsearch/OpenSearch document store
//!
//! A search runs as a single pipeline:
//!
//! ```text
//! SearchQuery ──▶ QueryBuilder ──▶ SearchBackend::execute_query ──▶ parse_search_response
//!                                                                        │
//!   SearchResponse ◀── annotate (matched fields, messages) ◀── rank ◀── filter_exact
//! ```
//!
//! - **Query building**: four weighted tiers (exact phrase, fuzzy, all terms,
//!   any term) over titles, nested messages and nested tags, plus filters on
//!   user, provider, tag and creation date
//! - **Exact filtering**: hits that only matched through fuzziness or
//!   stemming are dropped using word-boundary aware matching, CJK included
//! - **Ranking**: weighted keyword occurrence counts, stable on ties
//! - **Annotation**: matched-field lists from highlights and up to three
//!   representative messages per conversation
//!
//! The store sits behind the [`SearchBackend`], [`DocumentIndexer`] and
//! [`IndexAdmin`] traits, implemented by [`ElasticsearchClient`] and by
//! [`InMemoryStore`].
//!
//! # Example
//!
//! ```no_run
//! use chat_history_search::search::{InMemoryStore, SearchConfig, SearchQuery, SearchService};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(InMemoryStore::new());
//!     let search = SearchService::new(store, "conversations", SearchConfig::default());
//!
//!     let query = SearchQuery::new("budget").with_provider("openai").with_limit(20);
//!     let results = search.search(&query).await?;
//!     println!("Found {} conversations", results.total);
//!
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod document;
mod error;
mod health;
mod highlight;
mod index;
mod matcher;
mod memory;
mod query;
mod ranking;
mod response;
mod selection;
mod service;
mod store;
mod sync;

pub use client::ElasticsearchClient;
pub use config::{RelevanceWeights, SearchConfig, SearchConfigBuilder, MAX_MATCHED_MESSAGES};
pub use document::{conversation_mapping, fields, message_mapping};
pub use error::{SearchError, SearchResult};
pub use health::{HealthChecker, HealthReport};
pub use highlight::{extract_matched_fields, MatchedField};
pub use index::{IndexManager, IndexState, IndexStatus};
pub use matcher::{contains_keyword, conversation_matches, filter_exact, occurrences};
pub use memory::InMemoryStore;
pub use query::{DateRange, QueryBuilder, QueryMode, SearchFilter, SearchQuery, Tier};
pub use ranking::{rank, relevance_score};
pub use response::{parse_search_response, Highlights, ParsedResponse, SearchHit};
pub use selection::select_messages;
pub use service::{SearchConversation, SearchMessage, SearchResponse, SearchService, SearchTag};
pub use store::{
    BulkSummary, ClusterHealth, ClusterStatus, DocumentIndexer, HealthStatus, IndexAdmin,
    SearchBackend,
};
pub use sync::{ConversationSource, JsonFileSource, StaticSource, SyncReport, SyncService};
