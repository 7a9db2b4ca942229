//! Shared fixtures for integration tests

#![allow(dead_code)]

use chat_history_search::models::{ConversationDocument, MessageDocument, Role, TagDocument};
use chat_history_search::search::{DocumentIndexer, InMemoryStore, SearchConfig, SearchService};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub const INDEX: &str = "conversations";

/// Builder for test conversations
pub struct ConversationFixture {
    doc: ConversationDocument,
}

impl ConversationFixture {
    pub fn new(title: &str) -> Self {
        Self {
            doc: ConversationDocument::new(Uuid::new_v4(), title),
        }
    }

    pub fn user(mut self, user_id: Uuid) -> Self {
        self.doc.user_id = user_id;
        self
    }

    pub fn provider(mut self, provider: &str) -> Self {
        self.doc.provider = provider.to_string();
        self
    }

    pub fn created_at(mut self, ts: DateTime<Utc>) -> Self {
        self.doc.created_at = ts;
        self.doc.updated_at = ts;
        self
    }

    pub fn message(mut self, content: &str) -> Self {
        let role = if self.doc.messages.len() % 2 == 0 {
            Role::User
        } else {
            Role::Assistant
        };
        self.doc.push_message(MessageDocument::new(role, content));
        self
    }

    pub fn tag(mut self, tag: TagDocument) -> Self {
        self.doc.tags.push(tag);
        self
    }

    pub fn build(self) -> ConversationDocument {
        self.doc
    }
}

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
}

/// Store holding `docs` in the conversation index, plus a service over it
pub async fn seeded_service(docs: &[ConversationDocument]) -> (Arc<InMemoryStore>, SearchService) {
    let store = Arc::new(InMemoryStore::new());
    for doc in docs {
        store.index_document(INDEX, doc).await.unwrap();
    }
    let service = SearchService::new(store.clone(), INDEX, SearchConfig::default());
    (store, service)
}

/// Parse Prometheus exposition format into metric name -> lines
pub fn parse_prometheus_output(output: &str) -> HashMap<String, Vec<String>> {
    let mut metrics = HashMap::new();
    let mut current_metric = String::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with("# HELP") || line.starts_with("# TYPE") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 3 {
                current_metric = parts[2].to_string();
                metrics
                    .entry(current_metric.clone())
                    .or_insert_with(Vec::new)
                    .push(line.to_string());
            }
        } else if !line.starts_with('#') && !current_metric.is_empty() {
            metrics
                .entry(current_metric.clone())
                .or_insert_with(Vec::new)
                .push(line.to_string());
        }
    }

    metrics
}
