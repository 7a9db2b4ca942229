//! Index mappings for conversation documents
//!
//! The conversation mapping is the contract the query builder depends on:
//! every full-text field also carries an `exact` sub-field analyzed with the
//! `keyword` analyzer, which is what the zero-slop phrase tier targets. Dropping
//! the sub-field silently turns exact matching into fuzzy matching.

use serde_json::{json, Value};

/// Field paths used in queries and highlight responses
pub mod fields {
    pub const ID: &str = "id";
    pub const USER_ID: &str = "user_id";
    pub const PROVIDER: &str = "provider";
    pub const CREATED_AT: &str = "created_at";

    pub const TITLE: &str = "title";
    pub const SOURCE_TITLE: &str = "source_title";

    pub const MESSAGES: &str = "messages";
    pub const MESSAGE_CONTENT: &str = "messages.content";
    pub const MESSAGE_SOURCE_CONTENT: &str = "messages.source_content";

    pub const TAGS: &str = "tags";
    pub const TAG_ID: &str = "tags.id";
    pub const TAG_NAME: &str = "tags.name";

    /// Suffix of the keyword-analyzed sub-field
    pub const EXACT_SUFFIX: &str = ".exact";
}

/// A full-text field with `exact` (and optionally `keyword`) sub-fields
fn text_with_exact(with_keyword: bool) -> Value {
    let mut sub_fields = json!({
        "exact": { "type": "text", "analyzer": "keyword" }
    });
    if with_keyword {
        sub_fields["keyword"] = json!({ "type": "keyword", "ignore_above": 256 });
    }

    json!({
        "type": "text",
        "analyzer": "standard",
        "fields": sub_fields
    })
}

fn index_settings() -> Value {
    json!({
        "number_of_shards": 1,
        "number_of_replicas": 0,
        "analysis": {
            "analyzer": {
                "standard": {
                    "type": "standard",
                    "stopwords": "_english_"
                }
            }
        }
    })
}

/// Mapping and settings for the conversation index
pub fn conversation_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                "id": { "type": "keyword" },
                "user_id": { "type": "keyword" },
                "title": text_with_exact(true),
                "source_title": text_with_exact(true),
                "provider": { "type": "keyword" },
                "model": { "type": "keyword" },
                "source_id": { "type": "keyword" },
                "created_at": { "type": "date" },
                "updated_at": { "type": "date" },
                "messages": {
                    "type": "nested",
                    "properties": {
                        "id": { "type": "keyword" },
                        "conversation_id": { "type": "keyword" },
                        "role": { "type": "keyword" },
                        "content": text_with_exact(false),
                        "source_id": { "type": "keyword" },
                        "source_content": text_with_exact(false),
                        "created_at": { "type": "date" },
                        "updated_at": { "type": "date" }
                    }
                },
                "tags": {
                    "type": "nested",
                    "properties": {
                        "id": { "type": "keyword" },
                        "name": text_with_exact(false),
                        "created_at": { "type": "date" },
                        "updated_at": { "type": "date" }
                    }
                }
            }
        },
        "settings": index_settings()
    })
}

/// Mapping for the flat message index kept for per-message lookups
pub fn message_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                "id": { "type": "keyword" },
                "conversation_id": { "type": "keyword" },
                "role": { "type": "keyword" },
                "content": { "type": "text", "analyzer": "standard" },
                "source_id": { "type": "keyword" },
                "source_content": { "type": "text", "analyzer": "standard" },
                "created_at": { "type": "date" },
                "updated_at": { "type": "date" }
            }
        },
        "settings": index_settings()
    })
}
