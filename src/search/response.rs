//! Search response parsing

use crate::models::ConversationDocument;
use crate::search::error::{SearchError, SearchResult};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Highlight fragments keyed by field name
pub type Highlights = HashMap<String, Vec<String>>;

/// One decoded result entry
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub document: ConversationDocument,

    /// Fragments per field; empty when no field was highlighted
    pub highlights: Highlights,

    /// Engine score, informational only
    pub engine_score: Option<f64>,

    /// Secondary relevance score computed by the ranker
    pub relevance: u64,
}

impl SearchHit {
    pub fn new(document: ConversationDocument) -> Self {
        Self {
            document,
            highlights: Highlights::new(),
            engine_score: None,
            relevance: 0,
        }
    }

    pub fn with_highlights(mut self, highlights: Highlights) -> Self {
        self.highlights = highlights;
        self
    }
}

/// Decoded search response
#[derive(Debug, Clone, Default)]
pub struct ParsedResponse {
    pub hits: Vec<SearchHit>,

    /// Engine-reported total, before any local filtering
    pub total: u64,

    /// Entries that failed to decode and were dropped
    pub skipped: usize,
}

/// The engine reports totals as a bare number (older versions) or as an
/// object with a `value`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Total {
    Count(u64),
    Object { value: u64 },
}

impl Total {
    fn value(&self) -> u64 {
        match self {
            Total::Count(n) | Total::Object { value: n } => *n,
        }
    }
}

/// Parse a raw search response.
///
/// A missing `hits`, `hits.total` or `hits.hits` is a decode error. Entries
/// whose `_source` does not decode are skipped with a warning and counted in
/// [`ParsedResponse::skipped`]; the total is left as reported.
pub fn parse_search_response(raw: &Value) -> SearchResult<ParsedResponse> {
    let hits = raw
        .get("hits")
        .ok_or_else(|| SearchError::Decode("response has no hits object".to_string()))?;

    let total = hits
        .get("total")
        .ok_or_else(|| SearchError::Decode("response has no hits.total".to_string()))?;
    let total = Total::deserialize(total)
        .map_err(|e| SearchError::Decode(format!("invalid hits.total: {}", e)))?
        .value();

    let entries = hits
        .get("hits")
        .and_then(Value::as_array)
        .ok_or_else(|| SearchError::Decode("response has no hits.hits array".to_string()))?;

    let mut parsed = ParsedResponse {
        hits: Vec::with_capacity(entries.len()),
        total,
        skipped: 0,
    };

    for entry in entries {
        match parse_entry(entry) {
            Ok(hit) => parsed.hits.push(hit),
            Err(e) => {
                let id = entry.get("_id").and_then(Value::as_str).unwrap_or("<none>");
                warn!(id = %id, error = %e, "Skipping undecodable search hit");
                parsed.skipped += 1;
            }
        }
    }

    debug!(
        total = parsed.total,
        decoded = parsed.hits.len(),
        skipped = parsed.skipped,
        "Parsed search response"
    );

    Ok(parsed)
}

fn parse_entry(entry: &Value) -> SearchResult<SearchHit> {
    let source = entry
        .get("_source")
        .ok_or_else(|| SearchError::Decode("hit has no _source".to_string()))?;
    let document = ConversationDocument::deserialize(source)?;

    let highlights = match entry.get("highlight") {
        Some(h) => Highlights::deserialize(h)?,
        None => Highlights::new(),
    };

    Ok(SearchHit {
        document,
        highlights,
        engine_score: entry.get("_score").and_then(Value::as_f64),
        relevance: 0,
    })
}
