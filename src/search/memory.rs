//! In-memory document store
//!
//! Evaluates the query DSL subset produced by
//! [`QueryBuilder`](crate::search::QueryBuilder): `match_all`, `bool` with
//! `filter`/`must`/`must_not`/`should`, `term`, `range`, `nested` and
//! `multi_match` (`phrase`, `best_fields`, `cross_fields`, `AUTO` fuzziness).
//! Text analysis is approximated by lower-cased alphanumeric tokens, with
//! each CJK character as its own token; `.exact` sub-fields are read from
//! their parent field. Scores are the sum of matching clause boosts.

use crate::models::{ConversationDocument, MessageDocument};
use crate::search::error::{SearchError, SearchResult};
use crate::search::store::{
    BulkSummary, ClusterHealth, ClusterStatus, DocumentIndexer, IndexAdmin, SearchBackend,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Matched document tokens per field path, used for highlighting
type Matches = HashMap<String, HashSet<String>>;

/// Documents are keyed in id order so equal-scored hits page reproducibly
#[derive(Debug, Clone, Default)]
struct IndexData {
    settings: Value,
    docs: BTreeMap<Uuid, ConversationDocument>,
}

/// In-memory store (for local runs and testing)
#[derive(Clone)]
pub struct InMemoryStore {
    indices: Arc<DashMap<String, IndexData>>,
    cluster_status: Arc<RwLock<ClusterStatus>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            indices: Arc::new(DashMap::new()),
            cluster_status: Arc::new(RwLock::new(ClusterStatus::Green)),
        }
    }

    /// Status reported by the next cluster health request
    pub fn set_cluster_status(&self, status: ClusterStatus) {
        *self.cluster_status.write() = status;
    }

    pub fn document(&self, index: &str, id: Uuid) -> Option<ConversationDocument> {
        self.indices
            .get(index)
            .and_then(|data| data.docs.get(&id).cloned())
    }

    /// Number of documents in `index`
    pub fn count(&self, index: &str) -> usize {
        self.indices.get(index).map_or(0, |data| data.docs.len())
    }

    /// Settings and mappings body the index was created with
    pub fn index_settings(&self, index: &str) -> Option<Value> {
        self.indices.get(index).map(|data| data.settings.clone())
    }

    fn with_doc<F>(&self, index: &str, id: Uuid, f: F) -> SearchResult<()>
    where
        F: FnOnce(&mut ConversationDocument),
    {
        let mut data = self
            .indices
            .get_mut(index)
            .ok_or_else(|| SearchError::IndexNotFound(index.to_string()))?;
        let doc = data
            .docs
            .get_mut(&id)
            .ok_or_else(|| SearchError::IndexingFailed(format!("document {} not found", id)))?;
        f(doc);
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchBackend for InMemoryStore {
    async fn execute_query(&self, index: &str, body: &Value) -> SearchResult<Value> {
        let data = self
            .indices
            .get(index)
            .ok_or_else(|| SearchError::IndexNotFound(index.to_string()))?;

        let query = body.get("query").cloned().unwrap_or_else(|| json!({ "match_all": {} }));
        let highlight = body.get("highlight");

        let mut scored = Vec::new();
        for doc in data.docs.values() {
            let source = serde_json::to_value(doc)?;
            let mut matches = Matches::new();
            if let Some(score) = eval(&query, &source, &mut matches) {
                scored.push((score, doc.created_at, source, matches));
            }
        }
        drop(data);

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.1.cmp(&a.1))
        });

        let total = scored.len();
        let from = body.get("from").and_then(Value::as_u64).unwrap_or(0) as usize;
        let size = body.get("size").and_then(Value::as_u64).unwrap_or(10) as usize;
        let max_score = scored.first().map(|s| s.0);

        let hits: Vec<Value> = scored
            .into_iter()
            .skip(from)
            .take(size)
            .map(|(score, _, source, matches)| {
                let mut hit = json!({
                    "_index": index,
                    "_id": source.get("id").cloned().unwrap_or(Value::Null),
                    "_score": score,
                    "_source": source,
                });
                if let Some(spec) = highlight {
                    let fragments = build_highlight(spec, &hit["_source"], &matches);
                    if !fragments.is_empty() {
                        hit["highlight"] = Value::Object(fragments);
                    }
                }
                hit
            })
            .collect();

        debug!(index, total, returned = hits.len(), "Executed in-memory query");

        Ok(json!({
            "took": 0,
            "timed_out": false,
            "hits": {
                "total": { "value": total, "relation": "eq" },
                "max_score": max_score,
                "hits": hits
            }
        }))
    }
}

#[async_trait]
impl DocumentIndexer for InMemoryStore {
    async fn index_document(&self, index: &str, doc: &ConversationDocument) -> SearchResult<()> {
        self.indices
            .entry(index.to_string())
            .or_default()
            .docs
            .insert(doc.id, doc.clone());
        Ok(())
    }

    async fn update_document(&self, index: &str, doc: &ConversationDocument) -> SearchResult<()> {
        self.with_doc(index, doc.id, |stored| {
            stored.user_id = doc.user_id;
            stored.title = doc.title.clone();
            stored.provider = doc.provider.clone();
            stored.model = doc.model.clone();
            stored.source_id = doc.source_id.clone();
            stored.source_title = doc.source_title.clone();
            stored.created_at = doc.created_at;
            stored.updated_at = doc.updated_at;
        })
    }

    async fn delete_document(&self, index: &str, id: Uuid) -> SearchResult<()> {
        let mut data = self
            .indices
            .get_mut(index)
            .ok_or_else(|| SearchError::IndexNotFound(index.to_string()))?;
        data.docs
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| SearchError::IndexingFailed(format!("document {} not found", id)))
    }

    async fn bulk_index(&self, index: &str, docs: &[ConversationDocument]) -> SearchResult<BulkSummary> {
        let mut data = self.indices.entry(index.to_string()).or_default();
        for doc in docs {
            data.docs.insert(doc.id, doc.clone());
        }
        Ok(BulkSummary {
            indexed: docs.len(),
            ..Default::default()
        })
    }

    async fn document_exists(&self, index: &str, id: Uuid) -> SearchResult<bool> {
        Ok(self
            .indices
            .get(index)
            .map_or(false, |data| data.docs.contains_key(&id)))
    }

    async fn add_message(
        &self,
        index: &str,
        conversation_id: Uuid,
        message: &MessageDocument,
    ) -> SearchResult<()> {
        self.with_doc(index, conversation_id, |doc| doc.messages.push(message.clone()))
    }

    async fn update_message(
        &self,
        index: &str,
        conversation_id: Uuid,
        message: &MessageDocument,
    ) -> SearchResult<()> {
        self.with_doc(index, conversation_id, |doc| {
            if let Some(existing) = doc.messages.iter_mut().find(|m| m.id == message.id) {
                *existing = message.clone();
            }
        })
    }

    async fn remove_message(
        &self,
        index: &str,
        conversation_id: Uuid,
        message_id: Uuid,
    ) -> SearchResult<()> {
        self.with_doc(index, conversation_id, |doc| {
            doc.messages.retain(|m| m.id != message_id)
        })
    }
}

#[async_trait]
impl IndexAdmin for InMemoryStore {
    async fn ping(&self) -> SearchResult<bool> {
        Ok(true)
    }

    async fn cluster_health(&self) -> SearchResult<ClusterHealth> {
        Ok(ClusterHealth {
            cluster_name: "in-memory".to_string(),
            status: *self.cluster_status.read(),
            number_of_nodes: 1,
            active_shards: self.indices.len() as u32,
        })
    }

    async fn index_exists(&self, index: &str) -> SearchResult<bool> {
        Ok(self.indices.contains_key(index))
    }

    async fn create_index(&self, index: &str, body: &Value) -> SearchResult<()> {
        if self.indices.contains_key(index) {
            return Err(SearchError::IndexInitFailed(format!(
                "{}: resource_already_exists_exception",
                index
            )));
        }
        self.indices.insert(
            index.to_string(),
            IndexData {
                settings: body.clone(),
                docs: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> SearchResult<()> {
        self.indices
            .remove(index)
            .map(|_| ())
            .ok_or_else(|| SearchError::IndexNotFound(index.to_string()))
    }
}

/// Evaluate a query clause against `scope`. `None` means no match.
fn eval(query: &Value, scope: &Value, matches: &mut Matches) -> Option<f64> {
    let (kind, spec) = query.as_object()?.iter().next()?;
    match kind.as_str() {
        "match_all" => Some(1.0),
        "bool" => eval_bool(spec, scope, matches),
        "term" => eval_term(spec, scope),
        "range" => eval_range(spec, scope),
        "nested" => eval_nested(spec, scope, matches),
        "multi_match" => eval_multi_match(spec, scope, matches),
        other => {
            warn!(clause = other, "Unsupported query clause in in-memory store");
            None
        }
    }
}

fn clauses<'a>(spec: &'a Value, key: &str) -> Vec<&'a Value> {
    match spec.get(key) {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(item @ Value::Object(_)) => vec![item],
        _ => Vec::new(),
    }
}

fn eval_bool(spec: &Value, scope: &Value, matches: &mut Matches) -> Option<f64> {
    let filter = clauses(spec, "filter");
    let must = clauses(spec, "must");
    let should = clauses(spec, "should");

    for clause in &filter {
        eval(clause, scope, &mut Matches::new())?;
    }

    let mut score = 0.0;
    for clause in &must {
        score += eval(clause, scope, matches)?;
    }

    for clause in clauses(spec, "must_not") {
        if eval(clause, scope, &mut Matches::new()).is_some() {
            return None;
        }
    }

    let default_minimum = usize::from(!should.is_empty() && filter.is_empty() && must.is_empty());
    let minimum = spec
        .get("minimum_should_match")
        .and_then(Value::as_u64)
        .map_or(default_minimum, |n| n as usize);

    let mut matched = 0;
    for clause in &should {
        let mut local = Matches::new();
        if let Some(s) = eval(clause, scope, &mut local) {
            matched += 1;
            score += s;
            for (field, tokens) in local {
                matches.entry(field).or_default().extend(tokens);
            }
        }
    }

    (matched >= minimum).then_some(score)
}

/// All values at a dotted path, flattening arrays on the way
fn resolve<'a>(scope: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![scope];
    for part in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            match value.get(part) {
                Some(Value::Array(items)) => next.extend(items.iter()),
                Some(v) => next.push(v),
                None => {}
            }
        }
        current = next;
    }
    current
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn eval_term(spec: &Value, scope: &Value) -> Option<f64> {
    let (field, expected) = spec.as_object()?.iter().next()?;
    let expected = expected.get("value").unwrap_or(expected);
    let expected = as_text(expected)?;

    resolve(scope, field)
        .into_iter()
        .any(|v| as_text(v).as_deref() == Some(expected.as_str()))
        .then_some(1.0)
}

fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn eval_range(spec: &Value, scope: &Value) -> Option<f64> {
    let (field, bounds) = spec.as_object()?.iter().next()?;
    let bound = |key: &str| bounds.get(key).and_then(parse_date);
    let (gte, gt, lte, lt) = (bound("gte"), bound("gt"), bound("lte"), bound("lt"));

    resolve(scope, field)
        .into_iter()
        .filter_map(parse_date)
        .any(|ts| {
            gte.map_or(true, |b| ts >= b)
                && gt.map_or(true, |b| ts > b)
                && lte.map_or(true, |b| ts <= b)
                && lt.map_or(true, |b| ts < b)
        })
        .then_some(1.0)
}

fn eval_nested(spec: &Value, scope: &Value, matches: &mut Matches) -> Option<f64> {
    let path = spec.get("path")?.as_str()?;
    let query = spec.get("query")?;

    let mut best: Option<f64> = None;
    for element in resolve(scope, path) {
        let wrapped = json!({ path: element });
        let mut local = Matches::new();
        if let Some(score) = eval(query, &wrapped, &mut local) {
            best = Some(best.map_or(score, |b: f64| b.max(score)));
            for (field, tokens) in local {
                matches.entry(field).or_default().extend(tokens);
            }
        }
    }
    best
}

fn is_cjk(c: char) -> bool {
    matches!(c as u32, 0x3040..=0x30FF | 0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xAC00..=0xD7AF)
}

/// `(byte start, byte end, lower-cased token)` for each token in `text`
fn token_spans(text: &str) -> Vec<(usize, usize, String)> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in text.char_indices() {
        if is_cjk(c) {
            if let Some(s) = start.take() {
                spans.push((s, i, text[s..i].to_lowercase()));
            }
            spans.push((i, i + c.len_utf8(), c.to_lowercase().collect()));
        } else if c.is_alphanumeric() {
            start.get_or_insert(i);
        } else if let Some(s) = start.take() {
            spans.push((s, i, text[s..i].to_lowercase()));
        }
    }
    if let Some(s) = start {
        spans.push((s, text.len(), text[s..].to_lowercase()));
    }
    spans
}

fn tokens(text: &str) -> Vec<String> {
    token_spans(text).into_iter().map(|(_, _, t)| t).collect()
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut row = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            row[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(row[j] + 1);
        }
        prev = row;
    }
    prev[b.len()]
}

/// Edit distance allowed by `AUTO` fuzziness
fn auto_edits(term: &str) -> usize {
    match term.chars().count() {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}

fn token_matches(query: &str, doc: &str, fuzzy: bool) -> bool {
    query == doc || (fuzzy && levenshtein(query, doc) <= auto_edits(query))
}

/// `(data path, field boost)` from a `name^boost` entry
fn parse_field(entry: &str) -> (String, f64) {
    let (name, boost) = match entry.split_once('^') {
        Some((name, boost)) => (name, boost.parse().unwrap_or(1.0)),
        None => (entry, 1.0),
    };
    let name = name
        .strip_suffix(crate::search::document::fields::EXACT_SUFFIX)
        .unwrap_or(name);
    (name.to_string(), boost)
}

fn eval_multi_match(spec: &Value, scope: &Value, matches: &mut Matches) -> Option<f64> {
    let query_tokens = tokens(spec.get("query")?.as_str()?);
    if query_tokens.is_empty() {
        return None;
    }

    let kind = spec.get("type").and_then(Value::as_str).unwrap_or("best_fields");
    let all_required = spec
        .get("operator")
        .and_then(Value::as_str)
        .map_or(false, |op| op.eq_ignore_ascii_case("and"));
    let fuzzy = spec.get("fuzziness").is_some();
    let boost = spec.get("boost").and_then(Value::as_f64).unwrap_or(1.0);

    let fields: Vec<(String, f64)> = spec
        .get("fields")?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .map(parse_field)
        .collect();

    // Per field, which query tokens matched and through which document tokens
    let mut field_hits: Vec<(String, f64, HashSet<usize>, HashSet<String>)> = Vec::new();
    for (field, field_boost) in &fields {
        let mut matched_query = HashSet::new();
        let mut matched_doc = HashSet::new();

        for text in resolve(scope, field).into_iter().filter_map(as_text) {
            let doc_tokens = tokens(&text);
            if kind == "phrase" {
                let n = query_tokens.len();
                if doc_tokens.windows(n).any(|w| w == &query_tokens[..]) {
                    matched_query.extend(0..n);
                    matched_doc.extend(query_tokens.iter().cloned());
                }
            } else {
                for (qi, q) in query_tokens.iter().enumerate() {
                    for d in doc_tokens.iter().filter(|d| token_matches(q, d, fuzzy)) {
                        matched_query.insert(qi);
                        matched_doc.insert(d.clone());
                    }
                }
            }
        }

        if !matched_query.is_empty() {
            field_hits.push((field.clone(), *field_boost, matched_query, matched_doc));
        }
    }

    let accepted: Vec<&(String, f64, HashSet<usize>, HashSet<String>)> = match kind {
        "phrase" => field_hits.iter().collect(),
        "cross_fields" => {
            let covered: HashSet<usize> = field_hits.iter().flat_map(|h| h.2.iter().copied()).collect();
            let ok = if all_required {
                covered.len() == query_tokens.len()
            } else {
                !covered.is_empty()
            };
            if ok {
                field_hits.iter().collect()
            } else {
                Vec::new()
            }
        }
        _ => field_hits
            .iter()
            .filter(|h| !all_required || h.2.len() == query_tokens.len())
            .collect(),
    };

    let best = accepted.iter().map(|h| h.1).fold(None, |acc: Option<f64>, b| {
        Some(acc.map_or(b, |a| a.max(b)))
    })?;

    for (field, _, _, doc_tokens) in accepted {
        matches
            .entry(field.clone())
            .or_default()
            .extend(doc_tokens.iter().cloned());
    }

    Some(boost * best)
}

/// Highlight fragments for the requested fields that matched
fn build_highlight(spec: &Value, source: &Value, matches: &Matches) -> Map<String, Value> {
    let pre = spec
        .get("pre_tags")
        .and_then(|t| t.get(0))
        .and_then(Value::as_str)
        .unwrap_or("<em>");
    let post = spec
        .get("post_tags")
        .and_then(|t| t.get(0))
        .and_then(Value::as_str)
        .unwrap_or("</em>");

    let mut out = Map::new();
    let Some(requested) = spec.get("fields").and_then(Value::as_object) else {
        return out;
    };

    for (field, options) in requested {
        let Some(matched) = matches.get(field).filter(|m| !m.is_empty()) else {
            continue;
        };
        let fragment_size = options
            .get("fragment_size")
            .and_then(Value::as_u64)
            .unwrap_or(100) as usize;
        let max_fragments = options
            .get("number_of_fragments")
            .and_then(Value::as_u64)
            .unwrap_or(5) as usize;

        let fragments: Vec<Value> = resolve(source, field)
            .into_iter()
            .filter_map(as_text)
            .filter_map(|text| fragment(&text, matched, fragment_size, pre, post))
            .take(max_fragments)
            .map(Value::String)
            .collect();

        if !fragments.is_empty() {
            out.insert(field.clone(), Value::Array(fragments));
        }
    }
    out
}

/// A window of at most `size` characters around the first matched token,
/// with every matched token wrapped in `pre`/`post`
fn fragment(text: &str, matched: &HashSet<String>, size: usize, pre: &str, post: &str) -> Option<String> {
    let spans = token_spans(text);
    let first = spans.iter().find(|(_, _, t)| matched.contains(t))?;

    let char_starts: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let first_char = char_starts.iter().position(|&i| i == first.0).unwrap_or(0);
    let window_start_char = first_char.saturating_sub(size / 4);
    let window_start = char_starts.get(window_start_char).copied().unwrap_or(0);
    let window_end = char_starts
        .get(window_start_char + size)
        .copied()
        .unwrap_or(text.len());

    let mut out = String::new();
    let mut cursor = window_start;
    for (start, end, token) in spans {
        if start < window_start || end > window_end || !matched.contains(&token) {
            continue;
        }
        out.push_str(&text[cursor..start]);
        out.push_str(pre);
        out.push_str(&text[start..end]);
        out.push_str(post);
        cursor = end;
    }
    out.push_str(&text[cursor..window_end]);
    Some(out)
}
