//! Search query building
//!
//! Turns a [`SearchQuery`] into an Elasticsearch/OpenSearch query body. A
//! non-empty term produces four tiers of weighted `should` clauses, each
//! repeated for the conversation fields, the nested messages and the nested
//! tags:
//!
//! | Tier | Boost | Match                                   |
//! |------|-------|-----------------------------------------|
//! | 1    | 10    | zero-slop phrase on the `.exact` fields |
//! | 2    | 8     | fuzzy best-fields                       |
//! | 3    | 5     | cross-fields, every term required       |
//! | 4    | 2     | best-fields, any term                   |
//!
//! An empty term is a filter-only query: no relevance clauses and no
//! highlighting.

use crate::search::config::SearchConfig;
use crate::search::document::fields;
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Inclusive creation-time range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// Build a range from calendar dates. The start is midnight of its day and
    /// the end is normalized to 23:59:59 of its day.
    pub fn from_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        let start = start.map(|d| d.and_time(NaiveTime::MIN).and_utc());
        let end = end.and_then(|d| d.and_hms_opt(23, 59, 59)).map(|dt| dt.and_utc());
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Whether `ts` falls inside the range, bounds included
    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| *ts >= s) && self.end.map_or(true, |e| *ts <= e)
    }
}

/// Structured filters; none of them affect scoring
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    /// Only conversations owned by this user
    pub user_id: Option<Uuid>,

    /// Only conversations from this provider (openai, claude, gemini, ...)
    pub provider: Option<String>,

    /// Only conversations carrying this tag
    pub tag_id: Option<Uuid>,

    /// Only conversations created inside this range
    pub date_range: DateRange,
}

impl SearchFilter {
    pub fn is_empty(&self) -> bool {
        self.user_id.is_none()
            && self.provider.is_none()
            && self.tag_id.is_none()
            && self.date_range.is_empty()
    }
}

/// Whether a query carries text relevance clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    /// Non-empty term: tiered relevance clauses plus filters
    FullText,
    /// Empty term: filters only
    FilterOnly,
}

/// Main search query structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text term, may be empty
    pub query: String,

    /// Filters to apply
    pub filters: SearchFilter,

    /// 1-based page number
    pub page: usize,

    /// Page size
    pub limit: usize,
}

impl SearchQuery {
    /// Create a new search query for the first page
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            filters: SearchFilter::default(),
            page: 1,
            limit: 10,
        }
    }

    /// A query with no term, matching on filters alone
    pub fn filter_only() -> Self {
        Self::new("")
    }

    pub fn with_filters(mut self, filters: SearchFilter) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.filters.user_id = Some(user_id);
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.filters.provider = Some(provider.into());
        self
    }

    pub fn with_tag(mut self, tag_id: Uuid) -> Self {
        self.filters.tag_id = Some(tag_id);
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.filters.date_range = range;
        self
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// The trimmed term
    pub fn keyword(&self) -> &str {
        self.query.trim()
    }

    pub fn mode(&self) -> QueryMode {
        if self.keyword().is_empty() {
            QueryMode::FilterOnly
        } else {
            QueryMode::FullText
        }
    }
}

/// One of the four relevance tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Zero-slop phrase on the exact sub-fields
    Exact,
    /// Typo-tolerant best-fields
    Fuzzy,
    /// Cross-fields with every term required
    AllTerms,
    /// Best-fields with any term
    AnyTerm,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Exact, Tier::Fuzzy, Tier::AllTerms, Tier::AnyTerm];

    pub fn boost(self) -> f64 {
        match self {
            Tier::Exact => 10.0,
            Tier::Fuzzy => 8.0,
            Tier::AllTerms => 5.0,
            Tier::AnyTerm => 2.0,
        }
    }

    fn match_options(self) -> Value {
        match self {
            Tier::Exact => json!({ "type": "phrase", "slop": 0 }),
            Tier::Fuzzy => json!({ "type": "best_fields", "fuzziness": "AUTO" }),
            Tier::AllTerms => json!({ "type": "cross_fields", "operator": "and" }),
            Tier::AnyTerm => json!({ "type": "best_fields", "operator": "or" }),
        }
    }
}

/// The three places a term can match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldGroup {
    Conversation,
    Messages,
    Tags,
}

impl FieldGroup {
    const ALL: [FieldGroup; 3] = [FieldGroup::Conversation, FieldGroup::Messages, FieldGroup::Tags];

    /// `(field, field boost)` pairs
    fn fields(self) -> &'static [(&'static str, Option<u32>)] {
        match self {
            FieldGroup::Conversation => &[(fields::TITLE, Some(2)), (fields::SOURCE_TITLE, None)],
            FieldGroup::Messages => &[
                (fields::MESSAGE_CONTENT, Some(2)),
                (fields::MESSAGE_SOURCE_CONTENT, None),
            ],
            FieldGroup::Tags => &[(fields::TAG_NAME, None)],
        }
    }

    fn nested_path(self) -> Option<&'static str> {
        match self {
            FieldGroup::Conversation => None,
            FieldGroup::Messages => Some(fields::MESSAGES),
            FieldGroup::Tags => Some(fields::TAGS),
        }
    }

    fn field_list(self, exact: bool) -> Vec<String> {
        self.fields()
            .iter()
            .map(|(name, boost)| {
                let suffix = if exact { fields::EXACT_SUFFIX } else { "" };
                match boost {
                    Some(b) => format!("{name}{suffix}^{b}"),
                    None => format!("{name}{suffix}"),
                }
            })
            .collect()
    }
}

/// Builds engine query bodies from [`SearchQuery`] values
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    config: SearchConfig,
}

impl QueryBuilder {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    /// `(from, size)` for a query, with page clamped to at least 1 and limit
    /// clamped to `1..=max_page_size`. The offset saturates instead of wrapping.
    pub fn pagination(&self, query: &SearchQuery) -> (usize, usize) {
        let size = query.limit.clamp(1, self.config.max_page_size.max(1));
        (query.page.saturating_sub(1).saturating_mul(size), size)
    }

    /// Build the full request body
    pub fn build(&self, query: &SearchQuery) -> Value {
        let (from, size) = self.pagination(query);
        let filters = Self::filter_clauses(&query.filters);

        let mut body = json!({
            "from": from,
            "size": size,
            "track_total_hits": true,
            "sort": [
                { "_score": { "order": "desc" } },
                { (fields::CREATED_AT): { "order": "desc" } }
            ]
        });

        match query.mode() {
            QueryMode::FullText => {
                body["query"] = json!({
                    "bool": {
                        "filter": filters,
                        "should": Self::relevance_clauses(query.keyword()),
                        "minimum_should_match": 1
                    }
                });
                body["highlight"] = self.highlight();
            }
            QueryMode::FilterOnly if filters.is_empty() => {
                body["query"] = json!({ "match_all": {} });
            }
            QueryMode::FilterOnly => {
                body["query"] = json!({ "bool": { "filter": filters } });
            }
        }

        body
    }

    fn filter_clauses(filter: &SearchFilter) -> Vec<Value> {
        let mut clauses = Vec::new();

        if let Some(user_id) = filter.user_id {
            clauses.push(json!({ "term": { (fields::USER_ID): user_id.to_string() } }));
        }

        if let Some(ref provider) = filter.provider {
            clauses.push(json!({ "term": { (fields::PROVIDER): provider } }));
        }

        if let Some(tag_id) = filter.tag_id {
            clauses.push(json!({
                "nested": {
                    "path": fields::TAGS,
                    "query": { "term": { (fields::TAG_ID): tag_id.to_string() } }
                }
            }));
        }

        if !filter.date_range.is_empty() {
            let mut range = serde_json::Map::new();
            if let Some(start) = filter.date_range.start {
                range.insert("gte".to_string(), json!(format_timestamp(&start)));
            }
            if let Some(end) = filter.date_range.end {
                range.insert("lte".to_string(), json!(format_timestamp(&end)));
            }
            clauses.push(json!({ "range": { (fields::CREATED_AT): range } }));
        }

        clauses
    }

    /// The 12 weighted clauses: 4 tiers x 3 field groups
    pub fn relevance_clauses(keyword: &str) -> Vec<Value> {
        let mut clauses = Vec::with_capacity(Tier::ALL.len() * FieldGroup::ALL.len());

        for tier in Tier::ALL {
            for group in FieldGroup::ALL {
                let mut multi_match = json!({
                    "query": keyword,
                    "fields": group.field_list(tier == Tier::Exact),
                    "boost": tier.boost()
                });
                if let (Some(target), Some(options)) =
                    (multi_match.as_object_mut(), tier.match_options().as_object())
                {
                    target.extend(options.clone());
                }

                let clause = json!({ "multi_match": multi_match });
                clauses.push(match group.nested_path() {
                    Some(path) => json!({
                        "nested": { "path": path, "query": clause, "score_mode": "max" }
                    }),
                    None => clause,
                });
            }
        }

        clauses
    }

    fn highlight(&self) -> Value {
        let options = json!({
            "fragment_size": self.config.fragment_size,
            "number_of_fragments": self.config.number_of_fragments
        });

        let mut highlight_fields = serde_json::Map::new();
        for field in [
            fields::TITLE,
            fields::SOURCE_TITLE,
            fields::MESSAGE_CONTENT,
            fields::MESSAGE_SOURCE_CONTENT,
            fields::TAG_NAME,
        ] {
            highlight_fields.insert(field.to_string(), options.clone());
        }

        json!({
            "fields": highlight_fields,
            "pre_tags": [self.config.highlight_pre_tag],
            "post_tags": [self.config.highlight_post_tag]
        })
    }
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
