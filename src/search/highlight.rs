//! Matched-field extraction from highlight maps

use crate::search::document::fields;
use crate::search::response::Highlights;
use serde::{Deserialize, Serialize};

/// A field that can carry a highlight, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MatchedField {
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "source_title")]
    SourceTitle,
    #[serde(rename = "messages.content")]
    MessageContent,
    #[serde(rename = "messages.source_content")]
    MessageSourceContent,
    #[serde(rename = "tags.name")]
    TagName,
}

impl MatchedField {
    pub const ALL: [MatchedField; 5] = [
        MatchedField::Title,
        MatchedField::SourceTitle,
        MatchedField::MessageContent,
        MatchedField::MessageSourceContent,
        MatchedField::TagName,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MatchedField::Title => fields::TITLE,
            MatchedField::SourceTitle => fields::SOURCE_TITLE,
            MatchedField::MessageContent => fields::MESSAGE_CONTENT,
            MatchedField::MessageSourceContent => fields::MESSAGE_SOURCE_CONTENT,
            MatchedField::TagName => fields::TAG_NAME,
        }
    }

    /// Canonical field for a highlight key; sub-field keys such as
    /// `title.exact` map to their parent
    pub fn from_highlight_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| {
            let name = field.as_str();
            key == name
                || key
                    .strip_prefix(name)
                    .map_or(false, |rest| rest.starts_with('.'))
        })
    }

    pub fn is_message_field(self) -> bool {
        matches!(self, MatchedField::MessageContent | MatchedField::MessageSourceContent)
    }
}

impl std::fmt::Display for MatchedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical matched fields of a highlight map, ordered and deduplicated
pub fn extract_matched_fields(highlights: &Highlights) -> Vec<MatchedField> {
    let mut matched: Vec<MatchedField> = highlights
        .keys()
        .filter_map(|k| MatchedField::from_highlight_key(k))
        .collect();
    matched.sort();
    matched.dedup();
    matched
}

pub fn has_message_match(matched: &[MatchedField]) -> bool {
    matched.iter().any(|f| f.is_message_field())
}

/// Matched fields narrowed to a single message
pub fn message_fields(matched: &[MatchedField]) -> Vec<String> {
    if has_message_match(matched) {
        vec!["content".to_string()]
    } else {
        Vec::new()
    }
}

/// Matched fields narrowed to a single tag
pub fn tag_fields(matched: &[MatchedField]) -> Vec<String> {
    if matched.contains(&MatchedField::TagName) {
        vec!["name".to_string()]
    } else {
        Vec::new()
    }
}
