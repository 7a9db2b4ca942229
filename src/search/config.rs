//! Search configuration

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Weights applied by the secondary relevance scorer to keyword occurrences
/// in each part of a conversation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelevanceWeights {
    /// Weight per occurrence in the title (or source title)
    #[serde(default = "default_title_weight")]
    pub title: u32,

    /// Weight per occurrence in a message
    #[serde(default = "default_message_weight")]
    pub message: u32,

    /// Weight per occurrence in a tag name
    #[serde(default = "default_tag_weight")]
    pub tag: u32,
}

impl Default for RelevanceWeights {
    fn default() -> Self {
        Self {
            title: default_title_weight(),
            message: default_message_weight(),
            tag: default_tag_weight(),
        }
    }
}

/// Hard cap on messages attached to a matched conversation
pub const MAX_MATCHED_MESSAGES: usize = 3;

/// Search service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_page_sizes"))]
pub struct SearchConfig {
    /// Page size used when the caller does not pass one
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1))]
    pub default_page_size: usize,

    /// Largest page size a caller may request
    #[serde(default = "default_max_page_size")]
    #[validate(range(min = 1, max = 100))]
    pub max_page_size: usize,

    /// Maximum characters per highlight fragment
    #[serde(default = "default_fragment_size")]
    #[validate(range(min = 1))]
    pub fragment_size: usize,

    /// Maximum highlight fragments per field
    #[serde(default = "default_number_of_fragments")]
    #[validate(range(min = 1))]
    pub number_of_fragments: usize,

    /// Marker inserted before a highlighted term
    #[serde(default = "default_pre_tag")]
    #[validate(length(min = 1))]
    pub highlight_pre_tag: String,

    /// Marker inserted after a highlighted term
    #[serde(default = "default_post_tag")]
    #[validate(length(min = 1))]
    pub highlight_post_tag: String,

    /// Maximum messages attached to each matched conversation
    #[serde(default = "default_max_matched_messages")]
    #[validate(range(min = 1, max = 3))]
    pub max_matched_messages: usize,

    /// Relevance scorer weights
    #[serde(default)]
    pub weights: RelevanceWeights,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            fragment_size: default_fragment_size(),
            number_of_fragments: default_number_of_fragments(),
            highlight_pre_tag: default_pre_tag(),
            highlight_post_tag: default_post_tag(),
            max_matched_messages: default_max_matched_messages(),
            weights: RelevanceWeights::default(),
        }
    }
}

fn validate_page_sizes(config: &SearchConfig) -> Result<(), ValidationError> {
    if config.default_page_size > config.max_page_size {
        return Err(ValidationError::new("default_page_size_exceeds_max"));
    }
    Ok(())
}

/// Builder for SearchConfig
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    pub fn default_page_size(mut self, size: usize) -> Self {
        self.config.default_page_size = size;
        self
    }

    pub fn max_page_size(mut self, size: usize) -> Self {
        self.config.max_page_size = size;
        self
    }

    pub fn fragment_size(mut self, size: usize) -> Self {
        self.config.fragment_size = size;
        self
    }

    pub fn number_of_fragments(mut self, count: usize) -> Self {
        self.config.number_of_fragments = count;
        self
    }

    pub fn highlight_tags(mut self, pre: impl Into<String>, post: impl Into<String>) -> Self {
        self.config.highlight_pre_tag = pre.into();
        self.config.highlight_post_tag = post.into();
        self
    }

    pub fn max_matched_messages(mut self, max: usize) -> Self {
        self.config.max_matched_messages = max;
        self
    }

    pub fn weights(mut self, weights: RelevanceWeights) -> Self {
        self.config.weights = weights;
        self
    }

    pub fn build(self) -> SearchConfig {
        self.config
    }
}

impl Default for SearchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_title_weight() -> u32 {
    10
}

fn default_message_weight() -> u32 {
    5
}

fn default_tag_weight() -> u32 {
    8
}

fn default_page_size() -> usize {
    10
}

fn default_max_page_size() -> usize {
    100
}

fn default_fragment_size() -> usize {
    150
}

fn default_number_of_fragments() -> usize {
    3
}

fn default_pre_tag() -> String {
    "<mark>".to_string()
}

fn default_post_tag() -> String {
    "</mark>".to_string()
}

fn default_max_matched_messages() -> usize {
    3
}
