//! Secondary relevance scoring
//!
//! A transparent ranking independent of the engine score: weighted keyword
//! occurrence counts over title, messages and tags.

use crate::models::ConversationDocument;
use crate::search::config::RelevanceWeights;
use crate::search::matcher::occurrences;
use crate::search::response::SearchHit;

/// Weighted occurrence score of `keyword` in a conversation
pub fn relevance_score(doc: &ConversationDocument, keyword: &str, weights: &RelevanceWeights) -> u64 {
    let count = |text: &str| occurrences(text, keyword) as u64;

    let title = count(doc.display_title());
    let messages: u64 = doc.messages.iter().map(|m| count(m.effective_content())).sum();
    let tags: u64 = doc.tags.iter().map(|t| count(&t.name)).sum();

    title * u64::from(weights.title)
        + messages * u64::from(weights.message)
        + tags * u64::from(weights.tag)
}

/// Score every hit and order by descending score. Equal scores keep their
/// incoming order.
pub fn rank(hits: &mut [SearchHit], keyword: &str, weights: &RelevanceWeights) {
    for hit in hits.iter_mut() {
        hit.relevance = relevance_score(&hit.document, keyword, weights);
    }
    hits.sort_by(|a, b| b.relevance.cmp(&a.relevance));
}
