//! Matched-message selection

use crate::models::{ConversationDocument, MessageDocument};
use crate::search::matcher::occurrences;

/// Pick up to `max` messages to show for a conversation whose messages
/// matched.
///
/// Messages that contain the keyword come first, in stored order. If fewer
/// than `max` are found, the earliest remaining messages fill the gap.
/// Nothing is selected when no message field was highlighted.
pub fn select_messages<'a>(
    doc: &'a ConversationDocument,
    keyword: &str,
    message_highlighted: bool,
    max: usize,
) -> Vec<&'a MessageDocument> {
    if !message_highlighted || max == 0 {
        return Vec::new();
    }

    let mut picked: Vec<usize> = doc
        .messages
        .iter()
        .enumerate()
        .filter(|(_, m)| occurrences(m.effective_content(), keyword) > 0)
        .map(|(i, _)| i)
        .take(max)
        .collect();

    if picked.len() < max {
        let backfill: Vec<usize> = (0..doc.messages.len())
            .filter(|i| !picked.contains(i))
            .take(max - picked.len())
            .collect();
        picked.extend(backfill);
    }

    picked.into_iter().map(|i| &doc.messages[i]).collect()
}
