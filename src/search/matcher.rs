//! Exact keyword matching
//!
//! The engine's fuzzy and cross-field tiers return conversations in which the
//! literal keyword may never occur. This module re-checks every hit against
//! the raw keyword with word-boundary awareness.
//!
//! Word characters are ASCII letters, digits, `_` and every non-ASCII
//! character. A neighbour check is skipped on a side where the keyword's own
//! edge character is CJK, since those scripts are written without spaces.

use crate::models::ConversationDocument;
use crate::search::response::SearchHit;

/// Keywords at or below this many characters only match on word boundaries
const SHORT_KEYWORD_CHARS: usize = 3;

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || !c.is_ascii()
}

/// Ideographs, kana and hangul
fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x1100..=0x11FF
        | 0x3040..=0x30FF
        | 0x3130..=0x318F
        | 0x31F0..=0x31FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xAC00..=0xD7AF
        | 0xF900..=0xFAFF
        | 0x20000..=0x2FA1F
    )
}

/// Count the occurrences of `keyword` in `text` that sit on word boundaries,
/// ignoring case. An empty keyword never occurs.
pub fn occurrences(text: &str, keyword: &str) -> usize {
    let text: Vec<char> = text.to_lowercase().chars().collect();
    let keyword: Vec<char> = keyword.to_lowercase().chars().collect();

    let (first, last) = match (keyword.first(), keyword.last()) {
        (Some(&f), Some(&l)) => (f, l),
        _ => return 0,
    };
    if keyword.len() > text.len() {
        return 0;
    }

    let check_before = !is_cjk(first);
    let check_after = !is_cjk(last);

    (0..=text.len() - keyword.len())
        .filter(|&start| text[start..start + keyword.len()] == keyword[..])
        .filter(|&start| {
            let end = start + keyword.len();
            let before_ok = !check_before || start == 0 || !is_word_char(text[start - 1]);
            let after_ok = !check_after || end == text.len() || !is_word_char(text[end]);
            before_ok && after_ok
        })
        .count()
}

/// Whether `text` contains `keyword`. Short keywords must sit on word
/// boundaries; longer ones only need a case-insensitive substring match.
pub fn contains_keyword(text: &str, keyword: &str) -> bool {
    if keyword.chars().count() <= SHORT_KEYWORD_CHARS {
        occurrences(text, keyword) > 0
    } else {
        text.to_lowercase().contains(&keyword.to_lowercase())
    }
}

/// Whether the title, any message or any tag name contains the keyword.
/// Every conversation matches an empty keyword.
pub fn conversation_matches(doc: &ConversationDocument, keyword: &str) -> bool {
    if keyword.is_empty() {
        return true;
    }

    contains_keyword(doc.display_title(), keyword)
        || doc
            .messages
            .iter()
            .any(|m| contains_keyword(m.effective_content(), keyword))
        || doc.tags.iter().any(|t| contains_keyword(&t.name, keyword))
}

/// Drop hits that do not literally contain the keyword. Returns the survivors
/// in their original order and the number removed.
pub fn filter_exact(hits: Vec<SearchHit>, keyword: &str) -> (Vec<SearchHit>, usize) {
    let before = hits.len();
    let survivors: Vec<SearchHit> = hits
        .into_iter()
        .filter(|hit| conversation_matches(&hit.document, keyword))
        .collect();
    let removed = before - survivors.len();
    (survivors, removed)
}
