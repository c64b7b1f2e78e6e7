//! Description extraction: whatever is left of the message once every consumed
//! token is gone.

use crate::core::{
    amount::strip_installments,
    normalize::{collapse_whitespace, keyword_profile},
};
use regex::Regex;
use std::sync::OnceLock;

/// Used when nothing meaningful is left.
pub const PLACEHOLDER_DESCRIPTION: &str = "General Entry";

const CURRENCY_WORDS: &[&str] = &[
    "reais", "real", "r", "dollars", "dollar", "bucks", "usd", "brl", "euros", "euro",
];

const STOP_WORDS: &[&str] = &[
    "on", "at", "in", "of", "for", "with", "to", "from", "the", "a", "an", "my", "via", "by",
    "using",
];

const LOWERCASE_IN_TITLE: &[&str] = &["and", "or", "de", "da", "do", "e", "per"];

#[allow(clippy::expect_used)]
fn filler_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let words: Vec<&str> = CURRENCY_WORDS.iter().chain(STOP_WORDS).copied().collect();
        Regex::new(&format!(r"\b(?:{})\b", words.join("|"))).expect("invalid filler regex")
    })
}

fn remove_word(text: &str, word: &str) -> String {
    if word.trim().is_empty() {
        return text.to_string();
    }
    match Regex::new(&format!(r"\b{}\b", regex::escape(word))) {
        Ok(pattern) => pattern.replace_all(text, " ").into_owned(),
        Err(_) => text.to_string(),
    }
}

/// Builds a title-cased description from a keyword-profile message.
///
/// `amount_raw` is the amount token as written; `consumed` are the keywords already
/// used for kind, account, and method.
#[must_use]
pub fn extract_description(message: &str, amount_raw: Option<&str>, consumed: &[&str]) -> String {
    let mut text = message.to_string();

    // keyword profile drops separators, so "1.234,56" and "1,234.56" both read as 123456 here
    if let Some(raw) = amount_raw {
        text = remove_word(&text, &keyword_profile(raw));
    }
    text = strip_installments(&text);
    for keyword in consumed {
        text = remove_word(&text, &keyword_profile(keyword));
    }
    let text = filler_re().replace_all(&text, " ");

    let text = collapse_whitespace(&text);
    if text.chars().count() < 2 {
        return PLACEHOLDER_DESCRIPTION.to_string();
    }
    title_case(&text)
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .enumerate()
        .map(|(i, word)| {
            if i > 0 && LOWERCASE_IN_TITLE.contains(&word) {
                return word.to_string();
            }
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
