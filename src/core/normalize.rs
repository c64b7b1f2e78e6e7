//! Text normalization profiles.
//!
//! Two pure functions over the same input. The keyword profile is what every
//! lexicon/alias comparison runs on; the numeric profile keeps the separators the
//! amount parser needs. Feeding an extractor the wrong profile is a bug, so each
//! extractor documents which one it expects.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Strips accents, lower-cases, removes every punctuation character and collapses whitespace.
#[must_use]
pub fn keyword_profile(text: &str) -> String {
    let folded: String = fold(text)
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    collapse_whitespace(&folded)
}

/// Strips accents and lower-cases, keeping punctuation so `1.234,56` survives intact.
#[must_use]
pub fn numeric_profile(text: &str) -> String {
    collapse_whitespace(&fold(text).collect::<String>())
}

/// Account and lexicon keys are compared in keyword profile.
#[must_use]
pub fn normalized_key(name: &str) -> String {
    keyword_profile(name)
}

/// Similarity in `[0, 1]` used to rank literal matches.
///
/// For a message that contains `candidate`, this grows with the share of the message
/// the candidate covers, so longer matches outrank shorter ones.
#[must_use]
pub fn similarity(message: &str, candidate: &str) -> f64 {
    strsim::normalized_levenshtein(message, candidate)
}

/// Collapses runs of whitespace into one space and trims the ends.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fold(text: &str) -> impl Iterator<Item = char> + '_ {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}
