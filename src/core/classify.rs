//! Transaction kind detection.
//!
//! Precedence is fixed: the built-in rules are scanned in order (transfer, income,
//! expense) and the first literal hit wins outright. Only when none of them hit is
//! the configurable `kind` table consulted, matching whole words, first row wins.

use crate::core::{
    kinds::TransactionKind,
    lexicon::{Lexicon, LexiconTag},
};
use tracing::debug;

/// One built-in matcher: any of `keywords` as a substring means `kind`.
#[derive(Debug)]
pub struct MatcherRule {
    /// Kind produced on a hit
    pub kind: TransactionKind,
    /// Literal keywords, longest spelling first so the consumed keyword is complete
    pub keywords: &'static [&'static str],
}

/// Built-in rules in precedence order. Loan and advance phrases are transfers.
pub const FIXED_RULES: [MatcherRule; 3] = [
    MatcherRule {
        kind: TransactionKind::Transfer,
        keywords: &[
            "transferred",
            "transfer",
            "moved",
            "sent to my",
            "loaned",
            "lent",
            "advance to",
        ],
    },
    MatcherRule {
        kind: TransactionKind::Income,
        keywords: &[
            "received",
            "receive",
            "salary",
            "earned",
            "got paid",
            "income",
            "refund",
        ],
    },
    MatcherRule {
        kind: TransactionKind::Expense,
        keywords: &["spent", "paid", "bought", "purchase", "expense", "cost"],
    },
];

/// Where a kind decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindSource {
    /// Built-in rule
    Fixed,
    /// Configured `kind` row
    Table,
}

/// A detected kind and the keyword that triggered it.
#[derive(Debug, Clone, PartialEq)]
pub struct KindMatch {
    /// Detected kind
    pub kind: TransactionKind,
    /// Keyword consumed by the match
    pub keyword: String,
    /// Which tier decided
    pub source: KindSource,
}

/// Detects the transaction kind of a keyword-profile message.
#[must_use]
pub fn detect_kind(message: &str, lexicon: &Lexicon) -> Option<KindMatch> {
    for rule in &FIXED_RULES {
        if let Some(keyword) = rule.keywords.iter().find(|k| message.contains(**k)) {
            debug!(kind = %rule.kind, keyword, "kind from built-in rule");
            return Some(KindMatch {
                kind: rule.kind,
                keyword: (*keyword).to_string(),
                source: KindSource::Fixed,
            });
        }
    }

    lexicon.rows(LexiconTag::Kind).find_map(|row| {
        let kind = row.value.parse::<TransactionKind>().ok()?;
        row.matches_word(message).then(|| {
            debug!(kind = %kind, keyword = %row.keyword, "kind from lexicon table");
            KindMatch {
                kind,
                keyword: row.keyword.clone(),
                source: KindSource::Table,
            }
        })
    })
}
