//! Field resolvers: account, payment method, and category.
//!
//! All resolvers take the message in keyword profile. Every candidate that appears as
//! a literal substring is scored with [`similarity`]; the highest score wins and ties
//! go to whichever candidate was encountered first.

use crate::{
    core::{
        kinds::{AccountKind, PaymentMethod, TransactionKind},
        lexicon::{Lexicon, LexiconTag, split_category_path},
        normalize::similarity,
    },
    entities::{account, learned_association},
};
use tracing::debug;

/// Boost applied when the hit is the account's own full name rather than an alias.
pub const FULL_NAME_BOOST: f64 = 1.5;

/// Best alias hit for one account.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountMatch {
    /// Normalized account key
    pub key: String,
    /// Display name
    pub name: String,
    /// Account kind
    pub kind: AccountKind,
    /// The alias (or full name) found in the message
    pub alias: String,
    /// Byte offset of the alias in the message
    pub position: usize,
    /// Boosted similarity score
    pub score: f64,
}

fn account_hits(message: &str, accounts: &[account::Model], lexicon: &Lexicon) -> Vec<AccountMatch> {
    let mut hits = Vec::new();
    for account in accounts {
        let Ok(kind) = account.kind.parse::<AccountKind>() else {
            continue;
        };
        // a consolidated invoice only aggregates its cards; nothing is posted to it
        if kind == AccountKind::ConsolidatedInvoice {
            continue;
        }
        let candidates = std::iter::once((account.key.as_str(), FULL_NAME_BOOST))
            .chain(lexicon.aliases_for(&account.key).map(|alias| (alias, 1.0)));

        let mut best: Option<AccountMatch> = None;
        for (alias, boost) in candidates {
            let Some(position) = message.find(alias) else {
                continue;
            };
            let score = similarity(message, alias) * boost;
            if best.as_ref().is_none_or(|b| score > b.score) {
                best = Some(AccountMatch {
                    key: account.key.clone(),
                    name: account.name.clone(),
                    kind,
                    alias: alias.to_string(),
                    position,
                    score,
                });
            }
        }
        hits.extend(best);
    }
    hits
}

fn pick_best(hits: impl IntoIterator<Item = AccountMatch>) -> Option<AccountMatch> {
    hits.into_iter().fold(None, |best, hit| match best {
        Some(b) if hit.score <= b.score => Some(b),
        _ => Some(hit),
    })
}

/// Resolves the single account a message refers to.
#[must_use]
pub fn resolve_account(
    message: &str,
    accounts: &[account::Model],
    lexicon: &Lexicon,
) -> Option<AccountMatch> {
    let best = pick_best(account_hits(message, accounts, lexicon));
    if let Some(hit) = &best {
        debug!(account = %hit.key, alias = %hit.alias, score = hit.score, "account resolved");
    }
    best
}

/// Origin and destination of a transfer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferAccounts {
    /// Account the money leaves
    pub origin: Option<AccountMatch>,
    /// Account the money enters
    pub destination: Option<AccountMatch>,
}

fn follows_direction_word(message: &str, position: usize) -> bool {
    let before = message[..position].trim_end();
    let before = before.strip_suffix(" my").unwrap_or(before).trim_end();
    before.ends_with(" to")
        || before.ends_with(" into")
        || before == "to"
        || before == "into"
}

/// Splits the accounts of a transfer: whatever follows "to"/"into" is the destination.
///
/// Without a direction word, the earlier mention is the origin and the later one the
/// destination.
#[must_use]
pub fn resolve_transfer_accounts(
    message: &str,
    accounts: &[account::Model],
    lexicon: &Lexicon,
) -> TransferAccounts {
    let mut hits = account_hits(message, accounts, lexicon);
    // an alias nested in a longer hit ("santander" inside "santander emp") is not a second mention
    let spans: Vec<(usize, usize)> = hits.iter().map(|h| (h.position, h.position + h.alias.len())).collect();
    hits.retain(|h| {
        !spans.iter().any(|&(start, end)| {
            let (s, e) = (h.position, h.position + h.alias.len());
            start <= s && e <= end && (start, end) != (s, e)
        })
    });

    let destination_idx = hits
        .iter()
        .position(|h| follows_direction_word(message, h.position));

    match destination_idx {
        Some(idx) => {
            let destination = hits.remove(idx);
            TransferAccounts {
                origin: pick_best(hits),
                destination: Some(destination),
            }
        }
        None => {
            hits.sort_by_key(|h| h.position);
            let mut iter = hits.into_iter();
            TransferAccounts {
                origin: iter.next(),
                destination: iter.next(),
            }
        }
    }
}

/// A payment method found in the message.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodMatch {
    /// Resolved method
    pub method: PaymentMethod,
    /// Keyword that matched
    pub keyword: String,
}

/// Highest-similarity literal hit from the `payment_method` table.
#[must_use]
pub fn resolve_payment_method(message: &str, lexicon: &Lexicon) -> Option<MethodMatch> {
    let mut best: Option<(f64, MethodMatch)> = None;
    for row in lexicon.rows(LexiconTag::PaymentMethod) {
        if !message.contains(row.keyword.as_str()) {
            continue;
        }
        let Ok(method) = row.value.parse::<PaymentMethod>() else {
            continue;
        };
        let score = similarity(message, &row.keyword);
        if best.as_ref().is_none_or(|(s, _)| score > *s) {
            best = Some((
                score,
                MethodMatch {
                    method,
                    keyword: row.keyword.clone(),
                },
            ));
        }
    }
    best.map(|(_, m)| m)
}

/// Credit cards are always paid on credit: an absent, `none`, or `debit` method becomes `credit`.
#[must_use]
pub fn apply_card_override(
    account_kind: Option<AccountKind>,
    method: Option<PaymentMethod>,
) -> Option<PaymentMethod> {
    match (account_kind, method) {
        (
            Some(AccountKind::CreditCard),
            None | Some(PaymentMethod::NotApplicable | PaymentMethod::Debit),
        ) => Some(PaymentMethod::Credit),
        (_, method) => method,
    }
}

/// Which tier produced a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategorySource {
    /// A reinforced learned association
    Learned,
    /// A `subcategory` lexicon row
    Lexicon,
}

/// A resolved category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryMatch {
    /// Category name
    pub category: String,
    /// Subcategory, when known
    pub subcategory: Option<String>,
    /// Keyword that matched
    pub keyword: String,
    /// Deciding tier
    pub source: CategorySource,
}

/// Resolves category and subcategory: learned associations first, then the lexicon.
#[must_use]
pub fn resolve_category(
    message: &str,
    kind: TransactionKind,
    lexicon: &Lexicon,
    learned: &[learned_association::Model],
    threshold: i32,
) -> Option<CategoryMatch> {
    let mut best_learned: Option<&learned_association::Model> = None;
    for assoc in learned {
        if assoc.confidence < threshold
            || assoc.keyword.is_empty()
            || !message.contains(assoc.keyword.as_str())
        {
            continue;
        }
        if best_learned.is_none_or(|b| assoc.confidence > b.confidence) {
            best_learned = Some(assoc);
        }
    }
    if let Some(assoc) = best_learned {
        debug!(keyword = %assoc.keyword, confidence = assoc.confidence, "category from learned association");
        return Some(CategoryMatch {
            category: assoc.category.clone(),
            subcategory: assoc.subcategory.clone(),
            keyword: assoc.keyword.clone(),
            source: CategorySource::Learned,
        });
    }

    let mut best_row: Option<(f64, CategoryMatch)> = None;
    for row in lexicon
        .rows(LexiconTag::Subcategory)
        .filter(|r| r.allows(kind) && message.contains(r.keyword.as_str()))
    {
        let score = similarity(message, &row.keyword);
        if best_row.as_ref().is_none_or(|(s, _)| score > *s) {
            let (category, subcategory) = split_category_path(&row.value);
            best_row = Some((
                score,
                CategoryMatch {
                    category,
                    subcategory,
                    keyword: row.keyword.clone(),
                    source: CategorySource::Lexicon,
                },
            ));
        }
    }
    best_row.map(|(_, m)| m)
}
