//! The editable keyword table.
//!
//! Each row is `(tag, keyword, value, required_kind)`. Row order is meaningful: ties
//! are always broken in favour of the row that appears first.

use crate::{
    core::{
        kinds::TransactionKind,
        normalize::{collapse_whitespace, keyword_profile},
    },
    entities::lexicon_entry,
    errors::{Error, Result},
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What a lexicon row is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LexiconTag {
    /// Keyword implies a transaction kind; value is a [`TransactionKind`] string
    Kind,
    /// Keyword implies a payment method; value is a payment method string
    PaymentMethod,
    /// Keyword implies `"Category > Subcategory"`
    Subcategory,
    /// Keyword is a secondary alias for the account named in value
    Account,
}

impl LexiconTag {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Kind => "kind",
            Self::PaymentMethod => "payment_method",
            Self::Subcategory => "subcategory",
            Self::Account => "account",
        }
    }
}

impl FromStr for LexiconTag {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "kind" => Ok(Self::Kind),
            "payment_method" | "method" => Ok(Self::PaymentMethod),
            "subcategory" => Ok(Self::Subcategory),
            "account" | "account_alias" => Ok(Self::Account),
            other => Err(Error::InvalidValue {
                field: "lexicon tag",
                value: other.to_string(),
            }),
        }
    }
}

/// Whole-word matcher for a row keyword, compiled when the row is built.
#[derive(Debug, Clone)]
struct WordPattern(Option<Regex>);

impl WordPattern {
    fn new(keyword: &str) -> Self {
        Self(Regex::new(&format!(r"\b{}\b", regex::escape(keyword))).ok())
    }
}

impl PartialEq for WordPattern {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_ref().map(Regex::as_str) == other.0.as_ref().map(Regex::as_str)
    }
}

/// One usable lexicon row, keyword already in keyword profile.
#[derive(Debug, Clone, PartialEq)]
pub struct LexiconRow {
    /// Row purpose
    pub tag: LexiconTag,
    /// Normalized keyword
    pub keyword: String,
    /// Interpreted value, as configured
    pub value: String,
    /// Row only applies to this transaction kind
    pub required_kind: Option<TransactionKind>,
    pattern: WordPattern,
}

impl LexiconRow {
    /// Builds a row, normalizing the keyword.
    pub fn new(
        tag: LexiconTag,
        keyword: &str,
        value: &str,
        required_kind: Option<TransactionKind>,
    ) -> Self {
        let keyword = keyword_profile(keyword);
        Self {
            tag,
            pattern: WordPattern::new(&keyword),
            keyword,
            value: value.trim().to_string(),
            required_kind,
        }
    }

    /// Whether the keyword occurs in `text` as whole words.
    #[must_use]
    pub fn matches_word(&self, text: &str) -> bool {
        self.pattern.0.as_ref().is_some_and(|re| re.is_match(text))
    }

    /// Whether this row may be used for a transaction of `kind`.
    #[must_use]
    pub fn allows(&self, kind: TransactionKind) -> bool {
        self.required_kind.is_none_or(|required| required == kind)
    }
}

/// Splits `"Category > Subcategory"` into its parts.
#[must_use]
pub fn split_category_path(value: &str) -> (String, Option<String>) {
    match value.split_once('>') {
        Some((category, sub)) => {
            let sub = collapse_whitespace(sub);
            (
                collapse_whitespace(category),
                (!sub.is_empty()).then_some(sub),
            )
        }
        None => (collapse_whitespace(value), None),
    }
}

/// The full keyword table in configured order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lexicon {
    rows: Vec<LexiconRow>,
}

impl Lexicon {
    /// Wraps rows, dropping any whose keyword normalizes to nothing.
    #[must_use]
    pub fn new(rows: Vec<LexiconRow>) -> Self {
        Self {
            rows: rows.into_iter().filter(|r| !r.keyword.is_empty()).collect(),
        }
    }

    /// Converts stored entries (ordered by position) into a lexicon.
    pub fn from_entries(entries: &[lexicon_entry::Model]) -> Result<Self> {
        let rows = entries
            .iter()
            .map(|entry| {
                let required_kind = entry
                    .required_kind
                    .as_deref()
                    .filter(|k| !k.trim().is_empty())
                    .map(str::parse)
                    .transpose()?;
                Ok(LexiconRow::new(
                    entry.tag.parse()?,
                    &entry.keyword,
                    &entry.value,
                    required_kind,
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(rows))
    }

    /// Rows carrying `tag`, in table order.
    pub fn rows(&self, tag: LexiconTag) -> impl Iterator<Item = &LexiconRow> {
        self.rows.iter().filter(move |r| r.tag == tag)
    }

    /// Distinct categories offered for `kind`, in first-seen order.
    #[must_use]
    pub fn categories_for(&self, kind: TransactionKind) -> Vec<String> {
        let mut categories: Vec<String> = Vec::new();
        for row in self.rows(LexiconTag::Subcategory).filter(|r| r.allows(kind)) {
            let (category, _) = split_category_path(&row.value);
            if !categories.iter().any(|c| c.eq_ignore_ascii_case(&category)) {
                categories.push(category);
            }
        }
        categories
    }

    /// Distinct subcategories configured under `category` for `kind`.
    #[must_use]
    pub fn subcategories_for(&self, category: &str, kind: TransactionKind) -> Vec<String> {
        let mut subs: Vec<String> = Vec::new();
        for row in self.rows(LexiconTag::Subcategory).filter(|r| r.allows(kind)) {
            let (cat, sub) = split_category_path(&row.value);
            let Some(sub) = sub else { continue };
            if cat.eq_ignore_ascii_case(category) && !subs.iter().any(|s| s.eq_ignore_ascii_case(&sub)) {
                subs.push(sub);
            }
        }
        subs
    }

    /// Aliases configured for the account whose normalized key is `account_key`.
    pub fn aliases_for<'a>(&'a self, account_key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.rows(LexiconTag::Account)
            .filter(move |r| keyword_profile(&r.value) == account_key)
            .map(|r| r.keyword.as_str())
    }
}
