//! Text-to-transaction interpretation.
//!
//! Runs normalizer, classifier, and every field extractor over one message and
//! produces a [`Draft`]: a transaction whose fields may still be missing. Nothing in
//! here performs I/O; everything it needs arrives in a [`Knowledge`] snapshot.

use crate::{
    core::{
        amount::{find_amount, find_installments},
        classify::detect_kind,
        describe::{PLACEHOLDER_DESCRIPTION, extract_description},
        kinds::{AccountKind, PaymentMethod, TransactionKind},
        lexicon::Lexicon,
        normalize::{keyword_profile, numeric_profile},
        resolve::{
            AccountMatch, CategorySource, apply_card_override, resolve_account,
            resolve_category, resolve_payment_method, resolve_transfer_accounts,
        },
    },
    entities::{account, learned_association},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Category given to transfers when the lexicon has nothing better.
pub const TRANSFER_CATEGORY: &str = "Transfer";

/// Everything interpretation reads, loaded once per invocation.
#[derive(Debug, Clone, Default)]
pub struct Knowledge {
    /// Keyword table
    pub lexicon: Lexicon,
    /// Known accounts
    pub accounts: Vec<account::Model>,
    /// Learned associations
    pub learned: Vec<learned_association::Model>,
    /// Minimum confidence for a learned association to auto-apply
    pub learning_threshold: i32,
}

impl Knowledge {
    /// Account by normalized key.
    #[must_use]
    pub fn account(&self, key: &str) -> Option<&account::Model> {
        self.accounts.iter().find(|a| a.key == key)
    }

    /// Kind of the account with `key`, if it exists and parses.
    #[must_use]
    pub fn account_kind(&self, key: &str) -> Option<AccountKind> {
        self.account(key).and_then(|a| a.account_kind().ok())
    }
}

/// A transaction under construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    /// Detected kind
    pub kind: TransactionKind,
    /// Positive amount, once known
    pub amount: Option<f64>,
    /// Account key (transfer origin)
    pub account: Option<String>,
    /// Transfer destination account key
    pub destination: Option<String>,
    /// Category
    pub category: Option<String>,
    /// Subcategory
    pub subcategory: Option<String>,
    /// Payment method
    pub method: Option<PaymentMethod>,
    /// Title-cased description
    pub description: String,
    /// Installment count (1 for a single payment)
    pub installments: u32,
    /// Transaction date
    pub date: NaiveDate,
    /// Category the interpreter resolved by itself
    pub original_category: Option<String>,
    /// Set once the user supplied the category through the dialogue
    pub category_corrected: bool,
    /// Keyword a corrected category is learned under
    pub learning_keyword: Option<String>,
}

impl Draft {
    /// Sets the account and re-applies the credit-card method override.
    pub fn set_account(&mut self, key: String, knowledge: &Knowledge) {
        let kind = knowledge.account_kind(&key);
        self.account = Some(key);
        if self.kind != TransactionKind::Transfer {
            self.method = apply_card_override(kind, self.method);
        }
    }
}

/// A draft with every required field present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedTransaction {
    /// Kind
    pub kind: TransactionKind,
    /// Positive amount
    pub amount: f64,
    /// Account key (transfer origin)
    pub account: String,
    /// Transfer destination
    pub destination: Option<String>,
    /// Category
    pub category: String,
    /// Subcategory
    pub subcategory: Option<String>,
    /// Payment method
    pub method: PaymentMethod,
    /// Description
    pub description: String,
    /// Installment count
    pub installments: u32,
    /// Transaction date
    pub date: NaiveDate,
    /// Category before correction
    pub original_category: Option<String>,
    /// Whether the category came from the user
    pub category_corrected: bool,
    /// Keyword to reinforce
    pub learning_keyword: Option<String>,
}

fn consumed_alias(hit: Option<&AccountMatch>) -> Option<String> {
    hit.map(|h| h.alias.clone())
}

/// Interprets one message received on `date`.
///
/// Returns [`Error::UnparsableInput`] when no transaction kind can be detected;
/// every other gap is left as `None` for the dialogue to fill.
pub fn interpret(message: &str, date: NaiveDate, knowledge: &Knowledge) -> Result<Draft> {
    let keyword_text = keyword_profile(message);
    let numeric_text = numeric_profile(message);

    let kind_match =
        detect_kind(&keyword_text, &knowledge.lexicon).ok_or_else(|| Error::UnparsableInput {
            message: message.to_string(),
        })?;
    let kind = kind_match.kind;

    let amount_token = find_amount(&numeric_text);
    let amount = amount_token
        .as_ref()
        .map(|t| t.value)
        .filter(|v| *v > 0.0);
    let installments = find_installments(&keyword_text).unwrap_or(1);

    let mut consumed = vec![kind_match.keyword.clone()];

    let (account, destination) = if kind == TransactionKind::Transfer {
        let split = resolve_transfer_accounts(&keyword_text, &knowledge.accounts, &knowledge.lexicon);
        consumed.extend(consumed_alias(split.origin.as_ref()));
        consumed.extend(consumed_alias(split.destination.as_ref()));
        (split.origin, split.destination)
    } else {
        let hit = resolve_account(&keyword_text, &knowledge.accounts, &knowledge.lexicon);
        consumed.extend(consumed_alias(hit.as_ref()));
        (hit, None)
    };

    let method_hit = resolve_payment_method(&keyword_text, &knowledge.lexicon);
    consumed.extend(method_hit.as_ref().map(|m| m.keyword.clone()));
    let method = if kind == TransactionKind::Transfer {
        Some(
            method_hit
                .map_or(PaymentMethod::BankTransfer, |m| m.method),
        )
    } else {
        apply_card_override(account.as_ref().map(|a| a.kind), method_hit.map(|m| m.method))
    };

    let category_hit = resolve_category(
        &keyword_text,
        kind,
        &knowledge.lexicon,
        &knowledge.learned,
        knowledge.learning_threshold,
    );
    let (category, subcategory) = match (&category_hit, kind) {
        (Some(hit), _) => (Some(hit.category.clone()), hit.subcategory.clone()),
        (None, TransactionKind::Transfer) => (Some(TRANSFER_CATEGORY.to_string()), None),
        (None, _) => (None, None),
    };

    let consumed_refs: Vec<&str> = consumed.iter().map(String::as_str).collect();
    let description = extract_description(
        &keyword_text,
        amount_token.as_ref().map(|t| t.raw.as_str()),
        &consumed_refs,
    );
    let learning_keyword =
        (description != PLACEHOLDER_DESCRIPTION).then(|| keyword_profile(&description));

    debug!(
        kind = %kind,
        amount,
        account = account.as_ref().map(|a| a.key.as_str()),
        category = category.as_deref(),
        learned = category_hit.as_ref().is_some_and(|h| h.source == CategorySource::Learned),
        "message interpreted"
    );

    Ok(Draft {
        kind,
        amount,
        account: account.map(|a| a.key),
        destination: destination.map(|a| a.key),
        original_category: category.clone(),
        category,
        subcategory,
        method,
        description,
        installments,
        date,
        category_corrected: false,
        learning_keyword,
    })
}
