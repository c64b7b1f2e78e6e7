//! Repository interfaces the core depends on.
//!
//! The core never touches rows directly: reconciliation, learning, dialogue
//! persistence, and lexicon loading all go through these traits, so the same logic
//! runs against `SQLite` ([`sea::SeaStore`]) or in memory ([`memory::MemoryStore`]).

use crate::{
    core::kinds::{AccountKind, ClosingPolicy, EntrySide, PaymentMethod, TransactionKind},
    entities::{account, learned_association, lexicon_entry, transaction},
    errors::Result,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::time::Duration;

pub mod memory;
pub mod sea;

pub use memory::MemoryStore;
pub use sea::SeaStore;

/// A ledger entry about to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// Date the money moved
    pub date: NaiveDate,
    /// Description
    pub description: String,
    /// Category
    pub category: String,
    /// Subcategory
    pub subcategory: Option<String>,
    /// Category found before any correction
    pub original_category: Option<String>,
    /// Kind
    pub kind: TransactionKind,
    /// Side relative to `account_key`
    pub side: EntrySide,
    /// Positive amount
    pub amount: f64,
    /// Payment method
    pub payment_method: PaymentMethod,
    /// Normalized account key
    pub account_key: String,
    /// Installment count
    pub installment_total: i32,
    /// Installment number
    pub installment_current: i32,
    /// Statement due date
    pub due_date: Option<NaiveDate>,
    /// Entry status
    pub status: String,
    /// Transfer leg link
    pub transfer_group: Option<String>,
    /// Who sent the message
    pub registered_by: String,
    /// When it was written
    pub registered_at: DateTime<Utc>,
}

/// An account to create.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    /// Display name; the key is derived from it
    pub name: String,
    /// Kind
    pub kind: AccountKind,
    /// Opening balance
    pub opening_balance: f64,
    /// Card limit
    pub credit_limit: Option<f64>,
    /// Statement closing day
    pub closing_day: Option<u32>,
    /// Statement due day
    pub due_day: Option<u32>,
    /// Closing policy
    pub closing_policy: ClosingPolicy,
    /// Name of the consolidated invoice this account rolls into
    pub parent: Option<String>,
}

/// A lexicon row to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLexiconEntry {
    /// Row tag
    pub tag: String,
    /// Keyword
    pub keyword: String,
    /// Interpreted value
    pub value: String,
    /// Required transaction kind
    pub required_kind: Option<String>,
}

/// Transaction log plus stored per-account balances.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Appends all entries atomically: either every entry is written or none is.
    async fn append(&self, entries: Vec<NewTransaction>) -> Result<Vec<transaction::Model>>;

    /// Every entry ordered by transaction date, then id.
    async fn list_all(&self) -> Result<Vec<transaction::Model>>;

    /// Deletes entries by id, returning the ones that existed.
    async fn remove_transactions(&self, ids: &[i64]) -> Result<Vec<transaction::Model>>;

    /// Looks an account up by name (normalized before comparison).
    async fn get_account(&self, name: &str) -> Result<Option<account::Model>>;

    /// All accounts in creation order.
    async fn list_accounts(&self) -> Result<Vec<account::Model>>;

    /// Overwrites the stored balance of an account.
    async fn set_account_balance(&self, name: &str, value: f64) -> Result<()>;

    /// Creates an account; its stored balance starts at the opening balance.
    async fn add_account(&self, account: NewAccount) -> Result<account::Model>;
}

/// Keyword to category associations.
#[async_trait]
pub trait LearningStore: Send + Sync {
    /// Every association.
    async fn list_associations(&self) -> Result<Vec<learned_association::Model>>;

    /// Records a confirmation of `keyword -> category/subcategory`.
    ///
    /// Reconfirming the same mapping increments the confidence; a different mapping
    /// replaces the old one and restarts at 1.
    async fn reinforce(
        &self,
        keyword: &str,
        category: &str,
        subcategory: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<learned_association::Model>;
}

/// Keyed, TTL-bound state shared between invocations.
#[async_trait]
pub trait EphemeralStore: Send + Sync {
    /// Live value under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key` for `ttl`.
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Stores `value` only if no live value sits under `key`, atomically.
    /// Returns whether this call stored it.
    async fn put_if_absent(&self, key: &str, value: String, ttl: Duration) -> Result<bool>;

    /// Drops `key`.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Source of the editable keyword table.
#[async_trait]
pub trait LexiconStore: Send + Sync {
    /// All rows in table order.
    async fn load_lexicon(&self) -> Result<Vec<lexicon_entry::Model>>;

    /// Appends rows after the existing ones.
    async fn add_lexicon_entries(&self, entries: Vec<NewLexiconEntry>) -> Result<()>;
}

/// Everything the assistant needs from storage.
pub trait Storage: LedgerStore + LearningStore + EphemeralStore + LexiconStore {}

impl<T> Storage for T where T: LedgerStore + LearningStore + EphemeralStore + LexiconStore {}

/// Converts a TTL, capping absurd values at a year.
pub(crate) fn ttl_to_chrono(ttl: Duration) -> chrono::Duration {
    chrono::Duration::from_std(ttl)
        .unwrap_or_else(|_| chrono::Duration::days(365))
        .min(chrono::Duration::days(365))
}
