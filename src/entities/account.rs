//! Account entity - A place money lives: checking, cash, a credit card, or a
//! consolidated invoice grouping several cards.
//!
//! `key` is the accent/case-insensitive normalized name and is what every lookup uses.
//! `balance` holds the running balance for checking/cash and the pending total for
//! cards and consolidated invoices.

use crate::core::kinds::{AccountKind, ClosingPolicy};
use crate::errors;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    /// Unique identifier for the account
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Normalized name, unique
    #[sea_orm(unique)]
    pub key: String,
    /// Name as configured, for display
    pub name: String,
    /// `"checking"`, `"cash"`, `"credit_card"`, or `"consolidated_invoice"`
    pub kind: String,
    /// Balance before any recorded transaction
    pub opening_balance: f64,
    /// Stored balance (or pending total), kept current by the ledger engine
    pub balance: f64,
    /// Card credit limit
    pub credit_limit: Option<f64>,
    /// Day of month the card statement closes
    pub closing_day: Option<i32>,
    /// Day of month the card statement is due
    pub due_day: Option<i32>,
    /// `"standard"` or `"previous_closing"`
    pub closing_policy: String,
    /// Key of the consolidated invoice this card rolls up into
    pub parent_key: Option<String>,
}

impl Model {
    /// Typed account kind.
    pub fn account_kind(&self) -> errors::Result<AccountKind> {
        self.kind.parse()
    }

    /// Typed closing policy.
    pub fn policy(&self) -> errors::Result<ClosingPolicy> {
        self.closing_policy.parse()
    }
}

/// Accounts are linked to transactions by key, not by foreign key
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
