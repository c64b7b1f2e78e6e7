//! Transaction entity - One ledger entry.
//!
//! A transfer is stored as two entries (debit on the origin, credit on the
//! destination) sharing a `transfer_group`. An installment purchase is stored as one
//! entry per installment, each with its own `due_date`.

use crate::core::kinds::{EntrySide, PaymentMethod, TransactionKind};
use crate::errors;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Date the money moved; full recompute orders by this
    pub date: Date,
    /// Human-readable description of the transaction
    pub description: String,
    /// Category name
    pub category: String,
    /// Subcategory name
    pub subcategory: Option<String>,
    /// Category the interpreter found on its own, before any dialogue correction
    pub original_category: Option<String>,
    /// `"expense"`, `"income"`, `"transfer"`, `"investment_buy"`, `"investment_sell"`
    pub kind: String,
    /// `"debit"` or `"credit"` relative to `account_key`
    pub side: String,
    /// Always positive
    pub amount: f64,
    /// Payment method string
    pub payment_method: String,
    /// Normalized key of the account this entry touches
    pub account_key: String,
    /// Number of installments of the purchase (1 for a single payment)
    pub installment_total: i32,
    /// Which installment this entry is (1-based)
    pub installment_current: i32,
    /// Card statement due date
    pub due_date: Option<Date>,
    /// `"pending"` for card charges awaiting payment, `"settled"` otherwise
    pub status: String,
    /// Shared id of the two legs of a transfer
    pub transfer_group: Option<String>,
    /// User who sent the message
    pub registered_by: String,
    /// When the entry was written
    pub registered_at: DateTimeUtc,
}

impl Model {
    /// Typed kind.
    pub fn transaction_kind(&self) -> errors::Result<TransactionKind> {
        self.kind.parse()
    }

    /// Typed side.
    pub fn entry_side(&self) -> errors::Result<EntrySide> {
        self.side.parse()
    }

    /// Typed payment method.
    pub fn method(&self) -> errors::Result<PaymentMethod> {
        self.payment_method.parse()
    }
}

/// Transactions reference accounts by key only
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
