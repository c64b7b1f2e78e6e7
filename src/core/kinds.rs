//! Closed vocabularies shared across the pipeline and the ledger.
//!
//! Entities store these as plain strings; the typed forms live here together with
//! their string conversions so that a bad row surfaces as [`Error::InvalidValue`].

use crate::errors::Error;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// What a transaction does to money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Money leaving an account
    Expense,
    /// Money entering an account
    Income,
    /// Money moving between two of the user's accounts
    Transfer,
    /// Buying an investment position
    InvestmentBuy,
    /// Selling an investment position
    InvestmentSell,
}

impl TransactionKind {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
            Self::Transfer => "transfer",
            Self::InvestmentBuy => "investment_buy",
            Self::InvestmentSell => "investment_sell",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "expense" => Ok(Self::Expense),
            "income" => Ok(Self::Income),
            "transfer" => Ok(Self::Transfer),
            "investment_buy" | "investment" => Ok(Self::InvestmentBuy),
            "investment_sell" => Ok(Self::InvestmentSell),
            other => Err(Error::InvalidValue {
                field: "transaction kind",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an account holds money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    /// Bank checking account
    Checking,
    /// Wallet / physical cash
    Cash,
    /// Credit card with a billing cycle
    CreditCard,
    /// Virtual account that aggregates several cards into one invoice
    ConsolidatedInvoice,
}

impl AccountKind {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Cash => "cash",
            Self::CreditCard => "credit_card",
            Self::ConsolidatedInvoice => "consolidated_invoice",
        }
    }

    /// Cards and consolidated invoices track a pending total instead of a balance.
    #[must_use]
    pub const fn tracks_pending(self) -> bool {
        matches!(self, Self::CreditCard | Self::ConsolidatedInvoice)
    }
}

impl FromStr for AccountKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "checking" => Ok(Self::Checking),
            "cash" => Ok(Self::Cash),
            "credit_card" | "card" => Ok(Self::CreditCard),
            "consolidated_invoice" => Ok(Self::ConsolidatedInvoice),
            other => Err(Error::InvalidValue {
                field: "account kind",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which statement a card purchase lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosingPolicy {
    /// Purchases after the closing day roll into next month's statement
    #[default]
    Standard,
    /// Every purchase belongs to its own month's statement
    PreviousClosing,
}

impl ClosingPolicy {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::PreviousClosing => "previous_closing",
        }
    }
}

impl FromStr for ClosingPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "" | "standard" => Ok(Self::Standard),
            "previous_closing" => Ok(Self::PreviousClosing),
            other => Err(Error::InvalidValue {
                field: "closing policy",
                value: other.to_string(),
            }),
        }
    }
}

/// How a transaction was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Charged to a credit line
    Credit,
    /// Debited straight from the account
    Debit,
    /// Physical cash
    Cash,
    /// Instant payment
    Pix,
    /// Wire / bank transfer
    BankTransfer,
    /// Explicitly no method (the lexicon's `none`)
    NotApplicable,
}

impl PaymentMethod {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
            Self::Cash => "cash",
            Self::Pix => "pix",
            Self::BankTransfer => "bank_transfer",
            Self::NotApplicable => "none",
        }
    }

    /// Methods offered when the user has to pick one.
    pub const CHOICES: [Self; 5] = [
        Self::Credit,
        Self::Debit,
        Self::Cash,
        Self::Pix,
        Self::BankTransfer,
    ];
}

impl FromStr for PaymentMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            "cash" => Ok(Self::Cash),
            "pix" => Ok(Self::Pix),
            "bank_transfer" | "transfer" => Ok(Self::BankTransfer),
            "none" => Ok(Self::NotApplicable),
            other => Err(Error::InvalidValue {
                field: "payment method",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a single ledger entry relative to its account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySide {
    /// Money out (expense, investment buy, transfer origin)
    Debit,
    /// Money in (income, investment sell, transfer destination, card payment)
    Credit,
}

impl EntrySide {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }

    /// Side of the single entry a non-transfer kind produces.
    #[must_use]
    pub const fn for_kind(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::Expense | TransactionKind::InvestmentBuy | TransactionKind::Transfer => {
                Self::Debit
            }
            TransactionKind::Income | TransactionKind::InvestmentSell => Self::Credit,
        }
    }
}

impl FromStr for EntrySide {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debit" => Ok(Self::Debit),
            "credit" => Ok(Self::Credit),
            other => Err(Error::InvalidValue {
                field: "entry side",
                value: other.to_string(),
            }),
        }
    }
}
