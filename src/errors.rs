//! Unified error types for `LedgerBuddy`.
//!
//! Only genuinely exceptional conditions live here. A missing field is not an error
//! (the dialogue machine asks for it), and an ambiguous match is settled by precedence.

use thiserror::Error;

/// Every failure the assistant can report.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Human readable reason
        message: String,
    },

    /// Database failure from `SeaORM`
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Serialising or deserialising ephemeral state failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O failure (config file reads)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// No transaction kind could be detected in the message
    #[error("Could not understand message: {message}")]
    UnparsableInput {
        /// The message as received
        message: String,
    },

    /// The ledger lock was not acquired within the bounded wait
    #[error("Ledger is busy: {operation} gave up after {waited_secs}s")]
    LedgerLockTimeout {
        /// Operation that was waiting
        operation: &'static str,
        /// How long it waited
        waited_secs: u64,
    },

    /// Account lookup by normalized name failed
    #[error("Account '{name}' not found")]
    AccountNotFound {
        /// The name that was looked up
        name: String,
    },

    /// Entries go to a card, never to the consolidated invoice that groups it
    #[error("Account '{name}' is a consolidated invoice; record against one of its cards")]
    ConsolidatedInvoicePosting {
        /// The invoice account
        name: String,
    },

    /// Amount is zero, negative, or not finite
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// A stored or configured string does not name a known variant
    #[error("Invalid value '{value}' for {field}")]
    InvalidValue {
        /// Which field held the value
        field: &'static str,
        /// The unrecognised value
        value: String,
    },

    /// Serenity/Poise framework error
    #[error("Serenity/Poise framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

impl Error {
    /// Whether the caller may simply retry the same operation.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::LedgerLockTimeout { .. })
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
