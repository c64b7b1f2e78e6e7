//! Account and lexicon configuration from config.toml
//!
//! The accounts and keyword table defined in config.toml seed the store on first run.
//! Seeding is idempotent: accounts are only added when their normalized name is
//! unknown, and lexicon rows only when the table is still empty, so edits made to
//! the stored table afterwards are never overwritten.

use crate::{
    core::{
        kinds::{AccountKind, ClosingPolicy, TransactionKind},
        lexicon::LexiconTag,
    },
    errors::{Error, Result},
    repository::{LedgerStore, LexiconStore, NewAccount, NewLexiconEntry},
};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Accounts to seed
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
    /// Keyword table rows, in precedence order
    #[serde(default)]
    pub lexicon: Vec<LexiconConfig>,
}

/// Configuration for a single account
#[derive(Debug, Deserialize, Clone)]
pub struct AccountConfig {
    /// Display name
    pub name: String,
    /// `checking`, `cash`, `credit_card` or `consolidated_invoice`
    pub kind: String,
    /// Balance before the first recorded entry
    #[serde(default)]
    pub opening_balance: f64,
    /// Card limit
    pub credit_limit: Option<f64>,
    /// Statement closing day (cards)
    pub closing_day: Option<u32>,
    /// Statement due day (cards)
    pub due_day: Option<u32>,
    /// `standard` or `previous_closing`
    pub closing_policy: Option<String>,
    /// Name of the consolidated invoice this card rolls into
    pub parent: Option<String>,
}

/// Configuration for a single lexicon row
#[derive(Debug, Deserialize, Clone)]
pub struct LexiconConfig {
    /// `kind`, `payment_method`, `subcategory` or `account`
    pub tag: String,
    /// Keyword to look for
    pub keyword: String,
    /// What the keyword means
    pub value: String,
    /// Restricts the row to one transaction kind
    pub required_kind: Option<String>,
}

fn check_day(field: &'static str, day: Option<u32>) -> Result<Option<u32>> {
    match day {
        Some(d) if !(1..=31).contains(&d) => Err(Error::InvalidValue {
            field,
            value: d.to_string(),
        }),
        _ => Ok(day),
    }
}

impl AccountConfig {
    /// Validates the entry and converts it for the store.
    pub fn to_new_account(&self) -> Result<NewAccount> {
        let kind: AccountKind = self.kind.parse()?;
        let closing_policy = self
            .closing_policy
            .as_deref()
            .map(str::parse::<ClosingPolicy>)
            .transpose()?
            .unwrap_or_default();
        let closing_day = check_day("closing_day", self.closing_day)?;
        let due_day = check_day("due_day", self.due_day)?;
        if kind == AccountKind::CreditCard && (closing_day.is_none() || due_day.is_none()) {
            warn!(account = %self.name, "credit card without closing_day/due_day, due dates will be empty");
        }
        Ok(NewAccount {
            name: self.name.trim().to_string(),
            kind,
            opening_balance: self.opening_balance,
            credit_limit: self.credit_limit,
            closing_day,
            due_day,
            closing_policy,
            parent: self.parent.clone(),
        })
    }
}

impl LexiconConfig {
    /// Validates tag and required kind and converts the row for the store.
    pub fn to_new_entry(&self) -> Result<NewLexiconEntry> {
        let tag: LexiconTag = self.tag.parse()?;
        let required_kind = self
            .required_kind
            .as_deref()
            .map(str::parse::<TransactionKind>)
            .transpose()?;
        Ok(NewLexiconEntry {
            tag: tag.as_str().to_string(),
            keyword: self.keyword.clone(),
            value: self.value.clone(),
            required_kind: required_kind.map(|k| k.as_str().to_string()),
        })
    }
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.as_ref().display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from `LEDGER_CONFIG_PATH`, or ./config.toml
pub fn load_default_config() -> Result<Config> {
    let path = std::env::var("LEDGER_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_config(path)
}

/// What a seeding run added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Accounts created
    pub accounts_added: usize,
    /// Lexicon rows created
    pub lexicon_added: usize,
}

/// Seeds accounts and lexicon rows that are not there yet.
pub async fn seed<S: LedgerStore + LexiconStore + ?Sized>(store: &S, config: &Config) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for account in &config.accounts {
        let new = account.to_new_account()?;
        if store.get_account(&new.name).await?.is_some() {
            continue;
        }
        store.add_account(new).await?;
        report.accounts_added += 1;
    }

    for account in config.accounts.iter().filter_map(|a| a.parent.as_deref()) {
        if store.get_account(account).await?.is_none() {
            warn!(parent = account, "configured parent account does not exist");
        }
    }

    if store.load_lexicon().await?.is_empty() {
        let entries = config
            .lexicon
            .iter()
            .map(LexiconConfig::to_new_entry)
            .collect::<Result<Vec<_>>>()?;
        report.lexicon_added = entries.len();
        store.add_lexicon_entries(entries).await?;
    }

    info!(
        accounts_added = report.accounts_added,
        lexicon_added = report.lexicon_added,
        "configuration seeded"
    );
    Ok(report)
}
