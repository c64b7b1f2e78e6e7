//! Runtime settings loaded from environment variables.
//!
//! Every variable is optional; a malformed value is a configuration error rather than
//! a silent fallback.

use crate::errors::{Error, Result};
use std::{str::FromStr, time::Duration};

/// Duplicate events are suppressed for at least this long.
pub const MIN_DEDUP_TTL: Duration = Duration::from_secs(60);

/// Knobs of the assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantSettings {
    /// Lifetime of an unanswered dialogue (`DIALOGUE_TTL_SECS`)
    pub dialogue_ttl: Duration,
    /// Duplicate-event suppression window (`EVENT_DEDUP_TTL_SECS`, at least 60s)
    pub dedup_ttl: Duration,
    /// Bounded wait for the ledger lock (`LEDGER_LOCK_TIMEOUT_SECS`)
    pub lock_timeout: Duration,
    /// Confidence at which a learned association auto-applies (`LEARNING_THRESHOLD`)
    pub learning_threshold: i32,
    /// Prefix for amounts in replies (`DEFAULT_CURRENCY_SYMBOL`)
    pub currency_symbol: String,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            dialogue_ttl: Duration::from_secs(900),
            dedup_ttl: Duration::from_secs(120),
            lock_timeout: Duration::from_secs(30),
            learning_threshold: 2,
            currency_symbol: "$".to_string(),
        }
    }
}

fn parse_var<T: FromStr>(name: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| Error::Config {
            message: format!("{name} has an invalid value: '{value}'"),
        }),
    }
}

impl AssistantSettings {
    /// Reads settings through `lookup`, falling back to defaults for unset names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let secs = |name: &str, default: Duration| {
            parse_var(name, lookup(name), default.as_secs()).map(Duration::from_secs)
        };

        let learning_threshold = parse_var(
            "LEARNING_THRESHOLD",
            lookup("LEARNING_THRESHOLD"),
            defaults.learning_threshold,
        )?;
        if learning_threshold < 1 {
            return Err(Error::Config {
                message: format!("LEARNING_THRESHOLD must be at least 1, got {learning_threshold}"),
            });
        }

        Ok(Self {
            dialogue_ttl: secs("DIALOGUE_TTL_SECS", defaults.dialogue_ttl)?,
            dedup_ttl: secs("EVENT_DEDUP_TTL_SECS", defaults.dedup_ttl)?.max(MIN_DEDUP_TTL),
            lock_timeout: secs("LEDGER_LOCK_TIMEOUT_SECS", defaults.lock_timeout)?,
            learning_threshold,
            currency_symbol: lookup("DEFAULT_CURRENCY_SYMBOL").unwrap_or(defaults.currency_symbol),
        })
    }

    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}
