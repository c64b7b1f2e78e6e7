//! Shared test utilities for `LedgerBuddy`.
//!
//! A small but complete household: checking and cash accounts, two cards rolling
//! into one consolidated invoice, two look-alike bank accounts for similarity
//! tie-breaks, and a lexicon covering every row tag.
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use crate::{
    core::{
        assistant::{Inbound, InboundEvent, MessageChannel},
        interpret::Knowledge,
        kinds::{AccountKind, ClosingPolicy, EntrySide, PaymentMethod, TransactionKind},
        lexicon::{Lexicon, LexiconRow},
        normalize::normalized_key,
    },
    entities::{account, learned_association},
    errors::Result,
    repository::{
        LedgerStore, LexiconStore, MemoryStore, NewAccount, NewLexiconEntry, NewTransaction,
        SeaStore,
    },
};
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use std::sync::Mutex;

/// Parses `YYYY-MM-DD`.
pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("test date must be YYYY-MM-DD")
}

/// Lexicon rows in table order, as they would be configured.
pub fn sample_lexicon_entries() -> Vec<NewLexiconEntry> {
    let row = |tag: &str, keyword: &str, value: &str, required_kind: Option<&str>| NewLexiconEntry {
        tag: tag.to_string(),
        keyword: keyword.to_string(),
        value: value.to_string(),
        required_kind: required_kind.map(str::to_string),
    };
    vec![
        row("kind", "invested", "investment_buy", None),
        row("kind", "sold shares", "investment_sell", None),
        row("kind", "dividend", "income", None),
        row("payment_method", "credit", "credit", None),
        row("payment_method", "debit", "debit", None),
        row("payment_method", "cash", "cash", None),
        row("payment_method", "pix", "pix", None),
        row("payment_method", "wire", "bank_transfer", None),
        row("payment_method", "credit card", "credit", None),
        row("subcategory", "restaurant", "Food > Restaurant", Some("expense")),
        row("subcategory", "lunch", "Food > Restaurant", Some("expense")),
        row("subcategory", "supermarket", "Food > Groceries", Some("expense")),
        row("subcategory", "coffee", "Food > Coffee", Some("expense")),
        row("subcategory", "uber", "Transport > Ride", Some("expense")),
        row("subcategory", "gas", "Transport > Fuel", Some("expense")),
        row("subcategory", "salary", "Salary > Monthly", Some("income")),
        row("subcategory", "freelance", "Salary > Freelance", Some("income")),
        row("subcategory", "stocks", "Investments > Stocks", Some("investment_buy")),
        row("subcategory", "netflix", "Home > Subscriptions", None),
        row("account", "purple card", "Nubank", None),
        row("account", "santander emp", "Santander Empresas", None),
        row("account", "gold", "Visa Gold", None),
    ]
}

/// The sample lexicon, ready for matching.
pub fn sample_lexicon() -> Lexicon {
    let rows = sample_lexicon_entries()
        .into_iter()
        .map(|entry| {
            LexiconRow::new(
                entry.tag.parse().unwrap(),
                &entry.keyword,
                &entry.value,
                entry
                    .required_kind
                    .as_deref()
                    .map(|k| k.parse::<TransactionKind>().unwrap()),
            )
        })
        .collect();
    Lexicon::new(rows)
}

fn plain(name: &str, kind: AccountKind, opening_balance: f64) -> NewAccount {
    NewAccount {
        name: name.to_string(),
        kind,
        opening_balance,
        credit_limit: None,
        closing_day: None,
        due_day: None,
        closing_policy: ClosingPolicy::Standard,
        parent: None,
    }
}

fn card(name: &str, closing_day: u32, due_day: u32, closing_policy: ClosingPolicy) -> NewAccount {
    NewAccount {
        credit_limit: Some(5000.0),
        closing_day: Some(closing_day),
        due_day: Some(due_day),
        closing_policy,
        parent: Some("Family Invoice".to_string()),
        ..plain(name, AccountKind::CreditCard, 0.0)
    }
}

/// Accounts in creation order.
pub fn sample_account_configs() -> Vec<NewAccount> {
    vec![
        plain("Checking", AccountKind::Checking, 1000.0),
        plain("Wallet", AccountKind::Cash, 50.0),
        card("Nubank", 15, 22, ClosingPolicy::Standard),
        card("Visa Gold", 5, 12, ClosingPolicy::PreviousClosing),
        plain("Family Invoice", AccountKind::ConsolidatedInvoice, 0.0),
        plain("Santander", AccountKind::Checking, 500.0),
        plain("Santander Empresas", AccountKind::Checking, 0.0),
    ]
}

/// The sample accounts as stored models.
pub fn sample_accounts() -> Vec<account::Model> {
    (1..)
        .zip(sample_account_configs())
        .map(|(id, new)| account::Model {
            id,
            key: normalized_key(&new.name),
            name: new.name,
            kind: new.kind.as_str().to_string(),
            opening_balance: new.opening_balance,
            balance: new.opening_balance,
            credit_limit: new.credit_limit,
            closing_day: new.closing_day.map(|d| i32::try_from(d).unwrap()),
            due_day: new.due_day.map(|d| i32::try_from(d).unwrap()),
            closing_policy: new.closing_policy.as_str().to_string(),
            parent_key: new.parent.as_deref().map(normalized_key),
        })
        .collect()
}

/// A learned association.
pub fn learned(
    keyword: &str,
    category: &str,
    subcategory: Option<&str>,
    confidence: i32,
) -> learned_association::Model {
    learned_association::Model {
        id: 0,
        keyword: keyword.to_string(),
        category: category.to_string(),
        subcategory: subcategory.map(str::to_string),
        confidence,
        last_updated: Utc::now(),
    }
}

/// Sample lexicon and accounts, nothing learned yet, threshold 2.
pub fn sample_knowledge() -> Knowledge {
    Knowledge {
        lexicon: sample_lexicon(),
        accounts: sample_accounts(),
        learned: Vec::new(),
        learning_threshold: 2,
    }
}

/// A single settled expense entry.
pub fn new_expense(account_key: &str, amount: f64, on: &str) -> NewTransaction {
    NewTransaction {
        date: date(on),
        description: "Test Expense".to_string(),
        category: "Food".to_string(),
        subcategory: None,
        original_category: Some("Food".to_string()),
        kind: TransactionKind::Expense,
        side: EntrySide::Debit,
        amount,
        payment_method: PaymentMethod::Debit,
        account_key: account_key.to_string(),
        installment_total: 1,
        installment_current: 1,
        due_date: None,
        status: "settled".to_string(),
        transfer_group: None,
        registered_by: "tester".to_string(),
        registered_at: Utc::now(),
    }
}

async fn seed_sample<S: LedgerStore + LexiconStore>(store: &S) -> Result<()> {
    for account in sample_account_configs() {
        store.add_account(account).await?;
    }
    store.add_lexicon_entries(sample_lexicon_entries()).await
}

/// In-memory store holding the sample accounts and lexicon.
pub async fn seeded_memory_store() -> Result<MemoryStore> {
    let store = MemoryStore::new();
    seed_sample(&store).await?;
    Ok(store)
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for repository tests.
pub async fn setup_sea_store() -> Result<SeaStore> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(SeaStore::new(db))
}

/// Like [`setup_sea_store`], with the sample accounts and lexicon.
pub async fn seeded_sea_store() -> Result<SeaStore> {
    let store = setup_sea_store().await?;
    seed_sample(&store).await?;
    Ok(store)
}

/// A text message in conversation `conv-1` from `alice`, received 2025-03-10.
pub fn text_event(event_id: &str, text: &str) -> InboundEvent {
    InboundEvent {
        event_id: event_id.to_string(),
        conversation_id: "conv-1".to_string(),
        user: "alice".to_string(),
        payload: Inbound::Text(text.to_string()),
        received_at: Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap(),
    }
}

/// One message sent through a [`RecordingChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    /// Target conversation
    pub conversation_id: String,
    /// Text
    pub text: String,
    /// Offered options
    pub options: Vec<String>,
}

/// Channel that remembers everything sent through it.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingChannel {
    /// Everything sent so far.
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Text of the last message.
    pub fn last_text(&self) -> String {
        self.sent().last().map(|s| s.text.clone()).unwrap_or_default()
    }

    /// Options of the last message.
    pub fn last_options(&self) -> Vec<String> {
        self.sent().last().map(|s| s.options.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MessageChannel for RecordingChannel {
    async fn send(&self, conversation_id: &str, text: &str, options: &[String]) -> Result<()> {
        self.sent.lock().unwrap().push(Sent {
            conversation_id: conversation_id.to_string(),
            text: text.to_string(),
            options: options.to_vec(),
        });
        Ok(())
    }
}

/// Routes `tracing` output to the test harness; safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
