//! Ledger reconciliation engine.
//!
//! Balances are maintained two ways that must always agree:
//! - **full recompute** replays every entry in transaction-date order from the opening
//!   balances and writes the result back ([`LedgerEngine::recompute`]);
//! - **incremental** adjustment applies only the signed effect of the entries just
//!   appended or removed ([`LedgerEngine::record`], [`LedgerEngine::reverse`]).
//!
//! Both paths share [`effect`] and the consolidated-invoice roll-up rule, and every
//! mutation runs under one ledger-wide lock with a bounded wait.

use crate::{
    core::{
        billing::BillingCycle,
        interpret::{CompletedTransaction, Knowledge},
        kinds::{AccountKind, EntrySide, TransactionKind},
    },
    entities::{account, transaction},
    errors::{Error, Result},
    repository::{LedgerStore, NewTransaction},
};
use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, instrument, warn};

/// Status of a card charge not yet paid off.
pub const STATUS_PENDING: &str = "pending";
/// Status of an entry that already moved money.
pub const STATUS_SETTLED: &str = "settled";

/// Signed effect of one entry on its account's stored balance.
///
/// Checking and cash accounts hold money: credits add, debits subtract. Card-like
/// accounts hold what is owed: debits (charges) add to the pending total, credits
/// (invoice payments, refunds) reduce it.
#[must_use]
pub fn effect(kind: AccountKind, side: EntrySide, amount: f64) -> f64 {
    match (kind.tracks_pending(), side) {
        (false, EntrySide::Credit) | (true, EntrySide::Debit) => amount,
        (false, EntrySide::Debit) | (true, EntrySide::Credit) => -amount,
    }
}

/// Derived state of one account.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountBalance {
    /// Normalized key
    pub key: String,
    /// Display name
    pub name: String,
    /// Kind
    pub kind: AccountKind,
    /// Stored balance: money held, or for cards opening balance plus pending total
    pub balance: f64,
    /// Sum of outstanding charges (cards and consolidated invoices only)
    pub pending_total: f64,
    /// Charges due in the month after the snapshot date
    pub current_statement: f64,
}

/// Balances of every account, as of one date. Returned by value, never shared.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceSnapshot {
    /// Date the "current statement" is measured against
    pub as_of: NaiveDate,
    /// One row per account in account order
    pub accounts: Vec<AccountBalance>,
}

impl BalanceSnapshot {
    /// Row for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AccountBalance> {
        self.accounts.iter().find(|a| a.key == key)
    }

    /// Money held minus money owed, counting each card once (parents excluded).
    #[must_use]
    pub fn net_worth(&self) -> f64 {
        self.accounts
            .iter()
            .map(|a| match a.kind {
                AccountKind::Checking | AccountKind::Cash => a.balance,
                AccountKind::CreditCard => -a.balance,
                AccountKind::ConsolidatedInvoice => 0.0,
            })
            .sum()
    }
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// Rebuilds every balance from scratch.
///
/// Entries are replayed in transaction-date order regardless of how `entries` is
/// sorted. Entries against unknown accounts or directly against a consolidated
/// invoice are skipped with a warning.
pub fn compute_snapshot(
    accounts: &[account::Model],
    entries: &[transaction::Model],
    as_of: NaiveDate,
) -> Result<BalanceSnapshot> {
    let mut rows = accounts
        .iter()
        .map(|a| {
            Ok(AccountBalance {
                key: a.key.clone(),
                name: a.name.clone(),
                kind: a.account_kind()?,
                balance: a.opening_balance,
                pending_total: 0.0,
                current_statement: 0.0,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let index: HashMap<String, usize> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| (row.key.clone(), i))
        .collect();

    let next_month = as_of
        .with_day(1)
        .and_then(|d| d.checked_add_months(Months::new(1)))
        .unwrap_or(as_of);

    let mut ordered: Vec<&transaction::Model> = entries.iter().collect();
    ordered.sort_by_key(|t| (t.date, t.id));

    for entry in ordered {
        let Some(&i) = index.get(&entry.account_key) else {
            warn!(entry_id = entry.id, account = %entry.account_key, "entry for unknown account skipped");
            continue;
        };
        let row = &mut rows[i];
        if row.kind == AccountKind::ConsolidatedInvoice {
            warn!(entry_id = entry.id, account = %entry.account_key, "direct entry on consolidated invoice ignored");
            continue;
        }
        let side = entry.entry_side()?;
        let delta = effect(row.kind, side, entry.amount);
        row.balance += delta;
        if row.kind.tracks_pending() {
            row.pending_total += delta;
            if side == EntrySide::Debit && entry.due_date.is_some_and(|due| same_month(due, next_month)) {
                row.current_statement += entry.amount;
            }
        }
    }

    // roll cards up into their consolidated invoice
    for account in accounts {
        let Some(parent_key) = account.parent_key.as_deref() else {
            continue;
        };
        let (Some(&child), Some(&parent)) = (index.get(&account.key), index.get(parent_key)) else {
            warn!(account = %account.key, parent = parent_key, "parent account missing");
            continue;
        };
        if rows[parent].kind != AccountKind::ConsolidatedInvoice {
            continue;
        }
        let (pending, statement) = (rows[child].pending_total, rows[child].current_statement);
        let parent_row = &mut rows[parent];
        parent_row.pending_total += pending;
        parent_row.current_statement += statement;
        parent_row.balance += pending;
    }

    Ok(BalanceSnapshot {
        as_of,
        accounts: rows,
    })
}

fn billing_cycle(account: &account::Model) -> Result<Option<BillingCycle>> {
    let (Some(closing), Some(due)) = (account.closing_day, account.due_day) else {
        return Ok(None);
    };
    let day = |value: i32, field: &'static str| {
        u32::try_from(value).map_err(|_| Error::InvalidValue {
            field,
            value: value.to_string(),
        })
    };
    Ok(Some(BillingCycle {
        closing_day: day(closing, "closing_day")?,
        due_day: day(due, "due_day")?,
        policy: account.policy()?,
    }))
}

/// Splits `amount` into `parts` cent-exact shares, the remainder on the last one.
#[must_use]
pub fn split_installments(amount: f64, parts: u32) -> Vec<f64> {
    let parts = parts.max(1);
    #[allow(clippy::cast_possible_truncation)]
    let cents = (amount * 100.0).round() as i64;
    let base = cents / i64::from(parts);
    let last = cents - base * i64::from(parts - 1);
    #[allow(clippy::cast_precision_loss)]
    let to_amount = |cents: i64| cents as f64 / 100.0;
    (1..parts)
        .map(|_| to_amount(base))
        .chain(std::iter::once(to_amount(last)))
        .collect()
}

/// Who recorded a transaction and under which id its entries are grouped.
#[derive(Debug, Clone)]
pub struct Provenance<'a> {
    /// User that sent the message
    pub registered_by: &'a str,
    /// Write time
    pub registered_at: DateTime<Utc>,
    /// Shared id of linked entries (both legs of a transfer)
    pub group_id: &'a str,
}

fn postable_account<'k>(knowledge: &'k Knowledge, key: &str) -> Result<(&'k account::Model, AccountKind)> {
    let account = knowledge.account(key).ok_or_else(|| Error::AccountNotFound {
        name: key.to_string(),
    })?;
    let kind = account.account_kind()?;
    if kind == AccountKind::ConsolidatedInvoice {
        return Err(Error::ConsolidatedInvoicePosting {
            name: account.name.clone(),
        });
    }
    Ok((account, kind))
}

/// Turns a completed transaction into the ledger entries that represent it.
///
/// - transfers become two legs, debit on the origin and credit on the destination;
/// - card charges in N installments become N entries with their own due dates;
/// - everything else becomes a single entry.
pub fn build_entries(
    done: &CompletedTransaction,
    knowledge: &Knowledge,
    provenance: &Provenance<'_>,
) -> Result<Vec<NewTransaction>> {
    if !done.amount.is_finite() || done.amount <= 0.0 {
        return Err(Error::InvalidAmount {
            amount: done.amount,
        });
    }
    let (account, kind) = postable_account(knowledge, &done.account)?;

    let entry = |account_key: &str, side: EntrySide, amount: f64, status: &str| NewTransaction {
        date: done.date,
        description: done.description.clone(),
        category: done.category.clone(),
        subcategory: done.subcategory.clone(),
        original_category: done.original_category.clone(),
        kind: done.kind,
        side,
        amount,
        payment_method: done.method,
        account_key: account_key.to_string(),
        installment_total: 1,
        installment_current: 1,
        due_date: None,
        status: status.to_string(),
        transfer_group: None,
        registered_by: provenance.registered_by.to_string(),
        registered_at: provenance.registered_at,
    };

    if done.kind == TransactionKind::Transfer {
        let (destination, _) =
            postable_account(knowledge, done.destination.as_deref().unwrap_or_default())?;
        let group = Some(provenance.group_id.to_string());
        let origin_status = if kind == AccountKind::CreditCard {
            STATUS_PENDING
        } else {
            STATUS_SETTLED
        };
        return Ok(vec![
            NewTransaction {
                transfer_group: group.clone(),
                ..entry(&account.key, EntrySide::Debit, done.amount, origin_status)
            },
            NewTransaction {
                transfer_group: group,
                ..entry(&destination.key, EntrySide::Credit, done.amount, STATUS_SETTLED)
            },
        ]);
    }

    let side = EntrySide::for_kind(done.kind);
    if kind != AccountKind::CreditCard {
        return Ok(vec![entry(&account.key, side, done.amount, STATUS_SETTLED)]);
    }

    let Some(cycle) = billing_cycle(account)? else {
        warn!(account = %account.key, "card without billing days, due date left empty");
        return Ok(vec![entry(&account.key, side, done.amount, STATUS_PENDING)]);
    };
    let installments = if side == EntrySide::Debit {
        done.installments.max(1)
    } else {
        1
    };
    let total = i32::try_from(installments).map_err(|_| Error::InvalidValue {
        field: "installments",
        value: installments.to_string(),
    })?;
    let due_dates = cycle.installment_due_dates(done.date, installments);
    let amounts = split_installments(done.amount, installments);

    Ok(due_dates
        .into_iter()
        .zip(amounts)
        .zip(1..)
        .map(|((due, amount), current)| NewTransaction {
            installment_total: total,
            installment_current: current,
            due_date: Some(due),
            ..entry(&account.key, side, amount, STATUS_PENDING)
        })
        .collect())
}

/// Owns the ledger lock and both reconciliation paths.
pub struct LedgerEngine<S: ?Sized> {
    store: Arc<S>,
    lock: Arc<Mutex<()>>,
    lock_timeout: Duration,
}

impl<S: ?Sized> Clone for LedgerEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            lock: Arc::clone(&self.lock),
            lock_timeout: self.lock_timeout,
        }
    }
}

impl<S: LedgerStore + ?Sized> LedgerEngine<S> {
    /// Creates an engine with its own lock.
    #[must_use]
    pub fn new(store: Arc<S>, lock_timeout: Duration) -> Self {
        Self::with_lock(store, Arc::new(Mutex::new(())), lock_timeout)
    }

    /// Creates an engine sharing `lock` with other writers of the same ledger.
    #[must_use]
    pub const fn with_lock(store: Arc<S>, lock: Arc<Mutex<()>>, lock_timeout: Duration) -> Self {
        Self {
            store,
            lock,
            lock_timeout,
        }
    }

    async fn acquire(&self, operation: &'static str) -> Result<MutexGuard<'_, ()>> {
        tokio::time::timeout(self.lock_timeout, self.lock.lock())
            .await
            .map_err(|_| Error::LedgerLockTimeout {
                operation,
                waited_secs: self.lock_timeout.as_secs(),
            })
    }

    /// Full recompute: rebuilds every balance and writes it back.
    ///
    /// Nothing is written unless the lock is acquired.
    #[instrument(skip(self))]
    pub async fn recompute(&self, as_of: NaiveDate) -> Result<BalanceSnapshot> {
        let _guard = self.acquire("recompute").await?;
        let accounts = self.store.list_accounts().await?;
        let entries = self.store.list_all().await?;
        let snapshot = compute_snapshot(&accounts, &entries, as_of)?;
        for row in &snapshot.accounts {
            self.store.set_account_balance(&row.key, row.balance).await?;
        }
        info!(accounts = snapshot.accounts.len(), entries = entries.len(), "balances recomputed");
        Ok(snapshot)
    }

    /// Appends `entries` atomically and applies their effect incrementally.
    #[instrument(skip(self, entries), fields(count = entries.len()))]
    pub async fn record(&self, entries: Vec<NewTransaction>) -> Result<Vec<transaction::Model>> {
        let _guard = self.acquire("record").await?;
        let written = self.store.append(entries).await?;
        self.adjust(&written, 1.0).await?;
        info!(ids = ?written.iter().map(|t| t.id).collect::<Vec<_>>(), "entries recorded");
        Ok(written)
    }

    /// Removes entries and takes their effect back out of the stored balances.
    #[instrument(skip(self))]
    pub async fn reverse(&self, ids: &[i64]) -> Result<Vec<transaction::Model>> {
        let _guard = self.acquire("reverse").await?;
        let removed = self.store.remove_transactions(ids).await?;
        self.adjust(&removed, -1.0).await?;
        info!(count = removed.len(), "entries reversed");
        Ok(removed)
    }

    /// Incremental path. Must run under the lock.
    async fn adjust(&self, entries: &[transaction::Model], sign: f64) -> Result<()> {
        let accounts = self.store.list_accounts().await?;
        let mut deltas: Vec<(String, f64)> = Vec::new();
        let mut add = |key: &str, delta: f64| match deltas.iter_mut().find(|(k, _)| k == key) {
            Some((_, total)) => *total += delta,
            None => deltas.push((key.to_string(), delta)),
        };

        for entry in entries {
            let Some(account) = accounts.iter().find(|a| a.key == entry.account_key) else {
                warn!(entry_id = entry.id, account = %entry.account_key, "entry for unknown account skipped");
                continue;
            };
            let kind = account.account_kind()?;
            if kind == AccountKind::ConsolidatedInvoice {
                warn!(entry_id = entry.id, account = %account.key, "direct entry on consolidated invoice ignored");
                continue;
            }
            let delta = sign * effect(kind, entry.entry_side()?, entry.amount);
            add(&account.key, delta);
            if let Some(parent) = account.parent_key.as_deref() {
                let is_invoice = accounts
                    .iter()
                    .find(|a| a.key == parent)
                    .is_some_and(|a| a.account_kind().ok() == Some(AccountKind::ConsolidatedInvoice));
                if is_invoice {
                    add(parent, delta);
                }
            }
        }

        for (key, delta) in deltas {
            let current = self
                .store
                .get_account(&key)
                .await?
                .ok_or_else(|| Error::AccountNotFound { name: key.clone() })?;
            self.store
                .set_account_balance(&key, current.balance + delta)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::kinds::PaymentMethod;
    use crate::repository::MemoryStore;
    use crate::test_utils::{date, new_expense, sample_knowledge, seeded_memory_store};

    fn engine(store: &Arc<MemoryStore>) -> LedgerEngine<MemoryStore> {
        LedgerEngine::new(Arc::clone(store), Duration::from_secs(5))
    }

    fn round(value: f64) -> f64 {
        (value * 100.0).round() / 100.0
    }

    async fn stored_balances(store: &MemoryStore) -> Result<Vec<(String, f64)>> {
        Ok(store
            .list_accounts()
            .await?
            .into_iter()
            .map(|a| (a.key, round(a.balance)))
            .collect())
    }

    fn completed(text_account: &str, amount: f64, installments: u32) -> CompletedTransaction {
        CompletedTransaction {
            kind: TransactionKind::Expense,
            amount,
            account: text_account.to_string(),
            destination: None,
            category: "Food".to_string(),
            subcategory: Some("Restaurant".to_string()),
            method: PaymentMethod::Credit,
            description: "Dinner".to_string(),
            installments,
            date: date("2025-03-20"),
            original_category: Some("Food".to_string()),
            category_corrected: false,
            learning_keyword: Some("dinner".to_string()),
        }
    }

    fn provenance() -> Provenance<'static> {
        Provenance {
            registered_by: "alice",
            registered_at: Utc::now(),
            group_id: "evt-1",
        }
    }

    #[test]
    fn test_effect_signs() {
        assert_eq!(effect(AccountKind::Checking, EntrySide::Debit, 10.0), -10.0);
        assert_eq!(effect(AccountKind::Cash, EntrySide::Credit, 10.0), 10.0);
        assert_eq!(effect(AccountKind::CreditCard, EntrySide::Debit, 10.0), 10.0);
        assert_eq!(effect(AccountKind::CreditCard, EntrySide::Credit, 10.0), -10.0);
    }

    #[test]
    fn test_split_installments_remainder_on_last() {
        assert_eq!(split_installments(100.0, 3), vec![33.33, 33.33, 33.34]);
        assert_eq!(split_installments(50.0, 0), vec![50.0]);
    }

    #[test]
    fn test_card_installments_get_due_dates() -> Result<()> {
        let knowledge = sample_knowledge();
        let entries = build_entries(&completed("nubank", 300.0, 3), &knowledge, &provenance())?;
        assert_eq!(entries.len(), 3);
        // nubank closes on the 15th and is due on the 22nd; the 20th is past closing
        let due: Vec<_> = entries.iter().map(|e| e.due_date.unwrap()).collect();
        assert_eq!(due, vec![date("2025-05-22"), date("2025-06-22"), date("2025-07-22")]);
        assert!(entries.iter().all(|e| e.status == STATUS_PENDING && e.installment_total == 3));
        assert_eq!(entries[2].installment_current, 3);
        Ok(())
    }

    #[test]
    fn test_installments_ignored_off_card() -> Result<()> {
        let entries = build_entries(&completed("checking", 300.0, 3), &sample_knowledge(), &provenance())?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, STATUS_SETTLED);
        assert_eq!(entries[0].due_date, None);
        Ok(())
    }

    #[test]
    fn test_transfer_builds_two_linked_legs() -> Result<()> {
        let done = CompletedTransaction {
            kind: TransactionKind::Transfer,
            destination: Some("wallet".to_string()),
            method: PaymentMethod::BankTransfer,
            ..completed("checking", 80.0, 1)
        };
        let entries = build_entries(&done, &sample_knowledge(), &provenance())?;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].side, EntrySide::Debit);
        assert_eq!(entries[1].side, EntrySide::Credit);
        assert_eq!(entries[1].account_key, "wallet");
        assert!(entries.iter().all(|e| e.transfer_group.as_deref() == Some("evt-1")));
        Ok(())
    }

    #[test]
    fn test_consolidated_invoice_cannot_be_posted_to() {
        let knowledge = sample_knowledge();
        let direct = build_entries(&completed("family invoice", 30.0, 1), &knowledge, &provenance());
        assert!(matches!(direct, Err(Error::ConsolidatedInvoicePosting { .. })));

        let payment = CompletedTransaction {
            kind: TransactionKind::Transfer,
            destination: Some("family invoice".to_string()),
            method: PaymentMethod::BankTransfer,
            ..completed("checking", 500.0, 1)
        };
        let result = build_entries(&payment, &knowledge, &provenance());
        assert!(matches!(result, Err(Error::ConsolidatedInvoicePosting { .. })));
    }

    #[test]
    fn test_unknown_account_rejected() {
        let result = build_entries(&completed("nowhere", 10.0, 1), &sample_knowledge(), &provenance());
        assert!(matches!(result, Err(Error::AccountNotFound { .. })));
    }

    #[tokio::test]
    async fn test_incremental_matches_full_recompute() -> Result<()> {
        let store = Arc::new(seeded_memory_store().await?);
        let engine = engine(&store);
        engine
            .record(vec![new_expense("checking", 120.0, "2025-03-01"), new_expense("nubank", 45.5, "2025-03-02")])
            .await?;
        engine.record(vec![new_expense("wallet", 12.25, "2025-02-27")]).await?;

        let incremental = stored_balances(&store).await?;
        engine.recompute(date("2025-03-10")).await?;
        let recomputed = stored_balances(&store).await?;
        assert_eq!(incremental, recomputed);

        let balances: HashMap<_, _> = recomputed.into_iter().collect();
        assert_eq!(balances["checking"], 880.0);
        assert_eq!(balances["wallet"], 37.75);
        assert_eq!(balances["nubank"], 45.5);
        Ok(())
    }

    #[tokio::test]
    async fn test_consolidated_invoice_rolls_up_cards() -> Result<()> {
        let store = Arc::new(seeded_memory_store().await?);
        let engine = engine(&store);
        engine
            .record(vec![new_expense("nubank", 100.0, "2025-03-01"), new_expense("visa gold", 40.0, "2025-03-01")])
            .await?;
        // ignored by both paths
        engine.record(vec![new_expense("family invoice", 999.0, "2025-03-01")]).await?;

        let incremental = stored_balances(&store).await?;
        let snapshot = engine.recompute(date("2025-03-10")).await?;
        assert_eq!(incremental, stored_balances(&store).await?);

        let invoice = snapshot.get("family invoice").unwrap();
        assert_eq!(invoice.pending_total, 140.0);
        assert_eq!(invoice.balance, 140.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_current_statement_counts_next_month_dues() -> Result<()> {
        let store = Arc::new(seeded_memory_store().await?);
        let engine = engine(&store);
        let knowledge = sample_knowledge();
        // bought on 2025-03-10, before closing: due 2025-04-22, then 05-22
        let done = CompletedTransaction {
            date: date("2025-03-10"),
            ..completed("nubank", 200.0, 2)
        };
        engine.record(build_entries(&done, &knowledge, &provenance())?).await?;

        let snapshot = engine.recompute(date("2025-03-31")).await?;
        let nubank = snapshot.get("nubank").unwrap();
        assert_eq!(nubank.pending_total, 200.0);
        assert_eq!(nubank.current_statement, 100.0);
        assert_eq!(snapshot.get("family invoice").unwrap().current_statement, 100.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_recompute_orders_by_transaction_date() -> Result<()> {
        let accounts = seeded_memory_store().await?.list_accounts().await?;
        let mut later = transaction::Model {
            id: 1,
            date: date("2025-03-05"),
            description: "Later".to_string(),
            category: "Food".to_string(),
            subcategory: None,
            original_category: None,
            kind: "expense".to_string(),
            side: "debit".to_string(),
            amount: 10.0,
            payment_method: "debit".to_string(),
            account_key: "checking".to_string(),
            installment_total: 1,
            installment_current: 1,
            due_date: None,
            status: STATUS_SETTLED.to_string(),
            transfer_group: None,
            registered_by: "alice".to_string(),
            registered_at: Utc::now(),
        };
        let mut earlier = later.clone();
        earlier.id = 2;
        earlier.date = date("2025-03-01");
        later.amount = 5.0;

        let forward = compute_snapshot(&accounts, &[earlier.clone(), later.clone()], date("2025-03-10"))?;
        let backward = compute_snapshot(&accounts, &[later, earlier], date("2025-03-10"))?;
        assert_eq!(forward, backward);
        assert_eq!(forward.get("checking").unwrap().balance, 985.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_reverse_restores_balances() -> Result<()> {
        let store = Arc::new(seeded_memory_store().await?);
        let engine = engine(&store);
        let before = stored_balances(&store).await?;
        let written = engine
            .record(vec![new_expense("nubank", 70.0, "2025-03-01"), new_expense("checking", 30.0, "2025-03-01")])
            .await?;
        let ids: Vec<i64> = written.iter().map(|t| t.id).collect();
        let removed = engine.reverse(&ids).await?;
        assert_eq!(removed.len(), 2);
        assert_eq!(stored_balances(&store).await?, before);
        assert!(store.list_all().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_lock_timeout_aborts_without_writing() -> Result<()> {
        let store = Arc::new(seeded_memory_store().await?);
        let lock = Arc::new(Mutex::new(()));
        let engine = LedgerEngine::with_lock(Arc::clone(&store), Arc::clone(&lock), Duration::from_millis(50));

        let _held = lock.lock().await;
        let result = engine.record(vec![new_expense("checking", 10.0, "2025-03-01")]).await;
        assert!(matches!(result, Err(Error::LedgerLockTimeout { operation: "record", .. })));
        assert!(store.list_all().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_records_serialize() -> Result<()> {
        let store = Arc::new(seeded_memory_store().await?);
        let engine = engine(&store);
        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move { engine.record(vec![new_expense("checking", 1.0, "2025-03-01")]).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap()?;
        }
        let checking = store.get_account("Checking").await?.unwrap();
        assert_eq!(round(checking.balance), 990.0);
        Ok(())
    }
}
