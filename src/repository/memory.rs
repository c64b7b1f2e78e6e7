//! In-process implementation of every repository trait.
//!
//! Used by the core test-suite and handy for running the assistant without a database.

use super::{
    EphemeralStore, LearningStore, LedgerStore, LexiconStore, NewAccount, NewLexiconEntry,
    NewTransaction, ttl_to_chrono,
};
use crate::{
    core::normalize::normalized_key,
    entities::{account, learned_association, lexicon_entry, transaction},
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, hash_map::Entry};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    transactions: Vec<transaction::Model>,
    accounts: Vec<account::Model>,
    associations: Vec<learned_association::Model>,
    lexicon: Vec<lexicon_entry::Model>,
    ephemeral: HashMap<String, (String, DateTime<Utc>)>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn purge_expired(&mut self, now: DateTime<Utc>) {
        self.ephemeral.retain(|_, (_, expires_at)| *expires_at > now);
    }
}

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn append(&self, entries: Vec<NewTransaction>) -> Result<Vec<transaction::Model>> {
        let mut inner = self.lock();
        let mut written = Vec::with_capacity(entries.len());
        for entry in entries {
            let id = inner.next_id();
            written.push(transaction::Model {
                id,
                date: entry.date,
                description: entry.description,
                category: entry.category,
                subcategory: entry.subcategory,
                original_category: entry.original_category,
                kind: entry.kind.as_str().to_string(),
                side: entry.side.as_str().to_string(),
                amount: entry.amount,
                payment_method: entry.payment_method.as_str().to_string(),
                account_key: entry.account_key,
                installment_total: entry.installment_total,
                installment_current: entry.installment_current,
                due_date: entry.due_date,
                status: entry.status,
                transfer_group: entry.transfer_group,
                registered_by: entry.registered_by,
                registered_at: entry.registered_at,
            });
        }
        inner.transactions.extend(written.iter().cloned());
        Ok(written)
    }

    async fn list_all(&self) -> Result<Vec<transaction::Model>> {
        let mut all = self.lock().transactions.clone();
        all.sort_by_key(|t| (t.date, t.id));
        Ok(all)
    }

    async fn remove_transactions(&self, ids: &[i64]) -> Result<Vec<transaction::Model>> {
        let mut inner = self.lock();
        let (removed, kept): (Vec<_>, Vec<_>) = inner
            .transactions
            .drain(..)
            .partition(|t| ids.contains(&t.id));
        inner.transactions = kept;
        Ok(removed)
    }

    async fn get_account(&self, name: &str) -> Result<Option<account::Model>> {
        let key = normalized_key(name);
        Ok(self.lock().accounts.iter().find(|a| a.key == key).cloned())
    }

    async fn list_accounts(&self) -> Result<Vec<account::Model>> {
        Ok(self.lock().accounts.clone())
    }

    async fn set_account_balance(&self, name: &str, value: f64) -> Result<()> {
        let key = normalized_key(name);
        let mut inner = self.lock();
        let account = inner
            .accounts
            .iter_mut()
            .find(|a| a.key == key)
            .ok_or_else(|| Error::AccountNotFound {
                name: name.to_string(),
            })?;
        account.balance = value;
        Ok(())
    }

    async fn add_account(&self, account: NewAccount) -> Result<account::Model> {
        let mut inner = self.lock();
        let id = inner.next_id();
        let model = account::Model {
            id,
            key: normalized_key(&account.name),
            name: account.name,
            kind: account.kind.as_str().to_string(),
            opening_balance: account.opening_balance,
            balance: account.opening_balance,
            credit_limit: account.credit_limit,
            closing_day: account.closing_day.and_then(|d| i32::try_from(d).ok()),
            due_day: account.due_day.and_then(|d| i32::try_from(d).ok()),
            closing_policy: account.closing_policy.as_str().to_string(),
            parent_key: account.parent.as_deref().map(normalized_key),
        };
        inner.accounts.push(model.clone());
        Ok(model)
    }
}

#[async_trait]
impl LearningStore for MemoryStore {
    async fn list_associations(&self) -> Result<Vec<learned_association::Model>> {
        Ok(self.lock().associations.clone())
    }

    async fn reinforce(
        &self,
        keyword: &str,
        category: &str,
        subcategory: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<learned_association::Model> {
        let mut inner = self.lock();
        if let Some(existing) = inner.associations.iter_mut().find(|a| a.keyword == keyword) {
            if existing.category == category && existing.subcategory.as_deref() == subcategory {
                existing.confidence += 1;
            } else {
                existing.category = category.to_string();
                existing.subcategory = subcategory.map(str::to_string);
                existing.confidence = 1;
            }
            existing.last_updated = at;
            return Ok(existing.clone());
        }
        let id = inner.next_id();
        let model = learned_association::Model {
            id,
            keyword: keyword.to_string(),
            category: category.to_string(),
            subcategory: subcategory.map(str::to_string),
            confidence: 1,
            last_updated: at,
        };
        inner.associations.push(model.clone());
        Ok(model)
    }
}

#[async_trait]
impl EphemeralStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut inner = self.lock();
        let now = Utc::now();
        let live = inner
            .ephemeral
            .get(key)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(value, _)| value.clone());
        if live.is_none() {
            inner.ephemeral.remove(key);
        }
        Ok(live)
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let now = Utc::now();
        let mut inner = self.lock();
        inner.purge_expired(now);
        inner
            .ephemeral
            .insert(key.to_string(), (value, now + ttl_to_chrono(ttl)));
        Ok(())
    }

    async fn put_if_absent(&self, key: &str, value: String, ttl: Duration) -> Result<bool> {
        let now = Utc::now();
        let mut inner = self.lock();
        inner.purge_expired(now);
        match inner.ephemeral.entry(key.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert((value, now + ttl_to_chrono(ttl)));
                Ok(true)
            }
        }
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.lock().ephemeral.remove(key);
        Ok(())
    }
}

#[async_trait]
impl LexiconStore for MemoryStore {
    async fn load_lexicon(&self) -> Result<Vec<lexicon_entry::Model>> {
        Ok(self.lock().lexicon.clone())
    }

    async fn add_lexicon_entries(&self, entries: Vec<NewLexiconEntry>) -> Result<()> {
        let mut inner = self.lock();
        for entry in entries {
            let id = inner.next_id();
            let position = i32::try_from(inner.lexicon.len()).unwrap_or(i32::MAX);
            inner.lexicon.push(lexicon_entry::Model {
                id,
                position,
                tag: entry.tag,
                keyword: entry.keyword,
                value: entry.value,
                required_kind: entry.required_kind,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[tokio::test]
    async fn test_expired_state_reads_as_absent() -> Result<()> {
        let store = MemoryStore::new();
        store.put("k", "v".to_string(), Duration::ZERO).await?;
        assert_eq!(store.get("k").await?, None);

        store.put("k", "v".to_string(), Duration::from_secs(60)).await?;
        assert_eq!(store.get("k").await?.as_deref(), Some("v"));
        store.remove("k").await?;
        assert_eq!(store.get("k").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_put_purges_expired_entries() -> Result<()> {
        let store = MemoryStore::new();
        store.put("event:a", "1".to_string(), Duration::ZERO).await?;
        store.put("event:b", "1".to_string(), Duration::ZERO).await?;
        store.put("event:c", "1".to_string(), Duration::from_secs(60)).await?;

        let keys: Vec<String> = store.lock().ephemeral.keys().cloned().collect();
        assert_eq!(keys, vec!["event:c".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_put_if_absent_claims_once() -> Result<()> {
        let store = MemoryStore::new();
        assert!(store.put_if_absent("event:a", "1".to_string(), Duration::from_secs(60)).await?);
        assert!(!store.put_if_absent("event:a", "2".to_string(), Duration::from_secs(60)).await?);
        assert_eq!(store.get("event:a").await?.as_deref(), Some("1"));

        // an expired claim no longer blocks
        store.put("event:b", "1".to_string(), Duration::ZERO).await?;
        assert!(store.put_if_absent("event:b", "2".to_string(), Duration::from_secs(60)).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_reinforce_increments_and_resets() -> Result<()> {
        let store = MemoryStore::new();
        let now = Utc::now();
        assert_eq!(store.reinforce("lunch", "Food", None, now).await?.confidence, 1);
        assert_eq!(store.reinforce("lunch", "Food", None, now).await?.confidence, 2);
        let changed = store.reinforce("lunch", "Work", None, now).await?;
        assert_eq!(changed.confidence, 1);
        assert_eq!(changed.category, "Work");
        Ok(())
    }
}
