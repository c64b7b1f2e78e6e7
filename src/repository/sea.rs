//! `SeaORM` implementation of the repository traits.
//!
//! Multi-row appends run inside a database transaction so a transfer never lands
//! with only one leg.

use super::{
    EphemeralStore, LearningStore, LedgerStore, LexiconStore, NewAccount, NewLexiconEntry,
    NewTransaction, ttl_to_chrono,
};
use crate::{
    core::normalize::normalized_key,
    entities::{
        Account, EphemeralState, LearnedAssociation, LexiconEntry, Transaction, account,
        ephemeral_state, learned_association, lexicon_entry, transaction,
    },
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*, sea_query::OnConflict,
};
use std::time::Duration;
use tracing::debug;

/// Repository backed by a `SeaORM` connection.
#[derive(Debug, Clone)]
pub struct SeaStore {
    db: DatabaseConnection,
}

impl SeaStore {
    /// Wraps an open connection whose tables already exist.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<()> {
        let purged = EphemeralState::delete_many()
            .filter(ephemeral_state::Column::ExpiresAt.lte(now))
            .exec(&self.db)
            .await?;
        if purged.rows_affected > 0 {
            debug!(rows = purged.rows_affected, "expired ephemeral state purged");
        }
        Ok(())
    }
}

fn to_active(entry: NewTransaction) -> transaction::ActiveModel {
    transaction::ActiveModel {
        date: Set(entry.date),
        description: Set(entry.description),
        category: Set(entry.category),
        subcategory: Set(entry.subcategory),
        original_category: Set(entry.original_category),
        kind: Set(entry.kind.as_str().to_string()),
        side: Set(entry.side.as_str().to_string()),
        amount: Set(entry.amount),
        payment_method: Set(entry.payment_method.as_str().to_string()),
        account_key: Set(entry.account_key),
        installment_total: Set(entry.installment_total),
        installment_current: Set(entry.installment_current),
        due_date: Set(entry.due_date),
        status: Set(entry.status),
        transfer_group: Set(entry.transfer_group),
        registered_by: Set(entry.registered_by),
        registered_at: Set(entry.registered_at),
        ..Default::default()
    }
}

#[async_trait]
impl LedgerStore for SeaStore {
    async fn append(&self, entries: Vec<NewTransaction>) -> Result<Vec<transaction::Model>> {
        // Use a transaction to ensure atomicity
        let txn = self.db.begin().await?;
        let mut written = Vec::with_capacity(entries.len());
        for entry in entries {
            written.push(to_active(entry).insert(&txn).await?);
        }
        txn.commit().await?;
        Ok(written)
    }

    async fn list_all(&self) -> Result<Vec<transaction::Model>> {
        Transaction::find()
            .order_by_asc(transaction::Column::Date)
            .order_by_asc(transaction::Column::Id)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn remove_transactions(&self, ids: &[i64]) -> Result<Vec<transaction::Model>> {
        let txn = self.db.begin().await?;
        let existing = Transaction::find()
            .filter(transaction::Column::Id.is_in(ids.iter().copied()))
            .all(&txn)
            .await?;
        Transaction::delete_many()
            .filter(transaction::Column::Id.is_in(ids.iter().copied()))
            .exec(&txn)
            .await?;
        txn.commit().await?;
        Ok(existing)
    }

    async fn get_account(&self, name: &str) -> Result<Option<account::Model>> {
        Account::find()
            .filter(account::Column::Key.eq(normalized_key(name)))
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn list_accounts(&self) -> Result<Vec<account::Model>> {
        Account::find()
            .order_by_asc(account::Column::Id)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn set_account_balance(&self, name: &str, value: f64) -> Result<()> {
        use sea_orm::sea_query::Expr;

        let result = Account::update_many()
            .col_expr(account::Column::Balance, Expr::value(value))
            .filter(account::Column::Key.eq(normalized_key(name)))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(Error::AccountNotFound {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    async fn add_account(&self, new: NewAccount) -> Result<account::Model> {
        let model = account::ActiveModel {
            key: Set(normalized_key(&new.name)),
            name: Set(new.name.trim().to_string()),
            kind: Set(new.kind.as_str().to_string()),
            opening_balance: Set(new.opening_balance),
            balance: Set(new.opening_balance),
            credit_limit: Set(new.credit_limit),
            closing_day: Set(new.closing_day.and_then(|d| i32::try_from(d).ok())),
            due_day: Set(new.due_day.and_then(|d| i32::try_from(d).ok())),
            closing_policy: Set(new.closing_policy.as_str().to_string()),
            parent_key: Set(new.parent.as_deref().map(normalized_key)),
            ..Default::default()
        };
        Ok(model.insert(&self.db).await?)
    }
}

#[async_trait]
impl LearningStore for SeaStore {
    async fn list_associations(&self) -> Result<Vec<learned_association::Model>> {
        LearnedAssociation::find()
            .order_by_asc(learned_association::Column::Id)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn reinforce(
        &self,
        keyword: &str,
        category: &str,
        subcategory: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<learned_association::Model> {
        let existing = LearnedAssociation::find()
            .filter(learned_association::Column::Keyword.eq(keyword))
            .one(&self.db)
            .await?;

        if let Some(assoc) = existing {
            let same_mapping =
                assoc.category == category && assoc.subcategory.as_deref() == subcategory;
            let confidence = if same_mapping { assoc.confidence + 1 } else { 1 };
            let mut active: learned_association::ActiveModel = assoc.into();
            active.category = Set(category.to_string());
            active.subcategory = Set(subcategory.map(str::to_string));
            active.confidence = Set(confidence);
            active.last_updated = Set(at);
            return Ok(active.update(&self.db).await?);
        }

        let active = learned_association::ActiveModel {
            keyword: Set(keyword.to_string()),
            category: Set(category.to_string()),
            subcategory: Set(subcategory.map(str::to_string)),
            confidence: Set(1),
            last_updated: Set(at),
            ..Default::default()
        };
        Ok(active.insert(&self.db).await?)
    }
}

#[async_trait]
impl EphemeralStore for SeaStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let Some(row) = EphemeralState::find_by_id(key.to_string())
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };
        if row.expires_at <= Utc::now() {
            // Lazily drop expired rows
            EphemeralState::delete_by_id(key.to_string())
                .exec(&self.db)
                .await?;
            return Ok(None);
        }
        Ok(Some(row.value))
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let now = Utc::now();
        self.purge_expired(now).await?;
        EphemeralState::insert(ephemeral_state::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value),
            expires_at: Set(now + ttl_to_chrono(ttl)),
        })
        .on_conflict(
            OnConflict::column(ephemeral_state::Column::Key)
                .update_columns([ephemeral_state::Column::Value, ephemeral_state::Column::ExpiresAt])
                .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await?;
        Ok(())
    }

    async fn put_if_absent(&self, key: &str, value: String, ttl: Duration) -> Result<bool> {
        let now = Utc::now();
        // an expired row must not block the claim
        self.purge_expired(now).await?;
        let inserted = EphemeralState::insert(ephemeral_state::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value),
            expires_at: Set(now + ttl_to_chrono(ttl)),
        })
        .on_conflict(
            OnConflict::column(ephemeral_state::Column::Key)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await?;
        Ok(inserted > 0)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        EphemeralState::delete_by_id(key.to_string())
            .exec(&self.db)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl LexiconStore for SeaStore {
    async fn load_lexicon(&self) -> Result<Vec<lexicon_entry::Model>> {
        LexiconEntry::find()
            .order_by_asc(lexicon_entry::Column::Position)
            .order_by_asc(lexicon_entry::Column::Id)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn add_lexicon_entries(&self, entries: Vec<NewLexiconEntry>) -> Result<()> {
        let start = i32::try_from(LexiconEntry::find().count(&self.db).await?).unwrap_or(i32::MAX);
        let txn = self.db.begin().await?;
        for (offset, entry) in (0_i32..).zip(entries) {
            lexicon_entry::ActiveModel {
                position: Set(start.saturating_add(offset)),
                tag: Set(entry.tag),
                keyword: Set(entry.keyword),
                value: Set(entry.value),
                required_kind: Set(entry.required_kind),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
        txn.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::kinds::{AccountKind, ClosingPolicy};
    use crate::test_utils::{new_expense, setup_sea_store};

    #[tokio::test]
    async fn test_append_and_list_in_date_order() -> Result<()> {
        let store = setup_sea_store().await?;
        let late = new_expense("checking", 10.0, "2025-03-10");
        let early = new_expense("checking", 20.0, "2025-03-01");
        store.append(vec![late, early]).await?;

        let all = store.list_all().await?;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].amount, 20.0);
        assert_eq!(all[1].amount, 10.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_account_lookup_is_accent_and_case_insensitive() -> Result<()> {
        let store = setup_sea_store().await?;
        store
            .add_account(NewAccount {
                name: "Poupança Família".to_string(),
                kind: AccountKind::Checking,
                opening_balance: 100.0,
                credit_limit: None,
                closing_day: None,
                due_day: None,
                closing_policy: ClosingPolicy::Standard,
                parent: None,
            })
            .await?;

        let found = store.get_account("POUPANCA familia").await?.unwrap();
        assert_eq!(found.key, "poupanca familia");
        assert_eq!(found.balance, 100.0);

        store.set_account_balance("poupança família", 42.0).await?;
        assert_eq!(store.get_account("poupanca familia").await?.unwrap().balance, 42.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_set_balance_unknown_account() -> Result<()> {
        let store = setup_sea_store().await?;
        let result = store.set_account_balance("ghost", 1.0).await;
        assert!(matches!(result, Err(Error::AccountNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_ephemeral_put_overwrites_and_expires() -> Result<()> {
        let store = setup_sea_store().await?;
        store.put("dialogue:1", "a".to_string(), Duration::from_secs(60)).await?;
        store.put("dialogue:1", "b".to_string(), Duration::from_secs(60)).await?;
        assert_eq!(store.get("dialogue:1").await?.as_deref(), Some("b"));

        store.put("dialogue:1", "c".to_string(), Duration::ZERO).await?;
        assert_eq!(store.get("dialogue:1").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_markers_are_purged() -> Result<()> {
        let store = setup_sea_store().await?;
        store.put("event:a", "1".to_string(), Duration::ZERO).await?;
        store.put("event:b", "1".to_string(), Duration::ZERO).await?;
        store.put("event:c", "1".to_string(), Duration::from_secs(60)).await?;

        let keys: Vec<String> = EphemeralState::find()
            .all(&store.db)
            .await?
            .into_iter()
            .map(|row| row.key)
            .collect();
        assert_eq!(keys, vec!["event:c".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_put_if_absent_claims_once() -> Result<()> {
        let store = setup_sea_store().await?;
        assert!(store.put_if_absent("event:a", "1".to_string(), Duration::from_secs(60)).await?);
        assert!(!store.put_if_absent("event:a", "2".to_string(), Duration::from_secs(60)).await?);
        assert_eq!(store.get("event:a").await?.as_deref(), Some("1"));

        store.put("event:b", "1".to_string(), Duration::ZERO).await?;
        assert!(store.put_if_absent("event:b", "2".to_string(), Duration::from_secs(60)).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_reinforce_persists_confidence() -> Result<()> {
        let store = setup_sea_store().await?;
        let now = Utc::now();
        store.reinforce("gym", "Health", Some("Fitness"), now).await?;
        let second = store.reinforce("gym", "Health", Some("Fitness"), now).await?;
        assert_eq!(second.confidence, 2);
        assert_eq!(store.list_associations().await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_lexicon_keeps_insertion_order() -> Result<()> {
        let store = setup_sea_store().await?;
        let row = |keyword: &str| NewLexiconEntry {
            tag: "subcategory".to_string(),
            keyword: keyword.to_string(),
            value: "Food > Restaurant".to_string(),
            required_kind: None,
        };
        store.add_lexicon_entries(vec![row("b"), row("a")]).await?;
        store.add_lexicon_entries(vec![row("c")]).await?;
        let keywords: Vec<String> = store
            .load_lexicon()
            .await?
            .into_iter()
            .map(|e| e.keyword)
            .collect();
        assert_eq!(keywords, vec!["b", "a", "c"]);
        Ok(())
    }
}
