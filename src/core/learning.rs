//! Learning from dialogue corrections.

use crate::{
    core::interpret::CompletedTransaction, entities::learned_association, errors::Result,
    repository::LearningStore,
};
use chrono::{DateTime, Utc};
use tracing::info;

/// Feeds a category the user supplied back into the learning store.
///
/// Only transactions whose category was originally unresolved and then filled in
/// through the dialogue are learned, under the keyword profile of their description.
pub async fn learn_from<S: LearningStore + ?Sized>(
    store: &S,
    done: &CompletedTransaction,
    at: DateTime<Utc>,
) -> Result<Option<learned_association::Model>> {
    let Some(keyword) = done.learning_keyword.as_deref().filter(|_| done.category_corrected) else {
        return Ok(None);
    };
    let association = store
        .reinforce(keyword, &done.category, done.subcategory.as_deref(), at)
        .await?;
    info!(
        keyword,
        category = %association.category,
        confidence = association.confidence,
        "association reinforced"
    );
    Ok(Some(association))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::{
            interpret::{Knowledge, interpret},
            resolve::{CategorySource, resolve_category},
        },
        repository::MemoryStore,
        test_utils::{date, sample_knowledge},
    };

    fn corrected(knowledge: &Knowledge) -> CompletedTransaction {
        let draft = interpret("spent 30 at the fair", date("2025-03-10"), knowledge).unwrap();
        CompletedTransaction {
            kind: draft.kind,
            amount: 30.0,
            account: "checking".to_string(),
            destination: None,
            category: "Food".to_string(),
            subcategory: Some("Groceries".to_string()),
            method: crate::core::kinds::PaymentMethod::Debit,
            description: draft.description,
            installments: 1,
            date: draft.date,
            original_category: None,
            category_corrected: true,
            learning_keyword: draft.learning_keyword,
        }
    }

    #[tokio::test]
    async fn test_second_correction_auto_applies() -> Result<()> {
        let store = MemoryStore::new();
        let mut knowledge = sample_knowledge();
        let done = corrected(&knowledge);
        assert_eq!(done.learning_keyword.as_deref(), Some("fair"));

        let first = learn_from(&store, &done, Utc::now()).await?.unwrap();
        assert_eq!(first.confidence, 1);
        knowledge.learned = store.list_associations().await?;
        assert!(resolve_category("spent 12 at the fair", done.kind, &knowledge.lexicon, &knowledge.learned, 2).is_none());

        learn_from(&store, &done, Utc::now()).await?;
        knowledge.learned = store.list_associations().await?;
        let hit = resolve_category("spent 12 at the fair", done.kind, &knowledge.lexicon, &knowledge.learned, 2).unwrap();
        assert_eq!(hit.source, CategorySource::Learned);
        assert_eq!(hit.subcategory.as_deref(), Some("Groceries"));
        Ok(())
    }

    #[tokio::test]
    async fn test_uncorrected_category_not_learned() -> Result<()> {
        let store = MemoryStore::new();
        let done = CompletedTransaction {
            category_corrected: false,
            ..corrected(&sample_knowledge())
        };
        assert!(learn_from(&store, &done, Utc::now()).await?.is_none());
        assert!(store.list_associations().await?.is_empty());
        Ok(())
    }
}
