//! Ephemeral state entity - TTL-bound key/value rows that survive between invocations.
//!
//! Holds dialogue state and processed-event markers. A row whose `expires_at` has
//! passed is treated as absent.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ephemeral state database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ephemeral_state")]
pub struct Model {
    /// Lookup key (e.g. `"dialogue:<conversation>"`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    /// Serialized value
    pub value: String,
    /// Instant after which the row no longer exists
    pub expires_at: DateTimeUtc,
}

/// No relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
