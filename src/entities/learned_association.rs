//! Learned association entity - keyword to category mappings reinforced by user corrections.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Learned association database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "learned_associations")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Keyword in keyword profile
    #[sea_orm(unique)]
    pub keyword: String,
    /// Category the keyword maps to
    pub category: String,
    /// Subcategory the keyword maps to
    pub subcategory: Option<String>,
    /// Reinforcement counter; auto-applied from the configured threshold upwards
    pub confidence: i32,
    /// Last reinforcement
    pub last_updated: DateTimeUtc,
}

/// No relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
