//! Lexicon entry entity - one editable keyword row.
//!
//! Rows are read ordered by `position`; order decides ties.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lexicon entry database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lexicon_entries")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Table order
    pub position: i32,
    /// `"kind"`, `"payment_method"`, `"subcategory"`, or `"account"`
    pub tag: String,
    /// Keyword as configured
    pub keyword: String,
    /// Interpreted value
    pub value: String,
    /// Only applies to this transaction kind
    pub required_kind: Option<String>,
}

/// No relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
