//! Database configuration module for `LedgerBuddy`.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs without hand-written SQL.

use crate::entities::{Account, EphemeralState, LearnedAssociation, LexiconEntry, Transaction};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::path::Path;

/// Default location of the ledger database.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/ledger_buddy.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable, or the default
/// local `SQLite` file.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// File path of a `sqlite://` URL, without query parameters. `None` for in-memory
/// databases and other backends.
fn sqlite_file_path(url: &str) -> Option<&Path> {
    let path = url.strip_prefix("sqlite://")?.split('?').next()?;
    (!path.is_empty() && !path.starts_with(":memory:")).then(|| Path::new(path))
}

/// Establishes a connection to the `SQLite` database named by `DATABASE_URL`,
/// creating the directory of the database file first.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let url = get_database_url();
    if let Some(dir) = sqlite_file_path(&url)
        .and_then(Path::parent)
        .filter(|dir| !dir.as_os_str().is_empty())
    {
        std::fs::create_dir_all(dir)?;
    }
    Database::connect(&url).await.map_err(Into::into)
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()> {
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates every table that does not exist yet.
///
/// Covers accounts, transactions, learned associations, lexicon rows, and ephemeral state.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, Account).await?;
    create_table(db, &schema, Transaction).await?;
    create_table(db, &schema, LearnedAssociation).await?;
    create_table(db, &schema, LexiconEntry).await?;
    create_table(db, &schema, EphemeralState).await?;

    Ok(())
}
