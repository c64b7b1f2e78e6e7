/// Database configuration and connection management
pub mod database;

/// Accounts and lexicon seeding from config.toml
pub mod seed;

/// Runtime settings from environment variables
pub mod settings;
