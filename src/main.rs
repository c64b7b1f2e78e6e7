use dotenvy::dotenv;
use ledger_buddy::{
    bot::{self, BotData},
    config::{database, seed, settings::AssistantSettings},
    core::assistant::Assistant,
    errors::{Error, Result},
    repository::SeaStore,
};
use std::{env, sync::Arc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Runtime settings and seed configuration
    let settings = AssistantSettings::from_env()
        .inspect_err(|e| error!("Invalid settings: {e}"))?;
    let config = seed::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {e}"))?;
    info!("Successfully processed application configuration.");

    // 4. Database and tables
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {e}"))?;
    let store = Arc::new(SeaStore::new(db));

    // 5. Seed accounts and lexicon, then bring stored balances in line with the ledger
    seed::seed(store.as_ref(), &config)
        .await
        .inspect_err(|e| error!("Failed to seed configuration: {e}"))?;
    let assistant = Assistant::new(store, settings);
    assistant
        .ledger()
        .recompute(chrono::Utc::now().date_naive())
        .await
        .inspect_err(|e| error!("Initial recompute failed: {e}"))?;

    // 6. Run the bot
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {e}"))
        .map_err(Error::EnvVar)?;

    bot::run_bot(token, BotData::new(assistant)).await
}
