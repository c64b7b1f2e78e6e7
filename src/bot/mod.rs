//! Bot layer - Discord-specific interface and command handlers
//!
//! This module provides the Discord interface for LedgerBuddy: slash commands that
//! feed the conversational assistant, and the [`MessageChannel`](crate::core::assistant::MessageChannel)
//! implementation that answers through the invoking command.

/// Outbound messages through a command context
pub mod channel;
/// Discord command implementations (conversation, ledger, general)
pub mod commands;

use crate::{
    core::assistant::Assistant,
    errors::{Error, Result},
    repository::SeaStore,
};
use poise::serenity_prelude as serenity;
use tracing::{error, info, instrument};

/// Shared data available to all bot commands.
/// Holds the assistant, which owns the store and the ledger lock.
pub struct BotData {
    /// The assistant every command talks to
    pub assistant: Assistant<SeaStore>,
}

impl BotData {
    /// Creates a new `BotData` instance around an assistant.
    #[must_use]
    pub const fn new(assistant: Assistant<SeaStore>) -> Self {
        Self { assistant }
    }
}

/// Poise context with our data and error types.
pub type Context<'a> = poise::Context<'a, BotData, Error>;

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {error:?}");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!(command = %ctx.command().name, error = %error, "command failed");
            let notice = if error.is_transient() {
                "The ledger is busy right now, please try again in a moment.".to_string()
            } else {
                format!("An error occurred: {error}")
            };
            if let Err(e) = ctx.say(notice).await {
                error!("Failed to send error message: {e}");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}

/// Registers the commands and runs the Discord client until it stops.
#[instrument(skip(token, data))]
pub async fn run_bot(token: String, data: BotData) -> Result<()> {
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::log(),
                commands::pick(),
                commands::cancel(),
                commands::undo(),
                commands::balances(),
                commands::ping(),
                commands::help(),
            ],
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(data)
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::Client::builder(&token, intents)
        .framework(framework)
        .await
        .inspect_err(|e| error!("Error creating client: {e:?}"))?;

    info!("Starting bot client...");
    client
        .start()
        .await
        .inspect_err(|e| error!("Client error: {e:?}"))?;
    Ok(())
}
