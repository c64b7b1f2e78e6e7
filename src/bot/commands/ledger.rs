//! Ledger Discord commands - balances.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{bot::Context, core::assistant::format_balances, errors::Result};
    use chrono::Utc;

    /// Recomputes every balance from the full ledger and shows them.
    #[poise::command(slash_command, prefix_command)]
    pub async fn balances(ctx: Context<'_>) -> Result<()> {
        ctx.defer().await?;
        let assistant = &ctx.data().assistant;
        let snapshot = assistant.balances(Utc::now().date_naive()).await?;
        if snapshot.accounts.is_empty() {
            ctx.say("No accounts configured yet. Add some to config.toml.").await?;
            return Ok(());
        }
        ctx.say(format_balances(&snapshot, &assistant.settings().currency_symbol))
            .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
