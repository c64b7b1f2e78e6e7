//! General Discord commands - ping, help, and other utility commands.
//! These commands don't touch the ledger.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{bot::Context, errors::Result};

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: Context<'_>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: Context<'_>) -> Result<()> {
        let help_text = "**LedgerBuddy Help**\n\
        Tell me about your money in plain words and I'll keep the ledger.\n\n\
        **Recording**\n\
        • `/log <text>` - Records a transaction, e.g. `spent 42,90 on lunch with debit checking`, \
        `transferred 200 from checking to wallet`, `bought a tv 2.500,00 in 10x on nubank`.\n\
        • `/pick <number>` - Answers my last question with one of the listed options.\n\
        • `/cancel` - Drops the entry I'm asking about.\n\
        • `/undo` - Reverses the last transaction recorded here.\n\n\
        **Ledger**\n\
        • `/balances` - Recomputes and shows every account balance.\n\n\
        **Utility Commands**\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message.";

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
