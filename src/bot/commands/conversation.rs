//! Conversation commands - everything that feeds the assistant.
//!
//! Each invocation becomes one inbound event. The conversation is the pair of
//! channel and author, so two people in the same channel never answer each other's
//! questions.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{Context, channel::ReplyChannel},
        core::assistant::{Inbound, InboundEvent, describe_reversal},
        errors::Result,
    };
    use chrono::Utc;

    fn conversation_id(ctx: Context<'_>) -> String {
        format!("{}:{}", ctx.channel_id(), ctx.author().id)
    }

    fn event(ctx: Context<'_>, payload: Inbound) -> InboundEvent {
        InboundEvent {
            event_id: ctx.id().to_string(),
            conversation_id: conversation_id(ctx),
            user: ctx.author().name.clone(),
            payload,
            received_at: Utc::now(),
        }
    }

    /// Records a transaction described in plain words.
    ///
    /// Anything I can't work out, I'll ask about one question at a time.
    #[poise::command(slash_command, prefix_command)]
    pub async fn log(
        ctx: Context<'_>,
        #[description = "What happened, e.g. \"spent 30 on uber with nubank\""]
        #[rest]
        text: String,
    ) -> Result<()> {
        ctx.defer().await?;
        let event = event(ctx, Inbound::Text(text));
        ctx.data()
            .assistant
            .handle(&event, &ReplyChannel::new(ctx))
            .await;
        Ok(())
    }

    /// Answers the open question with one of the numbered options.
    #[poise::command(slash_command, prefix_command)]
    pub async fn pick(
        ctx: Context<'_>,
        #[description = "Option number"]
        #[min = 1]
        number: usize,
    ) -> Result<()> {
        ctx.defer().await?;
        let event = event(ctx, Inbound::OptionSelected(number));
        ctx.data()
            .assistant
            .handle(&event, &ReplyChannel::new(ctx))
            .await;
        Ok(())
    }

    /// Drops the entry currently being asked about.
    #[poise::command(slash_command, prefix_command)]
    pub async fn cancel(ctx: Context<'_>) -> Result<()> {
        let cancelled = ctx.data().assistant.cancel(&conversation_id(ctx)).await?;
        let reply = if cancelled {
            "Cancelled, nothing was recorded."
        } else {
            "There is nothing to cancel."
        };
        ctx.say(reply).await?;
        Ok(())
    }

    /// Reverses the last transaction recorded in this conversation.
    #[poise::command(slash_command, prefix_command)]
    pub async fn undo(ctx: Context<'_>) -> Result<()> {
        ctx.defer().await?;
        let assistant = &ctx.data().assistant;
        let removed = assistant.undo(&conversation_id(ctx)).await?;
        let reply = describe_reversal(&removed, &assistant.settings().currency_symbol)?
            .unwrap_or_else(|| "There is nothing to undo.".to_string());
        ctx.say(reply).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
