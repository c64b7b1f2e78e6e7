//! Replies to the assistant go back through the invoking command.

use crate::{bot::Context, core::assistant::MessageChannel, errors::Result};
use async_trait::async_trait;
use tracing::debug;

/// Renders a message and its numbered options as one Discord reply.
#[must_use]
pub fn render(text: &str, options: &[String]) -> String {
    if options.is_empty() {
        return text.to_string();
    }
    let listed: Vec<String> = options
        .iter()
        .enumerate()
        .map(|(i, option)| format!("`{}` {option}", i + 1))
        .collect();
    format!(
        "{text}\n{}\nAnswer with `/pick <number>` or `/log <text>`.",
        listed.join("\n")
    )
}

/// [`MessageChannel`] over a poise command context.
pub struct ReplyChannel<'a> {
    ctx: Context<'a>,
}

impl<'a> ReplyChannel<'a> {
    /// Wraps the context of the command being handled.
    #[must_use]
    pub const fn new(ctx: Context<'a>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl MessageChannel for ReplyChannel<'_> {
    async fn send(&self, conversation_id: &str, text: &str, options: &[String]) -> Result<()> {
        debug!(conversation = conversation_id, options = options.len(), "replying");
        self.ctx.say(render(text, options)).await?;
        Ok(())
    }
}
