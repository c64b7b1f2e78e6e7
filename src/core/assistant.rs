//! The conversational entry point.
//!
//! Every inbound event is handled as an independent invocation: whatever must survive
//! until the next one (dialogue state, duplicate-event markers, the last recorded
//! entries for undo) lives in the [`EphemeralStore`](crate::repository::EphemeralStore). [`Assistant::handle`] is the
//! catch boundary: processing errors are logged with the operation and conversation
//! and turned into a user-visible notice, never propagated to the transport.

use crate::{
    config::settings::AssistantSettings,
    core::{
        dialogue::{self, Answer, AnswerOutcome, DialogueState, Step},
        interpret::{CompletedTransaction, Knowledge, interpret},
        kinds::{AccountKind, EntrySide, TransactionKind},
        learning::learn_from,
        ledger::{BalanceSnapshot, LedgerEngine, Provenance, build_entries},
        lexicon::Lexicon,
    },
    entities::transaction,
    errors::{Error, Result},
    repository::Storage,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, info, instrument, warn};

/// How long the entries of the last recorded transaction stay undoable.
pub const UNDO_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Outbound side of the chat transport.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Sends `text` to a conversation, with an optional list of numbered options.
    async fn send(&self, conversation_id: &str, text: &str, options: &[String]) -> Result<()>;
}

/// What the user sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Free text
    Text(String),
    /// A 1-based option number from the last offered list
    OptionSelected(usize),
}

/// One inbound event.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    /// Transport-level id, used for duplicate suppression
    pub event_id: String,
    /// Conversation the event belongs to
    pub conversation_id: String,
    /// Sender
    pub user: String,
    /// Content
    pub payload: Inbound,
    /// Arrival time; its date is the transaction date
    pub received_at: DateTime<Utc>,
}

/// How an event was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The event id was already seen
    Duplicate,
    /// Entries were written to the ledger
    Recorded {
        /// Ids of the written entries
        ids: Vec<i64>,
    },
    /// A field was asked for
    Asked {
        /// The field
        field: &'static str,
    },
    /// The answer did not fill the field and the question was repeated
    Reprompted {
        /// The field
        field: &'static str,
    },
    /// The active dialogue was cancelled
    Cancelled,
    /// An option was picked but no dialogue is active
    Expired,
    /// No transaction kind was found
    Unparsable,
    /// Processing failed; a failure notice was sent
    Failed,
}

fn dialogue_key(conversation_id: &str) -> String {
    format!("dialogue:{conversation_id}")
}

fn event_key(event_id: &str) -> String {
    format!("event:{event_id}")
}

fn last_key(conversation_id: &str) -> String {
    format!("last:{conversation_id}")
}

/// Interprets messages, drives dialogues, and writes the ledger.
pub struct Assistant<S: ?Sized> {
    store: Arc<S>,
    ledger: LedgerEngine<S>,
    settings: AssistantSettings,
}

impl<S: Storage + ?Sized> Assistant<S> {
    /// Creates an assistant over `store`.
    #[must_use]
    pub fn new(store: Arc<S>, settings: AssistantSettings) -> Self {
        let ledger = LedgerEngine::new(Arc::clone(&store), settings.lock_timeout);
        Self {
            store,
            ledger,
            settings,
        }
    }

    /// The ledger engine, for maintenance operations.
    #[must_use]
    pub const fn ledger(&self) -> &LedgerEngine<S> {
        &self.ledger
    }

    /// Runtime settings.
    #[must_use]
    pub const fn settings(&self) -> &AssistantSettings {
        &self.settings
    }

    /// Loads lexicon, accounts, and learned associations.
    pub async fn load_knowledge(&self) -> Result<Knowledge> {
        let lexicon = Lexicon::from_entries(&self.store.load_lexicon().await?)?;
        Ok(Knowledge {
            lexicon,
            accounts: self.store.list_accounts().await?,
            learned: self.store.list_associations().await?,
            learning_threshold: self.settings.learning_threshold,
        })
    }

    /// Handles one inbound event. Never fails: errors end in a notice to the user.
    #[instrument(skip(self, event, channel), fields(event_id = %event.event_id, conversation = %event.conversation_id))]
    pub async fn handle(&self, event: &InboundEvent, channel: &dyn MessageChannel) -> Outcome {
        match self.process(event, channel).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    operation = "handle",
                    conversation = %event.conversation_id,
                    error = %e,
                    "failed to process event"
                );
                // a failed event may be delivered again and must then be processed
                if let Err(release_error) = self.store.remove(&event_key(&event.event_id)).await {
                    error!(error = %release_error, "failed to release event marker");
                }
                let notice = if e.is_transient() {
                    "The ledger is busy right now, please try again in a moment."
                } else {
                    "Sorry, something went wrong while processing that message."
                };
                if let Err(send_error) = channel.send(&event.conversation_id, notice, &[]).await {
                    error!(conversation = %event.conversation_id, error = %send_error, "failed to send failure notice");
                }
                Outcome::Failed
            }
        }
    }

    async fn process(&self, event: &InboundEvent, channel: &dyn MessageChannel) -> Result<Outcome> {
        let claimed = self
            .store
            .put_if_absent(
                &event_key(&event.event_id),
                event.received_at.to_rfc3339(),
                self.settings.dedup_ttl,
            )
            .await?;
        if !claimed {
            debug!("duplicate event suppressed");
            return Ok(Outcome::Duplicate);
        }

        let conversation = event.conversation_id.as_str();
        let knowledge = self.load_knowledge().await?;
        let state = self.active_dialogue(conversation).await?;

        match (state, &event.payload) {
            (Some(_), Inbound::Text(text)) if dialogue::is_cancellation(text) => {
                self.store.remove(&dialogue_key(conversation)).await?;
                info!("dialogue cancelled");
                channel.send(conversation, "Cancelled, nothing was recorded.", &[]).await?;
                Ok(Outcome::Cancelled)
            }
            (Some(state), Inbound::Text(text)) => {
                let looks_new = interpret(text, event.received_at.date_naive(), &knowledge).is_ok();
                self.resume(state, &Answer::Text(text.clone()), looks_new, event, &knowledge, channel)
                    .await
            }
            (Some(state), Inbound::OptionSelected(n)) => {
                self.resume(state, &Answer::Choice(*n), false, event, &knowledge, channel)
                    .await
            }
            (None, Inbound::OptionSelected(_)) => {
                debug!("option picked without an active dialogue");
                channel
                    .send(
                        conversation,
                        "That question is no longer open. Please send the transaction again.",
                        &[],
                    )
                    .await?;
                Ok(Outcome::Expired)
            }
            (None, Inbound::Text(text)) if dialogue::is_cancellation(text) => {
                channel.send(conversation, "There is nothing to cancel.", &[]).await?;
                Ok(Outcome::Cancelled)
            }
            (None, Inbound::Text(text)) => {
                match interpret(text, event.received_at.date_naive(), &knowledge) {
                    Ok(draft) => {
                        let step = dialogue::next_step(draft, &knowledge);
                        self.advance(step, &event.event_id, event, &knowledge, channel)
                            .await
                    }
                    Err(Error::UnparsableInput { .. }) => {
                        warn!("no transaction kind detected");
                        channel
                            .send(
                                conversation,
                                "I couldn't tell whether that was an expense, income, or transfer. \
                                 Try something like \"spent 25 on lunch with debit\".",
                                &[],
                            )
                            .await?;
                        Ok(Outcome::Unparsable)
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Live dialogue for a conversation. Unreadable state is dropped.
    async fn active_dialogue(&self, conversation_id: &str) -> Result<Option<DialogueState>> {
        let key = dialogue_key(conversation_id);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!(conversation = conversation_id, error = %e, "discarding unreadable dialogue state");
                self.store.remove(&key).await?;
                Ok(None)
            }
        }
    }

    async fn resume(
        &self,
        state: DialogueState,
        reply: &Answer,
        looks_new: bool,
        event: &InboundEvent,
        knowledge: &Knowledge,
        channel: &dyn MessageChannel,
    ) -> Result<Outcome> {
        let origin = state.origin_event_id.clone();
        match dialogue::answer(state, reply, knowledge) {
            AnswerOutcome::Advanced(step) => self.advance(step, &origin, event, knowledge, channel).await,
            AnswerOutcome::Rejected(state) => {
                let field = state.awaiting.field();
                let lead = if looks_new {
                    "You still have an unfinished entry. Answer the question or say \"cancel\" first."
                } else {
                    "Sorry, I didn't get that."
                };
                let text = format!("{lead} {}", state.awaiting.prompt());
                channel
                    .send(&state.conversation_id, &text, &state.awaiting.option_labels())
                    .await?;
                Ok(Outcome::Reprompted { field })
            }
        }
    }

    async fn advance(
        &self,
        step: Step,
        origin_event_id: &str,
        event: &InboundEvent,
        knowledge: &Knowledge,
        channel: &dyn MessageChannel,
    ) -> Result<Outcome> {
        let conversation = event.conversation_id.as_str();
        match step {
            Step::Ask { draft, awaiting } => {
                let field = awaiting.field();
                let state = DialogueState {
                    conversation_id: conversation.to_string(),
                    draft,
                    awaiting,
                    origin_event_id: origin_event_id.to_string(),
                    started_at: event.received_at,
                };
                self.store
                    .put(
                        &dialogue_key(conversation),
                        serde_json::to_string(&state)?,
                        self.settings.dialogue_ttl,
                    )
                    .await?;
                info!(field, "awaiting field");
                channel
                    .send(conversation, &state.awaiting.prompt(), &state.awaiting.option_labels())
                    .await?;
                Ok(Outcome::Asked { field })
            }
            Step::Complete(done) => {
                let provenance = Provenance {
                    registered_by: &event.user,
                    registered_at: event.received_at,
                    group_id: origin_event_id,
                };
                let entries = build_entries(&done, knowledge, &provenance)?;
                let written = self.ledger.record(entries).await?;
                let ids: Vec<i64> = written.iter().map(|t| t.id).collect();

                // committed: nothing below may turn the event into a failure
                if let Err(e) = self.finish_recorded(conversation, &ids, &done, event).await {
                    error!(operation = "finish_recorded", error = %e, "bookkeeping after a recorded entry failed");
                }
                let summary = describe_completed(&done, knowledge, &self.settings.currency_symbol);
                if let Err(e) = channel.send(conversation, &summary, &[]).await {
                    error!(operation = "confirm", error = %e, "failed to confirm a recorded entry");
                }
                Ok(Outcome::Recorded { ids })
            }
        }
    }

    async fn finish_recorded(
        &self,
        conversation: &str,
        ids: &[i64],
        done: &CompletedTransaction,
        event: &InboundEvent,
    ) -> Result<()> {
        self.store.remove(&dialogue_key(conversation)).await?;
        self.store
            .put(&last_key(conversation), serde_json::to_string(ids)?, UNDO_WINDOW)
            .await?;
        learn_from(self.store.as_ref(), done, event.received_at).await?;
        Ok(())
    }

    /// Cancels the conversation's dialogue. Returns whether one was active.
    pub async fn cancel(&self, conversation_id: &str) -> Result<bool> {
        let active = self.active_dialogue(conversation_id).await?.is_some();
        if active {
            self.store.remove(&dialogue_key(conversation_id)).await?;
            info!(conversation = conversation_id, "dialogue cancelled");
        }
        Ok(active)
    }

    /// Reverses the entries of the last transaction recorded in the conversation.
    #[instrument(skip(self))]
    pub async fn undo(&self, conversation_id: &str) -> Result<Vec<transaction::Model>> {
        let key = last_key(conversation_id);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(Vec::new());
        };
        let ids: Vec<i64> = serde_json::from_str(&raw)?;
        let removed = self.ledger.reverse(&ids).await?;
        self.store.remove(&key).await?;
        Ok(removed)
    }

    /// Fully recomputes and returns every balance.
    pub async fn balances(&self, as_of: NaiveDate) -> Result<BalanceSnapshot> {
        self.ledger.recompute(as_of).await
    }
}

/// Formats an amount with the configured currency symbol.
#[must_use]
pub fn format_amount(symbol: &str, amount: f64) -> String {
    if amount < 0.0 {
        format!("-{symbol}{:.2}", amount.abs())
    } else {
        format!("{symbol}{amount:.2}")
    }
}

fn account_name(knowledge: &Knowledge, key: &str) -> String {
    knowledge
        .account(key)
        .map_or_else(|| key.to_string(), |a| a.name.clone())
}

/// Confirmation of an undo: what was reversed, for how much, and how it was paid.
///
/// Only the debit leg of a transfer counts towards the amount.
pub fn describe_reversal(removed: &[transaction::Model], symbol: &str) -> Result<Option<String>> {
    let Some(first) = removed.first() else {
        return Ok(None);
    };
    let mut total = 0.0;
    for entry in removed {
        if entry.transfer_group.is_none() || entry.entry_side()? == EntrySide::Debit {
            total += entry.amount;
        }
    }
    let entries = match removed.len() {
        1 => "1 entry".to_string(),
        n => format!("{n} entries"),
    };
    Ok(Some(format!(
        "Undone {}: {} ({}, {}, {entries}).",
        first.transaction_kind()?.as_str().replace('_', " "),
        first.description,
        format_amount(symbol, total),
        first.method()?.as_str().replace('_', " "),
    )))
}

/// One-line confirmation of a recorded transaction.
#[must_use]
pub fn describe_completed(done: &CompletedTransaction, knowledge: &Knowledge, symbol: &str) -> String {
    let amount = format_amount(symbol, done.amount);
    let account = account_name(knowledge, &done.account);
    if done.kind == TransactionKind::Transfer {
        let destination = done
            .destination
            .as_deref()
            .map_or_else(String::new, |d| account_name(knowledge, d));
        return format!("Recorded transfer of {amount} from {account} to {destination}.");
    }
    let category = match &done.subcategory {
        Some(sub) => format!("{} > {sub}", done.category),
        None => done.category.clone(),
    };
    let installments = if done.installments > 1 && knowledge.account_kind(&done.account) == Some(AccountKind::CreditCard) {
        format!(" in {} installments", done.installments)
    } else {
        String::new()
    };
    format!(
        "Recorded {} of {amount}{installments} on {account}: {} ({category}, {}).",
        done.kind.as_str().replace('_', " "),
        done.description,
        done.method.as_str().replace('_', " "),
    )
}

/// Multi-line balance listing.
#[must_use]
pub fn format_balances(snapshot: &BalanceSnapshot, symbol: &str) -> String {
    let mut lines: Vec<String> = snapshot
        .accounts
        .iter()
        .map(|row| match row.kind {
            AccountKind::Checking | AccountKind::Cash => {
                format!("**{}**: {}", row.name, format_amount(symbol, row.balance))
            }
            AccountKind::CreditCard | AccountKind::ConsolidatedInvoice => format!(
                "**{}**: {} pending, {} on the next statement",
                row.name,
                format_amount(symbol, row.pending_total),
                format_amount(symbol, row.current_statement)
            ),
        })
        .collect();
    lines.push(format!("Net worth: {}", format_amount(symbol, snapshot.net_worth())));
    lines.join("\n")
}
