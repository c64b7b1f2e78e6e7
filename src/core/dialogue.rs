//! Slot-filling dialogue.
//!
//! `Idle -> Awaiting(field) -> Completed | Cancelled | Expired`. A draft that is
//! missing something asks for exactly one field, in fixed precedence:
//! amount, account, destination (transfers only), category, subcategory (only when
//! the category has several), payment method. Each answer is either a 1-based option
//! number or free text run through that field's extractor; a failed answer leaves the
//! state untouched.
//!
//! The functions here are pure. Persisting the state between invocations, expiry, and
//! cancellation bookkeeping belong to [`crate::core::assistant`].

use crate::core::{
    amount::find_amount,
    interpret::{CompletedTransaction, Draft, Knowledge},
    kinds::{AccountKind, PaymentMethod, TransactionKind},
    normalize::{keyword_profile, numeric_profile},
    resolve::{resolve_account, resolve_category, resolve_payment_method},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Words that cancel an active dialogue.
pub const CANCEL_WORDS: &[&str] = &["cancel", "stop", "nevermind", "never mind", "forget it"];

/// An account offered as an option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountOption {
    /// Normalized key
    pub key: String,
    /// Display name
    pub name: String,
}

/// The single field being asked for, with only the data needed to resolve it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum Awaiting {
    /// Positive amount
    Amount,
    /// Account (transfer origin)
    Account {
        /// Offered accounts
        options: Vec<AccountOption>,
    },
    /// Transfer destination
    Destination {
        /// Offered accounts
        options: Vec<AccountOption>,
    },
    /// Category
    Category {
        /// Offered categories
        options: Vec<String>,
    },
    /// Subcategory of an already chosen category
    Subcategory {
        /// The chosen category
        category: String,
        /// Offered subcategories
        options: Vec<String>,
    },
    /// Payment method
    Method {
        /// Offered methods
        options: Vec<PaymentMethod>,
    },
}

impl Awaiting {
    /// Field name, for logs.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::Amount => "amount",
            Self::Account { .. } => "account",
            Self::Destination { .. } => "destination",
            Self::Category { .. } => "category",
            Self::Subcategory { .. } => "subcategory",
            Self::Method { .. } => "method",
        }
    }

    /// Question shown to the user.
    #[must_use]
    pub fn prompt(&self) -> String {
        match self {
            Self::Amount => "How much was it?".to_string(),
            Self::Account { .. } => "Which account?".to_string(),
            Self::Destination { .. } => "Which account did the money go to?".to_string(),
            Self::Category { .. } => "Which category?".to_string(),
            Self::Subcategory { category, .. } => format!("Which kind of {category}?"),
            Self::Method { .. } => "How was it paid?".to_string(),
        }
    }

    /// Option labels in display order.
    #[must_use]
    pub fn option_labels(&self) -> Vec<String> {
        match self {
            Self::Amount => Vec::new(),
            Self::Account { options } | Self::Destination { options } => {
                options.iter().map(|o| o.name.clone()).collect()
            }
            Self::Category { options } | Self::Subcategory { options, .. } => options.clone(),
            Self::Method { options } => options
                .iter()
                .map(|m| m.as_str().replace('_', " "))
                .collect(),
        }
    }
}

/// A dialogue waiting for one answer. Stored in the ephemeral store between invocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueState {
    /// Conversation the dialogue belongs to
    pub conversation_id: String,
    /// Partially filled transaction
    pub draft: Draft,
    /// Field being asked for
    pub awaiting: Awaiting,
    /// Id of the message that started the dialogue
    pub origin_event_id: String,
    /// When the dialogue started
    pub started_at: DateTime<Utc>,
}

/// What happens after evaluating a draft.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Ask for one more field
    Ask {
        /// Draft so far
        draft: Draft,
        /// Field to ask for
        awaiting: Awaiting,
    },
    /// Every field is present
    Complete(CompletedTransaction),
}

/// One answer from the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// 1-based option number
    Choice(usize),
    /// Free text
    Text(String),
}

/// Result of applying an answer.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerOutcome {
    /// The field was filled; here is the next step
    Advanced(Step),
    /// The answer did not resolve the field; the state is unchanged
    Rejected(DialogueState),
}

/// Whether `text` asks to abandon the dialogue.
#[must_use]
pub fn is_cancellation(text: &str) -> bool {
    let text = keyword_profile(text);
    CANCEL_WORDS.contains(&text.as_str())
}

fn account_options(knowledge: &Knowledge, exclude: Option<&str>) -> Vec<AccountOption> {
    knowledge
        .accounts
        .iter()
        .filter(|a| a.account_kind().ok() != Some(AccountKind::ConsolidatedInvoice))
        .filter(|a| Some(a.key.as_str()) != exclude)
        .map(|a| AccountOption {
            key: a.key.clone(),
            name: a.name.clone(),
        })
        .collect()
}

/// Evaluates field precedence and either asks for the first missing field or completes.
#[must_use]
pub fn next_step(mut draft: Draft, knowledge: &Knowledge) -> Step {
    if draft.amount.is_none_or(|a| a <= 0.0) {
        return Step::Ask {
            draft,
            awaiting: Awaiting::Amount,
        };
    }
    if draft.account.is_none() {
        let options = account_options(knowledge, None);
        return Step::Ask {
            draft,
            awaiting: Awaiting::Account { options },
        };
    }
    if draft.kind == TransactionKind::Transfer && draft.destination.is_none() {
        let options = account_options(knowledge, draft.account.as_deref());
        return Step::Ask {
            draft,
            awaiting: Awaiting::Destination { options },
        };
    }
    let Some(category) = draft.category.clone() else {
        let options = knowledge.lexicon.categories_for(draft.kind);
        return Step::Ask {
            draft,
            awaiting: Awaiting::Category { options },
        };
    };
    if draft.subcategory.is_none() {
        let mut options = knowledge.lexicon.subcategories_for(&category, draft.kind);
        if options.len() > 1 {
            return Step::Ask {
                draft,
                awaiting: Awaiting::Subcategory { category, options },
            };
        }
        draft.subcategory = options.pop();
    }
    let Some(method) = draft.method else {
        return Step::Ask {
            draft,
            awaiting: Awaiting::Method {
                options: PaymentMethod::CHOICES.to_vec(),
            },
        };
    };

    Step::Complete(CompletedTransaction {
        kind: draft.kind,
        amount: draft.amount.unwrap_or_default(),
        account: draft.account.unwrap_or_default(),
        destination: draft.destination,
        category,
        subcategory: draft.subcategory,
        method,
        description: draft.description,
        installments: draft.installments.max(1),
        date: draft.date,
        original_category: draft.original_category,
        category_corrected: draft.category_corrected,
        learning_keyword: draft.learning_keyword,
    })
}

fn pick<'a, T>(options: &'a [T], answer: &Answer) -> Option<&'a T> {
    let index = match answer {
        Answer::Choice(n) => Some(*n),
        Answer::Text(text) => text.trim().parse::<usize>().ok(),
    }?;
    index.checked_sub(1).and_then(|i| options.get(i))
}

fn pick_by_name<'a>(options: &'a [String], text: &str) -> Option<&'a String> {
    let wanted = keyword_profile(text);
    options.iter().find(|o| keyword_profile(o) == wanted)
}

fn answer_account(options: &[AccountOption], answer: &Answer, knowledge: &Knowledge) -> Option<String> {
    if let Some(option) = pick(options, answer) {
        return Some(option.key.clone());
    }
    let Answer::Text(text) = answer else {
        return None;
    };
    let text = keyword_profile(text);
    if let Some(option) = options.iter().find(|o| o.key == text) {
        return Some(option.key.clone());
    }
    resolve_account(&text, &knowledge.accounts, &knowledge.lexicon)
        .map(|hit| hit.key)
        .filter(|key| options.iter().any(|o| &o.key == key))
}

/// Applies one answer to a waiting dialogue.
#[must_use]
pub fn answer(state: DialogueState, reply: &Answer, knowledge: &Knowledge) -> AnswerOutcome {
    let mut draft = state.draft.clone();
    let filled = match &state.awaiting {
        Awaiting::Amount => match reply {
            Answer::Text(text) => find_amount(&numeric_profile(text))
                .map(|t| t.value)
                .filter(|v| *v > 0.0)
                .map(|v| draft.amount = Some(v))
                .is_some(),
            Answer::Choice(_) => false,
        },
        Awaiting::Account { options } => answer_account(options, reply, knowledge)
            .map(|key| draft.set_account(key, knowledge))
            .is_some(),
        Awaiting::Destination { options } => answer_account(options, reply, knowledge)
            .map(|key| draft.destination = Some(key))
            .is_some(),
        Awaiting::Category { options } => {
            let chosen = pick(options, reply).map(|c| (c.clone(), None)).or_else(|| {
                let Answer::Text(text) = reply else {
                    return None;
                };
                pick_by_name(options, text).map(|c| (c.clone(), None)).or_else(|| {
                    resolve_category(
                        &keyword_profile(text),
                        draft.kind,
                        &knowledge.lexicon,
                        &knowledge.learned,
                        knowledge.learning_threshold,
                    )
                    .map(|hit| (hit.category, hit.subcategory))
                })
            });
            chosen
                .map(|(category, subcategory)| {
                    draft.category = Some(category);
                    draft.subcategory = subcategory;
                    draft.category_corrected = draft.original_category.is_none();
                })
                .is_some()
        }
        Awaiting::Subcategory { options, .. } => {
            let chosen = pick(options, reply).or_else(|| match reply {
                Answer::Text(text) => pick_by_name(options, text),
                Answer::Choice(_) => None,
            });
            chosen
                .map(|sub| draft.subcategory = Some(sub.clone()))
                .is_some()
        }
        Awaiting::Method { options } => {
            let chosen = pick(options, reply).copied().or_else(|| match reply {
                Answer::Text(text) => resolve_payment_method(&keyword_profile(text), &knowledge.lexicon)
                    .map(|hit| hit.method)
                    .or_else(|| text.parse::<PaymentMethod>().ok()),
                Answer::Choice(_) => None,
            });
            chosen.map(|method| draft.method = Some(method)).is_some()
        }
    };

    if !filled {
        debug!(field = state.awaiting.field(), "answer did not resolve the field");
        return AnswerOutcome::Rejected(state);
    }
    debug!(field = state.awaiting.field(), "field filled from answer");
    AnswerOutcome::Advanced(next_step(draft, knowledge))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::interpret::interpret;
    use crate::test_utils::{date, sample_knowledge};

    fn start(text: &str) -> (Step, Knowledge) {
        let knowledge = sample_knowledge();
        let draft = interpret(text, date("2025-03-10"), &knowledge).unwrap();
        (next_step(draft, &knowledge), knowledge)
    }

    fn waiting(step: Step) -> DialogueState {
        match step {
            Step::Ask { draft, awaiting } => DialogueState {
                conversation_id: "c1".to_string(),
                draft,
                awaiting,
                origin_event_id: "e1".to_string(),
                started_at: Utc::now(),
            },
            Step::Complete(done) => panic!("expected a question, got {done:?}"),
        }
    }

    fn advance(state: DialogueState, reply: Answer, knowledge: &Knowledge) -> Step {
        match answer(state, &reply, knowledge) {
            AnswerOutcome::Advanced(step) => step,
            AnswerOutcome::Rejected(state) => panic!("answer rejected while waiting for {}", state.awaiting.field()),
        }
    }

    #[test]
    fn test_account_requested_before_category() {
        let (step, knowledge) = start("spent 25 on something nice");
        let state = waiting(step);
        assert_eq!(state.awaiting.field(), "account");

        let step = advance(state, Answer::Text("checking".to_string()), &knowledge);
        let state = waiting(step);
        assert_eq!(state.awaiting.field(), "category");
    }

    #[test]
    fn test_amount_requested_first() {
        let (step, knowledge) = start("spent on lunch");
        let state = waiting(step);
        assert_eq!(state.awaiting, Awaiting::Amount);

        let step = advance(state, Answer::Text("12,50".to_string()), &knowledge);
        let state = waiting(step);
        assert_eq!(state.draft.amount, Some(12.5));
        assert_eq!(state.awaiting.field(), "account");
    }

    #[test]
    fn test_failed_answer_leaves_state_unchanged() {
        let (step, knowledge) = start("spent on lunch");
        let state = waiting(step);
        match answer(state.clone(), &Answer::Text("no idea".to_string()), &knowledge) {
            AnswerOutcome::Rejected(same) => assert_eq!(same, state),
            AnswerOutcome::Advanced(step) => panic!("unexpected advance: {step:?}"),
        }
    }

    #[test]
    fn test_out_of_range_choice_rejected() {
        let (step, knowledge) = start("spent 10 on lunch");
        let state = waiting(step);
        assert!(matches!(
            answer(state, &Answer::Choice(99), &knowledge),
            AnswerOutcome::Rejected(_)
        ));
    }

    #[test]
    fn test_full_dialogue_by_choices() {
        let (step, knowledge) = start("spent 25 on something nice");
        let state = waiting(step);
        let labels = state.awaiting.option_labels();
        let checking = labels.iter().position(|l| l == "Checking").unwrap() + 1;

        let state = waiting(advance(state, Answer::Choice(checking), &knowledge));
        let labels = state.awaiting.option_labels();
        let food = labels.iter().position(|l| l == "Food").unwrap() + 1;

        let state = waiting(advance(state, Answer::Choice(food), &knowledge));
        assert_eq!(state.awaiting.field(), "subcategory");
        assert_eq!(
            state.awaiting.option_labels(),
            vec!["Restaurant", "Groceries", "Coffee"]
        );

        let state = waiting(advance(state, Answer::Text("groceries".to_string()), &knowledge));
        assert_eq!(state.awaiting.field(), "method");

        match advance(state, Answer::Text("pix".to_string()), &knowledge) {
            Step::Complete(done) => {
                assert_eq!(done.account, "checking");
                assert_eq!(done.category, "Food");
                assert_eq!(done.subcategory.as_deref(), Some("Groceries"));
                assert_eq!(done.method, PaymentMethod::Pix);
                assert!(done.category_corrected);
                assert_eq!(done.learning_keyword.as_deref(), Some("something nice"));
            }
            Step::Ask { awaiting, .. } => panic!("still waiting for {}", awaiting.field()),
        }
    }

    #[test]
    fn test_single_subcategory_filled_automatically() {
        let (step, knowledge) = start("spent 25 on something nice");
        let state = waiting(step);
        let state = waiting(advance(state, Answer::Text("checking".to_string()), &knowledge));
        let state = waiting(advance(state, Answer::Text("home".to_string()), &knowledge));
        assert_eq!(state.draft.subcategory.as_deref(), Some("Subscriptions"));
        assert_eq!(state.awaiting.field(), "method");
    }

    #[test]
    fn test_choosing_card_sets_credit() {
        let (step, knowledge) = start("spent 60 on lunch");
        let state = waiting(step);
        match advance(state, Answer::Text("nubank".to_string()), &knowledge) {
            Step::Complete(done) => assert_eq!(done.method, PaymentMethod::Credit),
            Step::Ask { awaiting, .. } => panic!("still waiting for {}", awaiting.field()),
        }
    }

    #[test]
    fn test_transfer_asks_for_destination() {
        let (step, knowledge) = start("transferred 100 from checking");
        let state = waiting(step);
        let Awaiting::Destination { options } = &state.awaiting else {
            panic!("expected destination, got {}", state.awaiting.field());
        };
        assert!(!options.iter().any(|o| o.key == "checking"));
        assert!(!options.iter().any(|o| o.key == "family invoice"));

        match advance(state, Answer::Text("wallet".to_string()), &knowledge) {
            Step::Complete(done) => assert_eq!(done.destination.as_deref(), Some("wallet")),
            Step::Ask { awaiting, .. } => panic!("still waiting for {}", awaiting.field()),
        }
    }

    #[test]
    fn test_cancellation_words() {
        assert!(is_cancellation("Cancel"));
        assert!(is_cancellation("forget it!"));
        assert!(!is_cancellation("cancel my netflix 30"));
    }

    #[test]
    fn test_state_serialization_round_trip() {
        let (step, _) = start("spent 25 on something nice");
        let state = waiting(step);
        let json = serde_json::to_string(&state).unwrap();
        let back: DialogueState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
        assert!(!back.awaiting.option_labels().is_empty());
    }
}
