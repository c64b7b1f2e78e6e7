//! Core module - framework-agnostic interpretation, dialogue, and ledger logic.
//! Everything below `assistant` is pure; storage is reached only through the
//! repository traits.

pub mod amount;
pub mod assistant;
pub mod billing;
pub mod classify;
pub mod describe;
pub mod dialogue;
pub mod interpret;
pub mod kinds;
pub mod learning;
pub mod ledger;
pub mod lexicon;
pub mod normalize;
pub mod resolve;
