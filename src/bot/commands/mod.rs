//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Conversation commands: log, pick, cancel, undo
pub mod conversation;

/// General utility commands
pub mod general;

/// Ledger inspection commands
pub mod ledger;

// Export commands
pub use conversation::*;
pub use general::*;
pub use ledger::*;
