//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables behind the repository traits.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod account;
pub mod ephemeral_state;
pub mod learned_association;
pub mod lexicon_entry;
pub mod transaction;

// Re-export specific types to avoid conflicts
pub use account::{Column as AccountColumn, Entity as Account, Model as AccountModel};
pub use ephemeral_state::{
    Column as EphemeralStateColumn, Entity as EphemeralState, Model as EphemeralStateModel,
};
pub use learned_association::{
    Column as LearnedAssociationColumn, Entity as LearnedAssociation,
    Model as LearnedAssociationModel,
};
pub use lexicon_entry::{
    Column as LexiconEntryColumn, Entity as LexiconEntry, Model as LexiconEntryModel,
};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
};
