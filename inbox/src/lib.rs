//! Direct-message inbox for the Haven talent marketplace.
//!
//! Providers and refugee talent exchange direct messages; this crate turns
//! the flat message feed into per-counterpart conversations, keeps a local
//! SQLite copy, and drives periodic refreshes.

pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod grouping;
pub mod models;
pub mod source;
pub mod sync;
mod utils;

pub use config::InboxConfig;
pub use db::{ImportReport, SqliteStore};
pub use error::{InboxError, Result};
pub use feed::{parse_message_batch, MessageBatch};
pub use grouping::{group_conversations, group_conversations_with_report, GroupingReport, UNKNOWN_USER};
pub use models::input::{MarkAsReadInput, NewUserInput, SendMessageInput, ValidateExt};
pub use models::{
    find_conversation, total_unread, Conversation, Message, ParticipantRef, RawMessage, SkipReason,
    UserId, UserProfile,
};
pub use source::MessageSource;
pub use sync::{Inbox, MarkReadOutcome, PollerHandle};
pub use utils::preview;
