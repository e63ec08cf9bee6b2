mod conversation;
pub mod input;
mod message;
mod user;

pub use conversation::{find_conversation, total_unread, Conversation};
pub use message::{Message, RawMessage, RawTimestamp, SkipReason};
pub use user::{ParticipantProfile, ParticipantRef, RawId, UserId, UserProfile};
