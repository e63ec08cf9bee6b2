use serde::{Deserialize, Serialize};

use super::message::Message;
use super::user::UserId;

/// Every message exchanged with one counterpart, oldest first
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Same value for both participants
    pub id: String,
    pub counterpart_id: UserId,
    pub counterpart_name: String,
    pub messages: Vec<Message>,
    pub last_message: Message,
    pub unread_count: usize,
}

impl Conversation {
    pub fn is_unread(&self) -> bool {
        self.unread_count > 0
    }

    /// Ids of messages `viewer` received and has not read yet
    pub fn unread_message_ids(&self, viewer: &UserId) -> Vec<String> {
        self.messages
            .iter()
            .filter(|m| m.is_incoming_for(viewer) && !m.is_read)
            .map(|m| m.id.clone())
            .collect()
    }
}

/// Unread total across all conversations, for the inbox badge
pub fn total_unread(conversations: &[Conversation]) -> usize {
    conversations.iter().map(|c| c.unread_count).sum()
}

pub fn find_conversation<'a>(
    conversations: &'a [Conversation],
    counterpart: &UserId,
) -> Option<&'a Conversation> {
    conversations
        .iter()
        .find(|c| &c.counterpart_id == counterpart)
}
