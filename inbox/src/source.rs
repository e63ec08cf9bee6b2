use std::sync::Arc;

use async_trait::async_trait;

use crate::db::SqliteStore;
use crate::error::{InboxError, Result};
use crate::models::input::SendMessageInput;
use crate::models::{RawMessage, UserId};

/// Where the inbox gets its messages from and sends its updates to
///
/// The marketplace REST API is one implementation; `SqliteStore` is another.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Every message sent by or to `user`, in any order
    async fn fetch_messages(&self, user: &UserId) -> Result<Vec<RawMessage>>;

    /// Deliver a message and return it as the feed will show it
    async fn send_message(&self, from: &UserId, input: &SendMessageInput) -> Result<RawMessage>;

    async fn mark_read(&self, message_id: &str) -> Result<()>;
}

#[async_trait]
impl MessageSource for SqliteStore {
    async fn fetch_messages(&self, user: &UserId) -> Result<Vec<RawMessage>> {
        self.messages_for(user)
    }

    async fn send_message(&self, from: &UserId, input: &SendMessageInput) -> Result<RawMessage> {
        self.send(from, input)
    }

    async fn mark_read(&self, message_id: &str) -> Result<()> {
        if SqliteStore::mark_read(self, message_id)? {
            Ok(())
        } else {
            Err(InboxError::Source(format!("Unknown message {}", message_id)))
        }
    }
}

#[async_trait]
impl<S: MessageSource + ?Sized> MessageSource for Arc<S> {
    async fn fetch_messages(&self, user: &UserId) -> Result<Vec<RawMessage>> {
        (**self).fetch_messages(user).await
    }

    async fn send_message(&self, from: &UserId, input: &SendMessageInput) -> Result<RawMessage> {
        (**self).send_message(from, input).await
    }

    async fn mark_read(&self, message_id: &str) -> Result<()> {
        (**self).mark_read(message_id).await
    }
}
