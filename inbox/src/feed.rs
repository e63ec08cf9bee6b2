//! Tolerant decoding of a message feed.
//!
//! A single record with a wrongly typed field must not fail the whole batch,
//! so the payload is first read as generic JSON and each element decoded on
//! its own.

use serde_json::Value;
use tracing::debug;

use crate::error::{InboxError, Result};
use crate::models::RawMessage;

/// Keys under which list endpoints wrap their payload
const ENVELOPE_KEYS: [&str; 3] = ["messages", "data", "items"];

/// Decoded feed plus the number of elements that could not be decoded
#[derive(Debug, Default)]
pub struct MessageBatch {
    pub messages: Vec<RawMessage>,
    pub rejected: usize,
}

/// Decode a JSON array of messages, or an object wrapping one
pub fn parse_message_batch(json: &str) -> Result<MessageBatch> {
    let value: Value = serde_json::from_str(json)?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => ENVELOPE_KEYS
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| {
                InboxError::Validation("Expected a message array or {\"messages\": [...]}".to_string())
            })?,
        _ => {
            return Err(InboxError::Validation(
                "Expected a message array".to_string(),
            ))
        }
    };

    let mut batch = MessageBatch::default();
    for (position, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<RawMessage>(item) {
            Ok(message) => batch.messages.push(message),
            Err(e) => {
                debug!(position, error = %e, "Rejecting undecodable message");
                batch.rejected += 1;
            }
        }
    }
    Ok(batch)
}
