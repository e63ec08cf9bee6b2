use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::user::{ParticipantRef, RawId, UserId};

/// A direct message exactly as the messages endpoint returns it
///
/// Every field is optional on the wire; `Message::normalize` decides whether
/// the record is usable.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<RawId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<ParticipantRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<ParticipantRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_display_name: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<RawTimestamp>,
    #[serde(default)]
    pub is_read: bool,
}

impl RawMessage {
    /// Message id as a string, when present and non-blank
    pub fn message_id(&self) -> Option<String> {
        match self.id.as_ref()? {
            RawId::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            RawId::Text(_) => None,
            RawId::Number(n) => Some(n.to_string()),
        }
    }
}

/// Timestamp as sent by the API: RFC 3339 text or epoch milliseconds
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum RawTimestamp {
    Millis(i64),
    Text(String),
}

impl RawTimestamp {
    pub fn parse(&self) -> Option<DateTime<Utc>> {
        match self {
            RawTimestamp::Millis(ms) => Utc.timestamp_millis_opt(*ms).single(),
            RawTimestamp::Text(text) => {
                let text = text.trim();
                DateTime::parse_from_rfc3339(text)
                    .map(|dt| dt.with_timezone(&Utc))
                    .ok()
                    // Zone-less timestamps are treated as UTC
                    .or_else(|| {
                        NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                            .ok()
                            .map(|naive| naive.and_utc())
                    })
            }
        }
    }
}

impl From<DateTime<Utc>> for RawTimestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        RawTimestamp::Text(dt.to_rfc3339())
    }
}

/// Why a raw record was left out of the inbox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("missing message id")]
    MissingId,
    #[error("missing or invalid sender")]
    MissingSender,
    #[error("missing or invalid recipient")]
    MissingRecipient,
    #[error("missing timestamp")]
    MissingTimestamp,
    #[error("unparseable timestamp")]
    InvalidTimestamp,
}

/// A direct message with both participants reduced to bare ids
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub sender_name: Option<String>,
    pub recipient_name: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

impl Message {
    pub fn normalize(raw: &RawMessage) -> Result<Message, SkipReason> {
        let id = raw.message_id().ok_or(SkipReason::MissingId)?;
        let sender = raw.sender.as_ref().ok_or(SkipReason::MissingSender)?;
        let recipient = raw.recipient.as_ref().ok_or(SkipReason::MissingRecipient)?;
        let sender_id = sender.id().ok_or(SkipReason::MissingSender)?;
        let recipient_id = recipient.id().ok_or(SkipReason::MissingRecipient)?;
        let created_at = raw
            .created_at
            .as_ref()
            .ok_or(SkipReason::MissingTimestamp)?
            .parse()
            .ok_or(SkipReason::InvalidTimestamp)?;

        Ok(Message {
            id,
            sender_id,
            recipient_id,
            sender_name: resolve_name(raw.sender_display_name.as_deref(), sender),
            recipient_name: resolve_name(raw.recipient_display_name.as_deref(), recipient),
            content: raw.content.clone().unwrap_or_default(),
            created_at,
            is_read: raw.is_read,
        })
    }

    /// True when `user` is the recipient
    pub fn is_incoming_for(&self, user: &UserId) -> bool {
        &self.recipient_id == user
    }

    /// Counterpart id and name as seen by `user`
    pub fn counterpart_for(&self, user: &UserId) -> (&UserId, Option<&str>) {
        if self.is_incoming_for(user) {
            (&self.sender_id, self.sender_name.as_deref())
        } else {
            (&self.recipient_id, self.recipient_name.as_deref())
        }
    }

    pub fn to_raw(&self) -> RawMessage {
        RawMessage {
            id: Some(RawId::Text(self.id.clone())),
            sender: Some(ParticipantRef::from_id(&self.sender_id)),
            recipient: Some(ParticipantRef::from_id(&self.recipient_id)),
            sender_display_name: self.sender_name.clone(),
            recipient_display_name: self.recipient_name.clone(),
            content: Some(self.content.clone()),
            created_at: Some(self.created_at.into()),
            is_read: self.is_read,
        }
    }
}

/// Precomputed display name first, then the embedded profile's full name
fn resolve_name(display_name: Option<&str>, participant: &ParticipantRef) -> Option<String> {
    display_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .or_else(|| participant.full_name())
}
