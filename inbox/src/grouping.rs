//! Conversation grouping.
//!
//! Turns the flat direct-message feed into one conversation per counterpart.
//! The functions here are pure: the inbox shell calls them again on every
//! fetch, poll, send and read update with a complete snapshot.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::models::{Conversation, Message, RawMessage, UserId};
use crate::utils::conversation_key;

/// Name shown when no display name can be resolved for a counterpart
pub const UNKNOWN_USER: &str = "Unknown User";

/// What happened to each input record during a grouping pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingReport {
    pub accepted: usize,
    /// Neither participant is the current user
    pub unrelated: usize,
    /// Sender and recipient are both the current user
    pub self_addressed: usize,
    pub malformed: usize,
    /// Repeated message ids; the first occurrence is kept
    pub duplicates: usize,
}

impl GroupingReport {
    pub fn skipped(&self) -> usize {
        self.unrelated + self.self_addressed + self.malformed + self.duplicates
    }
}

struct Bucket {
    counterpart_id: UserId,
    messages: Vec<Message>,
}

/// Group `messages` into conversations as seen by `current_user`
///
/// Conversations come back most recent first; messages inside each one are
/// oldest first. Records that cannot be attributed are skipped, never fatal.
pub fn group_conversations(messages: &[RawMessage], current_user: &UserId) -> Vec<Conversation> {
    group_conversations_with_report(messages, current_user).0
}

pub fn group_conversations_with_report(
    messages: &[RawMessage],
    current_user: &UserId,
) -> (Vec<Conversation>, GroupingReport) {
    let mut report = GroupingReport::default();
    let mut seen_ids: HashSet<String> = HashSet::new();
    // counterpart -> position in `buckets`, so buckets keep first-seen order
    let mut index: HashMap<UserId, usize> = HashMap::new();
    let mut buckets: Vec<Bucket> = Vec::new();

    for raw in messages {
        let message = match Message::normalize(raw) {
            Ok(message) => message,
            Err(reason) => {
                debug!(id = ?raw.message_id(), %reason, "Skipping malformed message");
                report.malformed += 1;
                continue;
            }
        };

        let outgoing = &message.sender_id == current_user;
        let incoming = message.is_incoming_for(current_user);
        if outgoing && incoming {
            debug!(id = %message.id, "Skipping self-addressed message");
            report.self_addressed += 1;
            continue;
        }
        if !outgoing && !incoming {
            report.unrelated += 1;
            continue;
        }
        if !seen_ids.insert(message.id.clone()) {
            debug!(id = %message.id, "Skipping duplicate message");
            report.duplicates += 1;
            continue;
        }

        let counterpart = message.counterpart_for(current_user).0.clone();
        let slot = match index.get(&counterpart) {
            Some(&slot) => slot,
            None => {
                buckets.push(Bucket {
                    counterpart_id: counterpart.clone(),
                    messages: Vec::new(),
                });
                index.insert(counterpart, buckets.len() - 1);
                buckets.len() - 1
            }
        };
        buckets[slot].messages.push(message);
        report.accepted += 1;
    }

    let mut conversations: Vec<Conversation> = buckets
        .into_iter()
        .filter_map(|bucket| build_conversation(bucket, current_user))
        .collect();

    // Stable: equal timestamps keep first-seen order
    conversations.sort_by(|a, b| b.last_message.created_at.cmp(&a.last_message.created_at));

    (conversations, report)
}

fn build_conversation(bucket: Bucket, current_user: &UserId) -> Option<Conversation> {
    let Bucket {
        counterpart_id,
        mut messages,
    } = bucket;

    messages.sort_by_key(|m| m.created_at);
    let last_message = messages.last()?.clone();

    let unread_count = messages
        .iter()
        .filter(|m| m.is_incoming_for(current_user) && !m.is_read)
        .count();

    // Newest message that names the counterpart wins, profiles change
    let counterpart_name = messages
        .iter()
        .rev()
        .find_map(|m| m.counterpart_for(current_user).1)
        .unwrap_or(UNKNOWN_USER)
        .to_string();

    Some(Conversation {
        id: conversation_key(current_user.as_str(), counterpart_id.as_str()),
        counterpart_id,
        counterpart_name,
        messages,
        last_message,
        unread_count,
    })
}
