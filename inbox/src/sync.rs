//! The inbox shell.
//!
//! Owns the latest message snapshot for one user and republishes the grouped
//! conversations whenever it changes: after a fetch, a background poll, a
//! send, or a mark-read. Each snapshot is regrouped in full under one lock,
//! so subscribers never observe a half-applied update.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::{InboxError, Result};
use crate::grouping::{group_conversations_with_report, GroupingReport};
use crate::models::input::{SendMessageInput, ValidateExt};
use crate::models::{find_conversation, total_unread, Conversation, Message, RawMessage, UserId};
use crate::source::MessageSource;

#[derive(Default)]
struct InboxState {
    snapshot: Vec<RawMessage>,
    conversations: Vec<Conversation>,
    report: GroupingReport,
    refreshed_at: Option<DateTime<Utc>>,
}

/// Result of marking a conversation read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkReadOutcome {
    /// Messages the source was asked to mark
    pub requested: usize,
    /// Requests that failed; the next refresh restores their unread state
    pub failed: usize,
}

/// Live inbox for one user on top of a `MessageSource`
pub struct Inbox<S> {
    source: S,
    user: UserId,
    state: Mutex<InboxState>,
    updates: watch::Sender<Vec<Conversation>>,
}

impl<S: MessageSource> Inbox<S> {
    pub fn new(source: S, user: UserId) -> Self {
        let (updates, _) = watch::channel(Vec::new());
        Self {
            source,
            user,
            state: Mutex::new(InboxState::default()),
            updates,
        }
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// Receive the conversation list every time it changes
    pub fn subscribe(&self) -> watch::Receiver<Vec<Conversation>> {
        self.updates.subscribe()
    }

    pub async fn conversations(&self) -> Vec<Conversation> {
        self.state.lock().await.conversations.clone()
    }

    pub async fn total_unread(&self) -> usize {
        total_unread(&self.state.lock().await.conversations)
    }

    /// Counts from the most recent grouping pass
    pub async fn last_report(&self) -> GroupingReport {
        self.state.lock().await.report
    }

    pub async fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.refreshed_at
    }

    /// Replace the snapshot with a fresh fetch; returns the conversation count
    ///
    /// The lock is held across the fetch so an older response can never
    /// overwrite a newer one.
    pub async fn refresh(&self) -> Result<usize> {
        let mut state = self.state.lock().await;
        let messages = self.source.fetch_messages(&self.user).await?;
        state.snapshot = messages;
        state.refreshed_at = Some(Utc::now());
        self.regroup(&mut state);

        debug!(
            user = %self.user,
            messages = state.snapshot.len(),
            conversations = state.conversations.len(),
            skipped = state.report.skipped(),
            "Inbox refreshed"
        );
        Ok(state.conversations.len())
    }

    /// Send a message and show it immediately, ahead of the next refresh
    pub async fn send(&self, input: SendMessageInput) -> Result<Message> {
        input.validate_input()?;
        let recipient = UserId::parse(&input.recipient_id)?;
        if recipient == self.user {
            return Err(InboxError::Validation(
                "Cannot send a message to yourself".to_string(),
            ));
        }

        let sent = self.source.send_message(&self.user, &input).await?;
        let message = Message::normalize(&sent).map_err(|reason| {
            InboxError::Source(format!("Sent message came back unusable: {}", reason))
        })?;

        let mut state = self.state.lock().await;
        state.snapshot.push(sent);
        self.regroup(&mut state);
        debug!(id = %message.id, to = %recipient, "Message sent");
        Ok(message)
    }

    /// Mark every unread message from `counterpart` as read
    ///
    /// The unread count drops to zero right away; one request per message then
    /// goes to the source. Failures are logged and counted, and the next
    /// refresh brings back whatever the source did not record.
    pub async fn mark_conversation_read(&self, counterpart: &UserId) -> Result<MarkReadOutcome> {
        let ids = {
            let mut state = self.state.lock().await;
            let Some(conversation) = find_conversation(&state.conversations, counterpart) else {
                debug!(counterpart = %counterpart, "No conversation to mark read");
                return Ok(MarkReadOutcome::default());
            };
            let ids = conversation.unread_message_ids(&self.user);
            if ids.is_empty() {
                return Ok(MarkReadOutcome::default());
            }

            for raw in state.snapshot.iter_mut() {
                if raw.message_id().is_some_and(|id| ids.contains(&id)) {
                    raw.is_read = true;
                }
            }
            self.regroup(&mut state);
            ids
        };

        let mut outcome = MarkReadOutcome {
            requested: ids.len(),
            failed: 0,
        };
        for id in &ids {
            if let Err(e) = self.source.mark_read(id).await {
                warn!(id = %id, error = %e, "Failed to mark message read");
                outcome.failed += 1;
            }
        }

        info!(
            counterpart = %counterpart,
            requested = outcome.requested,
            failed = outcome.failed,
            "Marked conversation read"
        );
        Ok(outcome)
    }

    fn regroup(&self, state: &mut InboxState) {
        let (conversations, report) = group_conversations_with_report(&state.snapshot, &self.user);
        state.conversations = conversations;
        state.report = report;

        let next = &state.conversations;
        self.updates.send_if_modified(|current| {
            if *current == *next {
                false
            } else {
                *current = next.clone();
                true
            }
        });
    }
}

impl<S: MessageSource + 'static> Inbox<S> {
    /// Refresh now and then every `period` until the handle is shut down
    pub fn spawn_poller(self: &Arc<Self>, period: Duration) -> PollerHandle {
        let inbox = Arc::clone(self);
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(user = %inbox.user, period_secs = period.as_secs(), "Inbox poller started");

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Shutdown signal received, stopping inbox poller");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = inbox.refresh().await {
                            warn!(error = %e, "Inbox refresh failed");
                        }
                    }
                }
            }
        });

        PollerHandle { shutdown_tx, task }
    }
}

/// Stops a running poller
pub struct PollerHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal the poller and wait for its loop to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            warn!(error = %e, "Inbox poller ended abnormally");
        }
    }
}
