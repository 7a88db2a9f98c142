//! Pending notifications for conversations the viewer is not looking at.
//!
//! # Invariants
//!
//! - Membership is keyed by message id alone. Ids are globally unique, so the
//!   same id can never be pending twice, whichever conversation it claims.
//! - Nothing for the active conversation is ever pending.

use std::collections::{BTreeMap, HashSet};

use palaver_proto::{ConversationId, Message, MessageId};
use tracing::debug;

/// A live message waiting for the viewer to open its conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNotification {
    /// The delivered message.
    pub message: Message,
}

/// Where a live message went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// Belongs to the active conversation; hand it to the message store.
    Active(Message),
    /// Queued as a new pending notification.
    Queued,
    /// Already pending; nothing changed.
    Duplicate,
}

/// Deduplicated pending-notification set.
#[derive(Debug, Clone, Default)]
pub struct NotificationDeduper {
    // Arrival order, oldest first
    pending: Vec<PendingNotification>,
    ids: HashSet<MessageId>,
}

impl NotificationDeduper {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a live message against the active conversation.
    pub fn route(&mut self, message: Message, active: Option<&ConversationId>) -> Routed {
        if active == Some(&message.conversation) {
            return Routed::Active(message);
        }

        if !self.ids.insert(message.id.clone()) {
            debug!(id = %message.id, "duplicate notification suppressed");
            return Routed::Duplicate;
        }

        debug!(id = %message.id, conversation = %message.conversation, "notification queued");
        self.pending.push(PendingNotification { message });
        Routed::Queued
    }

    /// Drop everything pending for `conversation`. Returns how many went.
    pub fn clear_for_conversation(&mut self, conversation: &ConversationId) -> usize {
        let before = self.pending.len();
        let ids = &mut self.ids;
        self.pending.retain(|pending| {
            let keep = &pending.message.conversation != conversation;
            if !keep {
                ids.remove(&pending.message.id);
            }
            keep
        });
        before - self.pending.len()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.ids.clear();
    }

    /// Pending notifications, newest first.
    pub fn pending(&self) -> impl Iterator<Item = &PendingNotification> {
        self.pending.iter().rev()
    }

    /// Whether `id` is pending.
    pub fn contains(&self, id: &MessageId) -> bool {
        self.ids.contains(id)
    }

    /// Number of pending notifications.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending count per conversation.
    pub fn unread_counts(&self) -> BTreeMap<ConversationId, usize> {
        let mut counts = BTreeMap::new();
        for pending in &self.pending {
            *counts.entry(pending.message.conversation.clone()).or_insert(0) += 1;
        }
        counts
    }
}
