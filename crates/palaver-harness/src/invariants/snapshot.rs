//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the observable state of the system at a point in time.
//! Invariants operate on snapshots rather than live state to ensure
//! consistent, atomic checks.

use std::collections::BTreeMap;

use palaver_app::SyncSnapshot;
use palaver_proto::{ConversationId, Message, UserId};

/// Snapshot of the entire system state.
///
/// Contains observable state from one or more viewers for invariant checking.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    /// Per-viewer state snapshots.
    pub viewers: Vec<ViewerSnapshot>,
}

impl SystemSnapshot {
    /// Create an empty snapshot (no viewers).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a snapshot with a single viewer.
    pub fn single(viewer: ViewerSnapshot) -> Self {
        Self { viewers: vec![viewer] }
    }

    /// Add a viewer snapshot.
    pub fn add_viewer(&mut self, viewer: ViewerSnapshot) {
        self.viewers.push(viewer);
    }
}

/// Snapshot of a single viewer's observable state.
#[derive(Debug, Clone, Default)]
pub struct ViewerSnapshot {
    /// Signed-in user. `None` when signed out.
    pub user: Option<UserId>,
    /// Active conversation.
    pub active: Option<ConversationId>,
    /// Visible log.
    pub log: Vec<Message>,
    /// Pending notifications.
    pub pending: Vec<Message>,
    /// Unread counts reported to the conversation list.
    pub unread: BTreeMap<ConversationId, usize>,
}

impl ViewerSnapshot {
    /// Create a snapshot for `user`.
    pub fn new(user: impl Into<UserId>) -> Self {
        Self { user: Some(user.into()), ..Default::default() }
    }

    /// Set active conversation.
    pub fn with_active(mut self, conversation: Option<ConversationId>) -> Self {
        self.active = conversation;
        self
    }

    /// Append messages to the log.
    pub fn with_log(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.log.extend(messages);
        self
    }

    /// Add pending notifications, keeping unread counts in step.
    pub fn with_pending(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        for message in messages {
            *self.unread.entry(message.conversation.clone()).or_insert(0) += 1;
            self.pending.push(message);
        }
        self
    }
}

impl From<&SyncSnapshot> for ViewerSnapshot {
    fn from(sync: &SyncSnapshot) -> Self {
        Self {
            user: sync.viewer.clone(),
            active: sync.active.clone(),
            log: sync.messages.clone(),
            pending: sync.pending.clone(),
            unread: sync.unread.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use palaver_proto::MessageId;

    use super::*;

    fn message(id: &str, conversation: &str) -> Message {
        Message {
            id: MessageId::from(id),
            conversation: ConversationId::from(conversation),
            sender: UserId::from("bob"),
            content: String::new(),
            created_at: 0,
        }
    }

    #[test]
    fn empty_snapshot() {
        let snapshot = SystemSnapshot::empty();
        assert!(snapshot.viewers.is_empty());
    }

    #[test]
    fn viewer_snapshot_builder() {
        let viewer = ViewerSnapshot::new("alice")
            .with_active(Some(ConversationId::from("c1")))
            .with_log([message("m1", "c1")])
            .with_pending([message("m2", "c2"), message("m3", "c2")]);

        assert_eq!(viewer.user, Some(UserId::from("alice")));
        assert_eq!(viewer.log.len(), 1);
        assert_eq!(viewer.unread.get(&ConversationId::from("c2")), Some(&2));
    }

    #[test]
    fn converts_from_sync_snapshot() {
        let sync = SyncSnapshot {
            viewer: Some(UserId::from("alice")),
            active: Some(ConversationId::from("c1")),
            messages: vec![message("m1", "c1")],
            ..Default::default()
        };

        let viewer = ViewerSnapshot::from(&sync);

        assert_eq!(viewer.active, sync.active);
        assert_eq!(viewer.log, sync.messages);
    }
}
