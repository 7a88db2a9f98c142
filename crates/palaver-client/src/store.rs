//! Message log for the active conversation.
//!
//! The log merges two sources: a history fetch (pull) and live deliveries
//! (push). A fetch result replaces the log in one step. Live messages that
//! arrive while a fetch is outstanding are held back and appended after the
//! fetched batch, skipping any id the batch already contained.
//!
//! # Invariants
//!
//! - No two messages in the log share an id.
//! - Order is arrival order: fetched batch first, then live appends. The
//!   store never sorts by timestamp.
//! - Every message in the log belongs to the selected conversation.

use std::collections::HashSet;

use palaver_proto::{ConversationId, Message, MessageId};
use tracing::debug;

use crate::event::RequestId;

/// Result of offering a message to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Added to the end of the log.
    Appended,
    /// Already present (in the log or the held-back buffer).
    Duplicate,
    /// Held until the outstanding fetch resolves.
    Buffered,
    /// Belongs to a conversation other than the selected one.
    WrongConversation,
}

/// Duplicate-free message log scoped to one conversation at a time.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    conversation: Option<ConversationId>,
    log: Vec<Message>,
    ids: HashSet<MessageId>,
    loading: Option<RequestId>,
    buffered: Vec<Message>,
}

impl MessageStore {
    /// Empty store with nothing selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected conversation.
    pub fn conversation(&self) -> Option<&ConversationId> {
        self.conversation.as_ref()
    }

    /// Visible log, in arrival order.
    pub fn messages(&self) -> &[Message] {
        &self.log
    }

    /// Whether a history fetch is outstanding.
    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    /// Whether `id` is in the visible log.
    pub fn contains(&self, id: &MessageId) -> bool {
        self.ids.contains(id)
    }

    /// Switch to `conversation`, dropping the previous log.
    ///
    /// Any outstanding fetch is forgotten; its completion will be stale.
    pub fn select(&mut self, conversation: Option<ConversationId>) {
        self.conversation = conversation;
        self.clear_log();
        self.loading = None;
        self.buffered.clear();
    }

    /// Mark `request` as the fetch whose result will replace the log.
    ///
    /// The current log stays visible until the fetch resolves.
    pub fn begin_load(&mut self, request: RequestId) {
        debug_assert!(self.conversation.is_some(), "fetch without a selection");
        if let Some(previous) = self.loading.replace(request) {
            debug!(%previous, %request, "superseding outstanding fetch");
        }
        self.buffered.clear();
    }

    /// Apply a fetch result.
    ///
    /// Returns false (and changes nothing) if `request` is not the
    /// outstanding fetch.
    pub fn finish_load(&mut self, request: RequestId, history: Vec<Message>) -> bool {
        if self.loading != Some(request) {
            debug!(%request, "discarding stale history");
            return false;
        }
        self.loading = None;

        self.clear_log();
        for message in history {
            self.push_unique(message);
        }

        for message in std::mem::take(&mut self.buffered) {
            if !self.push_unique(message) {
                debug!("buffered live message already in fetched history");
            }
        }

        true
    }

    /// Record a failed fetch.
    ///
    /// The log is left as it was and held-back messages are dropped. Returns
    /// false if `request` is not the outstanding fetch.
    pub fn fail_load(&mut self, request: RequestId) -> bool {
        if self.loading != Some(request) {
            return false;
        }
        self.loading = None;
        self.buffered.clear();
        true
    }

    /// Offer a live or just-sent message.
    pub fn append_incoming(&mut self, message: Message) -> AppendOutcome {
        if self.conversation.as_ref() != Some(&message.conversation) {
            return AppendOutcome::WrongConversation;
        }

        if self.loading.is_some() {
            if self.buffered.iter().any(|held| held.id == message.id) {
                return AppendOutcome::Duplicate;
            }
            self.buffered.push(message);
            return AppendOutcome::Buffered;
        }

        if self.push_unique(message) { AppendOutcome::Appended } else { AppendOutcome::Duplicate }
    }

    fn push_unique(&mut self, message: Message) -> bool {
        if !self.ids.insert(message.id.clone()) {
            return false;
        }
        self.log.push(message);
        true
    }

    fn clear_log(&mut self) {
        self.log.clear();
        self.ids.clear();
    }
}
