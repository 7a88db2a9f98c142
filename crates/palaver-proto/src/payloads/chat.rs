//! Conversation-scoped payloads.

use serde::{Deserialize, Serialize};

use crate::ConversationId;

/// Body shared by join and typing events: a bare conversation reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationScope {
    /// Conversation the event applies to.
    pub conversation: ConversationId,
}

impl ConversationScope {
    /// Scope an event to `conversation`.
    pub fn new(conversation: ConversationId) -> Self {
        Self { conversation }
    }
}
