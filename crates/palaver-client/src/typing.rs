//! Typing indicator state machine.
//!
//! Local side is a debounce: the first keystroke sends typing-start, later
//! keystrokes only move the deadline, and stop is sent once the quiet period
//! since the *latest* keystroke reaches the timeout. There is a single
//! deadline, never one timer per keystroke, so overlapping timers cannot fire
//! twice.
//!
//! ```text
//!           keystroke / Start
//!   ┌──────┐──────────────────>┌────────┐──┐ keystroke
//!   │ Idle │                   │ Typing │  │ (re-arm)
//!   └──────┘<──────────────────└────────┘<─┘
//!        tick past deadline, send, switch / Stop
//! ```
//!
//! Remote side is a single flag for the active conversation.

use std::{ops::Sub, time::Duration};

use palaver_proto::ConversationId;

/// Typing signal to put on the push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypingSignal {
    /// Viewer started typing.
    Start(ConversationId),
    /// Viewer stopped typing.
    Stop(ConversationId),
}

#[derive(Debug, Clone)]
enum LocalTyping<I> {
    Idle,
    Typing { conversation: ConversationId, last_keystroke: I },
}

/// Debounced local typing plus the remote typing flag.
#[derive(Debug, Clone)]
pub struct TypingCoordinator<I> {
    timeout: Duration,
    local: LocalTyping<I>,
    remote: bool,
}

impl<I> TypingCoordinator<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Idle coordinator with the given quiet period.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout, local: LocalTyping::Idle, remote: false }
    }

    /// Whether the viewer is currently typing.
    pub fn is_local_typing(&self) -> bool {
        matches!(self.local, LocalTyping::Typing { .. })
    }

    /// Whether a participant is typing in the active conversation.
    pub fn is_remote_typing(&self) -> bool {
        self.remote
    }

    /// Record a keystroke in `conversation`.
    ///
    /// Starts typing from idle; otherwise re-arms the deadline.
    pub fn keystroke(&mut self, conversation: &ConversationId, now: I) -> Vec<TypingSignal> {
        if let LocalTyping::Typing { conversation: current, last_keystroke } = &mut self.local
            && current == conversation
        {
            *last_keystroke = now;
            return Vec::new();
        }

        let mut signals: Vec<_> = self.force_idle().into_iter().collect();
        self.local =
            LocalTyping::Typing { conversation: conversation.clone(), last_keystroke: now };
        signals.push(TypingSignal::Start(conversation.clone()));
        signals
    }

    /// Expire the debounce if the quiet period has elapsed.
    pub fn tick(&mut self, now: I) -> Option<TypingSignal> {
        let expired = matches!(
            &self.local,
            LocalTyping::Typing { last_keystroke, .. } if now - *last_keystroke >= self.timeout
        );
        if expired { self.force_idle() } else { None }
    }

    /// Time until the debounce expires. `None` when idle.
    pub fn remaining(&self, now: I) -> Option<Duration> {
        match &self.local {
            LocalTyping::Typing { last_keystroke, .. } => {
                Some(self.timeout.saturating_sub(now - *last_keystroke))
            },
            LocalTyping::Idle => None,
        }
    }

    /// Stop typing now, cancelling the deadline.
    ///
    /// Returns a stop signal only if the viewer was typing.
    pub fn force_idle(&mut self) -> Option<TypingSignal> {
        match std::mem::replace(&mut self.local, LocalTyping::Idle) {
            LocalTyping::Typing { conversation, .. } => Some(TypingSignal::Stop(conversation)),
            LocalTyping::Idle => None,
        }
    }

    /// Leave the conversation: local goes idle, remote flag clears.
    pub fn reset(&mut self) -> Option<TypingSignal> {
        self.remote = false;
        self.force_idle()
    }

    /// A participant started typing in the active conversation.
    pub fn remote_started(&mut self) {
        self.remote = true;
    }

    /// A participant stopped typing in the active conversation.
    pub fn remote_stopped(&mut self) {
        self.remote = false;
    }
}
