//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use std::collections::{BTreeMap, HashSet};

use super::{Invariant, InvariantResult, SystemSnapshot, Violation};

/// No message id appears twice in a visible log.
pub struct LogUnique;

impl Invariant for LogUnique {
    fn name(&self) -> &'static str {
        "log_unique"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for viewer in &state.viewers {
            let mut seen = HashSet::new();
            for message in &viewer.log {
                if !seen.insert(&message.id) {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("viewer {:?}: {} shown twice", viewer.user, message.id),
                    });
                }
            }
        }
        Ok(())
    }
}

/// No message id is pending twice.
pub struct PendingUnique;

impl Invariant for PendingUnique {
    fn name(&self) -> &'static str {
        "pending_unique"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for viewer in &state.viewers {
            let mut seen = HashSet::new();
            for message in &viewer.pending {
                if !seen.insert(&message.id) {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("viewer {:?}: {} pending twice", viewer.user, message.id),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Nothing for the active conversation is ever pending.
///
/// Live messages go to the log or the notification set, never both.
pub struct NothingPendingForActive;

impl Invariant for NothingPendingForActive {
    fn name(&self) -> &'static str {
        "nothing_pending_for_active"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for viewer in &state.viewers {
            let Some(active) = &viewer.active else {
                continue;
            };
            if let Some(message) = viewer.pending.iter().find(|m| &m.conversation == active) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "viewer {:?}: {} pending for active conversation {active}",
                        viewer.user, message.id
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Every logged message belongs to the active conversation.
///
/// With nothing selected the log is empty. Catches a late fetch for a
/// previous selection overwriting the current one.
pub struct LogMatchesActive;

impl Invariant for LogMatchesActive {
    fn name(&self) -> &'static str {
        "log_matches_active"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for viewer in &state.viewers {
            if let Some(message) =
                viewer.log.iter().find(|m| Some(&m.conversation) != viewer.active.as_ref())
            {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "viewer {:?}: {} from {} shown while {:?} is active",
                        viewer.user, message.id, message.conversation, viewer.active
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Unread counts agree with the pending set.
pub struct UnreadMatchesPending;

impl Invariant for UnreadMatchesPending {
    fn name(&self) -> &'static str {
        "unread_matches_pending"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for viewer in &state.viewers {
            let mut expected = BTreeMap::new();
            for message in &viewer.pending {
                *expected.entry(message.conversation.clone()).or_insert(0) += 1;
            }
            if expected != viewer.unread {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "viewer {:?}: unread {:?} but pending implies {expected:?}",
                        viewer.user, viewer.unread
                    ),
                });
            }
        }
        Ok(())
    }
}
