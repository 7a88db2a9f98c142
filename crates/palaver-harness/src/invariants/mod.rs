//! Behavioral invariants over rendered viewer state.
//!
//! Each render is reduced to a [`SystemSnapshot`] and every registered
//! [`Invariant`] is evaluated against it. A scenario only says what happens;
//! the registry says what must stay true however events interleave.
//! [`SimDriver`](crate::SimDriver) checks on every render and ends the run on
//! the first failing render.

mod checks;
mod snapshot;

use std::fmt;

pub use checks::{
    LogMatchesActive, LogUnique, NothingPendingForActive, PendingUnique, UnreadMatchesPending,
};
pub use snapshot::{SystemSnapshot, ViewerSnapshot};

/// Outcome of a single invariant check.
pub type InvariantResult = Result<(), Violation>;

/// A broken invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Which invariant failed.
    pub invariant: &'static str,
    /// What was observed.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// Every violation found in one snapshot. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violations(Vec<Violation>);

impl Violations {
    /// The individual violations, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.0.iter()
    }

    /// Whether the named invariant is among the failures.
    pub fn contains(&self, invariant: &str) -> bool {
        self.0.iter().any(|v| v.invariant == invariant)
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Violations {}

/// A property evaluated against every snapshot.
pub trait Invariant: Send + Sync {
    /// Stable name used in violation reports.
    fn name(&self) -> &'static str;

    /// Evaluate against `state`.
    fn check(&self, state: &SystemSnapshot) -> InvariantResult;
}

/// Ordered set of invariants evaluated together.
#[derive(Default)]
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl InvariantRegistry {
    /// Registry with nothing to check.
    pub fn new() -> Self {
        Self::default()
    }

    /// The synchronization invariants:
    ///
    /// - [`LogUnique`]
    /// - [`PendingUnique`]
    /// - [`NothingPendingForActive`]
    /// - [`LogMatchesActive`]
    /// - [`UnreadMatchesPending`]
    pub fn standard() -> Self {
        Self::new()
            .with(LogUnique)
            .with(PendingUnique)
            .with(NothingPendingForActive)
            .with(LogMatchesActive)
            .with(UnreadMatchesPending)
    }

    /// Register `invariant` and return the registry.
    #[must_use]
    pub fn with(mut self, invariant: impl Invariant + 'static) -> Self {
        self.invariants.push(Box::new(invariant));
        self
    }

    /// Names of the registered invariants, in evaluation order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.invariants.iter().map(|inv| inv.name())
    }

    /// Evaluate every invariant, collecting all failures.
    pub fn check_all(&self, state: &SystemSnapshot) -> Result<(), Violations> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(Violations(violations)) }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use palaver_proto::{ConversationId, Message, MessageId, UserId};

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
    fn standard_registry_order() {
        let names: Vec<_> = InvariantRegistry::standard().names().collect();
        assert_eq!(
            names,
            [
                "log_unique",
                "pending_unique",
                "nothing_pending_for_active",
                "log_matches_active",
                "unread_matches_pending"
            ]
        );
    }

    #[test]
    fn empty_registry_accepts_anything() {
        let viewer = ViewerSnapshot::new("alice")
            .with_active(Some(ConversationId::from("c1")))
            .with_log(vec![message("m1", "c1"), message("m1", "c1")]);
        assert!(InvariantRegistry::new().check_all(&SystemSnapshot::single(viewer)).is_ok());
    }

    #[test]
    fn signed_out_viewer_holds() {
        let registry = InvariantRegistry::standard();
        assert!(registry.check_all(&SystemSnapshot::empty()).is_ok());
        assert!(registry.check_all(&SystemSnapshot::single(ViewerSnapshot::default())).is_ok());
    }

    #[test]
    fn all_failures_are_reported() {
        let viewer = ViewerSnapshot::new("alice")
            .with_active(Some(ConversationId::from("c1")))
            .with_log(vec![message("m1", "c2"), message("m1", "c2")]);

        let violations =
            InvariantRegistry::standard().check_all(&SystemSnapshot::single(viewer)).unwrap_err();

        assert!(violations.contains("log_unique"));
        assert!(violations.contains("log_matches_active"));
        assert_eq!(violations.iter().count(), 2);
        assert!(violations.to_string().contains("; "));
    }
}
