//! Session-scoped payloads.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// Presence registration sent once per connection session.
///
/// Lets the server route participant deliveries to this connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    /// Viewer announcing itself.
    pub user_id: UserId,
}
