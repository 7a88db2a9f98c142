//! Chat vocabulary shared across the workspace.
//!
//! Identifiers are opaque server-assigned strings. They are wrapped in
//! newtypes so a conversation id can never be passed where a message id is
//! expected.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier.
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Raw identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }
    };
}

string_id! {
    /// Identifier of a user (viewer or sender).
    UserId
}

string_id! {
    /// Identifier of a conversation, direct or group.
    ConversationId
}

string_id! {
    /// Server-assigned, globally unique message identifier.
    MessageId
}

/// Bearer credential for request/response collaborators.
///
/// Never serialized onto the push channel and redacted from `Debug` output so
/// it cannot leak through logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wrap a raw token.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Raw token, for building request headers.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// The single logical viewer this client acts for.
///
/// Immutable for the lifetime of a connection session; a different identity
/// means a different session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerIdentity {
    /// Viewer's user id, announced on the push channel.
    pub user_id: UserId,
    /// Credential attached to every collaborator request.
    pub token: AuthToken,
}

impl ViewerIdentity {
    /// Create an identity.
    pub fn new(user_id: impl Into<UserId>, token: AuthToken) -> Self {
        Self { user_id: user_id.into(), token }
    }
}

/// A chat message. Immutable once created by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique, server-assigned id.
    pub id: MessageId,
    /// Conversation the message belongs to.
    pub conversation: ConversationId,
    /// Author.
    pub sender: UserId,
    /// Text body.
    pub content: String,
    /// Creation time in Unix milliseconds (UTC).
    pub created_at: u64,
}
