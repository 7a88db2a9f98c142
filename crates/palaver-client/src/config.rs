//! Client configuration.

use std::time::Duration;

/// Quiet period after the last keystroke before stop-typing is sent.
pub const DEFAULT_TYPING_TIMEOUT: Duration = Duration::from_secs(3);

/// Longest message body, in characters, the client will submit.
pub const DEFAULT_MAX_CONTENT_LEN: usize = 4096;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Typing debounce threshold
    pub typing_timeout: Duration,
    /// Maximum message length in characters; longer sends are dropped
    pub max_content_len: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { typing_timeout: DEFAULT_TYPING_TIMEOUT, max_content_len: DEFAULT_MAX_CONTENT_LEN }
    }
}
