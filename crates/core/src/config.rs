//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into
//! services by `Arc`. Operations never read process-wide environment
//! variables, which keeps behaviour consistent across runtimes and test
//! harnesses.

use crate::error::{CoordinationError, CoordinationResult};

/// Default base URL for the manual fallback chat link.
pub const DEFAULT_CHAT_LINK_BASE: &str = "https://wa.me";

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    chat_link_base: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// `chat_link_base` is the base URL used to build pre-filled chat
    /// links for manual sending. A trailing slash is stripped.
    pub fn new(chat_link_base: impl Into<String>) -> CoordinationResult<Self> {
        let base = chat_link_base.into().trim().trim_end_matches('/').to_owned();
        if base.is_empty() {
            return Err(CoordinationError::InvalidInput(
                "chat_link_base cannot be empty".into(),
            ));
        }

        Ok(Self {
            chat_link_base: base,
        })
    }

    pub fn chat_link_base(&self) -> &str {
        &self.chat_link_base
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            chat_link_base: DEFAULT_CHAT_LINK_BASE.to_owned(),
        }
    }
}
