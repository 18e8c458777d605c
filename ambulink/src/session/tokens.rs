//! Token pair and credential storage.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

/// Access/refresh token pair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

// Tokens never reach the logs.
impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Credential storage.
///
/// The production store is the platform's encrypted storage and lives
/// outside this crate. `save` must replace both tokens in one step.
pub trait TokenStore: Send + Sync {
    /// Currently stored tokens, if any.
    fn load(&self) -> Option<TokenPair>;

    /// Replace both stored tokens.
    fn save(&self, tokens: TokenPair);

    /// Remove all stored credentials.
    fn clear(&self);
}

/// In-memory token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<Option<TokenPair>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `tokens`.
    pub fn with_tokens(tokens: TokenPair) -> Self {
        Self {
            tokens: RwLock::new(Some(tokens)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<TokenPair> {
        self.tokens.read().unwrap().clone()
    }

    fn save(&self, tokens: TokenPair) {
        *self.tokens.write().unwrap() = Some(tokens);
    }

    fn clear(&self) {
        *self.tokens.write().unwrap() = None;
    }
}
