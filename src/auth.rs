//! Credential providers.
//!
//! The client never reads tokens from ambient storage; a provider is injected
//! at construction and consulted once per outbound attempt.

use std::fmt;

/// Environment variable read by [`EnvToken::default`].
pub const ENV_TOKEN: &str = "MARKET_CLIENT_TOKEN";

/// Source of the bearer credential attached to outbound calls.
pub trait CredentialProvider: Send + Sync {
    /// Current token, or `None` to send the call unauthenticated.
    fn token(&self) -> Option<String>;
}

/// Never attaches a credential.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
    fn token(&self) -> Option<String> {
        None
    }
}

/// Fixed token supplied at startup.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken(***)")
    }
}

impl CredentialProvider for StaticToken {
    fn token(&self) -> Option<String> {
        non_empty(self.0.clone())
    }
}

/// Reads the token from an environment variable on every call, so a
/// refreshed token is picked up without rebuilding the client.
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvToken {
    fn default() -> Self {
        Self::new(ENV_TOKEN)
    }
}

impl CredentialProvider for EnvToken {
    fn token(&self) -> Option<String> {
        std::env::var(&self.var).ok().and_then(non_empty)
    }
}

fn non_empty(token: String) -> Option<String> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
