//! Bearer credential sources for classifier requests.
//!
//! The controller never reads ambient storage itself; it asks the provider it was
//! constructed with.

use std::path::PathBuf;

pub trait CredentialProvider: Send + Sync {
    /// Token to send as `Authorization: Bearer <token>`, if one is available.
    fn bearer_token(&self) -> Option<String>;
}

/// No credential; requests still carry an empty bearer header.
#[derive(Debug, Clone, Default)]
pub struct Anonymous;

impl CredentialProvider for Anonymous {
    fn bearer_token(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl CredentialProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Session token stored in a file, re-read on every request so a fresh login is
/// picked up without restarting.
#[derive(Debug, Clone)]
pub struct SessionTokenFile {
    path: PathBuf,
}

impl SessionTokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialProvider for SessionTokenFile {
    fn bearer_token(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(s) => {
                let token = s.trim();
                if token.is_empty() {
                    None
                } else {
                    Some(token.to_string())
                }
            }
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "no session token");
                None
            }
        }
    }
}

/// Default session token location: `<config_dir>/spam-check/session-token`.
pub fn default_session_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("spam-check").join("session-token"))
}
