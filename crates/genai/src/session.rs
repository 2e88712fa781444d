//! Credential session shared by services and pollers.
//!
//! A [`Session`] holds the currently selected API key. It starts out
//! either with a key or empty, is invalidated when the remote service
//! rejects the key, and is refilled only through an explicit
//! [`Session::reacquire`] call backed by a [`KeySelector`].

use std::sync::RwLock;

use async_trait::async_trait;

/// Env vars checked, in order, for an API key.
pub const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

/// Process-wide credential state with an init/invalidate/reacquire
/// lifecycle.
#[derive(Debug, Default)]
pub struct Session {
    api_key: RwLock<Option<String>>,
}

impl Session {
    /// A session that starts out holding `api_key`.
    pub fn with_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: RwLock::new(Some(api_key.into())),
        }
    }

    /// A session with no credential selected yet.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether a credential is currently selected.
    pub fn has_valid_credential(&self) -> bool {
        self.read().is_some()
    }

    /// The selected API key, if any.
    pub fn api_key(&self) -> Option<String> {
        self.read().clone()
    }

    /// Drop the current credential after the service rejected it.
    pub fn invalidate(&self) {
        let mut guard = self.api_key.write().unwrap_or_else(|e| e.into_inner());
        if guard.take().is_some() {
            tracing::warn!("API key rejected by the generation service; session invalidated");
        }
    }

    /// Ask `selector` for a credential and store it.
    ///
    /// Returns `true` when a key was obtained.
    pub async fn reacquire(&self, selector: &dyn KeySelector) -> bool {
        match selector.select_key().await {
            Some(key) if !key.trim().is_empty() => {
                *self.api_key.write().unwrap_or_else(|e| e.into_inner()) = Some(key);
                tracing::info!("API key selected");
                true
            }
            _ => {
                tracing::warn!("No API key selected");
                false
            }
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<String>> {
        self.api_key.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// The "select a key" collaborator invoked on re-authentication.
#[async_trait]
pub trait KeySelector: Send + Sync {
    async fn select_key(&self) -> Option<String>;
}

/// Picks the key up from the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvKeySelector;

#[async_trait]
impl KeySelector for EnvKeySelector {
    async fn select_key(&self) -> Option<String> {
        API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|v| !v.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSelector(Option<&'static str>);

    #[async_trait]
    impl KeySelector for FixedSelector {
        async fn select_key(&self) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    #[test]
    fn empty_session_has_no_credential() {
        let session = Session::empty();
        assert!(!session.has_valid_credential());
        assert!(session.api_key().is_none());
    }

    #[test]
    fn invalidate_clears_key() {
        let session = Session::with_key("k-1");
        assert!(session.has_valid_credential());
        session.invalidate();
        assert!(!session.has_valid_credential());
        // Idempotent.
        session.invalidate();
        assert!(!session.has_valid_credential());
    }

    #[tokio::test]
    async fn reacquire_stores_selected_key() {
        let session = Session::empty();
        assert!(session.reacquire(&FixedSelector(Some("k-2"))).await);
        assert_eq!(session.api_key().as_deref(), Some("k-2"));
    }

    #[tokio::test]
    async fn reacquire_without_key_keeps_session_empty() {
        let session = Session::empty();
        assert!(!session.reacquire(&FixedSelector(None)).await);
        assert!(!session.reacquire(&FixedSelector(Some("  "))).await);
        assert!(!session.has_valid_credential());
    }
}
