use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionUser {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Default)]
struct Credential {
    token: Option<String>,
    user: Option<SessionUser>,
}

/// Bearer credential for the booking store, created at login and cleared on
/// logout or when the store rejects it.
#[derive(Debug, Default)]
pub struct Session {
    inner: RwLock<Credential>,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_user(token, None)
    }

    pub fn with_user(token: impl Into<String>, user: Option<SessionUser>) -> Self {
        Self {
            inner: RwLock::new(Credential {
                token: Some(token.into()),
                user,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Credential> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn token(&self) -> Option<String> {
        self.read().token.clone()
    }

    pub fn is_active(&self) -> bool {
        self.read().token.is_some()
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.read().user.clone()
    }

    /// Drops the token and the user together.
    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.user = None;
        if inner.token.take().is_some() {
            tracing::info!("session cleared");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let session = Session::new("tok-1");
        assert!(session.is_active());
        assert_eq!(session.token().as_deref(), Some("tok-1"));

        session.clear();
        assert!(!session.is_active());
        assert_eq!(session.token(), None);

        // clearing twice is harmless
        session.clear();
        assert!(!session.is_active());
    }

    #[test]
    fn test_clear_forgets_user() {
        let user = SessionUser {
            id: Some("u1".to_string()),
            username: Some("admin".to_string()),
        };
        let session = Session::with_user("tok-1", Some(user));
        assert_eq!(
            session.user().and_then(|u| u.username).as_deref(),
            Some("admin")
        );

        session.clear();
        assert!(session.user().is_none());
        assert!(!session.is_active());
    }

    #[test]
    fn test_default_session_is_inactive() {
        assert!(!Session::default().is_active());
    }
}
