//! Session handle carrying the auth credential and requester identity.
//!
//! Forms receive a clone at construction and only read from it. The login
//! flow is the single writer.

use std::sync::{Arc, PoisonError, RwLock};

/// Credential pair issued by a successful OTP validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub user_id: String,
}

/// Shared, cloneable view of the current session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<RwLock<Option<Credentials>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session pre-seeded with credentials (e.g. from configuration).
    pub fn with_credentials(token: impl Into<String>, user_id: impl Into<String>) -> Self {
        let session = Self::new();
        session.login(token, user_id);
        session
    }

    /// Current auth token, if one is present and non-empty.
    pub fn token(&self) -> Option<String> {
        self.current()
            .map(|c| c.token)
            .filter(|t| !t.is_empty())
    }

    /// Current requester identity, if one is present and non-empty.
    pub fn user_id(&self) -> Option<String> {
        self.current()
            .map(|c| c.user_id)
            .filter(|u| !u.is_empty())
    }

    /// Both token and identity, only when both are usable.
    pub fn credentials(&self) -> Option<Credentials> {
        let token = self.token()?;
        let user_id = self.user_id()?;
        Some(Credentials { token, user_id })
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials().is_some()
    }

    pub(crate) fn login(&self, token: impl Into<String>, user_id: impl Into<String>) {
        let credentials = Credentials {
            token: token.into(),
            user_id: user_id.into(),
        };
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(credentials);
    }

    pub(crate) fn logout(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn current(&self) -> Option<Credentials> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
