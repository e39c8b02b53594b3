//! Session identity supplied by the host application.
//!
//! The SDK never authenticates users itself -- the host's identity provider
//! resolves whoever is signed in and hands the SDK a [`CurrentSession`].
//! Every store action resolves the user id from the session before doing
//! anything else, so an anonymous session fails fast with
//! [`BinderError::Unauthenticated`].

use crate::error::{BinderError, Result};

/// The session context for one action invocation.
///
/// Constructed by the host from its identity provider: either
/// [`authenticated`](CurrentSession::authenticated) with the signed-in user's
/// id, or [`anonymous`](CurrentSession::anonymous) when nobody is signed in.
#[derive(Debug, Clone, Default)]
pub struct CurrentSession {
    user_id: Option<String>,
}

impl CurrentSession {
    /// Session for a signed-in user.
    pub fn authenticated(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    /// Session with nobody signed in. All store actions will fail with
    /// [`BinderError::Unauthenticated`].
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    /// The signed-in user's id, or `Unauthenticated`.
    ///
    /// This is the first check of every store action.
    pub fn user_id(&self) -> Result<&str> {
        self.user_id
            .as_deref()
            .ok_or(BinderError::Unauthenticated)
    }

    /// Whether a user is signed in.
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}
