//! Authentication session domain model.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrapeKitError};

/// The authentication state of the client.
///
/// Exactly one `Session` exists per client instance. It is owned and
/// mutated by the session manager; every other component reads it through
/// accessor methods. The token is an opaque bearer credential; the client
/// never inspects or validates it, and validity is discovered lazily by the
/// first backend call that needs it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Whether the user has a live login
    pub is_logged_in: bool,
    /// Opaque bearer token, present only while logged in
    pub token: Option<String>,
    /// Backend-assigned user identifier, present only while logged in
    pub user_id: Option<i64>,
}

impl Session {
    /// Creates a logged-in session from a login response.
    pub fn logged_in(token: impl Into<String>, user_id: i64) -> Self {
        Self {
            is_logged_in: true,
            token: Some(token.into()),
            user_id: Some(user_id),
        }
    }

    /// Returns the bearer token, or a validation error when there is none.
    ///
    /// Authenticated requests must never be issued without a token, so
    /// callers building such a request go through this accessor.
    pub fn require_token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| ScrapeKitError::validation("not logged in: no session token"))
    }

    /// Resets the session to the logged-out state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
