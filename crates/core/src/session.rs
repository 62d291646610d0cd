//! Authenticated session model and login/registration payloads.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A logged-in session: the bearer token plus the user it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub username: String,
}

/// The persisted `currentUser` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub username: String,
}

/// Body of `POST /api/login` and `POST /api/register`.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Build registration credentials, rejecting mismatched passwords
    /// locally so the backend is never contacted.
    pub fn for_registration(
        username: impl Into<String>,
        password: impl Into<String>,
        confirm_password: &str,
    ) -> Result<Self, CoreError> {
        let password = password.into();
        if password != confirm_password {
            return Err(CoreError::PasswordMismatch);
        }
        Ok(Self::new(username, password))
    }
}

/// Response of the login/registration endpoints.
///
/// On success the backend sends `token` and `username`; on failure it
/// sends `error`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl AuthResponse {
    /// Turn a successful response into a [`Session`].
    ///
    /// Falls back to `requested_username` when the backend omits the
    /// username. Returns `None` when no token was issued.
    pub fn into_session(self, requested_username: &str) -> Option<Session> {
        let token = self.token.filter(|t| !t.is_empty())?;
        Some(Session {
            token,
            username: self
                .username
                .unwrap_or_else(|| requested_username.to_string()),
        })
    }
}
