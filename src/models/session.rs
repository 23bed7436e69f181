use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use uuid::Uuid;

/// The identity record owned by the remote service.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub email_confirmed_at: Option<String>,
}

/// Opaque session handed out by the identity service.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: SecretString,

    pub refresh_token: Option<SecretString>,

    pub user: Identity,
}

impl Session {
    #[must_use]
    pub fn new(access_token: impl Into<String>, user: Identity) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            refresh_token: None,
            user,
        }
    }

    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        self.user.id
    }

    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token.expose_secret())
    }
}

/// Result of an account creation request.
///
/// With email confirmation enabled the service returns the identity without a
/// session.
#[derive(Debug, Clone)]
pub struct SignUpResult {
    pub user: Identity,

    pub session: Option<Session>,
}

impl SignUpResult {
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        self.user.id
    }
}
