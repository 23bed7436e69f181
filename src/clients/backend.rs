//! Contract of the hosted identity + data service.
//!
//! Services and controllers only ever see [`Backend`]; the HTTP implementation
//! lives in [`super::http`].

use crate::models::{NewProfile, Profile, ProfileChanges, Session, SignUpResult};
use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Failures reported by the remote service, already classified.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("Email not confirmed")]
    EmailNotConfirmed,

    #[error("User already registered")]
    UserAlreadyExists,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Backend returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Raw reply of a server function. Non-2xx statuses are not errors here,
/// callers decide what they mean.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionReply {
    pub status: u16,
    pub body: Value,
}

impl FunctionReply {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// `error` (or `message`) string from the body, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.body
            .get("error")
            .or_else(|| self.body.get("message"))
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Password sign-in. Stores the resulting session.
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Session, BackendError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<SignUpResult, BackendError>;

    /// Drops the local session even when the remote call fails.
    async fn sign_out(&self) -> Result<(), BackendError>;

    /// The stored session, confirmed against the service. `None` when absent
    /// or rejected.
    async fn current_session(&self) -> Result<Option<Session>, BackendError>;

    async fn update_password(&self, new_password: &SecretString) -> Result<(), BackendError>;

    async fn resend_confirmation(&self, email: &str) -> Result<(), BackendError>;

    async fn request_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), BackendError>;

    async fn fetch_profile(&self, id: Uuid) -> Result<Option<Profile>, BackendError>;

    async fn insert_profile(&self, row: &NewProfile) -> Result<(), BackendError>;

    async fn update_profile(&self, id: Uuid, changes: &ProfileChanges)
    -> Result<(), BackendError>;

    async fn upsert_profile(&self, row: &NewProfile) -> Result<(), BackendError>;

    async fn invoke_function(&self, name: &str, body: Value)
    -> Result<FunctionReply, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_function_reply_success_range() {
        let ok = FunctionReply {
            status: 200,
            body: json!({ "valid": true }),
        };
        assert!(ok.is_success());

        let bad = FunctionReply {
            status: 400,
            body: json!({ "error": "Token expired" }),
        };
        assert!(!bad.is_success());
        assert_eq!(bad.error_message(), Some("Token expired"));
    }

    #[test]
    fn test_function_reply_blank_error() {
        let reply = FunctionReply {
            status: 500,
            body: json!({ "error": "  " }),
        };
        assert_eq!(reply.error_message(), None);

        let reply = FunctionReply {
            status: 500,
            body: Value::Null,
        };
        assert_eq!(reply.error_message(), None);
    }
}
