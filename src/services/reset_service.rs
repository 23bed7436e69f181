//! Password reset token verification against the reset server function.
//!
//! The same function serves two phases: `{token, email}` only checks the
//! token, `{token, email, newPassword}` checks and consumes it. Token validity
//! is decided by the server alone.

use crate::clients::{Backend, BackendMode};
use crate::constants::messages;
use crate::fragment::ResetLink;
use crate::services::auth_service::AuthError;
use crate::validation::new_password_errors;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenCheck {
    Valid,
    Invalid(String),
}

pub struct ResetTokenVerifier {
    backend: Option<Arc<dyn Backend>>,
    function: String,
}

impl ResetTokenVerifier {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, function: impl Into<String>) -> Self {
        Self {
            backend: Some(backend),
            function: function.into(),
        }
    }

    /// Local mode has no reset function; every call reports `Unavailable`.
    #[must_use]
    pub fn from_mode(mode: &BackendMode, function: impl Into<String>) -> Self {
        Self {
            backend: mode.remote().cloned(),
            function: function.into(),
        }
    }

    fn backend(&self) -> Result<&Arc<dyn Backend>, AuthError> {
        self.backend.as_ref().ok_or(AuthError::Unavailable)
    }

    /// Read-only check, safe to retry.
    #[instrument(skip(self, link), fields(email = %link.email))]
    pub async fn verify(&self, link: &ResetLink) -> Result<TokenCheck, AuthError> {
        let backend = self.backend()?;
        let reply = backend
            .invoke_function(
                &self.function,
                json!({ "token": link.token, "email": link.email }),
            )
            .await?;

        if !reply.is_success() {
            warn!(status = reply.status, "Reset token rejected");
            return Ok(TokenCheck::Invalid(
                reply
                    .error_message()
                    .unwrap_or(messages::EXPIRED_RESET_LINK)
                    .to_string(),
            ));
        }

        if reply.body.get("valid").and_then(Value::as_bool) == Some(true) {
            Ok(TokenCheck::Valid)
        } else {
            info!("Reset token reported invalid");
            Ok(TokenCheck::Invalid(messages::EXPIRED_RESET_LINK.to_string()))
        }
    }

    /// Verifies and consumes the token while setting the new password.
    #[instrument(skip(self, link, new_password, confirmation), fields(email = %link.email))]
    pub async fn consume(
        &self,
        link: &ResetLink,
        new_password: &SecretString,
        confirmation: &SecretString,
    ) -> Result<(), AuthError> {
        new_password_errors(new_password.expose_secret(), confirmation.expose_secret())
            .into_result()?;

        let backend = self.backend()?;
        let reply = backend
            .invoke_function(
                &self.function,
                json!({
                    "token": link.token,
                    "email": link.email,
                    "newPassword": new_password.expose_secret(),
                }),
            )
            .await?;

        let refused = reply.body.get("error").and_then(Value::as_str).is_some()
            || reply.body.get("valid").and_then(Value::as_bool) == Some(false)
            || reply.body.get("success").and_then(Value::as_bool) == Some(false);

        if !reply.is_success() || refused {
            warn!(status = reply.status, "Password reset refused");
            return Err(AuthError::ResetFailed(
                reply
                    .error_message()
                    .unwrap_or(messages::RESET_FAILED)
                    .to_string(),
            ));
        }

        info!("Password reset completed");
        Ok(())
    }
}
