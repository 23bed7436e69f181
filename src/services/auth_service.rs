//! Domain service for authentication and account lifecycle.
//!
//! Handles login with the account state gate, self-registration, the forced
//! password change and password reset requests.

use crate::clients::BackendError;
use crate::constants::messages;
use crate::models::{Profile, RegistrationDetails};
use crate::services::warnings::Warnings;
use crate::validation::{Field, FieldErrors};
use secrecy::SecretString;
use thiserror::Error;
use uuid::Uuid;

/// Errors specific to authentication operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email not confirmed")]
    EmailNotConfirmed,

    #[error("Profile not found")]
    ProfileNotFound,

    #[error("Account disabled")]
    AccountDisabled,

    #[error("Account pending approval")]
    PendingApproval,

    #[error("Email already registered")]
    EmailAlreadyRegistered,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Registration failed: {0}")]
    RegistrationFailed(String),

    #[error("Invalid reset link: {0}")]
    InvalidResetLink(String),

    #[error("Password reset failed: {0}")]
    ResetFailed(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Unavailable in local mode")]
    Unavailable,

    #[error("A submission is already in progress")]
    Busy,

    #[error("Cancelled")]
    Cancelled,

    #[error("Backend error: {0}")]
    Backend(BackendError),
}

impl From<BackendError> for AuthError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::InvalidCredentials => Self::InvalidCredentials,
            BackendError::EmailNotConfirmed => Self::EmailNotConfirmed,
            BackendError::UserAlreadyExists => Self::EmailAlreadyRegistered,
            BackendError::PermissionDenied(msg) => Self::PermissionDenied(msg),
            BackendError::NotAuthenticated => Self::NotAuthenticated,
            other => Self::Backend(other),
        }
    }
}

impl From<FieldErrors> for AuthError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

impl AuthError {
    pub(crate) fn field(field: Field, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        Self::Validation(errors)
    }

    /// The single message shown to the user for this failure.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(errors) => errors
                .iter()
                .next()
                .map_or_else(|| "Check the highlighted fields".to_string(), |(_, m)| m.to_string()),
            Self::InvalidCredentials => messages::INVALID_CREDENTIALS.to_string(),
            Self::EmailNotConfirmed => messages::EMAIL_NOT_CONFIRMED.to_string(),
            Self::ProfileNotFound => messages::PROFILE_NOT_FOUND.to_string(),
            Self::AccountDisabled => messages::ACCOUNT_DISABLED.to_string(),
            Self::PendingApproval => messages::PENDING_APPROVAL.to_string(),
            Self::EmailAlreadyRegistered => messages::EMAIL_ALREADY_REGISTERED.to_string(),
            Self::PermissionDenied(_) => messages::PERMISSION_DENIED.to_string(),
            Self::RegistrationFailed(_) => messages::REGISTRATION_FAILED.to_string(),
            Self::InvalidResetLink(msg) | Self::ResetFailed(msg) => msg.clone(),
            Self::NotAuthenticated => messages::NOT_AUTHENTICATED.to_string(),
            Self::Unavailable => messages::UNAVAILABLE.to_string(),
            Self::Busy => "Please wait, the previous request is still running.".to_string(),
            Self::Cancelled => "The request was cancelled.".to_string(),
            Self::Backend(BackendError::Network(_)) => messages::NETWORK.to_string(),
            Self::Backend(_) => "Something went wrong. Try again later.".to_string(),
        }
    }

    #[must_use]
    pub const fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Successful login results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated(Profile),

    /// Admitted, but the password must be changed before anything else.
    MustChangePassword(Profile),

    /// The email was not confirmed; a new confirmation message was requested.
    ConfirmationResent { email: String },
}

/// Validated registration input.
#[derive(Debug, Clone)]
pub struct Registration {
    pub password: SecretString,
    pub details: RegistrationDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// New identity; the account now awaits approval.
    Registered { user_id: Uuid },

    /// The email already had an identity with this password; its profile was
    /// rewritten and the session closed.
    ExistingProfileUpdated { user_id: Uuid },
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Authenticates, then applies the account state gate to the profile.
    ///
    /// # Errors
    ///
    /// [`AuthError::ProfileNotFound`], [`AuthError::AccountDisabled`] (after
    /// signing out) or [`AuthError::PendingApproval`] when the gate refuses.
    async fn login(&self, email: &str, password: &SecretString)
    -> Result<LoginOutcome, AuthError>;

    /// Creates (or recovers) the identity and writes a pending profile.
    async fn register(&self, registration: Registration)
    -> Result<RegistrationOutcome, AuthError>;

    /// Re-proves the current password with a fresh sign-in, then sets the new
    /// one and clears `must_change_password` on a best-effort basis.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] if the current password is wrong or
    /// the new one breaks the password rules.
    async fn force_change_password(
        &self,
        profile: &Profile,
        current_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<(), AuthError>;

    /// Asks the service to email a password reset link.
    async fn request_password_reset(&self, email: &str) -> Result<(), AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Sign-out at the end of a session; a failure lands in [`Self::warnings`].
    async fn end_session(&self) {
        let result = self.sign_out().await;
        self.warnings().capture("sign_out", result);
    }

    /// Failures of best-effort side operations.
    fn warnings(&self) -> &Warnings;
}
