//! Remote and local implementations of the `AuthService` trait.

use crate::clients::{Backend, BackendError, LocalCredentials};
use crate::models::{
    AccountStatus, ApprovalStatus, NewProfile, Profile, ProfileChanges, Role,
};
use crate::services::auth_service::{
    AuthError, AuthService, LoginOutcome, Registration, RegistrationOutcome,
};
use crate::services::gate::{self, GateDecision};
use crate::services::warnings::Warnings;
use crate::validation::{Field, FieldErrors, validate_email, validate_password};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

pub struct RemoteAuthService {
    backend: Arc<dyn Backend>,
    reset_redirect_url: String,
    sign_out_pending: bool,
    warnings: Warnings,
}

impl RemoteAuthService {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, reset_redirect_url: impl Into<String>) -> Self {
        Self {
            backend,
            reset_redirect_url: reset_redirect_url.into(),
            sign_out_pending: false,
            warnings: Warnings::new(),
        }
    }

    /// Revoke the session when a login is refused for pending approval.
    #[must_use]
    pub fn with_pending_sign_out(mut self, enabled: bool) -> Self {
        self.sign_out_pending = enabled;
        self
    }

    /// Sign-out whose failure is only reported on the side channel.
    async fn sign_out_quietly(&self, operation: &'static str) {
        self.warnings.capture(operation, self.backend.sign_out().await);
    }

    /// Creates the identity, or recovers an existing one when the password
    /// proves ownership. Returns the id and whether it was pre-existing.
    async fn resolve_identity(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<(Uuid, bool), AuthError> {
        match self.backend.sign_up(email, password).await {
            Ok(result) => Ok((result.user_id(), false)),
            Err(BackendError::UserAlreadyExists) => {
                info!(email, "Email already registered, trying to recover identity");
                match self.backend.sign_in(email, password).await {
                    Ok(session) => Ok((session.user_id(), true)),
                    Err(e) => {
                        warn!(email, error = %e, "Could not recover existing identity");
                        Err(AuthError::EmailAlreadyRegistered)
                    }
                }
            }
            Err(BackendError::PermissionDenied(msg)) => Err(AuthError::PermissionDenied(msg)),
            Err(e) => {
                error!(email, error = %e, "Account creation failed");
                Err(AuthError::RegistrationFailed(e.to_string()))
            }
        }
    }

    /// Insert first; a conflicting row is updated instead.
    async fn write_profile(&self, row: &NewProfile, existing: bool) -> Result<(), BackendError> {
        if existing {
            return self.backend.upsert_profile(row).await;
        }

        match self.backend.insert_profile(row).await {
            Err(BackendError::Conflict(msg)) => {
                info!(user_id = %row.id, reason = %msg, "Profile exists, updating instead");
                self.backend.update_profile(row.id, &row.as_changes()).await
            }
            other => other,
        }
    }
}

#[async_trait]
impl AuthService for RemoteAuthService {
    async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<LoginOutcome, AuthError> {
        let email = email.trim();

        let session = match self.backend.sign_in(email, password).await {
            Ok(session) => session,
            Err(BackendError::EmailNotConfirmed) => {
                info!(email, "Email not confirmed, resending confirmation");
                self.warnings.capture(
                    "resend_confirmation",
                    self.backend.resend_confirmation(email).await,
                );
                return Ok(LoginOutcome::ConfirmationResent {
                    email: email.to_string(),
                });
            }
            Err(e) => {
                warn!(email, error = %e, "Sign-in failed");
                return Err(e.into());
            }
        };

        let profile = match self.backend.fetch_profile(session.user_id()).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                error!(user_id = %session.user_id(), "Authenticated identity has no profile");
                return Err(AuthError::ProfileNotFound);
            }
            Err(e) => {
                error!(user_id = %session.user_id(), error = %e, "Failed to load profile");
                return Err(e.into());
            }
        };

        match gate::evaluate(&profile) {
            GateDecision::Disabled => {
                warn!(user_id = %profile.id, "Login attempt on disabled account");
                // the backend drops its session even if the remote call fails
                self.sign_out_quietly("sign_out").await;
                Err(AuthError::AccountDisabled)
            }
            GateDecision::PendingApproval => {
                info!(user_id = %profile.id, "Login attempt while pending approval");
                if self.sign_out_pending {
                    self.sign_out_quietly("sign_out").await;
                }
                Err(AuthError::PendingApproval)
            }
            GateDecision::MustChangePassword => {
                info!(user_id = %profile.id, "Password change required");
                Ok(LoginOutcome::MustChangePassword(profile))
            }
            GateDecision::Admitted => {
                info!(user_id = %profile.id, "Login succeeded");
                Ok(LoginOutcome::Authenticated(profile))
            }
        }
    }

    async fn register(
        &self,
        registration: Registration,
    ) -> Result<RegistrationOutcome, AuthError> {
        let email = registration.details.email.trim().to_string();

        let (user_id, existing) = self
            .resolve_identity(&email, &registration.password)
            .await?;

        let row = NewProfile::pending(user_id, registration.details);
        if let Err(e) = self.write_profile(&row, existing).await {
            error!(%user_id, error = %e, "Failed to write profile");
            if existing {
                self.sign_out_quietly("sign_out").await;
            }
            return Err(match e {
                BackendError::PermissionDenied(msg) => AuthError::PermissionDenied(msg),
                other => AuthError::RegistrationFailed(other.to_string()),
            });
        }

        if existing {
            // the recovered identity was signed in by resolve_identity
            self.sign_out_quietly("sign_out").await;
            info!(%user_id, "Existing identity re-registered");
            Ok(RegistrationOutcome::ExistingProfileUpdated { user_id })
        } else {
            info!(%user_id, "Registration submitted for approval");
            Ok(RegistrationOutcome::Registered { user_id })
        }
    }

    async fn force_change_password(
        &self,
        profile: &Profile,
        current_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<(), AuthError> {
        let mut errors = FieldErrors::new();
        errors.check(Field::Password, validate_password(new_password.expose_secret()));
        if current_password.expose_secret() == new_password.expose_secret() {
            errors.add(
                Field::Password,
                "New password must be different from current password",
            );
        }
        errors.into_result()?;

        // a live session is not proof of knowing the password
        match self.backend.sign_in(&profile.email, current_password).await {
            Ok(_) => {}
            Err(BackendError::InvalidCredentials) => {
                return Err(AuthError::field(
                    Field::CurrentPassword,
                    "Current password is incorrect",
                ));
            }
            Err(e) => {
                warn!(user_id = %profile.id, error = %e, "Re-authentication failed");
                return Err(e.into());
            }
        }

        self.backend.update_password(new_password).await.map_err(|e| {
            error!(user_id = %profile.id, error = %e, "Failed to update password");
            AuthError::from(e)
        })?;

        info!(user_id = %profile.id, "Password changed");

        self.warnings.capture(
            "clear_password_flag",
            self.backend
                .update_profile(profile.id, &ProfileChanges::clear_password_flag())
                .await,
        );

        Ok(())
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let email = email.trim();
        validate_email(email).map_err(|m| AuthError::field(Field::Email, m))?;

        self.backend
            .request_password_reset(email, &self.reset_redirect_url)
            .await
            .map_err(|e| {
                warn!(email, error = %e, "Password reset request failed");
                AuthError::from(e)
            })?;

        info!(email, "Password reset email requested");
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.backend.sign_out().await.map_err(AuthError::from)
    }

    fn warnings(&self) -> &Warnings {
        &self.warnings
    }
}

/// Fallback used when no backend is configured: a single local administrator,
/// read-only, and no registration.
pub struct LocalAuthService {
    credentials: LocalCredentials,
    warnings: Warnings,
}

impl LocalAuthService {
    #[must_use]
    pub fn new(credentials: LocalCredentials) -> Self {
        Self {
            credentials,
            warnings: Warnings::new(),
        }
    }

    /// Synthetic profile for the local administrator.
    #[must_use]
    pub fn local_profile(&self) -> Profile {
        Profile {
            id: Uuid::nil(),
            email: self.credentials.username.clone(),
            full_name: Some("Local administrator".to_string()),
            phone: None,
            birth_date: None,
            rg: None,
            region: None,
            gender: None,
            position: None,
            responsible_name: None,
            responsible_phone: None,
            avatar_url: None,
            observation: None,
            role: Role::Admin,
            status: ApprovalStatus::Approved,
            account_status: AccountStatus::Active,
            must_change_password: false,
        }
    }
}

#[async_trait]
impl AuthService for LocalAuthService {
    async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<LoginOutcome, AuthError> {
        if self.credentials.matches(username, password) {
            info!("Local administrator logged in");
            Ok(LoginOutcome::Authenticated(self.local_profile()))
        } else {
            warn!("Local login rejected");
            Err(AuthError::InvalidCredentials)
        }
    }

    async fn register(&self, _: Registration) -> Result<RegistrationOutcome, AuthError> {
        Err(AuthError::Unavailable)
    }

    async fn force_change_password(
        &self,
        _: &Profile,
        _: &SecretString,
        _: &SecretString,
    ) -> Result<(), AuthError> {
        Err(AuthError::Unavailable)
    }

    async fn request_password_reset(&self, _: &str) -> Result<(), AuthError> {
        Err(AuthError::Unavailable)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        Ok(())
    }

    fn warnings(&self) -> &Warnings {
        &self.warnings
    }
}
