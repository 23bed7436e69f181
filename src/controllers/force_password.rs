use crate::controllers::{Lifetime, SubmitGuard, lock};
use crate::models::Profile;
use crate::services::{AuthError, AuthService};
use crate::validation::{Field, FieldErrors, new_password_errors, validate_required};
use secrecy::{ExposeSecret, SecretString};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct ForcePasswordForm {
    pub current_password: SecretString,
    pub new_password: SecretString,
    pub confirm_password: SecretString,
}

impl ForcePasswordForm {
    #[must_use]
    pub fn validate(&self) -> FieldErrors {
        let current = self.current_password.expose_secret();
        let new = self.new_password.expose_secret();

        let mut errors = new_password_errors(new, self.confirm_password.expose_secret());
        errors.check(
            Field::CurrentPassword,
            validate_required(current, "Current password"),
        );
        if !new.is_empty() && new == current {
            errors.add(
                Field::Password,
                "The new password must differ from the current one",
            );
        }
        errors
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ForcePasswordState {
    #[default]
    Editing,
    Submitting,
    Changed,
    Failed(String),
}

/// Blocks the signed-in user until a new password is set.
pub struct ForcePasswordController {
    auth: Arc<dyn AuthService>,
    profile: Profile,
    form: Mutex<ForcePasswordForm>,
    state: Mutex<ForcePasswordState>,
    errors: Mutex<FieldErrors>,
    guard: SubmitGuard,
    lifetime: Lifetime,
}

impl ForcePasswordController {
    /// `None` unless the profile is flagged for a password change.
    #[must_use]
    pub fn for_profile(auth: Arc<dyn AuthService>, profile: Profile) -> Option<Self> {
        if !profile.must_change_password {
            return None;
        }

        Some(Self {
            auth,
            profile,
            form: Mutex::new(ForcePasswordForm::default()),
            state: Mutex::new(ForcePasswordState::Editing),
            errors: Mutex::new(FieldErrors::new()),
            guard: SubmitGuard::new(),
            lifetime: Lifetime::new(),
        })
    }

    #[must_use]
    pub const fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn edit(&self, f: impl FnOnce(&mut ForcePasswordForm)) {
        f(&mut lock(&self.form));
    }

    #[must_use]
    pub fn state(&self) -> ForcePasswordState {
        lock(&self.state).clone()
    }

    #[must_use]
    pub fn field_errors(&self) -> FieldErrors {
        lock(&self.errors).clone()
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.guard.is_busy()
    }

    pub fn unmount(&self) {
        self.lifetime.cancel();
    }

    /// Changes the password; `on_refresh` runs once the change succeeded so
    /// the caller can reload the profile.
    pub async fn submit(&self, on_refresh: impl FnOnce()) -> Result<(), AuthError> {
        let Some(_in_flight) = self.guard.try_begin() else {
            debug!("Password change already in flight");
            return Err(AuthError::Busy);
        };

        let form = lock(&self.form).clone();
        let errors = form.validate();
        *lock(&self.errors) = errors.clone();
        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }

        *lock(&self.state) = ForcePasswordState::Submitting;
        let result = self
            .lifetime
            .run(self.auth.force_change_password(
                &self.profile,
                &form.current_password,
                &form.new_password,
            ))
            .await;

        match result {
            Ok(()) => {
                info!(user_id = %self.profile.id, "Forced password change completed");
                *lock(&self.form) = ForcePasswordForm::default();
                *lock(&self.state) = ForcePasswordState::Changed;
                on_refresh();
                Ok(())
            }
            Err(AuthError::Cancelled) => {
                *lock(&self.state) = ForcePasswordState::Editing;
                Err(AuthError::Cancelled)
            }
            Err(e) => {
                if let Some(field_errors) = e.field_errors() {
                    *lock(&self.errors) = field_errors.clone();
                }
                *lock(&self.state) = ForcePasswordState::Failed(e.user_message());
                Err(e)
            }
        }
    }
}
