use crate::controllers::{Lifetime, SubmitGuard, lock};
use crate::models::Profile;
use crate::services::{AuthError, AuthService, LoginOutcome};
use crate::validation::{Field, FieldErrors, validate_required};
use secrecy::{ExposeSecret, SecretString};
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    /// Email, or the local administrator's username in local mode.
    pub email: String,

    pub password: SecretString,
}

impl LoginForm {
    #[must_use]
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        errors.check(Field::Email, validate_required(&self.email, "Email"));
        errors.check(
            Field::Password,
            validate_required(self.password.expose_secret(), "Password"),
        );
        errors
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoginState {
    #[default]
    Idle,
    Submitting,
    Authenticated(Profile),
    MustChangePassword(Profile),
    ConfirmationResent,
    Rejected(String),
}

pub struct LoginController {
    auth: Arc<dyn AuthService>,
    form: Mutex<LoginForm>,
    state: Mutex<LoginState>,
    errors: Mutex<FieldErrors>,
    guard: SubmitGuard,
    lifetime: Lifetime,
}

impl LoginController {
    #[must_use]
    pub fn new(auth: Arc<dyn AuthService>) -> Self {
        Self {
            auth,
            form: Mutex::new(LoginForm::default()),
            state: Mutex::new(LoginState::Idle),
            errors: Mutex::new(FieldErrors::new()),
            guard: SubmitGuard::new(),
            lifetime: Lifetime::new(),
        }
    }

    pub fn edit(&self, f: impl FnOnce(&mut LoginForm)) {
        f(&mut lock(&self.form));
    }

    #[must_use]
    pub fn state(&self) -> LoginState {
        lock(&self.state).clone()
    }

    #[must_use]
    pub fn field_errors(&self) -> FieldErrors {
        lock(&self.errors).clone()
    }

    /// Whether the submit trigger is disabled.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.guard.is_busy()
    }

    pub fn unmount(&self) {
        self.lifetime.cancel();
    }

    fn set_state(&self, state: LoginState) {
        *lock(&self.state) = state;
    }

    /// Submits the form. `on_success` runs only for an admitted login that
    /// does not require a password change.
    pub async fn submit(&self, on_success: impl FnOnce(&Profile)) -> Result<LoginState, AuthError> {
        let Some(_in_flight) = self.guard.try_begin() else {
            debug!("Login already in flight");
            return Err(AuthError::Busy);
        };

        let form = lock(&self.form).clone();
        let errors = form.validate();
        *lock(&self.errors) = errors.clone();
        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }

        self.set_state(LoginState::Submitting);
        let result = self
            .lifetime
            .run(self.auth.login(form.email.trim(), &form.password))
            .await;

        let state = match result {
            Ok(LoginOutcome::Authenticated(profile)) => {
                on_success(&profile);
                LoginState::Authenticated(profile)
            }
            Ok(LoginOutcome::MustChangePassword(profile)) => {
                LoginState::MustChangePassword(profile)
            }
            Ok(LoginOutcome::ConfirmationResent { .. }) => LoginState::ConfirmationResent,
            Err(AuthError::Cancelled) => {
                self.set_state(LoginState::Idle);
                return Err(AuthError::Cancelled);
            }
            Err(e) => {
                self.set_state(LoginState::Rejected(e.user_message()));
                return Err(e);
            }
        };

        // the password is not kept once it has been used
        lock(&self.form).password = SecretString::default();
        self.set_state(state.clone());
        Ok(state)
    }
}
