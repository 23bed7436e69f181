use crate::avatar::AvatarFile;
use crate::controllers::{Lifetime, SubmitGuard, lock};
use crate::models::RegistrationDetails;
use crate::services::{AuthError, AuthService, Registration, RegistrationOutcome};
use crate::validation::{
    Field, FieldErrors, new_password_errors, normalize_optional, validate_birth_date,
    validate_email, validate_phone, validate_required,
};
use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub email: String,
    pub full_name: String,
    pub phone: String,
    pub birth_date: Option<NaiveDate>,
    pub rg: String,
    pub region: String,
    pub gender: String,
    pub position: String,
    pub responsible_name: String,
    pub responsible_phone: String,
    pub observation: String,
    pub password: SecretString,
    pub confirm_password: SecretString,

    /// Encoded photo (data URL) once a valid file has been selected.
    pub avatar: Option<String>,
}

impl RegistrationForm {
    /// Checks every field; only a fully valid form yields a [`Registration`].
    pub fn validate(&self, today: NaiveDate) -> Result<Registration, FieldErrors> {
        let mut errors = FieldErrors::new();

        if self.avatar.is_none() {
            errors.add(Field::Avatar, "A profile photo is required");
        }
        errors.check(Field::Email, validate_email(&self.email));
        errors.check(Field::FullName, validate_required(&self.full_name, "Full name"));
        let birth_date = validate_birth_date(self.birth_date, today)
            .map_err(|m| errors.add(Field::BirthDate, m))
            .ok();
        errors.check(Field::Rg, validate_required(&self.rg, "RG"));
        errors.check(Field::Region, validate_required(&self.region, "Region"));
        errors.check(Field::Phone, validate_phone(&self.phone));
        if !self.responsible_phone.trim().is_empty() {
            errors.check(
                Field::ResponsiblePhone,
                validate_phone(&self.responsible_phone),
            );
        }
        for (field, message) in new_password_errors(
            self.password.expose_secret(),
            self.confirm_password.expose_secret(),
        )
        .iter()
        {
            errors.add(field, message);
        }

        match (errors.into_result(), birth_date, &self.avatar) {
            (Ok(()), Some(birth_date), Some(avatar)) => Ok(Registration {
                password: self.password.clone(),
                details: RegistrationDetails {
                    email: self.email.trim().to_string(),
                    full_name: self.full_name.trim().to_string(),
                    phone: self.phone.trim().to_string(),
                    birth_date,
                    rg: self.rg.trim().to_string(),
                    region: self.region.trim().to_string(),
                    gender: normalize_optional(&self.gender),
                    position: normalize_optional(&self.position),
                    responsible_name: normalize_optional(&self.responsible_name),
                    responsible_phone: normalize_optional(&self.responsible_phone),
                    avatar_url: avatar.clone(),
                    observation: normalize_optional(&self.observation),
                },
            }),
            (Err(errors), _, _) => Err(errors),
            // unreachable: a missing date or photo always records an error
            _ => Err(FieldErrors::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RegisterState {
    #[default]
    Editing,
    Submitting,
    Registered,
    ExistingProfileUpdated,
    Failed(String),
}

pub struct RegisterController {
    auth: Arc<dyn AuthService>,
    enabled: bool,
    max_avatar_bytes: u64,
    form: Mutex<RegistrationForm>,
    state: Mutex<RegisterState>,
    errors: Mutex<FieldErrors>,
    guard: SubmitGuard,
    lifetime: Lifetime,
}

impl RegisterController {
    /// `enabled` is false in local mode; submissions then fail without any
    /// request.
    #[must_use]
    pub fn new(auth: Arc<dyn AuthService>, enabled: bool, max_avatar_bytes: u64) -> Self {
        Self {
            auth,
            enabled,
            max_avatar_bytes,
            form: Mutex::new(RegistrationForm::default()),
            state: Mutex::new(RegisterState::Editing),
            errors: Mutex::new(FieldErrors::new()),
            guard: SubmitGuard::new(),
            lifetime: Lifetime::new(),
        }
    }

    pub fn edit(&self, f: impl FnOnce(&mut RegistrationForm)) {
        f(&mut lock(&self.form));
    }

    #[must_use]
    pub fn form(&self) -> RegistrationForm {
        lock(&self.form).clone()
    }

    #[must_use]
    pub fn state(&self) -> RegisterState {
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

    /// Validates and encodes the photo. A rejected file leaves the previous
    /// photo in place.
    pub async fn select_avatar(&self, file: AvatarFile) -> Result<(), AuthError> {
        let encoded = self
            .lifetime
            .run(async {
                file.into_data_url(self.max_avatar_bytes)
                    .await
                    .map_err(|e| AuthError::field(Field::Avatar, e.to_string()))
            })
            .await;

        match encoded {
            Ok(data_url) => {
                lock(&self.form).avatar = Some(data_url);
                lock(&self.errors).remove(Field::Avatar);
                Ok(())
            }
            Err(e) => {
                if let Some(field_errors) = e.field_errors() {
                    let mut errors = lock(&self.errors);
                    errors.remove(Field::Avatar);
                    for (field, message) in field_errors.iter() {
                        errors.add(field, message);
                    }
                }
                Err(e)
            }
        }
    }

    pub async fn submit(&self, today: NaiveDate) -> Result<RegistrationOutcome, AuthError> {
        let Some(_in_flight) = self.guard.try_begin() else {
            debug!("Registration already in flight");
            return Err(AuthError::Busy);
        };

        if !self.enabled {
            *lock(&self.state) = RegisterState::Failed(AuthError::Unavailable.user_message());
            return Err(AuthError::Unavailable);
        }

        let registration = match lock(&self.form).validate(today) {
            Ok(registration) => {
                *lock(&self.errors) = FieldErrors::new();
                registration
            }
            Err(errors) => {
                *lock(&self.errors) = errors.clone();
                return Err(AuthError::Validation(errors));
            }
        };

        *lock(&self.state) = RegisterState::Submitting;
        let result = self.lifetime.run(self.auth.register(registration)).await;

        let state = match &result {
            Ok(RegistrationOutcome::Registered { user_id }) => {
                info!(%user_id, "Registration completed");
                RegisterState::Registered
            }
            Ok(RegistrationOutcome::ExistingProfileUpdated { .. }) => {
                RegisterState::ExistingProfileUpdated
            }
            Err(AuthError::Cancelled) => RegisterState::Editing,
            Err(e) => RegisterState::Failed(e.user_message()),
        };
        *lock(&self.state) = state;

        result
    }
}
