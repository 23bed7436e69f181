//! Self-service profile editor.
//!
//! Edits happen on a [`ProfileDraft`]; nothing is written until `save`. The
//! email is shown but never part of an update.

use crate::avatar::AvatarFile;
use crate::controllers::{Lifetime, SubmitGuard, lock};
use crate::models::{Profile, ProfileChanges};
use crate::services::{AuthError, ProfileService};
use crate::validation::{Field, FieldErrors, new_password_errors, normalize_optional, validate_phone};
use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Editable mirror of a profile. Blank text means "no value".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileDraft {
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

    /// Pending photo preview as a data URL.
    pub avatar: Option<String>,
}

impl ProfileDraft {
    #[must_use]
    pub fn from_profile(profile: &Profile) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            full_name: text(&profile.full_name),
            phone: text(&profile.phone),
            birth_date: profile.birth_date,
            rg: text(&profile.rg),
            region: text(&profile.region),
            gender: text(&profile.gender),
            position: text(&profile.position),
            responsible_name: text(&profile.responsible_name),
            responsible_phone: text(&profile.responsible_phone),
            observation: text(&profile.observation),
            avatar: profile.avatar_url.clone(),
        }
    }

    /// Phone numbers are checked only when filled in.
    #[must_use]
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if !self.phone.trim().is_empty() {
            errors.check(Field::Phone, validate_phone(&self.phone));
        }
        if !self.responsible_phone.trim().is_empty() {
            errors.check(
                Field::ResponsiblePhone,
                validate_phone(&self.responsible_phone),
            );
        }
        errors
    }

    /// Columns whose normalized value differs from `current`.
    #[must_use]
    pub fn changes_from(&self, current: &Profile) -> ProfileChanges {
        fn diff<T: PartialEq>(new: Option<T>, old: &Option<T>) -> Option<Option<T>> {
            (new.as_ref() != old.as_ref()).then_some(new)
        }

        ProfileChanges {
            full_name: diff(normalize_optional(&self.full_name), &current.full_name),
            phone: diff(normalize_optional(&self.phone), &current.phone),
            birth_date: diff(self.birth_date, &current.birth_date),
            rg: diff(normalize_optional(&self.rg), &current.rg),
            region: diff(normalize_optional(&self.region), &current.region),
            gender: diff(normalize_optional(&self.gender), &current.gender),
            position: diff(normalize_optional(&self.position), &current.position),
            responsible_name: diff(
                normalize_optional(&self.responsible_name),
                &current.responsible_name,
            ),
            responsible_phone: diff(
                normalize_optional(&self.responsible_phone),
                &current.responsible_phone,
            ),
            avatar_url: diff(self.avatar.clone(), &current.avatar_url),
            observation: diff(normalize_optional(&self.observation), &current.observation),
            ..ProfileChanges::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PasswordDraft {
    pub new_password: SecretString,
    pub confirm_password: SecretString,
}

#[derive(Debug, Clone)]
pub enum EditorState {
    Viewing,
    Editing(ProfileDraft),
    ChangingPassword(PasswordDraft),
}

pub struct ProfileEditor {
    profiles: Arc<dyn ProfileService>,
    max_avatar_bytes: u64,
    profile: Mutex<Profile>,
    state: Mutex<EditorState>,
    errors: Mutex<FieldErrors>,
    error: Mutex<Option<String>>,
    guard: SubmitGuard,
    lifetime: Lifetime,
}

impl ProfileEditor {
    #[must_use]
    pub fn new(profiles: Arc<dyn ProfileService>, profile: Profile, max_avatar_bytes: u64) -> Self {
        Self {
            profiles,
            max_avatar_bytes,
            profile: Mutex::new(profile),
            state: Mutex::new(EditorState::Viewing),
            errors: Mutex::new(FieldErrors::new()),
            error: Mutex::new(None),
            guard: SubmitGuard::new(),
            lifetime: Lifetime::new(),
        }
    }

    /// Last saved profile.
    #[must_use]
    pub fn profile(&self) -> Profile {
        lock(&self.profile).clone()
    }

    #[must_use]
    pub fn state(&self) -> EditorState {
        lock(&self.state).clone()
    }

    #[must_use]
    pub fn draft(&self) -> Option<ProfileDraft> {
        match &*lock(&self.state) {
            EditorState::Editing(draft) => Some(draft.clone()),
            _ => None,
        }
    }

    #[must_use]
    pub fn field_errors(&self) -> FieldErrors {
        lock(&self.errors).clone()
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        lock(&self.error).clone()
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.guard.is_busy()
    }

    pub fn unmount(&self) {
        self.lifetime.cancel();
    }

    fn reset_feedback(&self) {
        *lock(&self.errors) = FieldErrors::new();
        *lock(&self.error) = None;
    }

    pub fn begin_edit(&self) -> Result<(), AuthError> {
        if self.profiles.is_read_only() {
            return Err(AuthError::Unavailable);
        }
        let draft = ProfileDraft::from_profile(&lock(&self.profile));
        self.reset_feedback();
        *lock(&self.state) = EditorState::Editing(draft);
        Ok(())
    }

    pub fn begin_password_change(&self) -> Result<(), AuthError> {
        if self.profiles.is_read_only() {
            return Err(AuthError::Unavailable);
        }
        self.reset_feedback();
        *lock(&self.state) = EditorState::ChangingPassword(PasswordDraft::default());
        Ok(())
    }

    /// Drops any pending edits.
    pub fn cancel(&self) {
        self.reset_feedback();
        *lock(&self.state) = EditorState::Viewing;
    }

    /// No-op outside the editing state.
    pub fn edit_draft(&self, f: impl FnOnce(&mut ProfileDraft)) {
        if let EditorState::Editing(draft) = &mut *lock(&self.state) {
            f(draft);
        }
    }

    pub fn edit_password(&self, f: impl FnOnce(&mut PasswordDraft)) {
        if let EditorState::ChangingPassword(draft) = &mut *lock(&self.state) {
            f(draft);
        }
    }

    /// Replaces the preview with the selected image. A rejected file is
    /// never read and leaves the current preview as it was.
    pub async fn select_avatar(&self, file: AvatarFile) -> Result<(), AuthError> {
        if self.draft().is_none() {
            return Err(AuthError::field(Field::Avatar, "Start editing to change the photo"));
        }

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
                self.edit_draft(|draft| draft.avatar = Some(data_url));
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

    /// Persists the draft as a partial update and returns to viewing.
    pub async fn save(&self) -> Result<Profile, AuthError> {
        let Some(_in_flight) = self.guard.try_begin() else {
            debug!("Profile save already in flight");
            return Err(AuthError::Busy);
        };

        let Some(draft) = self.draft() else {
            return Err(AuthError::field(Field::FullName, "Nothing to save"));
        };

        let errors = draft.validate();
        *lock(&self.errors) = errors.clone();
        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }

        let changes = draft.changes_from(&lock(&self.profile));
        *lock(&self.error) = None;

        let result = self
            .lifetime
            .run(self.profiles.update_profile(&changes))
            .await;

        match result {
            Ok(profile) => {
                info!(user_id = %profile.id, "Profile saved");
                *lock(&self.profile) = profile.clone();
                *lock(&self.state) = EditorState::Viewing;
                Ok(profile)
            }
            Err(e) => {
                if !matches!(e, AuthError::Cancelled) {
                    warn!(error = %e, "Failed to save profile");
                    *lock(&self.error) = Some(e.user_message());
                }
                Err(e)
            }
        }
    }

    /// Sets a new password for the already signed-in user.
    pub async fn submit_password(&self) -> Result<(), AuthError> {
        let Some(_in_flight) = self.guard.try_begin() else {
            debug!("Password change already in flight");
            return Err(AuthError::Busy);
        };

        let draft = match &*lock(&self.state) {
            EditorState::ChangingPassword(draft) => draft.clone(),
            _ => return Err(AuthError::field(Field::Password, "Start a password change first")),
        };

        let errors = new_password_errors(
            draft.new_password.expose_secret(),
            draft.confirm_password.expose_secret(),
        );
        *lock(&self.errors) = errors.clone();
        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }

        *lock(&self.error) = None;
        let result = self
            .lifetime
            .run(self.profiles.change_password(&draft.new_password))
            .await;

        match result {
            Ok(()) => {
                *lock(&self.state) = EditorState::Viewing;
                Ok(())
            }
            Err(e) => {
                if !matches!(e, AuthError::Cancelled) {
                    warn!(error = %e, "Failed to change password");
                    *lock(&self.error) = Some(e.user_message());
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn profile() -> Profile {
        Profile {
            id: Uuid::new_v4(),
            email: "ana@club.test".to_string(),
            full_name: Some("Ana Souza".to_string()),
            phone: Some("11987654321".to_string()),
            birth_date: None,
            rg: None,
            region: Some("Zona Sul".to_string()),
            gender: None,
            position: None,
            responsible_name: None,
            responsible_phone: None,
            avatar_url: None,
            observation: Some("Canhota".to_string()),
            role: crate::models::Role::User,
            status: crate::models::ApprovalStatus::Approved,
            account_status: crate::models::AccountStatus::Active,
            must_change_password: false,
        }
    }

    #[test]
    fn test_unchanged_draft_has_no_changes() {
        let p = profile();
        assert!(ProfileDraft::from_profile(&p).changes_from(&p).is_empty());
    }

    #[test]
    fn test_blank_fields_become_null() {
        let p = profile();
        let mut draft = ProfileDraft::from_profile(&p);
        draft.observation = "   ".to_string();
        draft.position = " Zagueira ".to_string();

        let changes = draft.changes_from(&p);
        assert_eq!(changes.observation, Some(None));
        assert_eq!(changes.position, Some(Some("Zagueira".to_string())));
        assert_eq!(changes.full_name, None);
    }

    #[test]
    fn test_phone_checked_only_when_filled() {
        let mut draft = ProfileDraft::from_profile(&profile());
        draft.phone = String::new();
        assert!(draft.validate().is_empty());

        draft.phone = "123".to_string();
        let errors = draft.validate();
        assert!(errors.contains(Field::Phone));
        assert_eq!(errors.len(), 1);
    }
}
