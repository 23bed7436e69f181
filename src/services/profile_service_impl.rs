use crate::clients::Backend;
use crate::models::{Profile, ProfileChanges};
use crate::services::auth_service::AuthError;
use crate::services::profile_service::ProfileService;
use crate::validation::{Field, validate_password};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

pub struct RemoteProfileService {
    backend: Arc<dyn Backend>,
}

impl RemoteProfileService {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    async fn session_user(&self) -> Result<Uuid, AuthError> {
        match self.backend.current_session().await? {
            Some(session) => Ok(session.user_id()),
            None => {
                warn!("No valid session");
                Err(AuthError::NotAuthenticated)
            }
        }
    }
}

#[async_trait]
impl ProfileService for RemoteProfileService {
    async fn current_profile(&self) -> Result<Profile, AuthError> {
        let user_id = self.session_user().await?;
        self.backend
            .fetch_profile(user_id)
            .await?
            .ok_or(AuthError::ProfileNotFound)
    }

    async fn update_profile(&self, changes: &ProfileChanges) -> Result<Profile, AuthError> {
        let user_id = self.session_user().await?;

        if !changes.is_empty() {
            self.backend
                .update_profile(user_id, changes)
                .await
                .map_err(|e| {
                    error!(%user_id, error = %e, "Failed to update profile");
                    AuthError::from(e)
                })?;
            info!(%user_id, "Profile updated");
        }

        self.backend
            .fetch_profile(user_id)
            .await?
            .ok_or(AuthError::ProfileNotFound)
    }

    async fn change_password(&self, new_password: &SecretString) -> Result<(), AuthError> {
        validate_password(new_password.expose_secret())
            .map_err(|m| AuthError::field(Field::Password, m))?;

        let user_id = self.session_user().await?;
        self.backend.update_password(new_password).await.map_err(|e| {
            error!(%user_id, error = %e, "Failed to change password");
            AuthError::from(e)
        })?;

        info!(%user_id, "Password changed from profile");
        Ok(())
    }

    fn is_read_only(&self) -> bool {
        false
    }
}

/// Read-only view over a fixed profile, used in local mode.
pub struct LocalProfileService {
    profile: Profile,
}

impl LocalProfileService {
    #[must_use]
    pub const fn new(profile: Profile) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl ProfileService for LocalProfileService {
    async fn current_profile(&self) -> Result<Profile, AuthError> {
        Ok(self.profile.clone())
    }

    async fn update_profile(&self, _: &ProfileChanges) -> Result<Profile, AuthError> {
        Err(AuthError::Unavailable)
    }

    async fn change_password(&self, _: &SecretString) -> Result<(), AuthError> {
        Err(AuthError::Unavailable)
    }

    fn is_read_only(&self) -> bool {
        true
    }
}
