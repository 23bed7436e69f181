//! Domain service for the signed-in user's own profile.

use crate::models::{Profile, ProfileChanges};
use crate::services::auth_service::AuthError;
use secrecy::SecretString;

/// Domain service trait for profile self-service.
#[async_trait::async_trait]
pub trait ProfileService: Send + Sync {
    /// Loads the profile of the current session's identity.
    ///
    /// # Errors
    ///
    /// [`AuthError::NotAuthenticated`] without a valid session,
    /// [`AuthError::ProfileNotFound`] when the row is missing.
    async fn current_profile(&self) -> Result<Profile, AuthError>;

    /// Partial update scoped to the current identity; returns the stored row.
    async fn update_profile(&self, changes: &ProfileChanges) -> Result<Profile, AuthError>;

    /// Password change for a user already holding a valid session.
    async fn change_password(&self, new_password: &SecretString) -> Result<(), AuthError>;

    /// Whether writes are possible at all.
    fn is_read_only(&self) -> bool;
}
