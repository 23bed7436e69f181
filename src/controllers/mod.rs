//! Form controllers.
//!
//! Each controller owns its form fields, an explicit state enum, a
//! [`SubmitGuard`] that refuses overlapping submissions and a [`Lifetime`]
//! whose cancellation aborts requests still in flight when the controller
//! goes away.

pub mod force_password;
pub mod login;
pub mod profile_editor;
pub mod register;
pub mod reset_password;

pub use force_password::{ForcePasswordController, ForcePasswordForm, ForcePasswordState};
pub use login::{LoginController, LoginForm, LoginState};
pub use profile_editor::{EditorState, PasswordDraft, ProfileDraft, ProfileEditor};
pub use register::{RegisterController, RegisterState, RegistrationForm};
pub use reset_password::{ResetPasswordController, ResetPasswordForm, ResetState};

use crate::services::AuthError;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cancellation scope bound to a controller. Dropping it cancels.
#[derive(Debug, Default)]
pub struct Lifetime {
    token: CancellationToken,
}

impl Lifetime {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ends the scope; pending and future `run` calls return `Cancelled`.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token for work that must stop with this scope.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Runs `fut` unless the scope ends first.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, AuthError>>,
    {
        if self.token.is_cancelled() {
            return Err(AuthError::Cancelled);
        }

        tokio::select! {
            biased;
            () = self.token.cancelled() => {
                debug!("Request cancelled");
                Err(AuthError::Cancelled)
            }
            result = fut => result,
        }
    }
}

impl Drop for Lifetime {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Marks one submission in flight; the trigger stays disabled while held.
#[derive(Debug, Default)]
pub struct SubmitGuard {
    in_flight: AtomicBool,
}

impl SubmitGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` while another submission holds the guard.
    pub fn try_begin(&self) -> Option<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight { guard: self })
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Releases the [`SubmitGuard`] on drop, including on early return.
#[derive(Debug)]
pub struct InFlight<'a> {
    guard: &'a SubmitGuard,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.guard.in_flight.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_submit_guard_is_exclusive() {
        let guard = SubmitGuard::new();
        let first = guard.try_begin();
        assert!(first.is_some());
        assert!(guard.is_busy());
        assert!(guard.try_begin().is_none());

        drop(first);
        assert!(!guard.is_busy());
        assert!(guard.try_begin().is_some());
    }

    #[tokio::test]
    async fn test_lifetime_cancels_pending_work() {
        let lifetime = Lifetime::new();
        let token = lifetime.token();

        let cancel = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        };
        let work = lifetime.run(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, AuthError>(())
        });

        let (result, ()) = tokio::join!(work, cancel);
        assert_eq!(result, Err(AuthError::Cancelled));
        assert!(lifetime.is_cancelled());
    }

    #[tokio::test]
    async fn test_lifetime_passes_result_through() {
        let lifetime = Lifetime::new();
        assert_eq!(lifetime.run(async { Ok::<_, AuthError>(7) }).await, Ok(7));

        lifetime.cancel();
        assert_eq!(
            lifetime.run(async { Ok::<_, AuthError>(7) }).await,
            Err(AuthError::Cancelled)
        );
    }

    #[test]
    fn test_drop_cancels_token() {
        let lifetime = Lifetime::new();
        let token = lifetime.token();
        drop(lifetime);
        assert!(token.is_cancelled());
    }
}
