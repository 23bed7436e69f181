//! Password reset page.
//!
//! `Checking -> Valid -> Submitting -> Done`, or `Checking -> Invalid`, which
//! is terminal: the user has to request a new link.

use crate::constants::{
    intervals::{NOTICE_POLL, RESET_SLOW_NOTICE},
    messages,
};
use crate::controllers::{Lifetime, SubmitGuard, lock};
use crate::fragment::{Location, ResetLink};
use crate::services::{AuthError, ResetTokenVerifier, TokenCheck};
use crate::validation::{FieldErrors, new_password_errors};
use secrecy::{ExposeSecret, SecretString};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResetState {
    #[default]
    Checking,
    Valid,
    Submitting,
    Done,
    Invalid(String),
}

#[derive(Debug, Clone, Default)]
pub struct ResetPasswordForm {
    pub new_password: SecretString,
    pub confirm_password: SecretString,
}

pub struct ResetPasswordController {
    verifier: Arc<ResetTokenVerifier>,
    location: Arc<dyn Location>,
    slow_after: Duration,
    link: Mutex<Option<ResetLink>>,
    form: Mutex<ResetPasswordForm>,
    state: Mutex<ResetState>,
    errors: Mutex<FieldErrors>,
    error: Mutex<Option<String>>,
    slow: AtomicBool,
    guard: SubmitGuard,
    lifetime: Lifetime,
}

impl ResetPasswordController {
    #[must_use]
    pub fn new(verifier: Arc<ResetTokenVerifier>, location: Arc<dyn Location>) -> Self {
        Self {
            verifier,
            location,
            slow_after: RESET_SLOW_NOTICE,
            link: Mutex::new(None),
            form: Mutex::new(ResetPasswordForm::default()),
            state: Mutex::new(ResetState::Checking),
            errors: Mutex::new(FieldErrors::new()),
            error: Mutex::new(None),
            slow: AtomicBool::new(false),
            guard: SubmitGuard::new(),
            lifetime: Lifetime::new(),
        }
    }

    /// Overrides the delay before the "still waiting" notice.
    #[must_use]
    pub fn with_slow_notice(mut self, after: Duration) -> Self {
        self.slow_after = after;
        self
    }

    #[must_use]
    pub fn state(&self) -> ResetState {
        lock(&self.state).clone()
    }

    /// Verification has been running longer than the notice delay.
    #[must_use]
    pub fn is_slow(&self) -> bool {
        self.slow.load(Ordering::Acquire)
    }

    /// Notice shown while a slow verification is still running.
    #[must_use]
    pub fn notice(&self) -> Option<&'static str> {
        (self.is_slow() && self.state() == ResetState::Checking)
            .then_some(messages::RESET_STILL_CHECKING)
    }

    /// Last submission failure; the form stays usable.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        lock(&self.error).clone()
    }

    #[must_use]
    pub fn field_errors(&self) -> FieldErrors {
        lock(&self.errors).clone()
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.guard.is_busy()
    }

    pub fn edit(&self, f: impl FnOnce(&mut ResetPasswordForm)) {
        f(&mut lock(&self.form));
    }

    pub fn unmount(&self) {
        self.lifetime.cancel();
    }

    fn set_state(&self, state: ResetState) {
        *lock(&self.state) = state;
    }

    /// Reads the link from the location fragment and checks it remotely.
    /// A link without both parameters is rejected without any request.
    pub async fn mount(&self) -> ResetState {
        let link = self
            .location
            .fragment()
            .as_deref()
            .and_then(ResetLink::from_fragment);

        let Some(link) = link else {
            info!("Reset link is missing its token or email");
            let state = ResetState::Invalid(messages::INVALID_RESET_LINK.to_string());
            self.set_state(state.clone());
            return state;
        };

        self.set_state(ResetState::Checking);
        self.slow.store(false, Ordering::Release);

        let check = self
            .lifetime
            .run(async {
                let verify = self.verifier.verify(&link);
                tokio::pin!(verify);
                let notice = tokio::time::sleep(self.slow_after);
                tokio::pin!(notice);

                loop {
                    tokio::select! {
                        result = &mut verify => break result,
                        () = &mut notice, if !self.is_slow() => {
                            debug!("Reset token verification is slow");
                            self.slow.store(true, Ordering::Release);
                        }
                    }
                }
            })
            .await;

        let state = match check {
            Ok(TokenCheck::Valid) => {
                *lock(&self.link) = Some(link);
                ResetState::Valid
            }
            Ok(TokenCheck::Invalid(message)) => ResetState::Invalid(message),
            Err(AuthError::Cancelled) => ResetState::Checking,
            Err(e) => {
                warn!(error = %e, "Reset token verification failed");
                ResetState::Invalid(e.user_message())
            }
        };
        self.set_state(state.clone());
        state
    }

    /// [`Self::mount`], handing the "still waiting" notice to `on_notice`
    /// once, if verification becomes slow.
    pub async fn mount_with_notice(&self, on_notice: impl FnOnce(&'static str)) -> ResetState {
        let mount = self.mount();
        tokio::pin!(mount);

        let mut on_notice = Some(on_notice);
        let mut poll = tokio::time::interval(NOTICE_POLL);

        loop {
            tokio::select! {
                state = &mut mount => return state,
                _ = poll.tick(), if on_notice.is_some() => {
                    if let Some(notice) = self.notice()
                        && let Some(show) = on_notice.take()
                    {
                        show(notice);
                    }
                }
            }
        }
    }

    /// Sets the new password. Only possible once the link was verified.
    ///
    /// On success the fragment is cleared and `on_complete` runs once.
    pub async fn submit(&self, on_complete: impl FnOnce()) -> Result<(), AuthError> {
        let Some(_in_flight) = self.guard.try_begin() else {
            debug!("Password reset already in flight");
            return Err(AuthError::Busy);
        };

        let link = match (self.state(), lock(&self.link).clone()) {
            (ResetState::Valid, Some(link)) => link,
            (ResetState::Invalid(message), _) => return Err(AuthError::InvalidResetLink(message)),
            _ => {
                return Err(AuthError::InvalidResetLink(
                    messages::INVALID_RESET_LINK.to_string(),
                ));
            }
        };

        let form = lock(&self.form).clone();
        let errors = new_password_errors(
            form.new_password.expose_secret(),
            form.confirm_password.expose_secret(),
        );
        *lock(&self.errors) = errors.clone();
        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }

        *lock(&self.error) = None;
        self.set_state(ResetState::Submitting);
        let result = self
            .lifetime
            .run(
                self.verifier
                    .consume(&link, &form.new_password, &form.confirm_password),
            )
            .await;

        match result {
            Ok(()) => {
                self.location.clear_fragment();
                *lock(&self.link) = None;
                *lock(&self.form) = ResetPasswordForm::default();
                self.set_state(ResetState::Done);
                on_complete();
                Ok(())
            }
            Err(e) => {
                if !matches!(e, AuthError::Cancelled) {
                    *lock(&self.error) = Some(e.user_message());
                }
                self.set_state(ResetState::Valid);
                Err(e)
            }
        }
    }
}
