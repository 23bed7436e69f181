use std::sync::Arc;

use crate::clients::BackendMode;
use crate::config::Config;
use crate::services::{
    AuthService, LocalAuthService, LocalProfileService, ProfileService, RemoteAuthService,
    RemoteProfileService, ResetTokenVerifier,
};

/// Services wired to one backend mode, shared by every controller.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub mode: BackendMode,

    pub auth: Arc<dyn AuthService>,

    pub profiles: Arc<dyn ProfileService>,

    pub reset: Arc<ResetTokenVerifier>,
}

impl SharedState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let mode = BackendMode::from_config(&config)?;
        Ok(Self::with_mode(config, mode))
    }

    /// Wires services to an explicit mode, e.g. an in-memory backend.
    #[must_use]
    pub fn with_mode(config: Config, mode: BackendMode) -> Self {
        let reset = Arc::new(ResetTokenVerifier::from_mode(
            &mode,
            config.backend.reset_function.clone(),
        ));

        let (auth, profiles): (Arc<dyn AuthService>, Arc<dyn ProfileService>) = match &mode {
            BackendMode::Remote(backend) => (
                Arc::new(
                    RemoteAuthService::new(
                        Arc::clone(backend),
                        config.links.reset_redirect_url.clone(),
                    )
                    .with_pending_sign_out(config.login.sign_out_pending),
                ),
                Arc::new(RemoteProfileService::new(Arc::clone(backend))),
            ),
            BackendMode::Local(credentials) => {
                let local = LocalAuthService::new(credentials.clone());
                let profile = local.local_profile();
                (
                    Arc::new(local),
                    Arc::new(LocalProfileService::new(profile)),
                )
            }
        };

        Self {
            config: Arc::new(config),
            mode,
            auth,
            profiles,
            reset,
        }
    }

    #[must_use]
    pub fn max_avatar_bytes(&self) -> u64 {
        self.config.uploads.max_avatar_bytes
    }

    /// Registration needs a remote backend.
    #[must_use]
    pub const fn registration_enabled(&self) -> bool {
        !self.mode.is_local()
    }
}
