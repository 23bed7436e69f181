pub mod gate;
pub use gate::GateDecision;

pub mod warnings;
pub use warnings::{Warning, Warnings};

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, LoginOutcome, Registration, RegistrationOutcome};
pub use auth_service_impl::{LocalAuthService, RemoteAuthService};

pub mod profile_service;
pub mod profile_service_impl;
pub use profile_service::ProfileService;
pub use profile_service_impl::{LocalProfileService, RemoteProfileService};

pub mod reset_service;
pub use reset_service::{ResetTokenVerifier, TokenCheck};
