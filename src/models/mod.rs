pub mod profile;
pub mod session;

pub use profile::{
    AccountStatus, ApprovalStatus, NewProfile, Profile, ProfileChanges, RegistrationDetails, Role,
};
pub use session::{Identity, Session, SignUpResult};
