//! Account state gate: decides a login outcome from the profile status fields.

use crate::models::{ApprovalStatus, Profile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Disabled account; the caller must sign out.
    Disabled,

    /// Neither approved nor admin.
    PendingApproval,

    /// Admitted, but only the forced password change is allowed.
    MustChangePassword,

    Admitted,
}

impl GateDecision {
    #[must_use]
    pub const fn admits(self) -> bool {
        matches!(self, Self::Admitted | Self::MustChangePassword)
    }
}

/// Inactive wins over everything, admins skip approval.
#[must_use]
pub fn evaluate(profile: &Profile) -> GateDecision {
    if profile.is_inactive() {
        return GateDecision::Disabled;
    }

    if profile.status != ApprovalStatus::Approved && !profile.is_admin() {
        return GateDecision::PendingApproval;
    }

    if profile.must_change_password {
        GateDecision::MustChangePassword
    } else {
        GateDecision::Admitted
    }
}
