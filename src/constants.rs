pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub const PROFILES_TABLE: &str = "profiles";

pub mod limits {

    pub const MIN_PASSWORD_LEN: usize = 6;

    pub const MAX_AVATAR_BYTES: u64 = 2 * 1024 * 1024;
}

pub mod intervals {
    use std::time::Duration;

    /// How long token verification may run before the "still waiting" notice.
    pub const RESET_SLOW_NOTICE: Duration = Duration::from_secs(8);

    pub const NOTICE_POLL: Duration = Duration::from_millis(100);
}

pub mod messages {

    pub const PROFILE_NOT_FOUND: &str = "Profile not found. Contact the club administration.";

    pub const ACCOUNT_DISABLED: &str =
        "Your account has been disabled. Contact the club administration.";

    pub const PENDING_APPROVAL: &str =
        "Your registration is awaiting approval by the club administration.";

    pub const INVALID_CREDENTIALS: &str = "Invalid email or password.";

    pub const EMAIL_NOT_CONFIRMED: &str =
        "Email not confirmed. We sent you a new confirmation link.";

    pub const EMAIL_ALREADY_REGISTERED: &str =
        "This email is already registered. Use password recovery to regain access.";

    pub const PERMISSION_DENIED: &str =
        "Permission denied while saving your data. Contact the club administration.";

    pub const REGISTRATION_FAILED: &str = "Could not create your account. Try again later.";

    pub const INVALID_RESET_LINK: &str =
        "Invalid or incomplete reset link. Request a new password reset email.";

    pub const EXPIRED_RESET_LINK: &str =
        "This reset link is invalid or has expired. Request a new one.";

    pub const RESET_FAILED: &str = "Could not reset your password. Try again.";

    pub const RESET_STILL_CHECKING: &str = "Still verifying your link, please wait...";

    pub const NOT_AUTHENTICATED: &str = "Your session has expired. Log in again.";

    pub const UNAVAILABLE: &str = "This feature is unavailable while running in local mode.";

    pub const NETWORK: &str = "Could not reach the server. Check your connection.";
}
