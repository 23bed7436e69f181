mod forgot;
mod login;
mod password;
mod profile;
mod prompt;
mod register;
mod reset;

pub use forgot::cmd_forgot;
pub use login::{authenticate, cmd_login};
pub use password::cmd_password;
pub use profile::{cmd_profile_edit, cmd_profile_show};
pub use register::cmd_register;
pub use reset::cmd_reset;
