use super::prompt::{print_error, prompt};
use crate::state::SharedState;
use crate::validation::validate_email;

pub async fn cmd_forgot(state: &SharedState, email: Option<String>) -> anyhow::Result<()> {
    let email = match email {
        Some(email) => email,
        None => prompt("Email")?,
    };

    if let Err(message) = validate_email(&email) {
        println!("✗ {message}");
        return Ok(());
    }

    match state.auth.request_password_reset(email.trim()).await {
        Ok(()) => {
            println!("✓ If an account exists for {}, a reset link is on its way.", email.trim());
        }
        Err(e) => print_error(&e),
    }
    Ok(())
}
