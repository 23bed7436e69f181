use super::prompt::{print_error, print_warnings, prompt, prompt_secret};
use crate::controllers::{ForcePasswordController, LoginController, LoginState};
use crate::models::Profile;
use crate::state::SharedState;

pub async fn cmd_login(state: &SharedState, email: Option<String>) -> anyhow::Result<()> {
    let Some(profile) = authenticate(state, email).await? else {
        return Ok(());
    };

    println!();
    println!("Signed in as {} ({})", profile.display_name(), profile.role);
    if state.mode.is_local() {
        println!("Local mode: profile is read-only, registration is disabled.");
    }

    state.auth.end_session().await;
    print_warnings(state.auth.warnings());
    Ok(())
}

/// Signs in through the login gate. Runs the forced password change when the
/// account requires one. `None` means access was refused; the reason has
/// already been printed.
pub async fn authenticate(
    state: &SharedState,
    email: Option<String>,
) -> anyhow::Result<Option<Profile>> {
    let email = match email {
        Some(email) => email,
        None if state.mode.is_local() => prompt("Username")?,
        None => prompt("Email")?,
    };
    let password = prompt_secret("Password")?;

    let login = LoginController::new(state.auth.clone());
    login.edit(|form| {
        form.email = email;
        form.password = password;
    });

    let result = login
        .submit(|profile| println!("✓ Welcome, {}", profile.display_name()))
        .await;
    print_warnings(state.auth.warnings());

    match result {
        Ok(LoginState::Authenticated(profile)) => Ok(Some(profile)),
        Ok(LoginState::MustChangePassword(profile)) => force_change(state, profile).await,
        Ok(LoginState::ConfirmationResent) => {
            println!("Your email is not confirmed yet. A new confirmation link was sent.");
            Ok(None)
        }
        Ok(other) => {
            println!("Login did not complete: {other:?}");
            Ok(None)
        }
        Err(e) => {
            print_error(&e);
            Ok(None)
        }
    }
}

async fn force_change(state: &SharedState, profile: Profile) -> anyhow::Result<Option<Profile>> {
    let Some(controller) = ForcePasswordController::for_profile(state.auth.clone(), profile) else {
        return Ok(None);
    };

    println!("You must change your password before continuing.");
    let current = prompt_secret("Current password")?;
    let new = prompt_secret("New password")?;
    let confirm = prompt_secret("Confirm new password")?;
    controller.edit(|form| {
        form.current_password = current;
        form.new_password = new;
        form.confirm_password = confirm;
    });

    let mut refreshed = false;
    let result = controller.submit(|| refreshed = true).await;
    print_warnings(state.auth.warnings());

    match result {
        Ok(()) => {
            println!("✓ Password changed");
            if refreshed && let Ok(profile) = state.profiles.current_profile().await {
                return Ok(Some(profile));
            }
            Ok(Some(controller.profile().clone()))
        }
        Err(e) => {
            print_error(&e);
            Ok(None)
        }
    }
}
