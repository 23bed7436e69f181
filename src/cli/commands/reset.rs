use super::prompt::{print_error, prompt_secret};
use crate::controllers::{ResetPasswordController, ResetState};
use crate::fragment::MemoryLocation;
use crate::state::SharedState;
use anyhow::Context;
use std::sync::Arc;

pub async fn cmd_reset(state: &SharedState, link: &str) -> anyhow::Result<()> {
    let location = MemoryLocation::parse(link).context("Not a valid link")?;
    let controller = ResetPasswordController::new(state.reset.clone(), Arc::new(location));

    println!("Verifying reset link...");
    let checked = controller
        .mount_with_notice(|notice| println!("{notice}"))
        .await;

    match checked {
        ResetState::Valid => {}
        ResetState::Invalid(message) => {
            println!("✗ {message}");
            return Ok(());
        }
        other => {
            println!("Reset link could not be checked: {other:?}");
            return Ok(());
        }
    }

    loop {
        let new = prompt_secret("New password")?;
        let confirm = prompt_secret("Confirm new password")?;
        controller.edit(|form| {
            form.new_password = new;
            form.confirm_password = confirm;
        });

        match controller.submit(|| println!("✓ Password updated. You can log in now.")).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                print_error(&e);
                // only local rule violations are worth another attempt
                if e.field_errors().is_none() {
                    return Ok(());
                }
            }
        }
    }
}
