use super::login::authenticate;
use super::prompt::{print_error, print_warnings, prompt_secret};
use crate::controllers::ProfileEditor;
use crate::state::SharedState;

pub async fn cmd_password(state: &SharedState) -> anyhow::Result<()> {
    let Some(profile) = authenticate(state, None).await? else {
        return Ok(());
    };

    let editor = ProfileEditor::new(state.profiles.clone(), profile, state.max_avatar_bytes());
    if let Err(e) = editor.begin_password_change() {
        print_error(&e);
        return Ok(());
    }

    let new = prompt_secret("New password")?;
    let confirm = prompt_secret("Confirm new password")?;
    editor.edit_password(|draft| {
        draft.new_password = new;
        draft.confirm_password = confirm;
    });

    match editor.submit_password().await {
        Ok(()) => println!("✓ Password changed"),
        Err(e) => print_error(&e),
    }

    state.auth.end_session().await;
    print_warnings(state.auth.warnings());
    Ok(())
}
