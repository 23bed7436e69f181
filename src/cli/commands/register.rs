use super::prompt::{print_error, print_warnings, prompt, prompt_secret};
use crate::avatar::AvatarFile;
use crate::controllers::RegisterController;
use crate::services::RegistrationOutcome;
use crate::state::SharedState;
use crate::validation::parse_date_input;
use chrono::Local;

pub async fn cmd_register(state: &SharedState) -> anyhow::Result<()> {
    if !state.registration_enabled() {
        println!("Registration is unavailable in local mode.");
        return Ok(());
    }

    let controller = RegisterController::new(
        state.auth.clone(),
        state.registration_enabled(),
        state.max_avatar_bytes(),
    );

    println!("New member registration");
    println!("{:-<70}", "");

    loop {
        let path = prompt("Photo file (JPG, PNG, GIF or WebP)")?;
        match AvatarFile::from_path(path.trim()).await {
            Ok(file) => match controller.select_avatar(file).await {
                Ok(()) => break,
                Err(e) => print_error(&e),
            },
            Err(e) => println!("✗ {e}"),
        }
    }

    let email = prompt("Email")?;
    let full_name = prompt("Full name")?;
    let birth_date = loop {
        match parse_date_input(&prompt("Birth date (YYYY-MM-DD)")?) {
            Ok(date) => break date,
            Err(message) => println!("✗ {message}"),
        }
    };
    let rg = prompt("RG")?;
    let region = prompt("Region")?;
    let phone = prompt("Phone")?;
    let gender = prompt("Gender (optional)")?;
    let position = prompt("Position (optional)")?;
    let responsible_name = prompt("Guardian name (optional)")?;
    let responsible_phone = prompt("Guardian phone (optional)")?;
    let observation = prompt("Notes (optional)")?;
    let password = prompt_secret("Password")?;
    let confirm_password = prompt_secret("Confirm password")?;

    controller.edit(|form| {
        form.email = email;
        form.full_name = full_name;
        form.birth_date = birth_date;
        form.rg = rg;
        form.region = region;
        form.phone = phone;
        form.gender = gender;
        form.position = position;
        form.responsible_name = responsible_name;
        form.responsible_phone = responsible_phone;
        form.observation = observation;
        form.password = password;
        form.confirm_password = confirm_password;
    });

    let result = controller.submit(Local::now().date_naive()).await;
    print_warnings(state.auth.warnings());

    match result {
        Ok(RegistrationOutcome::Registered { .. }) => {
            println!("✓ Registration received.");
            println!("Confirm your email, then wait for the club administration to approve it.");
        }
        Ok(RegistrationOutcome::ExistingProfileUpdated { .. }) => {
            println!("✓ Your existing account was found and its profile updated.");
            println!("Please log in.");
        }
        Err(e) => print_error(&e),
    }

    Ok(())
}
