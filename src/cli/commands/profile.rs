use super::login::authenticate;
use super::prompt::{print_error, print_warnings, prompt, prompt_with_default};
use crate::avatar::AvatarFile;
use crate::controllers::ProfileEditor;
use crate::models::Profile;
use crate::state::SharedState;
use crate::validation::parse_date_input;

pub async fn cmd_profile_show(state: &SharedState) -> anyhow::Result<()> {
    let Some(profile) = authenticate(state, None).await? else {
        return Ok(());
    };

    print_profile(&profile);
    state.auth.end_session().await;
    print_warnings(state.auth.warnings());
    Ok(())
}

pub async fn cmd_profile_edit(state: &SharedState) -> anyhow::Result<()> {
    let Some(profile) = authenticate(state, None).await? else {
        return Ok(());
    };

    let editor = ProfileEditor::new(state.profiles.clone(), profile, state.max_avatar_bytes());
    if let Err(e) = editor.begin_edit() {
        print_error(&e);
        return Ok(());
    }

    let Some(draft) = editor.draft() else {
        return Ok(());
    };

    println!("Press enter to keep a value, '-' to clear it.");
    println!("Email: {} (cannot be changed)", editor.profile().email);

    let full_name = prompt_with_default("Full name", &draft.full_name)?;
    let phone = prompt_with_default("Phone", &draft.phone)?;
    let current_birth_date = draft.birth_date.map(|d| d.to_string()).unwrap_or_default();
    let birth_date = loop {
        let input = prompt_with_default("Birth date (YYYY-MM-DD)", &current_birth_date)?;
        match parse_date_input(&input) {
            Ok(date) => break date,
            Err(message) => println!("✗ {message}"),
        }
    };
    let rg = prompt_with_default("RG", &draft.rg)?;
    let region = prompt_with_default("Region", &draft.region)?;
    let gender = prompt_with_default("Gender", &draft.gender)?;
    let position = prompt_with_default("Position", &draft.position)?;
    let responsible_name = prompt_with_default("Guardian name", &draft.responsible_name)?;
    let responsible_phone = prompt_with_default("Guardian phone", &draft.responsible_phone)?;
    let observation = prompt_with_default("Notes", &draft.observation)?;

    editor.edit_draft(|draft| {
        draft.full_name = full_name;
        draft.phone = phone;
        draft.birth_date = birth_date;
        draft.rg = rg;
        draft.region = region;
        draft.gender = gender;
        draft.position = position;
        draft.responsible_name = responsible_name;
        draft.responsible_phone = responsible_phone;
        draft.observation = observation;
    });

    let path = prompt("New photo file (empty to keep)")?;
    if !path.trim().is_empty() {
        match AvatarFile::from_path(path.trim()).await {
            Ok(file) => {
                if let Err(e) = editor.select_avatar(file).await {
                    print_error(&e);
                    println!("Keeping the current photo.");
                }
            }
            Err(e) => println!("✗ {e}"),
        }
    }

    match editor.save().await {
        Ok(profile) => {
            println!("✓ Profile saved");
            print_profile(&profile);
        }
        Err(e) => print_error(&e),
    }

    state.auth.end_session().await;
    print_warnings(state.auth.warnings());
    Ok(())
}

fn print_profile(profile: &Profile) {
    let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());

    println!("Profile: {}", profile.display_name());
    println!("{:-<70}", "");
    println!("Email:          {}", profile.email);
    println!("Phone:          {}", show(&profile.phone));
    println!(
        "Birth date:     {}",
        profile
            .birth_date
            .map_or_else(|| "-".to_string(), |d| d.format("%d/%m/%Y").to_string())
    );
    println!("RG:             {}", show(&profile.rg));
    println!("Region:         {}", show(&profile.region));
    println!("Gender:         {}", show(&profile.gender));
    println!("Position:       {}", show(&profile.position));
    println!("Guardian:       {}", show(&profile.responsible_name));
    println!("Guardian phone: {}", show(&profile.responsible_phone));
    println!("Notes:          {}", show(&profile.observation));
    println!(
        "Photo:          {}",
        if profile.avatar_url.is_some() { "Yes" } else { "No" }
    );
    println!(
        "Status:         {} / {} ({})",
        profile.status, profile.account_status, profile.role
    );
}
