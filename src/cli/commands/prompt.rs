use crate::services::{AuthError, Warnings};
use secrecy::SecretString;
use std::io::{BufRead, Write};

pub fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{label}: ");
    std::io::stdout().flush()?;

    read_answer(&mut std::io::stdin().lock())
}

/// One line without its terminator. Fails once input is closed.
fn read_answer(reader: &mut impl BufRead) -> anyhow::Result<String> {
    let mut input = String::new();
    if reader.read_line(&mut input)? == 0 {
        anyhow::bail!("input closed");
    }
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

/// Shows the current value; an empty answer keeps it, `-` clears it.
pub fn prompt_with_default(label: &str, current: &str) -> anyhow::Result<String> {
    let input = if current.is_empty() {
        prompt(label)?
    } else {
        prompt(&format!("{label} [{current}]"))?
    };

    Ok(match input.trim() {
        "" => current.to_string(),
        "-" => String::new(),
        _ => input,
    })
}

pub fn prompt_secret(label: &str) -> anyhow::Result<SecretString> {
    Ok(SecretString::from(prompt(label)?))
}

pub fn print_error(err: &AuthError) {
    println!("✗ {}", err.user_message());
    if let Some(errors) = err.field_errors() {
        for (field, message) in errors.iter() {
            println!("  {field}: {message}");
        }
    }
}

pub fn print_warnings(warnings: &Warnings) {
    for warning in warnings.drain() {
        println!("⚠ {}: {}", warning.operation, warning.message);
    }
}
