//! Client-side field validation.
//!
//! Every check here runs before any request leaves the process; a non-empty
//! [`FieldErrors`] blocks submission.

use crate::constants::limits::MIN_PASSWORD_LEN;
use chrono::NaiveDate;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

/// Optional `+55`, then a two digit area code and an 8 or 9 digit number.
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+?55)?\d{10,11}$").expect("phone pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Email,
    Password,
    ConfirmPassword,
    CurrentPassword,
    FullName,
    Phone,
    BirthDate,
    Rg,
    Region,
    ResponsiblePhone,
    Avatar,
}

impl Field {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Password => "password",
            Self::ConfirmPassword => "confirm_password",
            Self::CurrentPassword => "current_password",
            Self::FullName => "full_name",
            Self::Phone => "phone",
            Self::BirthDate => "birth_date",
            Self::Rg => "rg",
            Self::Region => "region",
            Self::ResponsiblePhone => "responsible_phone",
            Self::Avatar => "avatar",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field-scoped validation messages, first error per field wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: Field, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn check(&mut self, field: Field, result: Result<(), String>) {
        if let Err(message) = result {
            self.add(field, message);
        }
    }

    pub fn remove(&mut self, field: Field) {
        self.0.remove(&field);
    }

    #[must_use]
    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(f, m)| (*f, m.as_str()))
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        write!(f, "{}", parts.join("; "))
    }
}

pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if !EMAIL_RE.is_match(email) {
        return Err("Enter a valid email address".to_string());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }
    Ok(())
}

pub fn validate_confirmation(password: &str, confirmation: &str) -> Result<(), String> {
    if password != confirmation {
        return Err("Passwords do not match".to_string());
    }
    Ok(())
}

pub fn validate_required(value: &str, label: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{label} is required"));
    }
    Ok(())
}

/// Accepts formatted input such as `(11) 98765-4321`.
pub fn validate_phone(phone: &str) -> Result<(), String> {
    let digits: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '(' | ')' | '-' | '.'))
        .collect();

    if digits.is_empty() {
        return Err("Phone is required".to_string());
    }
    if !PHONE_RE.is_match(&digits) {
        return Err("Enter a valid phone number with area code".to_string());
    }
    Ok(())
}

pub fn validate_birth_date(date: Option<NaiveDate>, today: NaiveDate) -> Result<NaiveDate, String> {
    match date {
        None => Err("Birth date is required".to_string()),
        Some(d) if d > today => Err("Birth date cannot be in the future".to_string()),
        Some(d) => Ok(d),
    }
}

/// Reads a typed `YYYY-MM-DD` date. Blank input means no date; anything else
/// that does not parse is an error, never a silent `None`.
pub fn parse_date_input(input: &str) -> Result<Option<NaiveDate>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| format!("'{input}' is not a valid date, use YYYY-MM-DD"))
}

/// Password rules shared by every flow that sets a new password.
pub fn new_password_errors(password: &str, confirmation: &str) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.check(Field::Password, validate_password(password));
    errors.check(
        Field::ConfirmPassword,
        validate_confirmation(password, confirmation),
    );
    errors
}

/// Trims and maps blank input to `None`.
#[must_use]
pub fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
