//! Form validation shared by event create/update and account forms.
//!
//! Everything here is local and synchronous. A validation failure means no
//! network call is made.

use serde::Serialize;

use crate::document::EventDraft;
use crate::error::ValidationError;

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Which account form is being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialMode {
    Register,
    SignIn,
}

/// Validated, trimmed credentials ready to send to the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Validate an event draft and return its trimmed form.
pub fn validate_event(draft: &EventDraft) -> Result<EventDraft, ValidationError> {
    let title = draft.title.trim();
    let description = draft.description.trim();
    let date = draft.date.trim();

    if title.is_empty() || description.is_empty() || date.is_empty() {
        return Err(ValidationError::MissingRequiredField);
    }
    if !is_valid_date(date) {
        return Err(ValidationError::BadDateFormat);
    }

    Ok(EventDraft::new(title, description, date))
}

/// Check a display date against the two accepted shapes.
///
/// - `Mon D, YYYY`: three letters, a space, one or two digits, a comma, a
///   space and four digits (`Aug 8, 2025`)
/// - `D-M-YYYY`: one or two digits, `-`, one or two digits, `-`, four digits
///   (`12-12-2026`)
///
/// Only the shape is checked; `Aug 32, 2025` passes.
pub fn is_valid_date(date: &str) -> bool {
    is_month_day_year(date) || is_dashed(date)
}

fn is_month_day_year(date: &str) -> bool {
    let Some((month, rest)) = date.split_once(' ') else {
        return false;
    };
    let Some((day, year)) = rest.split_once(", ") else {
        return false;
    };
    month.len() == 3
        && month.bytes().all(|b| b.is_ascii_alphabetic())
        && is_digits(day, 1..=2)
        && is_digits(year, 4..=4)
}

fn is_dashed(date: &str) -> bool {
    let mut parts = date.split('-');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(day), Some(month), Some(year), None) => {
            is_digits(day, 1..=2) && is_digits(month, 1..=2) && is_digits(year, 4..=4)
        }
        _ => false,
    }
}

fn is_digits(s: &str, len: std::ops::RangeInclusive<usize>) -> bool {
    len.contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
}

/// Check an email address: `local@domain.tld`, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    // Some dot in the domain with text on both sides
    domain
        .match_indices('.')
        .any(|(i, _)| i > 0 && i + 1 < domain.len())
}

/// Validate account form input and return trimmed credentials.
pub fn validate_credentials(
    email: &str,
    password: &str,
    mode: CredentialMode,
) -> Result<Credentials, ValidationError> {
    let email = email.trim();
    let password = password.trim();

    if email.is_empty() || password.is_empty() {
        return Err(ValidationError::MissingCredentials);
    }
    if !is_valid_email(email) {
        return Err(ValidationError::InvalidEmail);
    }
    if mode == CredentialMode::Register && password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }

    Ok(Credentials {
        email: email.to_string(),
        password: password.to_string(),
    })
}
