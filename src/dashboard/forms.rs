use thiserror::Error;
use url::Url;

use crate::models::RegisterRequest;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 20;
const PASSWORD_MIN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("enter a valid http:// or https:// URL")]
    InvalidUrl,
    #[error("username must be 3-20 characters")]
    UsernameLength,
    #[error("username may only contain letters, digits and underscores")]
    UsernameCharset,
    #[error("password must be at least 8 characters")]
    PasswordTooShort,
}

/// Check a URL typed into the shorten form; returns it trimmed
pub fn validate_target_url(input: &str) -> Result<String, ValidationError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ValidationError::Missing("URL"));
    }

    let parsed = Url::parse(input).map_err(|_| ValidationError::InvalidUrl)?;
    match parsed.scheme() {
        "http" | "https" if parsed.host().is_some() => Ok(input.to_string()),
        _ => Err(ValidationError::InvalidUrl),
    }
}

pub fn validate_login(username: &str, password: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::Missing("username"));
    }
    if password.is_empty() {
        return Err(ValidationError::Missing("password"));
    }
    Ok(())
}

/// Check the registration form and build the request the backend expects
///
/// A blank full name is sent as null.
pub fn validate_registration(
    username: &str,
    password: &str,
    full_name: Option<&str>,
) -> Result<RegisterRequest, ValidationError> {
    let username = username.trim();
    let length = username.chars().count();
    if length == 0 {
        return Err(ValidationError::Missing("username"));
    }
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&length) {
        return Err(ValidationError::UsernameLength);
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ValidationError::UsernameCharset);
    }
    if password.chars().count() < PASSWORD_MIN {
        return Err(ValidationError::PasswordTooShort);
    }

    let full_name = full_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    Ok(RegisterRequest {
        username: username.to_string(),
        password: password.to_string(),
        full_name,
    })
}
