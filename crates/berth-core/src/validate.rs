//! Input validation for service names and hostnames.
//!
//! Service names become directory names, router names, and compose service
//! keys, so they are restricted to identifier-safe characters. Hostnames
//! are checked for shape only; DNS resolution is not our business.

use thiserror::Error;

/// Validation failures. Reported before any mutation happens.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("service name must not be empty")]
    EmptyName,

    #[error("service name '{0}' must start with a letter")]
    NameFirstChar(String),

    #[error("service name '{0}' may only contain letters, digits, and underscores")]
    NameBadChar(String),

    #[error("hostname must not be empty")]
    EmptyHostname,

    #[error("hostname '{0}' contains whitespace or control characters")]
    HostnameBadChar(String),
}

/// Check that a service name is identifier-safe: an ASCII letter first,
/// then letters, digits, or underscores.
pub fn validate_service_name(name: &str) -> Result<(), ValidationError> {
    let mut chars = name.chars();
    match chars.next() {
        None => return Err(ValidationError::EmptyName),
        Some(c) if !c.is_ascii_alphabetic() => {
            return Err(ValidationError::NameFirstChar(name.to_string()));
        }
        Some(_) => {}
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(ValidationError::NameBadChar(name.to_string()))
    }
}

/// Check that a hostname is non-empty and free of characters that would
/// break a routing rule (whitespace, quotes, backticks, control chars).
pub fn validate_hostname(hostname: &str) -> Result<(), ValidationError> {
    if hostname.is_empty() {
        return Err(ValidationError::EmptyHostname);
    }
    let ok = hostname
        .chars()
        .all(|c| !c.is_whitespace() && !c.is_control() && c != '`' && c != '\'' && c != '"');
    if ok {
        Ok(())
    } else {
        Err(ValidationError::HostnameBadChar(hostname.to_string()))
    }
}
