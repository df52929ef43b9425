//! Email address value object.
//!
//! Profile lookups by email are case-insensitive, so the canonical form is
//! trimmed and lower-cased at construction.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// Normalized email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Parses and normalizes an email address.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        let normalized = raw.as_ref().trim().to_lowercase();
        if normalized.is_empty() {
            return Err(ValidationError::empty_field("email"));
        }

        let Some((local, domain)) = normalized.split_once('@') else {
            return Err(ValidationError::invalid_format("email", "missing @ symbol"));
        };
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(ValidationError::invalid_format(
                "email",
                "expected local@domain",
            ));
        }
        if normalized.chars().any(char::is_whitespace) {
            return Err(ValidationError::invalid_format("email", "contains whitespace"));
        }

        Ok(Self(normalized))
    }

    /// Returns the normalized address.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against an unnormalized address.
    pub fn matches(&self, other: &str) -> bool {
        self.0 == other.trim().to_lowercase()
    }
}

impl TryFrom<String> for Email {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
