use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const EMAIL_LOCAL_SYMBOLS: &str = "._%+-";
const EMAIL_DOMAIN_SYMBOLS: &str = ".-";
const USERNAME_SYMBOLS: &str = "!@#$%^&*()_+=[]{};':\"\\|,.<>/?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Email,
    Username,
    Text,
    PageSize,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Email => "email",
            Field::Username => "username",
            Field::Text => "text",
            Field::PageSize => "page size",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter both email and username ({0} is missing)")]
    Missing(Field),
    #[error("Invalid email format")]
    InvalidEmail,
    #[error("Username can only contain letters, digits, and symbols")]
    InvalidUsername,
    #[error("Comment text cannot be empty")]
    EmptyComment,
    #[error("Page size must be a positive number")]
    ZeroPageSize,
}

impl ValidationError {
    /// The input field the error refers to.
    pub fn field(&self) -> Field {
        match self {
            ValidationError::Missing(field) => *field,
            ValidationError::InvalidEmail => Field::Email,
            ValidationError::InvalidUsername => Field::Username,
            ValidationError::EmptyComment => Field::Text,
            ValidationError::ZeroPageSize => Field::PageSize,
        }
    }
}

/// A validated registration form. Constructing one never touches the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    email: String,
    username: String,
}

impl Registration {
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let email = email.into();
        let username = username.into();

        if email.is_empty() {
            return Err(ValidationError::Missing(Field::Email));
        }
        if username.is_empty() {
            return Err(ValidationError::Missing(Field::Username));
        }
        if !is_valid_email(&email) {
            return Err(ValidationError::InvalidEmail);
        }
        if !is_valid_username(&username) {
            return Err(ValidationError::InvalidUsername);
        }
        Ok(Self { email, username })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

/// `local@domain.tld`: one `@`, a dotted domain and a top-level segment of at
/// least two ASCII letters.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty()
        || !local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || EMAIL_LOCAL_SYMBOLS.contains(c))
    {
        return false;
    }
    if !domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || EMAIL_DOMAIN_SYMBOLS.contains(c))
    {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
}

pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || USERNAME_SYMBOLS.contains(c))
}

/// Trims comment input, rejecting text that is empty or only whitespace.
pub fn comment_text(raw: &str) -> Result<&str, ValidationError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ValidationError::EmptyComment);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_conventional_emails() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last+tag@mail.example.co"));
        assert!(is_valid_email("a_b%c-d@sub-domain.example.org"));
    }

    #[test]
    fn rejects_malformed_emails() {
        for bad in [
            "bad-email",
            "@example.com",
            "user@",
            "user@example",
            "user@example.c",
            "user@.com",
            "user@example.c0m",
            "us er@example.com",
            "user@@example.com",
            "user@exa_mple.com",
            "jöhn@example.com",
        ] {
            assert!(!is_valid_email(bad), "{bad} should be rejected");
        }
    }

    #[test]
    fn username_allow_list() {
        assert!(is_valid_username("ferris"));
        assert!(is_valid_username("F3rr!s_{crab}"));
        assert!(is_valid_username("a\\b|c\"d'e"));

        assert!(!is_valid_username(""));
        assert!(!is_valid_username("   "));
        assert!(!is_valid_username("two words"));
        assert!(!is_valid_username("crab-rave"));
        assert!(!is_valid_username("tilde~"));
        assert!(!is_valid_username("名前"));
    }

    #[test]
    fn registration_reports_failing_field() {
        let err = Registration::new("bad-email", "ferris").unwrap_err();
        assert_eq!(err, ValidationError::InvalidEmail);
        assert_eq!(err.field(), Field::Email);

        let err = Registration::new("user@example.com", "fer ris").unwrap_err();
        assert_eq!(err.field(), Field::Username);

        let err = Registration::new("", "ferris").unwrap_err();
        assert_eq!(err, ValidationError::Missing(Field::Email));

        let err = Registration::new("user@example.com", "").unwrap_err();
        assert_eq!(err, ValidationError::Missing(Field::Username));
    }

    #[test]
    fn registration_accepts_valid_form() {
        let form = Registration::new("user@example.com", "ferris").unwrap();
        assert_eq!(form.email(), "user@example.com");
        assert_eq!(form.username(), "ferris");
    }

    #[test]
    fn comment_text_is_trimmed() {
        assert_eq!(comment_text("  hello \n").unwrap(), "hello");
        assert_eq!(comment_text("").unwrap_err(), ValidationError::EmptyComment);
        assert_eq!(
            comment_text(" \t\n ").unwrap_err(),
            ValidationError::EmptyComment
        );
    }
}
