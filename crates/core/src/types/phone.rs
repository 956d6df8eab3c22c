//! Russian mobile phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone cannot be empty")]
    Empty,
    /// The input contains characters other than digits and separators.
    #[error("phone may only contain digits, spaces, '+', '-', '(' and ')'")]
    InvalidCharacter,
    /// The digits do not form a Russian number.
    #[error("phone must be a Russian number like +7 900 123-45-67")]
    InvalidNumber,
}

/// A phone number normalized to E.164 form (`+7XXXXXXXXXX`).
///
/// Accepted spellings: `+7 (900) 123-45-67`, `8 900 123 45 67`,
/// `79001234567`, and the bare ten-digit `9001234567`.
///
/// ```
/// use vitrina_core::Phone;
///
/// let phone = Phone::parse("8 (900) 123-45-67").unwrap();
/// assert_eq!(phone.as_str(), "+79001234567");
/// assert_eq!(phone.digits(), "79001234567");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Phone(String);

impl Phone {
    /// Parse and normalize a phone number.
    ///
    /// # Errors
    ///
    /// Returns a [`PhoneError`] if the input is empty, has stray characters,
    /// or does not normalize to eleven digits starting with 7.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PhoneError::Empty);
        }

        let mut digits = String::with_capacity(11);
        for c in trimmed.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' | '(' | ')' | '+' => {}
                _ => return Err(PhoneError::InvalidCharacter),
            }
        }

        let normalized = match (digits.len(), digits.chars().next()) {
            (11, Some('7')) => digits,
            (11, Some('8')) => format!("7{}", digits.get(1..).unwrap_or_default()),
            (10, Some('9')) => format!("7{digits}"),
            _ => return Err(PhoneError::InvalidNumber),
        };

        Ok(Self(format!("+{normalized}")))
    }

    /// The number in E.164 form, e.g. `+79001234567`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The number without the leading `+`, as SMS gateways expect it.
    #[must_use]
    pub fn digits(&self) -> &str {
        self.0.trim_start_matches('+')
    }

    /// A log-safe rendering that keeps only the last two digits.
    #[must_use]
    pub fn masked(&self) -> String {
        let tail = self.0.get(self.0.len().saturating_sub(2)..).unwrap_or("");
        format!("+7*******{tail}")
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Phone {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Phone {
    type Error = PhoneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Phone> for String {
    fn from(phone: Phone) -> Self {
        phone.0
    }
}
