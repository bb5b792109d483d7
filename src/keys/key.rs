//! # The registration key sum type.
//!
//! ## Encoding
//! ```text
//! username:alice@example.com            → Username("alice@example.com")
//! addressbook:64f0c1:collected          → AddressBook { base: "64f0c1", id: "collected" }
//! calendarurl:64f0c1:64f0c2             → CalendarUrl { base: "64f0c1", id: "64f0c2" }
//! └── prefix ─┘└── components ────────┘
//! ```
//!
//! Components are trimmed on construction, so the encoding produced by
//! [`RegistrationKey::as_string`] always parses back to an equal key.

use std::fmt;
use std::str::FromStr;

use super::{AddressBookUrl, CalendarUrl, KeyFactory, Username};
use crate::error::KeyError;

/// Separator between the prefix and the components of an encoded key.
pub(crate) const DELIMITER: char = ':';

/// What a listener registers interest in.
///
/// Equality and hashing are structural, so keys can be used in maps and sets.
///
/// # Example
/// ```
/// use keybus::{KeyFactory, RegistrationKey};
///
/// let key = RegistrationKey::username("alice@example.com").unwrap();
/// assert_eq!(key.as_string(), "username:alice@example.com");
/// assert_eq!(KeyFactory::with_defaults().parse(&key.as_string()), Ok(key));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegistrationKey {
    /// Everything concerning one user.
    Username(Username),
    /// One address book of one user/domain.
    AddressBook(AddressBookUrl),
    /// One calendar of one user/resource.
    CalendarUrl(CalendarUrl),
}

impl RegistrationKey {
    /// Builds a [`RegistrationKey::Username`] key.
    pub fn username(username: &str) -> Result<Self, KeyError> {
        Username::new(username).map(RegistrationKey::Username)
    }

    /// Builds a [`RegistrationKey::AddressBook`] key.
    pub fn address_book(base_id: &str, address_book_id: &str) -> Result<Self, KeyError> {
        AddressBookUrl::new(base_id, address_book_id).map(RegistrationKey::AddressBook)
    }

    /// Builds a [`RegistrationKey::CalendarUrl`] key.
    pub fn calendar_url(base_id: &str, calendar_id: &str) -> Result<Self, KeyError> {
        CalendarUrl::new(base_id, calendar_id).map(RegistrationKey::CalendarUrl)
    }

    /// Returns the variant prefix (`username`, `addressbook`, `calendarurl`).
    pub fn prefix(&self) -> &'static str {
        match self {
            RegistrationKey::Username(_) => Username::PREFIX,
            RegistrationKey::AddressBook(_) => AddressBookUrl::PREFIX,
            RegistrationKey::CalendarUrl(_) => CalendarUrl::PREFIX,
        }
    }

    /// Returns the canonical `prefix:components` encoding.
    pub fn as_string(&self) -> String {
        let components = match self {
            RegistrationKey::Username(u) => u.as_str().to_string(),
            RegistrationKey::AddressBook(a) => a.components(),
            RegistrationKey::CalendarUrl(c) => c.components(),
        };
        format!("{}{DELIMITER}{components}", self.prefix())
    }
}

impl fmt::Display for RegistrationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl FromStr for RegistrationKey {
    type Err = KeyError;

    /// Parses with the built-in variants ([`KeyFactory::with_defaults`]).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyFactory::shared().parse(s)
    }
}

impl From<Username> for RegistrationKey {
    fn from(value: Username) -> Self {
        RegistrationKey::Username(value)
    }
}

impl From<AddressBookUrl> for RegistrationKey {
    fn from(value: AddressBookUrl) -> Self {
        RegistrationKey::AddressBook(value)
    }
}

impl From<CalendarUrl> for RegistrationKey {
    fn from(value: CalendarUrl) -> Self {
        RegistrationKey::CalendarUrl(value)
    }
}

/// Validates one component: trimmed, non-blank, no embedded delimiter.
pub(crate) fn segment(variant: &'static str, input: &str, value: &str) -> Result<String, KeyError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(KeyError::BlankSegment {
            variant,
            input: input.to_string(),
        });
    }
    if trimmed.contains(DELIMITER) {
        return Err(KeyError::InvalidFormat {
            variant,
            input: input.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Splits the component part of an encoded key into exactly `expected` segments.
pub(crate) fn split_components<'a>(
    variant: &'static str,
    raw: &'a str,
    expected: usize,
) -> Result<Vec<&'a str>, KeyError> {
    if raw.trim().is_empty() {
        return Err(KeyError::Blank);
    }
    let parts: Vec<&str> = raw.split(DELIMITER).collect();
    if parts.len() != expected {
        return Err(KeyError::InvalidFormat {
            variant,
            input: format!("{variant}{DELIMITER}{raw}"),
        });
    }
    Ok(parts)
}
