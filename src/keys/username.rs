//! `username:<username>` keys.

use super::{DELIMITER, RegistrationKey, segment, split_components};
use crate::error::KeyError;

/// A user identity, usually a mail address.
///
/// Non-blank, trimmed, and free of the `:` delimiter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Username(String);

impl Username {
    /// Prefix of the encoded key.
    pub const PREFIX: &'static str = "username";

    /// Validates and wraps a username.
    pub fn new(value: &str) -> Result<Self, KeyError> {
        segment(Self::PREFIX, value, value).map(Username)
    }

    /// Returns the username.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the component part (everything after `username:`).
    pub(crate) fn parse(raw: &str) -> Result<RegistrationKey, KeyError> {
        let parts = split_components(Self::PREFIX, raw, 1)?;
        let input = format!("{}{DELIMITER}{raw}", Self::PREFIX);
        let value = segment(Self::PREFIX, &input, parts[0])?;
        Ok(RegistrationKey::Username(Username(value)))
    }
}
