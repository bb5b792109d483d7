//! # Prefix → parser registry for registration keys.
//!
//! [`KeyFactory`] maps each known key prefix to the function that parses the
//! component part of that variant. It is populated from an explicit list at
//! startup; looking up a prefix that was never registered is an error.
//!
//! ## Flow
//! ```text
//! "calendarurl:64f0c1:64f0c2"
//!      │ split at first ':'
//!      ├─► prefix "calendarurl" ──► parsers["calendarurl"] ──┐
//!      └─► raw    "64f0c1:64f0c2" ──────────────────────────┴─► CalendarUrl::parse(raw)
//! ```
//!
//! The routing layer uses the factory to turn routing keys received from the
//! transport back into [`RegistrationKey`]s; a bus only understands the
//! prefixes its factory knows.

use std::collections::HashMap;
use std::sync::LazyLock;

use super::{AddressBookUrl, CalendarUrl, DELIMITER, RegistrationKey, Username};
use crate::error::KeyError;

/// Parses the component part of one key variant.
pub type KeyParser = fn(&str) -> Result<RegistrationKey, KeyError>;

static DEFAULTS: LazyLock<KeyFactory> = LazyLock::new(KeyFactory::with_defaults);

/// Registry of key parsers, keyed by prefix.
#[derive(Clone, Debug)]
pub struct KeyFactory {
    parsers: HashMap<&'static str, KeyParser>,
}

impl KeyFactory {
    /// Creates an empty registry (every parse fails with `UnknownPrefix`).
    pub fn new() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// Creates a registry with every built-in variant.
    pub fn with_defaults() -> Self {
        Self::new()
            .with_parser(Username::PREFIX, Username::parse)
            .with_parser(AddressBookUrl::PREFIX, AddressBookUrl::parse)
            .with_parser(CalendarUrl::PREFIX, CalendarUrl::parse)
    }

    /// Registers (or replaces) the parser for `prefix`.
    pub fn with_parser(mut self, prefix: &'static str, parser: KeyParser) -> Self {
        self.parsers.insert(prefix, parser);
        self
    }

    /// Returns true if a parser is registered for `prefix`.
    pub fn supports(&self, prefix: &str) -> bool {
        self.parsers.contains_key(prefix)
    }

    /// Returns the registered prefixes, sorted.
    pub fn prefixes(&self) -> Vec<&'static str> {
        let mut prefixes: Vec<&'static str> = self.parsers.keys().copied().collect();
        prefixes.sort_unstable();
        prefixes
    }

    /// Parses a full `prefix:components` encoding.
    pub fn parse(&self, encoded: &str) -> Result<RegistrationKey, KeyError> {
        if encoded.trim().is_empty() {
            return Err(KeyError::Blank);
        }
        let (prefix, raw) = encoded.split_once(DELIMITER).unwrap_or((encoded, ""));
        self.parse_with(prefix, raw)
    }

    /// Parses the component part `raw` with the parser registered for `prefix`.
    pub fn parse_with(&self, prefix: &str, raw: &str) -> Result<RegistrationKey, KeyError> {
        let parser = self
            .parsers
            .get(prefix)
            .ok_or_else(|| KeyError::UnknownPrefix {
                prefix: prefix.to_string(),
            })?;
        if raw.trim().is_empty() {
            return Err(KeyError::Blank);
        }
        parser(raw)
    }

    /// Process-wide registry with the built-in variants.
    pub(crate) fn shared() -> &'static KeyFactory {
        &DEFAULTS
    }
}

impl Default for KeyFactory {
    /// Same as [`KeyFactory::with_defaults`].
    fn default() -> Self {
        Self::with_defaults()
    }
}
