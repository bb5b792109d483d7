//! `addressbook:<baseId>:<addressBookId>` keys.
//!
//! The address-book id is the remainder after the base id and may itself
//! contain `:`; the base id may not.

use super::{DELIMITER, RegistrationKey, segment};
use crate::error::KeyError;

/// Address of one address book: the owning base id plus the book id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AddressBookUrl {
    base_id: String,
    address_book_id: String,
}

impl AddressBookUrl {
    /// Prefix of the encoded key.
    pub const PREFIX: &'static str = "addressbook";

    /// Validates and builds an address-book URL.
    pub fn new(base_id: &str, address_book_id: &str) -> Result<Self, KeyError> {
        let input = format!("{base_id}{DELIMITER}{address_book_id}");
        Ok(Self {
            base_id: segment(Self::PREFIX, &input, base_id)?,
            address_book_id: remainder(&input, address_book_id)?,
        })
    }

    /// Returns the owning base id.
    pub fn base_id(&self) -> &str {
        &self.base_id
    }

    /// Returns the address-book id.
    pub fn address_book_id(&self) -> &str {
        &self.address_book_id
    }

    pub(crate) fn components(&self) -> String {
        format!("{}{DELIMITER}{}", self.base_id, self.address_book_id)
    }

    /// Parses the component part (everything after `addressbook:`).
    pub(crate) fn parse(raw: &str) -> Result<RegistrationKey, KeyError> {
        if raw.trim().is_empty() {
            return Err(KeyError::Blank);
        }
        let input = format!("{}{DELIMITER}{raw}", Self::PREFIX);
        let Some((base, book)) = raw.split_once(DELIMITER) else {
            return Err(KeyError::InvalidFormat {
                variant: Self::PREFIX,
                input,
            });
        };
        Ok(RegistrationKey::AddressBook(Self {
            base_id: segment(Self::PREFIX, &input, base)?,
            address_book_id: remainder(&input, book)?,
        }))
    }
}

fn remainder(input: &str, value: &str) -> Result<String, KeyError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(KeyError::BlankSegment {
            variant: AddressBookUrl::PREFIX,
            input: input.to_string(),
        });
    }
    Ok(trimmed.to_string())
}
