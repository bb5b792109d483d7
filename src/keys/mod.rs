//! Registration keys: what a listener cares about.
//!
//! A [`RegistrationKey`] is a closed sum type over the supported key variants.
//! Every variant has a compact string encoding `prefix:component[:component...]`
//! and a parser turning that encoding back into the structured value.
//!
//! ## Contents
//! - [`RegistrationKey`] the key sum type (`Hash + Eq`, used as map key)
//! - [`Username`], [`AddressBookUrl`], [`CalendarUrl`] variant values
//! - [`KeyFactory`] prefix → parser registry
//!
//! ## Rules
//! - **Round-trip**: `factory.parse(&key.as_string()) == Ok(key)` for every key.
//! - **Fail fast**: unknown prefix, wrong segment count or blank segment is a [`KeyError`](crate::KeyError).
//! - **Pure**: no I/O, no shared state.

mod address_book;
mod calendar_url;
mod factory;
mod key;
mod username;

pub use address_book::AddressBookUrl;
pub use calendar_url::CalendarUrl;
pub use factory::{KeyFactory, KeyParser};
pub use key::RegistrationKey;
pub use username::Username;

pub(crate) use key::{DELIMITER, segment, split_components};
