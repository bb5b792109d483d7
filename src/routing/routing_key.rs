//! # Routing keys.
//!
//! A [`RoutingKey`] has no identity of its own: its string is exactly the
//! encoding of the registration key it was projected from. Keeping the two
//! types apart lets the transport side deal with plain names while listeners
//! deal with typed keys.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::KeyError;
use crate::keys::{KeyFactory, RegistrationKey};

/// Transport-level name derived from a [`RegistrationKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoutingKey(String);

impl RoutingKey {
    /// Projects a registration key.
    pub fn of(key: &RegistrationKey) -> Self {
        RoutingKey(key.as_string())
    }

    /// Returns the routing key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&RegistrationKey> for RoutingKey {
    fn from(key: &RegistrationKey) -> Self {
        RoutingKey::of(key)
    }
}

/// Converts between registration keys and routing keys.
///
/// The reverse direction only accepts prefixes known to the wrapped [`KeyFactory`].
#[derive(Clone, Debug, Default)]
pub struct RoutingKeyResolver {
    factory: KeyFactory,
}

impl RoutingKeyResolver {
    /// Creates a resolver over the given key factory.
    pub fn new(factory: KeyFactory) -> Self {
        Self { factory }
    }

    /// Projects a registration key to its routing key.
    #[inline]
    pub fn routing_key(&self, key: &RegistrationKey) -> RoutingKey {
        RoutingKey::of(key)
    }

    /// Recovers the registration key a routing key was projected from.
    pub fn registration_key(&self, routing_key: &RoutingKey) -> Result<RegistrationKey, KeyError> {
        self.factory.parse(routing_key.as_str())
    }

    /// Returns the key factory used for the reverse mapping.
    pub fn factory(&self) -> &KeyFactory {
        &self.factory
    }
}
