//! # Bus identity and transport naming.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::RoutingKey;

/// Identity of one bus instance, created once per bus.
///
/// Carried by every remotely published message so receivers can tell their
/// own messages apart from other instances' messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventBusId(Uuid);

impl EventBusId {
    /// Creates a fresh random identity.
    pub fn random() -> Self {
        EventBusId(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for EventBusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Derives channel and directory names from the bus name.
///
/// Buses with different names never share a channel or a directory set, so
/// they can use the same transport without seeing each other's traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingStrategy {
    name: String,
}

impl NamingStrategy {
    /// Creates a naming strategy for the bus called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Returns the bus name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inbound channel of the bus instance `id`.
    pub fn channel(&self, id: &EventBusId) -> String {
        format!("{}:channel:{id}", self.name)
    }

    /// Directory set listing the channels interested in `routing_key`.
    pub fn registration_set(&self, routing_key: &RoutingKey) -> String {
        format!("{}:registrations:{routing_key}", self.name)
    }
}
