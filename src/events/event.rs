//! # The event contract.
//!
//! The bus is generic over the event family `E`. It only needs a stable identity,
//! the owner the event belongs to, a short kind label for logs, and whether the
//! event is a no-op marker that must be filtered out before any delivery.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

use crate::keys::RegistrationKey;

/// Unique identifier of a dispatched event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Generates a fresh random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for EventId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An event that can travel through the bus.
///
/// Implementations are usually a serde-tagged enum; see
/// [`JsonEvent`](crate::JsonEvent) for the serialization side.
pub trait Event: Send + Sync + 'static {
    /// Identity used in logs and failure reports.
    fn event_id(&self) -> EventId;

    /// The user/account the event belongs to.
    fn owner(&self) -> &str;

    /// Short discriminator for logs (e.g. `"calendar_change"`).
    fn kind(&self) -> &'static str;

    /// No-op events are dropped by the dispatcher before any delivery.
    fn is_noop(&self) -> bool {
        false
    }
}

/// An event paired with the registration keys it targets (batch dispatch input).
#[derive(Clone, Debug)]
pub struct EventWithKeys<E> {
    /// The event.
    pub event: E,
    /// Target keys; duplicates collapse.
    pub keys: HashSet<RegistrationKey>,
}

impl<E> EventWithKeys<E> {
    /// Pairs `event` with `keys`.
    pub fn new(event: E, keys: impl IntoIterator<Item = RegistrationKey>) -> Self {
        Self {
            event,
            keys: keys.into_iter().collect(),
        }
    }
}
