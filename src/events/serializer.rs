//! # Event ⇄ JSON.
//!
//! [`EventSerializer`] is the seam between the bus and the event family. The
//! bus serializes an event (or a batch) once per dispatch and the receiving
//! instance decodes the batch before running its listeners.
//!
//! [`JsonEventSerializer`] covers any serde internally-tagged family:
//!
//! ```text
//! {"type": "calendar_change", "id": "…", "owner": "bob", …}
//!   │
//!   ├─ no "type" field            → SerializationError::MissingDiscriminator
//!   ├─ "type" not in E::KINDS     → SerializationError::UnknownDiscriminator
//!   └─ serde_json::from_value::<E>
//! ```
//!
//! Checking the tag against an explicit table keeps "this family does not know
//! that event" apart from "the payload is broken".

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;

use crate::error::SerializationError;
use crate::events::Event;

/// An event family with a JSON representation tagged by [`JsonEvent::TAG`].
///
/// # Example
/// ```rust
/// use keybus::{Event, EventId, JsonEvent};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Serialize, Deserialize)]
/// #[serde(tag = "type", rename_all = "snake_case")]
/// enum MailboxEvent {
///     Added { id: EventId, owner: String },
/// }
///
/// impl Event for MailboxEvent {
///     fn event_id(&self) -> EventId { match self { Self::Added { id, .. } => *id } }
///     fn owner(&self) -> &str { match self { Self::Added { owner, .. } => owner } }
///     fn kind(&self) -> &'static str { "added" }
/// }
///
/// impl JsonEvent for MailboxEvent {
///     const KINDS: &'static [&'static str] = &["added"];
/// }
/// ```
pub trait JsonEvent: Event + Serialize + DeserializeOwned {
    /// Name of the discriminator field.
    const TAG: &'static str = "type";

    /// Every discriminator value the family can decode.
    const KINDS: &'static [&'static str];
}

/// Converts events of family `E` to and from their wire representation.
pub trait EventSerializer<E>: Send + Sync + 'static {
    /// Encodes one event.
    fn to_json(&self, event: &E) -> Result<String, SerializationError>;

    /// Encodes several events as one payload.
    fn to_json_batch(&self, events: &[&E]) -> Result<String, SerializationError>;

    /// Decodes one event.
    fn from_json(&self, payload: &str) -> Result<E, SerializationError>;

    /// Decodes a payload produced by [`to_json_batch`](Self::to_json_batch) or
    /// [`to_json`](Self::to_json).
    fn from_json_batch(&self, payload: &str) -> Result<Vec<E>, SerializationError>;
}

/// serde_json based [`EventSerializer`] for any [`JsonEvent`] family.
pub struct JsonEventSerializer<E> {
    _family: PhantomData<fn() -> E>,
}

impl<E> JsonEventSerializer<E> {
    /// Creates a serializer for family `E`.
    pub fn new() -> Self {
        Self {
            _family: PhantomData,
        }
    }
}

impl<E> Default for JsonEventSerializer<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for JsonEventSerializer<E> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for JsonEventSerializer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonEventSerializer")
            .field("family", &std::any::type_name::<E>())
            .finish()
    }
}

impl<E: JsonEvent> JsonEventSerializer<E> {
    fn decode(value: Value) -> Result<E, SerializationError> {
        match value.get(E::TAG).and_then(Value::as_str) {
            None => return Err(SerializationError::MissingDiscriminator),
            Some(kind) if !E::KINDS.iter().any(|known| *known == kind) => {
                return Err(SerializationError::UnknownDiscriminator {
                    kind: kind.to_string(),
                });
            }
            Some(_) => {}
        }
        serde_json::from_value(value).map_err(SerializationError::Decode)
    }
}

impl<E: JsonEvent> EventSerializer<E> for JsonEventSerializer<E> {
    fn to_json(&self, event: &E) -> Result<String, SerializationError> {
        serde_json::to_string(event).map_err(SerializationError::Encode)
    }

    fn to_json_batch(&self, events: &[&E]) -> Result<String, SerializationError> {
        serde_json::to_string(events).map_err(SerializationError::Encode)
    }

    fn from_json(&self, payload: &str) -> Result<E, SerializationError> {
        let value: Value = serde_json::from_str(payload).map_err(SerializationError::Decode)?;
        Self::decode(value)
    }

    fn from_json_batch(&self, payload: &str) -> Result<Vec<E>, SerializationError> {
        let value: Value = serde_json::from_str(payload).map_err(SerializationError::Decode)?;
        match value {
            Value::Array(items) => items.into_iter().map(Self::decode).collect(),
            single => Ok(vec![Self::decode(single)?]),
        }
    }
}
