//! Event family contract, JSON serialization and the inter-instance envelope.
//!
//! ## Contents
//! - [`Event`], [`EventId`], [`EventWithKeys`] what a dispatched event must expose
//! - [`EventSerializer`], [`JsonEventSerializer`], [`JsonEvent`] event ⇄ JSON, single and batch
//! - [`KeyChannelMessage`] the wire envelope published to a remote bus channel
//!
//! ## Wire shape
//! ```text
//! KeyChannelMessage (JSON)
//! {
//!   "senderBusId": "<uuid>",          // publisher's EventBusId
//!   "routingKey":  "username:bob",    // RegistrationKey::as_string()
//!   "payload":     "[{\"type\":..}]"  // EventSerializer::to_json_batch output
//! }
//! ```
//!
//! The envelope carries the routing key, not the parsed registration key: the
//! receiver resolves it back through its own [`KeyFactory`](crate::KeyFactory).

mod event;
mod message;
mod serializer;

pub use event::{Event, EventId, EventWithKeys};
pub use message::KeyChannelMessage;
pub use serializer::{EventSerializer, JsonEvent, JsonEventSerializer};
