//! # Inter-instance envelope.
//!
//! One [`KeyChannelMessage`] is published per (routing key, remote channel) pair.
//! It identifies the sending bus so a receiver can recognize its own messages.

use serde::{Deserialize, Serialize};

use crate::error::SerializationError;
use crate::routing::{EventBusId, RoutingKey};

/// Envelope carried over the pub/sub transport.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyChannelMessage {
    /// The publishing bus instance.
    pub sender_bus_id: EventBusId,
    /// Routing key the payload was published for.
    pub routing_key: RoutingKey,
    /// Serialized event batch.
    pub payload: String,
}

impl KeyChannelMessage {
    /// Builds an envelope.
    pub fn new(
        sender_bus_id: EventBusId,
        routing_key: RoutingKey,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            sender_bus_id,
            routing_key,
            payload: payload.into(),
        }
    }

    /// Encodes the envelope for the transport.
    pub fn encode(&self) -> Result<String, SerializationError> {
        serde_json::to_string(self).map_err(SerializationError::Encode)
    }

    /// Decodes an envelope received from the transport.
    pub fn decode(raw: &str) -> Result<Self, SerializationError> {
        serde_json::from_str(raw).map_err(SerializationError::Decode)
    }
}
