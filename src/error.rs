//! Error types used by the keybus runtime, its transports and its listeners.
//!
//! This module defines:
//!
//! - [`KeyError`]: malformed registration keys (always a hard error).
//! - [`TransportError`]: failures of the pub/sub transport or the registration directory.
//! - [`SerializationError`]: events or envelopes that cannot be encoded/decoded.
//! - [`ListenerError`]: failures returned by listeners (isolated, never surfaced to publishers).
//! - [`BusError`]: everything a caller of the [`EventBus`](crate::EventBus) can observe.
//! - [`ConfigError`]: configuration documents that cannot be parsed.
//!
//! All enums provide `as_label` for logs; [`TransportError::is_transient`] drives
//! the failure-tolerance policy of the dispatcher.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced while parsing registration keys.
///
/// Parsing never truncates or coerces: any of these is returned instead of a
/// partially populated key.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The encoded key was empty or whitespace only.
    #[error("registration key must not be blank")]
    Blank,

    /// No parser is registered for this prefix.
    #[error("unknown registration key prefix '{prefix}'")]
    UnknownPrefix {
        /// The prefix that was looked up.
        prefix: String,
    },

    /// Wrong prefix or wrong number of segments for the variant.
    #[error("invalid {variant} registration key: '{input}'")]
    InvalidFormat {
        /// Variant prefix (e.g. `username`).
        variant: &'static str,
        /// The rejected input.
        input: String,
    },

    /// A segment was empty after trimming.
    #[error("blank segment in {variant} registration key: '{input}'")]
    BlankSegment {
        /// Variant prefix (e.g. `calendarurl`).
        variant: &'static str,
        /// The rejected input.
        input: String,
    },
}

impl KeyError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            KeyError::Blank => "key_blank",
            KeyError::UnknownPrefix { .. } => "key_unknown_prefix",
            KeyError::InvalidFormat { .. } => "key_invalid_format",
            KeyError::BlankSegment { .. } => "key_blank_segment",
        }
    }
}

/// # Errors produced by the pub/sub transport and the registration directory.
///
/// `Timeout` and `Unavailable` are **transient**: under a failure-tolerant
/// configuration the dispatcher logs and skips them.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// The operation did not complete within the configured bound.
    #[error("transport operation timed out after {timeout:?}")]
    Timeout {
        /// The bound that was exceeded.
        timeout: Duration,
    },

    /// The backend could not be reached or refused the operation temporarily.
    #[error("transport unavailable: {reason}")]
    Unavailable {
        /// Backend-specific detail.
        reason: String,
    },

    /// The transport has been shut down.
    #[error("transport closed")]
    Closed,

    /// Any other backend failure.
    #[error("transport error: {reason}")]
    Other {
        /// Backend-specific detail.
        reason: String,
    },
}

impl TransportError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            TransportError::Timeout { .. } => "transport_timeout",
            TransportError::Unavailable { .. } => "transport_unavailable",
            TransportError::Closed => "transport_closed",
            TransportError::Other { .. } => "transport_other",
        }
    }

    /// Indicates whether the failure is classified as transient.
    ///
    /// # Example
    /// ```
    /// use keybus::TransportError;
    /// use std::time::Duration;
    ///
    /// assert!(TransportError::Timeout { timeout: Duration::from_secs(1) }.is_transient());
    /// assert!(!TransportError::Closed.is_transient());
    /// ```
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::Timeout { .. } | TransportError::Unavailable { .. }
        )
    }
}

/// # Errors produced while encoding or decoding events and envelopes.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SerializationError {
    /// The value could not be encoded.
    #[error("failed to encode: {0}")]
    Encode(#[source] serde_json::Error),

    /// The payload is not valid for the expected shape.
    #[error("failed to decode: {0}")]
    Decode(#[source] serde_json::Error),

    /// The payload has no type discriminator.
    #[error("missing event type discriminator")]
    MissingDiscriminator,

    /// The type discriminator is not part of the event family.
    #[error("unknown event type '{kind}'")]
    UnknownDiscriminator {
        /// The discriminator found in the payload.
        kind: String,
    },
}

impl SerializationError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            SerializationError::Encode(_) => "serialization_encode",
            SerializationError::Decode(_) => "serialization_decode",
            SerializationError::MissingDiscriminator => "serialization_missing_type",
            SerializationError::UnknownDiscriminator { .. } => "serialization_unknown_type",
        }
    }
}

/// # Errors returned by listeners.
///
/// Listener failures are isolated: they are logged by the
/// [`ListenerExecutor`](crate::ListenerExecutor) and never reach the publisher.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum ListenerError {
    /// The listener could not process the event.
    #[error("listener failed: {reason}")]
    Failed {
        /// Human-readable failure description.
        reason: String,
    },
}

impl ListenerError {
    /// Convenience constructor for [`ListenerError::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        ListenerError::Failed {
            reason: reason.into(),
        }
    }
}

/// # Errors observable by callers of the event bus.
///
/// A dispatch either succeeds (partial listener/channel failures are only
/// logged) or fails with one of these.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BusError {
    /// `register`/`dispatch` called while the bus is not running.
    #[error("event bus is not running")]
    NotRunning,

    /// The operation is not supported by this bus (group-based delivery).
    #[error("unsupported operation: {operation}")]
    Unsupported {
        /// Name of the rejected operation.
        operation: &'static str,
    },

    /// A registration key could not be parsed.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// An event or envelope could not be serialized.
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    /// A transport failure that was not tolerated.
    #[error("transport failure for routing key '{routing_key}': {source}")]
    Transport {
        /// Routing key being served when the failure happened.
        routing_key: String,
        /// The underlying transport error.
        #[source]
        source: TransportError,
    },

    /// The bus could not subscribe to its inbound channel.
    #[error("cannot subscribe to channel '{channel}': {source}")]
    Subscription {
        /// The inbound channel name.
        channel: String,
        /// The underlying transport error.
        #[source]
        source: TransportError,
    },
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::NotRunning => "bus_not_running",
            BusError::Unsupported { .. } => "bus_unsupported",
            BusError::Key(e) => e.as_label(),
            BusError::Serialization(e) => e.as_label(),
            BusError::Transport { source, .. } => source.as_label(),
            BusError::Subscription { .. } => "bus_subscription_failed",
        }
    }
}

/// # Errors produced while loading configuration.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The TOML document is malformed or has wrongly typed fields.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}
