//! # keybus
//!
//! **Keybus** is a keyed event bus for Rust services that run as several
//! instances behind one pub/sub transport.
//!
//! Listeners register for a [`RegistrationKey`] (a user, an address book, a
//! calendar). Publishers dispatch an event to a set of keys; the bus runs the
//! local listeners of those keys and forwards the event to every other bus
//! instance that advertised interest in one of them.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!          publisher                                  other bus instance
//!              │ dispatch(event, keys)                         ▲
//!              ▼                                               │
//! ┌──────────────────────────────────────────┐                 │
//! │ EventBus (façade, lifecycle)             │                 │
//! │  └─ EventDispatcher                      │                 │
//! │      ├─ local phase                      │                 │
//! │      │   LocalListenerRegistry           │                 │
//! │      │    └─► ListenerExecutor ──► Listener::on_event      │
//! │      └─ remote phase                     │                 │
//! │          EventSerializer (once)          │                 │
//! │          RegistrationDirectory.members ──┼─► channels      │
//! │          PubSub.publish(KeyChannelMessage)───────────────► │
//! │  └─ KeyRegistrationHandler               │                 │
//! │      ├─ directory add/remove on first/last listener        │
//! │      └─ consumer of this instance's channel ◄──────────────┘
//! └──────────────────────────────────────────┘
//! ```
//!
//! ### Naming
//! ```text
//! inbound channel of an instance   "{name}:channel:{bus_id}"
//! directory set of a routing key   "{name}:registrations:{routing_key}"
//! routing key                      RegistrationKey::as_string(), e.g. "username:bob"
//! ```
//!
//! ## Features
//! | Area              | Description                                                    | Key types / traits                            |
//! |-------------------|----------------------------------------------------------------|-----------------------------------------------|
//! | **Keys**          | Typed registration keys with a strict, prefix-based codec      | [`RegistrationKey`], [`KeyFactory`]           |
//! | **Listeners**     | Synchronous (inline) or asynchronous (via transport) delivery  | [`Listener`], [`ListenerFn`], [`ExecutionMode`] |
//! | **Isolation**     | Failing or panicking listeners never reach the publisher       | [`ListenerExecutor`], [`ListenerFailure`]     |
//! | **Fan-out**       | One serialized payload per dispatch, bounded remote calls      | [`EventBus`], [`Config`]                      |
//! | **Transport**     | Pluggable pub/sub and registration directory, in-memory impls  | [`PubSub`], [`RegistrationDirectory`]         |
//! | **Serialization** | Tagged JSON event families with an explicit kind table         | [`JsonEvent`], [`JsonEventSerializer`]        |
//!
//! ## Example
//! ```rust
//! use keybus::{
//!     Config, Event, EventBusBuilder, EventId, InMemoryDirectory, InMemoryPubSub, JsonEvent,
//!     JsonEventSerializer, ListenerError, ListenerFn, PubSub, RegistrationDirectory, RegistrationKey,
//! };
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Clone, Serialize, Deserialize)]
//! #[serde(tag = "type", rename_all = "snake_case")]
//! enum CalendarEvent {
//!     Changed { id: EventId, owner: String },
//! }
//!
//! impl Event for CalendarEvent {
//!     fn event_id(&self) -> EventId { match self { Self::Changed { id, .. } => *id } }
//!     fn owner(&self) -> &str { match self { Self::Changed { owner, .. } => owner } }
//!     fn kind(&self) -> &'static str { "changed" }
//! }
//!
//! impl JsonEvent for CalendarEvent {
//!     const KINDS: &'static [&'static str] = &["changed"];
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), keybus::BusError> {
//!     let pubsub: Arc<dyn PubSub> = Arc::new(InMemoryPubSub::new());
//!     let directory: Arc<dyn RegistrationDirectory> = Arc::new(InMemoryDirectory::new());
//!     let serializer = Arc::new(JsonEventSerializer::<CalendarEvent>::new());
//!
//!     let node_a = EventBusBuilder::new(Config::default(), serializer.clone())
//!         .with_transport(pubsub.clone(), directory.clone())
//!         .build();
//!     let node_b = EventBusBuilder::new(Config::default(), serializer)
//!         .with_transport(pubsub, directory)
//!         .build();
//!     node_a.start().await?;
//!     node_b.start().await?;
//!
//!     let bob = RegistrationKey::calendar_url("home", "work")?;
//!     let _registration = node_b
//!         .register(
//!             ListenerFn::arc("sync-clients", |event: CalendarEvent| async move {
//!                 println!("calendar of {} changed", event.owner());
//!                 Ok::<_, ListenerError>(())
//!             }),
//!             bob.clone(),
//!         )
//!         .await?;
//!
//!     let event = CalendarEvent::Changed { id: EventId::random(), owner: "bob".into() };
//!     node_a.dispatch(&event, [bob]).await?;
//!
//!     node_a.stop().await;
//!     node_b.stop().await;
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod events;
mod keys;
mod listeners;
mod policies;
mod routing;
mod serde_millis;
mod transport;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use core::{BusStatus, Config, EventBus, EventBusBuilder, Group, Registration};
pub use error::{BusError, ConfigError, KeyError, ListenerError, SerializationError, TransportError};
pub use events::{
    Event, EventId, EventSerializer, EventWithKeys, JsonEvent, JsonEventSerializer,
    KeyChannelMessage,
};
pub use keys::{AddressBookUrl, CalendarUrl, KeyFactory, KeyParser, RegistrationKey, Username};
pub use listeners::{
    ExecutionMode, Listener, ListenerExecutor, ListenerFailure, ListenerFn, ListenerId,
    ListenerRef, LocalListenerRegistry, LocalRegistration, RemovalStatus,
};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use routing::{EventBusId, NamingStrategy, RoutingKey, RoutingKeyResolver};
pub use transport::{InMemoryDirectory, InMemoryPubSub, MessageStream, PubSub, RegistrationDirectory};
