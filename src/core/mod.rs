//! Bus core: façade, lifecycle, dispatch and registration handling.
//!
//! The public API of this module is [`EventBus`] (built with [`EventBusBuilder`]),
//! its [`Config`], the [`Registration`] handle and [`BusStatus`].
//!
//! ## Wiring
//! ```text
//! EventBusBuilder::build() ─► EventBus (Stopped)
//!
//! EventBus::start()
//!   └─► BusContext { config, bus_id, naming, serializer, pubsub, directory,
//!                    registry (fresh), executor }
//!         ├─► KeyRegistrationHandler  subscribe own channel, spawn consumer
//!         └─► EventDispatcher         local phase + remote phase
//!
//! EventBus::register ─► KeyRegistrationHandler::register ─► Registration
//! EventBus::dispatch ─► EventDispatcher::dispatch
//! EventBus::stop     ─► KeyRegistrationHandler::stop
//! ```
//!
//! Internal modules:
//! - [`context`]: components shared by one running bus;
//! - [`dispatcher`]: local then remote delivery of events;
//! - [`handler`]: inbound consumer and directory bookkeeping;
//! - [`state`]: lifecycle state machine.

mod builder;
mod bus;
mod config;
mod context;
mod dispatcher;
mod handler;
mod registration;
mod state;

pub use builder::EventBusBuilder;
pub use bus::{EventBus, Group};
pub use config::Config;
pub use registration::Registration;
pub use state::BusStatus;
