//! Local listeners: the trait, the per-key registry and the isolated executor.
//!
//! ## Architecture
//! ```text
//! EventBus::register(listener, key)
//!     └─► LocalListenerRegistry  key → [(ListenerId, Arc<dyn Listener<E>>), ..]
//!
//! EventDispatcher / inbound consumer
//!     └─► registry.listeners_for(key)   (snapshot, no lock held afterwards)
//!           └─► ListenerExecutor::execute_all(targets, event, rate)
//!                 ├─► listener.on_event(event)   Ok
//!                 ├─► Err(ListenerError)         logged, counted
//!                 └─► panic                      caught, logged, counted
//! ```
//!
//! ## Rules
//! - A failing or panicking listener never affects its siblings or the publisher.
//! - The registry hands out snapshots; concurrent register/unregister never
//!   changes a delivery already in progress.
//! - Synchronous listeners run inline with `dispatch`; asynchronous ones are
//!   reached through the transport (see `core::handler`).

mod executor;
mod listener;
mod listener_fn;
mod registry;

pub use executor::{ListenerExecutor, ListenerFailure};
pub use listener::{ExecutionMode, Listener, ListenerRef};
pub use listener_fn::ListenerFn;
pub use registry::{ListenerId, LocalListenerRegistry, LocalRegistration, RemovalStatus};
