//! # Listener trait.
//!
//! A [`Listener`] reacts to events dispatched for the registration keys it was
//! registered under.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use keybus::{Event, ExecutionMode, Listener, ListenerError};
//!
//! struct PushNotifier;
//!
//! #[async_trait]
//! impl<E: Event> Listener<E> for PushNotifier {
//!     async fn on_event(&self, event: &E) -> Result<(), ListenerError> {
//!         if event.owner().is_empty() {
//!             return Err(ListenerError::failed("event without owner"));
//!         }
//!         Ok(())
//!     }
//!
//!     fn name(&self) -> &str { "push" }
//!     fn execution_mode(&self) -> ExecutionMode { ExecutionMode::Asynchronous }
//! }
//! ```

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ListenerError;
use crate::events::Event;

/// How a listener is reached on the publishing bus instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExecutionMode {
    /// Runs inline, before `dispatch` returns.
    #[default]
    Synchronous,
    /// Runs when the event comes back through the transport, after `dispatch` returns.
    Asynchronous,
}

/// Reacts to events of family `E`.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Return `Err` for failures: they are logged, never propagated to the publisher.
/// - Panics are caught, but shared state behind a lock may be left inconsistent.
#[async_trait]
pub trait Listener<E: Event>: Send + Sync + 'static {
    /// Handles one event.
    async fn on_event(&self, event: &E) -> Result<(), ListenerError>;

    /// Name used in logs and failure reports.
    ///
    /// The default uses `type_name::<Self>()`, which is verbose; override it when possible.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Delivery mode, [`ExecutionMode::Synchronous`] unless overridden.
    fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode::Synchronous
    }
}

/// Shared handle to a listener.
pub type ListenerRef<E> = Arc<dyn Listener<E>>;
