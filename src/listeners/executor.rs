//! # Listener executor.
//!
//! Runs listeners with failure isolation. Whatever a listener does (return an
//! error, panic) is turned into a [`ListenerFailure`], logged with the event id,
//! the owner and the registration key, and reported back as a value. Nothing is
//! ever propagated to the publisher.
//!
//! **Warning**: `AssertUnwindSafe` is used, so a listener that panics while
//! holding a lock on shared state may leave that state inconsistent.

use futures::FutureExt;
use futures::future;
use futures::stream::{self, StreamExt};
use std::panic::AssertUnwindSafe;

use crate::events::{Event, EventId};
use crate::keys::RegistrationKey;
use crate::listeners::listener::{Listener, ListenerRef};

/// Report of one failed listener invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListenerFailure {
    /// [`Listener::name`] of the failing listener.
    pub listener: String,
    /// Key the listener was reached through.
    pub registration_key: RegistrationKey,
    /// The event being delivered.
    pub event_id: EventId,
    /// Error text or panic message.
    pub reason: String,
    /// `true` if the listener panicked.
    pub panicked: bool,
}

/// Invokes listeners, isolating their failures.
#[derive(Clone, Copy, Debug, Default)]
pub struct ListenerExecutor;

impl ListenerExecutor {
    /// Creates an executor.
    pub fn new() -> Self {
        Self
    }

    /// Runs one listener for `event`, reached through `key`.
    pub async fn execute<E: Event>(
        &self,
        listener: &dyn Listener<E>,
        key: &RegistrationKey,
        event: &E,
    ) -> Result<(), ListenerFailure> {
        let outcome = AssertUnwindSafe(listener.on_event(event))
            .catch_unwind()
            .await;

        let (reason, panicked) = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(err)) => (err.to_string(), false),
            Err(panic) => (panic_message(&*panic), true),
        };

        tracing::error!(
            event_id = %event.event_id(),
            event_kind = event.kind(),
            owner = event.owner(),
            registration_key = %key,
            listener = listener.name(),
            panicked,
            reason = %reason,
            "error while executing listener"
        );

        Err(ListenerFailure {
            listener: listener.name().to_string(),
            registration_key: key.clone(),
            event_id: event.event_id(),
            reason,
            panicked,
        })
    }

    /// Runs every `(key, listener)` target for `event`, at most `limit` at a time
    /// (`None` = all at once), and returns the failures.
    pub async fn execute_all<E: Event>(
        &self,
        targets: &[(RegistrationKey, ListenerRef<E>)],
        event: &E,
        limit: Option<usize>,
    ) -> Vec<ListenerFailure> {
        if targets.is_empty() {
            return Vec::new();
        }
        let width = limit.unwrap_or(targets.len()).max(1);

        let calls: Vec<_> = targets
            .iter()
            .map(|(key, listener)| self.execute(listener.as_ref(), key, event))
            .collect();

        stream::iter(calls)
            .buffer_unordered(width)
            .filter_map(|outcome| future::ready(outcome.err()))
            .collect()
            .await
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
