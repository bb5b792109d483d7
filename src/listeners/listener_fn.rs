//! # Closure-backed listener (`ListenerFn`)
//!
//! [`ListenerFn`] wraps `F: Fn(E) -> Fut`. Each call receives its own clone of the
//! event, so the returned future owns everything it touches.
//!
//! ## Example
//! ```rust
//! # use keybus::{Event, EventId};
//! # #[derive(Clone)]
//! # struct Ping(EventId);
//! # impl Event for Ping {
//! #     fn event_id(&self) -> EventId { self.0 }
//! #     fn owner(&self) -> &str { "bob" }
//! #     fn kind(&self) -> &'static str { "ping" }
//! # }
//! use keybus::{Listener, ListenerError, ListenerFn, ListenerRef};
//!
//! let listener: ListenerRef<Ping> = ListenerFn::arc("audit", |ping: Ping| async move {
//!     let _ = ping.event_id();
//!     Ok::<_, ListenerError>(())
//! });
//! assert_eq!(listener.name(), "audit");
//! ```

use async_trait::async_trait;
use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use crate::error::ListenerError;
use crate::events::Event;
use crate::listeners::listener::{ExecutionMode, Listener};

/// Function-backed listener.
#[derive(Debug)]
pub struct ListenerFn<F> {
    name: Cow<'static, str>,
    mode: ExecutionMode,
    f: F,
}

impl<F> ListenerFn<F> {
    /// Creates a synchronous listener.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            mode: ExecutionMode::Synchronous,
            f,
        }
    }

    /// Creates the listener and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }

    /// Switches the listener to [`ExecutionMode::Asynchronous`].
    #[must_use]
    pub fn asynchronous(mut self) -> Self {
        self.mode = ExecutionMode::Asynchronous;
        self
    }
}

#[async_trait]
impl<E, F, Fut> Listener<E> for ListenerFn<F>
where
    E: Event + Clone,
    F: Fn(E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ListenerError>> + Send + 'static,
{
    async fn on_event(&self, event: &E) -> Result<(), ListenerError> {
        (self.f)(event.clone()).await
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn execution_mode(&self) -> ExecutionMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listeners::ListenerRef;
    use crate::testing::TestEvent;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_closure_sees_event_and_mode() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);

        let listener: ListenerRef<TestEvent> = Arc::new(
            ListenerFn::new("counter", move |event: TestEvent| {
                let seen = Arc::clone(&seen);
                async move {
                    assert_eq!(event.owner(), "bob");
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .asynchronous(),
        );

        listener
            .on_event(&TestEvent::change("bob"))
            .await
            .expect("listener succeeds");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(listener.name(), "counter");
        assert_eq!(listener.execution_mode(), ExecutionMode::Asynchronous);
    }
}
