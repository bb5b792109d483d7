//! # Bus lifecycle state.
//!
//! One `parking_lot::Mutex` guards a single state enum; every transition is a
//! compare-and-set on that enum, so no combination of flags can be observed
//! half-updated. The lock is never held across an `.await`.
//!
//! ```text
//!            try_begin_start            finish_start
//!  Stopped ─────────────────► Starting ─────────────► Running(Arc<R>)
//!     ▲                          │                         │
//!     │        abort_start       │                         │ try_begin_stop
//!     ├──────────────────────────┘                         ▼
//!     └─────────────────────────────────────────────── Stopping
//!                       finish_stop
//! ```

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Observable state of an [`EventBus`](crate::EventBus).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BusStatus {
    /// Initial and final state.
    Stopped,
    /// `start()` is wiring components.
    Starting,
    /// Accepting `register` and `dispatch`.
    Running,
    /// `stop()` is tearing the registration handler down.
    Stopping,
}

impl fmt::Display for BusStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BusStatus::Stopped => "stopped",
            BusStatus::Starting => "starting",
            BusStatus::Running => "running",
            BusStatus::Stopping => "stopping",
        })
    }
}

enum State<R> {
    Stopped,
    Starting,
    Running(Arc<R>),
    Stopping,
}

/// Lifecycle cell holding the running components `R` while the bus runs.
pub(crate) struct Lifecycle<R> {
    state: Mutex<State<R>>,
}

impl<R> Lifecycle<R> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State::Stopped),
        }
    }

    pub(crate) fn status(&self) -> BusStatus {
        match &*self.state.lock() {
            State::Stopped => BusStatus::Stopped,
            State::Starting => BusStatus::Starting,
            State::Running(_) => BusStatus::Running,
            State::Stopping => BusStatus::Stopping,
        }
    }

    /// Running components, if the bus is running.
    pub(crate) fn running(&self) -> Option<Arc<R>> {
        match &*self.state.lock() {
            State::Running(components) => Some(Arc::clone(components)),
            _ => None,
        }
    }

    /// Stopped → Starting. `false` in any other state.
    pub(crate) fn try_begin_start(&self) -> bool {
        let mut state = self.state.lock();
        if matches!(*state, State::Stopped) {
            *state = State::Starting;
            true
        } else {
            false
        }
    }

    /// Starting → Running.
    pub(crate) fn finish_start(&self, components: Arc<R>) {
        let mut state = self.state.lock();
        debug_assert!(matches!(*state, State::Starting));
        *state = State::Running(components);
    }

    /// Starting → Stopped.
    pub(crate) fn abort_start(&self) {
        let mut state = self.state.lock();
        debug_assert!(matches!(*state, State::Starting));
        *state = State::Stopped;
    }

    /// Running → Stopping, handing back the components to tear down.
    pub(crate) fn try_begin_stop(&self) -> Option<Arc<R>> {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, State::Stopping) {
            State::Running(components) => Some(components),
            previous => {
                *state = previous;
                None
            }
        }
    }

    /// Stopping → Stopped.
    pub(crate) fn finish_stop(&self) {
        let mut state = self.state.lock();
        debug_assert!(matches!(*state, State::Stopping));
        *state = State::Stopped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle() {
        let lifecycle = Lifecycle::<&'static str>::new();
        assert_eq!(lifecycle.status(), BusStatus::Stopped);
        assert!(lifecycle.running().is_none());

        assert!(lifecycle.try_begin_start());
        assert_eq!(lifecycle.status(), BusStatus::Starting);
        assert!(!lifecycle.try_begin_start());

        lifecycle.finish_start(Arc::new("components"));
        assert_eq!(lifecycle.status(), BusStatus::Running);
        assert_eq!(lifecycle.running().as_deref(), Some(&"components"));

        let components = lifecycle.try_begin_stop().expect("was running");
        assert_eq!(*components, "components");
        assert_eq!(lifecycle.status(), BusStatus::Stopping);
        assert!(lifecycle.try_begin_stop().is_none());
        assert!(!lifecycle.try_begin_start());

        lifecycle.finish_stop();
        assert_eq!(lifecycle.status(), BusStatus::Stopped);
        assert!(lifecycle.try_begin_start());
    }

    #[test]
    fn test_stop_when_stopped_keeps_state() {
        let lifecycle = Lifecycle::<()>::new();
        assert!(lifecycle.try_begin_stop().is_none());
        assert_eq!(lifecycle.status(), BusStatus::Stopped);
    }

    #[test]
    fn test_abort_start_returns_to_stopped() {
        let lifecycle = Lifecycle::<()>::new();
        assert!(lifecycle.try_begin_start());
        lifecycle.abort_start();
        assert_eq!(lifecycle.status(), BusStatus::Stopped);
    }
}
