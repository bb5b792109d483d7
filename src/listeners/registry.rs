//! # Local listener registry.
//!
//! Maps each [`RegistrationKey`] to the listeners registered under it on this
//! bus instance.
//!
//! ## Rules
//! - Each registration gets a unique [`ListenerId`]; the same listener may be
//!   registered several times, under one key or many.
//! - `register` reports whether it created the key's entry and `unregister`
//!   reports whether it removed the last listener, so the caller knows when
//!   to advertise or withdraw the key remotely.
//! - An entry never lingers empty: removing the last listener removes the key
//!   under the same shard lock.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::events::Event;
use crate::keys::RegistrationKey;
use crate::listeners::listener::ListenerRef;

static LISTENER_SEQ: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of one registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        Self(LISTENER_SEQ.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Receipt of a successful [`LocalListenerRegistry::register`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalRegistration {
    key: RegistrationKey,
    id: ListenerId,
    first: bool,
}

impl LocalRegistration {
    /// The key the listener was registered under.
    pub fn key(&self) -> &RegistrationKey {
        &self.key
    }

    /// The registration identity.
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// `true` if no other listener was registered for the key at that moment.
    pub fn is_first(&self) -> bool {
        self.first
    }
}

/// Outcome of [`LocalListenerRegistry::unregister`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemovalStatus {
    /// The key has no local listener left.
    LastListenerRemoved,
    /// Other listeners remain for the key.
    ListenersRemaining,
    /// The registration was already gone.
    NotRegistered,
}

struct Slot<E: Event> {
    id: ListenerId,
    listener: ListenerRef<E>,
}

/// Concurrent key → listeners map.
pub struct LocalListenerRegistry<E: Event> {
    slots: DashMap<RegistrationKey, Vec<Slot<E>>>,
}

impl<E: Event> LocalListenerRegistry<E> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Adds `listener` under `key`.
    pub fn register(&self, key: RegistrationKey, listener: ListenerRef<E>) -> LocalRegistration {
        let id = ListenerId::next();
        let mut slots = self.slots.entry(key.clone()).or_default();
        let first = slots.is_empty();
        slots.push(Slot { id, listener });
        LocalRegistration { key, id, first }
    }

    /// Removes one registration.
    pub fn unregister(&self, registration: &LocalRegistration) -> RemovalStatus {
        let Entry::Occupied(mut entry) = self.slots.entry(registration.key.clone()) else {
            return RemovalStatus::NotRegistered;
        };

        let slots = entry.get_mut();
        let before = slots.len();
        slots.retain(|slot| slot.id != registration.id);

        if slots.len() == before {
            RemovalStatus::NotRegistered
        } else if slots.is_empty() {
            entry.remove();
            RemovalStatus::LastListenerRemoved
        } else {
            RemovalStatus::ListenersRemaining
        }
    }

    /// Snapshot of the listeners registered under `key`, in registration order.
    pub fn listeners_for(&self, key: &RegistrationKey) -> Vec<ListenerRef<E>> {
        self.slots
            .get(key)
            .map(|slots| slots.iter().map(|slot| slot.listener.clone()).collect())
            .unwrap_or_default()
    }

    /// Keys that currently have at least one listener.
    pub fn keys(&self) -> Vec<RegistrationKey> {
        self.slots.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of listeners registered under `key`.
    pub fn count(&self, key: &RegistrationKey) -> usize {
        self.slots.get(key).map_or(0, |slots| slots.len())
    }

    /// Removes every registration and returns the keys that had listeners.
    pub fn clear(&self) -> Vec<RegistrationKey> {
        let keys = self.keys();
        for key in &keys {
            self.slots.remove(key);
        }
        keys
    }

    /// `true` if no listener is registered at all.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<E: Event> Default for LocalListenerRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> fmt::Debug for LocalListenerRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalListenerRegistry")
            .field("keys", &self.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingListener, TestEvent};
    use std::sync::Arc;

    fn key(name: &str) -> RegistrationKey {
        RegistrationKey::username(name).expect("valid key")
    }

    #[test]
    fn test_first_and_last_transitions() {
        let registry = LocalListenerRegistry::<TestEvent>::new();
        let listener = RecordingListener::arc("a");

        let first = registry.register(key("bob"), listener.clone());
        let second = registry.register(key("bob"), listener.clone());
        assert!(first.is_first());
        assert!(!second.is_first());
        assert_eq!(registry.count(&key("bob")), 2);

        assert_eq!(registry.unregister(&first), RemovalStatus::ListenersRemaining);
        assert_eq!(registry.unregister(&second), RemovalStatus::LastListenerRemoved);
        assert!(registry.is_empty());
        assert!(registry.keys().is_empty());
    }

    #[test]
    fn test_clear_forgets_outstanding_registrations() {
        let registry = LocalListenerRegistry::<TestEvent>::new();
        let reg = registry.register(key("bob"), RecordingListener::arc("a"));
        registry.register(key("alice"), RecordingListener::arc("b"));

        let mut cleared = registry.clear();
        cleared.sort();
        assert_eq!(cleared, vec![key("alice"), key("bob")]);
        assert!(registry.is_empty());
        assert_eq!(registry.unregister(&reg), RemovalStatus::NotRegistered);
    }

    #[test]
    fn test_unregister_twice_is_not_registered() {
        let registry = LocalListenerRegistry::<TestEvent>::new();
        let reg = registry.register(key("bob"), RecordingListener::arc("a"));
        registry.register(key("bob"), RecordingListener::arc("b"));

        assert_eq!(registry.unregister(&reg), RemovalStatus::ListenersRemaining);
        assert_eq!(registry.unregister(&reg), RemovalStatus::NotRegistered);
        assert_eq!(registry.count(&key("bob")), 1);
    }

    #[test]
    fn test_keys_are_isolated() {
        let registry = LocalListenerRegistry::<TestEvent>::new();
        let listener = RecordingListener::arc("shared");
        registry.register(key("bob"), listener.clone());
        registry.register(key("alice"), listener.clone());

        assert_eq!(registry.listeners_for(&key("bob")).len(), 1);
        assert_eq!(registry.listeners_for(&key("carol")).len(), 0);

        let mut keys = registry.keys();
        keys.sort();
        assert_eq!(keys, vec![key("alice"), key("bob")]);
    }

    #[test]
    fn test_snapshot_survives_unregister() {
        let registry = LocalListenerRegistry::<TestEvent>::new();
        let reg = registry.register(key("bob"), RecordingListener::arc("a"));
        let snapshot = registry.listeners_for(&key("bob"));

        registry.unregister(&reg);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(Arc::strong_count(&snapshot[0]), 1);
    }
}
