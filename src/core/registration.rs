//! # Registration handle.

use std::fmt;
use std::sync::Arc;

use crate::core::handler::KeyRegistrationHandler;
use crate::error::BusError;
use crate::events::Event;
use crate::keys::RegistrationKey;
use crate::listeners::{ListenerId, LocalRegistration};

/// Handle returned by [`EventBus::register`](crate::EventBus::register).
///
/// Dropping the handle keeps the listener registered; call
/// [`unregister`](Self::unregister) to remove it. When it was the last local
/// listener for its key, this bus stops advertising the key remotely.
#[must_use = "dropping a Registration keeps the listener registered"]
pub struct Registration<E: Event> {
    handler: Arc<KeyRegistrationHandler<E>>,
    local: LocalRegistration,
}

impl<E: Event> Registration<E> {
    pub(crate) fn new(handler: Arc<KeyRegistrationHandler<E>>, local: LocalRegistration) -> Self {
        Self { handler, local }
    }

    /// The key the listener is registered under.
    pub fn key(&self) -> &RegistrationKey {
        self.local.key()
    }

    /// The registration identity.
    pub fn id(&self) -> ListenerId {
        self.local.id()
    }

    /// Removes the listener.
    ///
    /// Fails only if the directory could not be updated; the listener is
    /// removed locally in every case.
    pub async fn unregister(self) -> Result<(), BusError> {
        self.handler.unregister(&self.local).await
    }
}

impl<E: Event> fmt::Debug for Registration<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("key", self.local.key())
            .field("id", &self.local.id())
            .finish()
    }
}
