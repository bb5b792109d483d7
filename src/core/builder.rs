use std::sync::Arc;

use crate::core::{Config, EventBus};
use crate::events::{Event, EventSerializer};
use crate::keys::KeyFactory;
use crate::routing::{EventBusId, RoutingKeyResolver};
use crate::transport::{InMemoryDirectory, InMemoryPubSub, PubSub, RegistrationDirectory};

/// Builder for an [`EventBus`].
///
/// Without [`with_transport`](Self::with_transport) the bus runs on a private
/// [`InMemoryPubSub`]/[`InMemoryDirectory`] pair, i.e. as a single-process bus.
pub struct EventBusBuilder<E: Event> {
    cfg: Config,
    serializer: Arc<dyn EventSerializer<E>>,
    pubsub: Option<Arc<dyn PubSub>>,
    directory: Option<Arc<dyn RegistrationDirectory>>,
    factory: KeyFactory,
    id: Option<EventBusId>,
}

impl<E: Event> EventBusBuilder<E> {
    /// Creates a builder with the given configuration and event serializer.
    pub fn new(cfg: Config, serializer: Arc<dyn EventSerializer<E>>) -> Self {
        Self {
            cfg,
            serializer,
            pubsub: None,
            directory: None,
            factory: KeyFactory::with_defaults(),
            id: None,
        }
    }

    /// Shares a transport with other bus instances.
    pub fn with_transport(
        mut self,
        pubsub: Arc<dyn PubSub>,
        directory: Arc<dyn RegistrationDirectory>,
    ) -> Self {
        self.pubsub = Some(pubsub);
        self.directory = Some(directory);
        self
    }

    /// Restricts or extends the registration key prefixes accepted on inbound
    /// messages and by [`EventBus::register_encoded`].
    pub fn with_key_factory(mut self, factory: KeyFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Fixes the bus identity instead of generating a random one.
    pub fn with_id(mut self, id: EventBusId) -> Self {
        self.id = Some(id);
        self
    }

    /// Builds the bus in the [`Stopped`](crate::BusStatus::Stopped) state.
    pub fn build(self) -> Arc<EventBus<E>> {
        let pubsub = self
            .pubsub
            .unwrap_or_else(|| Arc::new(InMemoryPubSub::new()) as Arc<dyn PubSub>);
        let directory = self
            .directory
            .unwrap_or_else(|| Arc::new(InMemoryDirectory::new()) as Arc<dyn RegistrationDirectory>);

        Arc::new(EventBus::new_internal(
            self.cfg,
            self.id.unwrap_or_else(EventBusId::random),
            RoutingKeyResolver::new(self.factory),
            self.serializer,
            pubsub,
            directory,
        ))
    }
}
