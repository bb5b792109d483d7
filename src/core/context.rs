//! Components shared by the dispatcher and the registration handler of one
//! running bus.

use std::future::Future;
use std::sync::Arc;

use crate::core::Config;
use crate::error::TransportError;
use crate::events::{Event, EventSerializer};
use crate::listeners::{ListenerExecutor, LocalListenerRegistry};
use crate::routing::{EventBusId, NamingStrategy, RoutingKeyResolver};
use crate::transport::{PubSub, RegistrationDirectory};

pub(crate) struct BusContext<E: Event> {
    pub(crate) config: Arc<Config>,
    pub(crate) bus_id: EventBusId,
    pub(crate) naming: NamingStrategy,
    /// This instance's inbound channel.
    pub(crate) channel: String,
    pub(crate) resolver: RoutingKeyResolver,
    pub(crate) serializer: Arc<dyn EventSerializer<E>>,
    pub(crate) pubsub: Arc<dyn PubSub>,
    pub(crate) directory: Arc<dyn RegistrationDirectory>,
    pub(crate) registry: Arc<LocalListenerRegistry<E>>,
    pub(crate) executor: ListenerExecutor,
}

impl<E: Event> BusContext<E> {
    /// Runs a transport operation under `Config::publish_timeout`.
    pub(crate) async fn bounded<T, F>(&self, operation: F) -> Result<T, TransportError>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        match self.config.remote_timeout() {
            None => operation.await,
            Some(timeout) => tokio::time::timeout(timeout, operation)
                .await
                .unwrap_or(Err(TransportError::Timeout { timeout })),
        }
    }
}

impl<E: Event> Clone for BusContext<E> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            bus_id: self.bus_id,
            naming: self.naming.clone(),
            channel: self.channel.clone(),
            resolver: self.resolver.clone(),
            serializer: Arc::clone(&self.serializer),
            pubsub: Arc::clone(&self.pubsub),
            directory: Arc::clone(&self.directory),
            registry: Arc::clone(&self.registry),
            executor: self.executor,
        }
    }
}
