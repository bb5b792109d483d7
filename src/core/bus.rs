//! # Event bus façade.
//!
//! [`EventBus`] is the public entry point. It owns the configuration, the bus
//! identity and the transport handles, and wires a fresh listener registry,
//! dispatcher and registration handler on every `start()`.
//!
//! ## Lifecycle
//! ```text
//!  Stopped ──start()──► Starting ──► Running ──stop()──► Stopping ──► Stopped
//!                           │                                            ▲
//!                           └──────── subscribe failed ──────────────────┘
//! ```
//!
//! ## Rules
//! - `start()` and `stop()` are idempotent; calls in any other state are no-ops.
//! - `register`/`dispatch` outside `Running` fail with [`BusError::NotRunning`].
//! - Dispatches already in flight when `stop()` is called run to completion.
//! - Group based delivery is not supported: [`EventBus::register_group`] and
//!   [`EventBus::redeliver`] always fail with [`BusError::Unsupported`].
//! - Every `register` runs in a `register` span and every dispatch in a
//!   `dispatch` span, so timing layers can key on the operation name.
//!
//! ## Example
//! ```rust
//! # use keybus::{Event, EventId, JsonEvent};
//! # use serde::{Deserialize, Serialize};
//! # #[derive(Clone, Serialize, Deserialize)]
//! # #[serde(tag = "type", rename_all = "snake_case")]
//! # enum MailboxEvent { Added { id: EventId, owner: String } }
//! # impl Event for MailboxEvent {
//! #     fn event_id(&self) -> EventId { match self { Self::Added { id, .. } => *id } }
//! #     fn owner(&self) -> &str { match self { Self::Added { owner, .. } => owner } }
//! #     fn kind(&self) -> &'static str { "added" }
//! # }
//! # impl JsonEvent for MailboxEvent { const KINDS: &'static [&'static str] = &["added"]; }
//! use keybus::{Config, EventBusBuilder, JsonEventSerializer, ListenerError, ListenerFn, RegistrationKey};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), keybus::BusError> {
//! let bus = EventBusBuilder::new(Config::default(), Arc::new(JsonEventSerializer::<MailboxEvent>::new()))
//!     .build();
//! bus.start().await?;
//!
//! let bob = RegistrationKey::username("bob")?;
//! let registration = bus
//!     .register(
//!         ListenerFn::arc("indexer", |_event: MailboxEvent| async { Ok::<_, ListenerError>(()) }),
//!         bob.clone(),
//!     )
//!     .await?;
//!
//! let event = MailboxEvent::Added { id: EventId::random(), owner: "bob".into() };
//! bus.dispatch(&event, [bob]).await?;
//!
//! registration.unregister().await?;
//! bus.stop().await;
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::Instrument;

use crate::core::Config;
use crate::core::context::BusContext;
use crate::core::dispatcher::EventDispatcher;
use crate::core::handler::KeyRegistrationHandler;
use crate::core::registration::Registration;
use crate::core::state::{BusStatus, Lifecycle};
use crate::error::BusError;
use crate::events::{Event, EventSerializer, EventWithKeys};
use crate::keys::RegistrationKey;
use crate::listeners::{ListenerExecutor, ListenerRef, LocalListenerRegistry};
use crate::routing::{EventBusId, NamingStrategy, RoutingKeyResolver};
use crate::transport::{PubSub, RegistrationDirectory};

/// Name of a durable consumer group.
///
/// Only accepted so that group based calls can be rejected explicitly.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Group(String);

impl Group {
    /// Creates a group name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the group name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

struct RunningBus<E: Event> {
    dispatcher: EventDispatcher<E>,
    handler: Arc<KeyRegistrationHandler<E>>,
}

/// Keyed event bus instance.
///
/// Built with [`EventBusBuilder`](crate::EventBusBuilder).
pub struct EventBus<E: Event> {
    config: Arc<Config>,
    id: EventBusId,
    naming: NamingStrategy,
    resolver: RoutingKeyResolver,
    serializer: Arc<dyn EventSerializer<E>>,
    pubsub: Arc<dyn PubSub>,
    directory: Arc<dyn RegistrationDirectory>,
    executor: ListenerExecutor,
    lifecycle: Lifecycle<RunningBus<E>>,
}

impl<E: Event> EventBus<E> {
    pub(crate) fn new_internal(
        config: Config,
        id: EventBusId,
        resolver: RoutingKeyResolver,
        serializer: Arc<dyn EventSerializer<E>>,
        pubsub: Arc<dyn PubSub>,
        directory: Arc<dyn RegistrationDirectory>,
    ) -> Self {
        Self {
            naming: NamingStrategy::new(config.name.clone()),
            config: Arc::new(config),
            id,
            resolver,
            serializer,
            pubsub,
            directory,
            executor: ListenerExecutor::new(),
            lifecycle: Lifecycle::new(),
        }
    }

    /// This instance's identity.
    pub fn id(&self) -> EventBusId {
        self.id
    }

    /// The bus name from [`Config::name`].
    pub fn name(&self) -> &str {
        self.naming.name()
    }

    /// The channel this instance receives remote events on.
    pub fn channel(&self) -> String {
        self.naming.channel(&self.id)
    }

    /// Current lifecycle state.
    pub fn status(&self) -> BusStatus {
        self.lifecycle.status()
    }

    /// `true` while the bus accepts `register` and `dispatch`.
    pub fn is_running(&self) -> bool {
        self.status() == BusStatus::Running
    }

    /// The active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Starts the bus. No-op unless the bus is stopped.
    pub async fn start(&self) -> Result<(), BusError> {
        if !self.lifecycle.try_begin_start() {
            tracing::debug!(bus = %self.name(), status = %self.status(), "start ignored");
            return Ok(());
        }

        let ctx = BusContext {
            config: Arc::clone(&self.config),
            bus_id: self.id,
            naming: self.naming.clone(),
            channel: self.channel(),
            resolver: self.resolver.clone(),
            serializer: Arc::clone(&self.serializer),
            pubsub: Arc::clone(&self.pubsub),
            directory: Arc::clone(&self.directory),
            registry: Arc::new(LocalListenerRegistry::new()),
            executor: self.executor,
        };

        let handler = Arc::new(KeyRegistrationHandler::new(ctx.clone()));
        if let Err(err) = handler.start().await {
            self.lifecycle.abort_start();
            tracing::error!(bus = %self.name(), bus_id = %self.id, error = %err, "event bus failed to start");
            return Err(err);
        }

        self.lifecycle.finish_start(Arc::new(RunningBus {
            dispatcher: EventDispatcher::new(ctx),
            handler,
        }));
        tracing::info!(bus = %self.name(), bus_id = %self.id, "event bus started");
        Ok(())
    }

    /// Stops the bus. No-op unless the bus is running.
    pub async fn stop(&self) {
        let Some(running) = self.lifecycle.try_begin_stop() else {
            tracing::debug!(bus = %self.name(), status = %self.status(), "stop ignored");
            return;
        };

        running.handler.stop().await;
        self.lifecycle.finish_stop();
        tracing::info!(bus = %self.name(), bus_id = %self.id, "event bus stopped");
    }

    /// Registers `listener` for events dispatched to `key`.
    pub async fn register(
        &self,
        listener: ListenerRef<E>,
        key: RegistrationKey,
    ) -> Result<Registration<E>, BusError> {
        let running = self.running()?;
        let span = tracing::info_span!("register", bus = %self.name(), registration_key = %key);
        running.handler.register(listener, key).instrument(span).await
    }

    /// Registers `listener` for an encoded key such as `"username:bob"`.
    pub async fn register_encoded(
        &self,
        listener: ListenerRef<E>,
        key: &str,
    ) -> Result<Registration<E>, BusError> {
        let key = self.resolver.factory().parse(key)?;
        self.register(listener, key).await
    }

    /// Durable consumer groups are not supported; always fails.
    pub fn register_group(
        &self,
        _listener: ListenerRef<E>,
        _group: &Group,
    ) -> Result<Registration<E>, BusError> {
        Err(BusError::Unsupported {
            operation: "register_group",
        })
    }

    /// Redelivery to a consumer group is not supported; always fails.
    pub async fn redeliver(&self, _group: &Group, _event: &E) -> Result<(), BusError> {
        Err(BusError::Unsupported {
            operation: "redeliver",
        })
    }

    /// Dispatches `event` to the listeners of `keys`, locally and remotely.
    pub async fn dispatch<K>(&self, event: &E, keys: K) -> Result<(), BusError>
    where
        K: IntoIterator<Item = RegistrationKey>,
    {
        let running = self.running()?;
        let keys: HashSet<RegistrationKey> = keys.into_iter().collect();
        let span = tracing::info_span!(
            "dispatch",
            bus = %self.name(),
            event_id = %event.event_id(),
            event_kind = event.kind(),
            keys = keys.len()
        );
        running.dispatcher.dispatch(event, &keys).instrument(span).await
    }

    /// Dispatches a batch; see [`EventBus::dispatch`].
    pub async fn dispatch_batch(&self, events: &[EventWithKeys<E>]) -> Result<(), BusError> {
        let running = self.running()?;
        let span = tracing::info_span!("dispatch", bus = %self.name(), events = events.len());
        running.dispatcher.dispatch_batch(events).instrument(span).await
    }

    fn running(&self) -> Result<Arc<RunningBus<E>>, BusError> {
        self.lifecycle.running().ok_or(BusError::NotRunning)
    }

    #[cfg(test)]
    pub(crate) fn running_handler(&self) -> Option<Arc<KeyRegistrationHandler<E>>> {
        self.lifecycle
            .running()
            .map(|running| Arc::clone(&running.handler))
    }
}

impl<E: Event> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("name", &self.name())
            .field("id", &self.id)
            .field("status", &self.status())
            .finish()
    }
}
