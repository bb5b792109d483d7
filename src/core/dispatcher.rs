//! # Event dispatcher.
//!
//! Delivers one event (or a batch) to the listeners of a set of registration
//! keys: local synchronous listeners inline, every other bus instance through
//! the transport.
//!
//! ## Architecture
//! ```text
//! dispatch(event, keys)
//!   │
//!   ├─ event.is_noop() ─────────────► Ok(()) (no listener, no transport call)
//!   │
//!   ├─ local phase
//!   │    keys ─► registry.listeners_for(key) ─► Synchronous only
//!   │         └─► ListenerExecutor::execute_all(.., Config::concurrency_limit())
//!   │             (failures logged, never returned)
//!   │
//!   └─ remote phase (serialize once)
//!        for each routing key, concurrently:
//!          members(registration_set)   bounded by publish_timeout
//!            └─ {}            ─► nothing published
//!            └─ {ch1, ch2..}  ─► publish(ch, KeyChannelMessage)   each bounded
//!        transport error ─► tolerated?  warn + Ok
//!                        └─ otherwise   BusError::Transport
//! ```
//!
//! ## Rules
//! - The local phase completes before the remote phase starts.
//! - This bus's own channel is only published to when a local asynchronous
//!   listener exists for the key; synchronous ones already ran inline.
//! - Only `Timeout`/`Unavailable` are tolerated, and only with `failure_ignore`.
//! - Serialization errors always fail the dispatch.

use futures::future::join_all;
use std::collections::{BTreeMap, HashSet};

use crate::core::context::BusContext;
use crate::error::{BusError, TransportError};
use crate::events::{Event, EventWithKeys, KeyChannelMessage};
use crate::keys::RegistrationKey;
use crate::listeners::{ExecutionMode, ListenerRef};
use crate::routing::RoutingKey;

/// Local-then-remote delivery of events.
pub(crate) struct EventDispatcher<E: Event> {
    ctx: BusContext<E>,
}

impl<E: Event> EventDispatcher<E> {
    pub(crate) fn new(ctx: BusContext<E>) -> Self {
        Self { ctx }
    }

    /// Dispatches one event to `keys`.
    pub(crate) async fn dispatch(
        &self,
        event: &E,
        keys: &HashSet<RegistrationKey>,
    ) -> Result<(), BusError> {
        if event.is_noop() {
            tracing::trace!(event_id = %event.event_id(), "noop event skipped");
            return Ok(());
        }

        self.dispatch_to_local_listeners(event, keys).await;

        let payload = self.ctx.serializer.to_json(event)?;
        let targets: Vec<&RegistrationKey> = keys.iter().collect();
        self.dispatch_to_remote_listeners(&payload, &targets)
            .await
            .inspect_err(|err| {
                tracing::error!(
                    event_id = %event.event_id(),
                    event_kind = event.kind(),
                    owner = event.owner(),
                    error = %err,
                    "failed to dispatch event to remote listeners"
                );
            })
    }

    /// Dispatches several events.
    ///
    /// Each event gets its own local phase. Remotely, routing keys that carry
    /// exactly the same events share one serialized payload.
    pub(crate) async fn dispatch_batch(&self, batch: &[EventWithKeys<E>]) -> Result<(), BusError> {
        let live: Vec<&EventWithKeys<E>> = batch.iter().filter(|item| !item.event.is_noop()).collect();
        if live.is_empty() {
            return Ok(());
        }

        for item in &live {
            self.dispatch_to_local_listeners(&item.event, &item.keys).await;
        }

        let mut events_by_key: BTreeMap<&RegistrationKey, Vec<usize>> = BTreeMap::new();
        for (index, item) in live.iter().enumerate() {
            for key in &item.keys {
                events_by_key.entry(key).or_default().push(index);
            }
        }

        let mut keys_by_events: BTreeMap<Vec<usize>, Vec<&RegistrationKey>> = BTreeMap::new();
        for (key, indexes) in events_by_key {
            keys_by_events.entry(indexes).or_default().push(key);
        }

        let mut groups = Vec::with_capacity(keys_by_events.len());
        for (indexes, keys) in keys_by_events {
            let events: Vec<&E> = indexes.iter().map(|&index| &live[index].event).collect();
            groups.push((self.ctx.serializer.to_json_batch(&events)?, keys));
        }

        let outcomes = join_all(
            groups
                .iter()
                .map(|(payload, keys)| self.dispatch_to_remote_listeners(payload, keys)),
        )
        .await;

        outcomes.into_iter().collect::<Result<(), _>>().inspect_err(|err| {
            tracing::error!(events = live.len(), error = %err, "failed to dispatch batch to remote listeners");
        })
    }

    async fn dispatch_to_local_listeners(&self, event: &E, keys: &HashSet<RegistrationKey>) {
        let targets: Vec<(RegistrationKey, ListenerRef<E>)> = keys
            .iter()
            .flat_map(|key| {
                self.ctx
                    .registry
                    .listeners_for(key)
                    .into_iter()
                    .filter(|listener| listener.execution_mode() == ExecutionMode::Synchronous)
                    .map(move |listener| (key.clone(), listener))
            })
            .collect();

        if targets.is_empty() {
            return;
        }

        let failures = self
            .ctx
            .executor
            .execute_all(&targets, event, self.ctx.config.concurrency_limit())
            .await;

        tracing::debug!(
            event_id = %event.event_id(),
            listeners = targets.len(),
            failed = failures.len(),
            "local listeners executed"
        );
    }

    async fn dispatch_to_remote_listeners(
        &self,
        payload: &str,
        keys: &[&RegistrationKey],
    ) -> Result<(), BusError> {
        let outcomes = join_all(keys.iter().map(|key| self.dispatch_to_key(payload, key))).await;
        outcomes.into_iter().collect()
    }

    async fn dispatch_to_key(&self, payload: &str, key: &RegistrationKey) -> Result<(), BusError> {
        let routing_key = RoutingKey::of(key);
        let set = self.ctx.naming.registration_set(&routing_key);

        let mut channels = match self.ctx.bounded(self.ctx.directory.members(&set)).await {
            Ok(channels) => channels,
            Err(err) => return self.tolerate(err, &routing_key, None),
        };

        if channels.contains(&self.ctx.channel) && !self.has_async_listener(key) {
            channels.remove(&self.ctx.channel);
        }

        if channels.is_empty() {
            tracing::trace!(routing_key = %routing_key, "no channel registered for routing key");
            return Ok(());
        }

        let message = KeyChannelMessage::new(self.ctx.bus_id, routing_key.clone(), payload).encode()?;

        let outcomes = join_all(channels.iter().map(|channel| {
            let message = message.as_str();
            let routing_key = &routing_key;
            async move {
                match self.ctx.bounded(self.ctx.pubsub.publish(channel, message)).await {
                    Ok(()) => Ok(()),
                    Err(err) => self.tolerate(err, routing_key, Some(channel.as_str())),
                }
            }
        }))
        .await;

        outcomes.into_iter().collect()
    }

    fn has_async_listener(&self, key: &RegistrationKey) -> bool {
        self.ctx
            .registry
            .listeners_for(key)
            .iter()
            .any(|listener| listener.execution_mode() == ExecutionMode::Asynchronous)
    }

    fn tolerate(
        &self,
        err: TransportError,
        routing_key: &RoutingKey,
        channel: Option<&str>,
    ) -> Result<(), BusError> {
        if self.ctx.config.failure_ignore && err.is_transient() {
            tracing::warn!(
                routing_key = %routing_key,
                channel = channel.unwrap_or("-"),
                error = %err,
                "transport failure ignored while dispatching to remote listeners"
            );
            return Ok(());
        }
        Err(BusError::Transport {
            routing_key: routing_key.to_string(),
            source: err,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use crate::listeners::{ListenerExecutor, LocalListenerRegistry};
    use crate::routing::{EventBusId, NamingStrategy, RoutingKeyResolver};
    use crate::testing::{
        FailingListener, FaultyDirectory, RecordingListener, RecordingPubSub, TestEvent,
    };
    use crate::transport::RegistrationDirectory;
    use crate::{EventSerializer, JsonEventSerializer, TransportError};
    use std::sync::Arc;
    use std::time::Duration;

    struct Fixture {
        dispatcher: EventDispatcher<TestEvent>,
        registry: Arc<LocalListenerRegistry<TestEvent>>,
        pubsub: Arc<RecordingPubSub>,
        directory: Arc<FaultyDirectory>,
        naming: NamingStrategy,
    }

    fn fixture(config: Config) -> Fixture {
        let naming = NamingStrategy::new(config.name.clone());
        let bus_id = EventBusId::random();
        let registry = Arc::new(LocalListenerRegistry::<TestEvent>::new());
        let pubsub = Arc::new(RecordingPubSub::new());
        let directory = Arc::new(FaultyDirectory::new());

        let ctx = BusContext {
            config: Arc::new(config),
            bus_id,
            channel: naming.channel(&bus_id),
            naming: naming.clone(),
            resolver: RoutingKeyResolver::default(),
            serializer: Arc::new(JsonEventSerializer::<TestEvent>::new()),
            pubsub: pubsub.clone(),
            directory: directory.clone(),
            registry: registry.clone(),
            executor: ListenerExecutor::new(),
        };

        Fixture {
            dispatcher: EventDispatcher::new(ctx),
            registry,
            pubsub,
            directory,
            naming,
        }
    }

    fn key(name: &str) -> RegistrationKey {
        RegistrationKey::username(name).expect("valid key")
    }

    fn keys(names: &[&str]) -> HashSet<RegistrationKey> {
        names.iter().map(|name| key(name)).collect()
    }

    impl Fixture {
        async fn advertise(&self, name: &str, channel: &str) {
            let set = self.naming.registration_set(&RoutingKey::of(&key(name)));
            self.directory.add(&set, channel).await.expect("add");
        }
    }

    #[tokio::test]
    async fn test_noop_event_touches_nothing() {
        let fx = fixture(Config::default());
        let listener = RecordingListener::arc("l");
        fx.registry.register(key("bob"), listener.clone());
        fx.advertise("bob", "remote-a").await;

        fx.dispatcher
            .dispatch(&TestEvent::noop("bob"), &keys(&["bob"]))
            .await
            .expect("noop dispatch");

        assert_eq!(listener.count(), 0);
        assert_eq!(fx.directory.lookups(), 0);
        assert!(fx.pubsub.published().is_empty());
    }

    #[tokio::test]
    async fn test_failing_listener_does_not_stop_sibling() {
        let fx = fixture(Config::default());
        let healthy = RecordingListener::arc("healthy");
        fx.registry.register(key("bob"), FailingListener::arc("broken"));
        fx.registry.register(key("bob"), healthy.clone());

        fx.dispatcher
            .dispatch(&TestEvent::change("bob"), &keys(&["bob"]))
            .await
            .expect("dispatch succeeds");

        assert_eq!(healthy.count(), 1);
    }

    #[tokio::test]
    async fn test_asynchronous_listener_skipped_in_local_phase() {
        let fx = fixture(Config::default());
        let sync = RecordingListener::arc("sync");
        let deferred = RecordingListener::asynchronous("async");
        fx.registry.register(key("bob"), sync.clone());
        fx.registry.register(key("bob"), deferred.clone());

        fx.dispatcher
            .dispatch(&TestEvent::change("bob"), &keys(&["bob"]))
            .await
            .expect("dispatch");

        assert_eq!(sync.count(), 1);
        assert_eq!(deferred.count(), 0);
    }

    #[tokio::test]
    async fn test_fan_out_targets_only_advertised_channels() {
        let fx = fixture(Config::default());
        fx.advertise("bob", "remote-a").await;
        fx.advertise("bob", "remote-b").await;

        fx.dispatcher
            .dispatch(&TestEvent::change("bob"), &keys(&["bob", "nobody"]))
            .await
            .expect("dispatch");

        let mut channels: Vec<String> = fx
            .pubsub
            .published()
            .into_iter()
            .map(|(channel, _)| channel)
            .collect();
        channels.sort();
        assert_eq!(channels, vec!["remote-a".to_string(), "remote-b".to_string()]);
        assert_eq!(fx.directory.lookups(), 2);
    }

    #[tokio::test]
    async fn test_published_envelope_carries_routing_key_and_sender() {
        let fx = fixture(Config::default());
        fx.advertise("bob", "remote-a").await;
        let event = TestEvent::change("bob");

        fx.dispatcher
            .dispatch(&event, &keys(&["bob"]))
            .await
            .expect("dispatch");

        let (_, raw) = fx.pubsub.published().pop().expect("one publish");
        let message = KeyChannelMessage::decode(&raw).expect("envelope");
        assert_eq!(message.routing_key.as_str(), "username:bob");
        assert_eq!(message.sender_bus_id, fx.dispatcher.ctx.bus_id);

        let decoded = fx
            .dispatcher
            .ctx
            .serializer
            .from_json_batch(&message.payload)
            .expect("payload");
        assert_eq!(decoded, vec![event]);
    }

    #[tokio::test]
    async fn test_own_channel_skipped_without_async_listener() {
        let fx = fixture(Config::default());
        let own = fx.dispatcher.ctx.channel.clone();
        fx.registry.register(key("bob"), RecordingListener::arc("sync"));
        fx.advertise("bob", &own).await;

        fx.dispatcher
            .dispatch(&TestEvent::change("bob"), &keys(&["bob"]))
            .await
            .expect("dispatch");
        assert!(fx.pubsub.published().is_empty());

        fx.registry
            .register(key("bob"), RecordingListener::asynchronous("async"));
        fx.dispatcher
            .dispatch(&TestEvent::change("bob"), &keys(&["bob"]))
            .await
            .expect("dispatch");
        assert_eq!(fx.pubsub.published().len(), 1);
    }

    #[tokio::test]
    async fn test_publish_timeout_tolerated() {
        let fx = fixture(Config {
            failure_ignore: true,
            publish_timeout: Duration::from_millis(50),
            ..Config::default()
        });
        fx.advertise("bob", "remote-a").await;
        fx.advertise("bob", "stuck").await;
        fx.pubsub.hang("stuck");

        fx.dispatcher
            .dispatch(&TestEvent::change("bob"), &keys(&["bob"]))
            .await
            .expect("timeout tolerated");

        let channels: Vec<String> = fx.pubsub.published().into_iter().map(|(c, _)| c).collect();
        assert_eq!(channels, vec!["remote-a".to_string()]);
    }

    #[tokio::test]
    async fn test_publish_timeout_propagated() {
        let fx = fixture(Config {
            failure_ignore: false,
            publish_timeout: Duration::from_millis(50),
            ..Config::default()
        });
        fx.advertise("bob", "stuck").await;
        fx.pubsub.hang("stuck");

        let err = fx
            .dispatcher
            .dispatch(&TestEvent::change("bob"), &keys(&["bob"]))
            .await
            .expect_err("timeout propagated");

        match err {
            BusError::Transport {
                routing_key,
                source: TransportError::Timeout { timeout },
            } => {
                assert_eq!(routing_key, "username:bob");
                assert_eq!(timeout, Duration::from_millis(50));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_transient_error_never_tolerated() {
        let fx = fixture(Config {
            failure_ignore: true,
            ..Config::default()
        });
        fx.advertise("bob", "remote-a").await;
        fx.pubsub.fail("remote-a", TransportError::Closed);

        let err = fx
            .dispatcher
            .dispatch(&TestEvent::change("bob"), &keys(&["bob"]))
            .await
            .expect_err("closed transport");
        assert_eq!(err.as_label(), "transport_closed");
    }

    #[tokio::test]
    async fn test_directory_lookup_failure_follows_policy() {
        let tolerant = fixture(Config {
            failure_ignore: true,
            ..Config::default()
        });
        tolerant.directory.fail_lookups(TransportError::Unavailable {
            reason: "maintenance".into(),
        });
        tolerant
            .dispatcher
            .dispatch(&TestEvent::change("bob"), &keys(&["bob"]))
            .await
            .expect("lookup failure tolerated");

        let strict = fixture(Config::default());
        strict.directory.fail_lookups(TransportError::Unavailable {
            reason: "maintenance".into(),
        });
        assert!(
            strict
                .dispatcher
                .dispatch(&TestEvent::change("bob"), &keys(&["bob"]))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_batch_groups_keys_by_event_subset() {
        let fx = fixture(Config::default());
        fx.advertise("bob", "channel-bob").await;
        fx.advertise("alice", "channel-alice").await;
        fx.advertise("carol", "channel-carol").await;

        let shared = TestEvent::change("bob");
        let bob_only = TestEvent::change("bob");
        let batch = vec![
            EventWithKeys::new(shared.clone(), [key("bob"), key("alice")]),
            EventWithKeys::new(bob_only.clone(), [key("bob")]),
            EventWithKeys::new(TestEvent::noop("carol"), [key("carol")]),
        ];

        fx.dispatcher.dispatch_batch(&batch).await.expect("batch");

        let serializer = JsonEventSerializer::<TestEvent>::new();
        let mut received: BTreeMap<String, Vec<TestEvent>> = BTreeMap::new();
        for (channel, raw) in fx.pubsub.published() {
            let message = KeyChannelMessage::decode(&raw).expect("envelope");
            let events = serializer.from_json_batch(&message.payload).expect("payload");
            received.insert(channel, events);
        }

        assert_eq!(received.len(), 2, "noop-only key is never published");
        assert_eq!(received["channel-bob"], vec![shared.clone(), bob_only]);
        assert_eq!(received["channel-alice"], vec![shared]);
    }

    #[tokio::test]
    async fn test_batch_runs_local_phase_per_event() {
        let fx = fixture(Config::default());
        let bob = RecordingListener::arc("bob");
        let alice = RecordingListener::arc("alice");
        fx.registry.register(key("bob"), bob.clone());
        fx.registry.register(key("alice"), alice.clone());

        let batch = vec![
            EventWithKeys::new(TestEvent::change("bob"), [key("bob")]),
            EventWithKeys::new(TestEvent::change("x"), [key("bob"), key("alice")]),
            EventWithKeys::new(TestEvent::noop("bob"), [key("bob")]),
        ];
        fx.dispatcher.dispatch_batch(&batch).await.expect("batch");

        assert_eq!(bob.count(), 2);
        assert_eq!(alice.count(), 1);
    }
}
