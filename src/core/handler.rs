//! # Registration handler.
//!
//! Owns the inbound side of one bus instance and keeps the registration
//! directory in line with the local listener registry.
//!
//! ## Architecture
//! ```text
//! register(listener, key)
//!   └─► registry.register ──first for key?──► directory.add(set(key), own channel)
//!                                              (retried with backoff; rolled back on failure)
//!
//! Registration::unregister()
//!   └─► registry.unregister ──last for key?──► directory.remove(set(key), own channel)
//!
//! consumer task (spawned by start)
//!   own channel ─► KeyChannelMessage::decode
//!               ─► RoutingKeyResolver::registration_key
//!               ─► EventSerializer::from_json_batch
//!               ─► sender == self ? asynchronous listeners : all listeners
//!               ─► ListenerExecutor::execute_all (per event)
//! ```
//!
//! ## Rules
//! - Registry changes and directory calls for one key run under that key's
//!   bookkeeping lock, so a withdraw never overtakes a later advertise.
//! - Once stopped, the handler no longer touches the directory; handles from
//!   an earlier session cannot withdraw what a later session advertised.
//! - Messages are handled one at a time, in arrival order.
//! - A message that cannot be decoded or resolved is logged and dropped.
//! - `stop()` lets the message in progress finish, then withdraws every
//!   advertisement this instance made.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::Mutex as KeyLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::context::BusContext;
use crate::core::registration::Registration;
use crate::error::{BusError, TransportError};
use crate::events::{Event, KeyChannelMessage};
use crate::keys::RegistrationKey;
use crate::listeners::{ExecutionMode, ListenerRef, LocalRegistration, RemovalStatus};
use crate::routing::RoutingKey;
use crate::transport::MessageStream;

pub(crate) struct KeyRegistrationHandler<E: Event> {
    ctx: BusContext<E>,
    token: CancellationToken,
    consumer: Mutex<Option<JoinHandle<()>>>,
    bookkeeping: DashMap<RegistrationKey, Arc<KeyLock<()>>>,
}

impl<E: Event> KeyRegistrationHandler<E> {
    pub(crate) fn new(ctx: BusContext<E>) -> Self {
        Self {
            ctx,
            token: CancellationToken::new(),
            consumer: Mutex::new(None),
            bookkeeping: DashMap::new(),
        }
    }

    /// Subscribes to the inbound channel and spawns the consumer.
    pub(crate) async fn start(self: &Arc<Self>) -> Result<(), BusError> {
        let messages = self
            .ctx
            .pubsub
            .subscribe(&self.ctx.channel)
            .await
            .map_err(|source| BusError::Subscription {
                channel: self.ctx.channel.clone(),
                source,
            })?;

        let handler = Arc::clone(self);
        let handle = tokio::spawn(async move { handler.consume(messages).await });
        *self.consumer.lock() = Some(handle);

        tracing::debug!(channel = %self.ctx.channel, "inbound channel subscribed");
        Ok(())
    }

    /// Cancels the consumer, unsubscribes and withdraws all advertisements.
    pub(crate) async fn stop(&self) {
        self.token.cancel();
        let consumer = self.consumer.lock().take();
        if let Some(handle) = consumer {
            if let Err(err) = handle.await {
                tracing::warn!(channel = %self.ctx.channel, error = %err, "inbound consumer ended abnormally");
            }
        }

        if let Err(err) = self.ctx.pubsub.unsubscribe(&self.ctx.channel).await {
            tracing::warn!(channel = %self.ctx.channel, error = %err, "failed to unsubscribe inbound channel");
        }

        for key in self.ctx.registry.clear() {
            let routing_key = RoutingKey::of(&key);
            if let Err(err) = self.serialized(&key, self.withdraw(&routing_key)).await {
                tracing::warn!(
                    routing_key = %routing_key,
                    channel = %self.ctx.channel,
                    error = %err,
                    "failed to withdraw registration on stop"
                );
            }
        }
    }

    pub(crate) async fn register(
        self: &Arc<Self>,
        listener: ListenerRef<E>,
        key: RegistrationKey,
    ) -> Result<Registration<E>, BusError> {
        let name = listener.name().to_string();
        let lock_key = key.clone();

        let local = self
            .serialized(&lock_key, async {
                if self.token.is_cancelled() {
                    return Err(BusError::NotRunning);
                }
                let local = self.ctx.registry.register(key, listener);
                if !local.is_first() {
                    return Ok(local);
                }

                let routing_key = RoutingKey::of(local.key());
                match self.advertise(&routing_key).await {
                    Ok(()) => Ok(local),
                    Err(source) => {
                        self.ctx.registry.unregister(&local);
                        tracing::error!(
                            routing_key = %routing_key,
                            listener = %name,
                            error = %source,
                            "failed to advertise registration, listener rolled back"
                        );
                        Err(BusError::Transport {
                            routing_key: routing_key.to_string(),
                            source,
                        })
                    }
                }
            })
            .await?;

        tracing::debug!(registration_key = %local.key(), listener = %name, id = %local.id(), "listener registered");
        Ok(Registration::new(Arc::clone(self), local))
    }

    pub(crate) async fn unregister(&self, local: &LocalRegistration) -> Result<(), BusError> {
        self.serialized(local.key(), async {
            let status = self.ctx.registry.unregister(local);
            if status != RemovalStatus::LastListenerRemoved {
                return Ok(());
            }
            if self.token.is_cancelled() {
                tracing::debug!(registration_key = %local.key(), "handler stopped, directory left untouched");
                return Ok(());
            }

            let routing_key = RoutingKey::of(local.key());
            self.withdraw(&routing_key).await.map_err(|source| {
                tracing::error!(routing_key = %routing_key, error = %source, "failed to withdraw registration");
                BusError::Transport {
                    routing_key: routing_key.to_string(),
                    source,
                }
            })
        })
        .await
    }

    /// Runs `operation` under the bookkeeping lock of `key`.
    async fn serialized<T, F>(&self, key: &RegistrationKey, operation: F) -> T
    where
        F: Future<Output = T>,
    {
        let lock = self.bookkeeping.entry(key.clone()).or_default().value().clone();
        let outcome = {
            let _guard = lock.lock().await;
            operation.await
        };
        drop(lock);
        self.bookkeeping
            .remove_if(key, |_, idle| Arc::strong_count(idle) == 1);
        outcome
    }

    async fn advertise(&self, routing_key: &RoutingKey) -> Result<(), TransportError> {
        let set = self.ctx.naming.registration_set(routing_key);
        self.retrying("add", &set, || self.ctx.directory.add(&set, &self.ctx.channel))
            .await
    }

    async fn withdraw(&self, routing_key: &RoutingKey) -> Result<(), TransportError> {
        let set = self.ctx.naming.registration_set(routing_key);
        self.retrying("remove", &set, || {
            self.ctx.directory.remove(&set, &self.ctx.channel)
        })
        .await
    }

    /// Retries transient directory failures following `Config::retry`.
    async fn retrying<F, Fut>(
        &self,
        operation: &'static str,
        set: &str,
        mut call: F,
    ) -> Result<(), TransportError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), TransportError>>,
    {
        let mut attempt = 0u32;
        loop {
            match self.ctx.bounded(call()).await {
                Ok(()) => return Ok(()),
                Err(err) if err.is_transient() && attempt < self.ctx.config.max_retries => {
                    let delay = self.ctx.config.retry.next(attempt);
                    tracing::warn!(
                        operation,
                        set,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "registration directory call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn consume(&self, mut messages: MessageStream) {
        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                next = messages.next() => match next {
                    Some(raw) => self.on_message(&raw).await,
                    None => break,
                },
            }
        }
        tracing::debug!(channel = %self.ctx.channel, "inbound consumer stopped");
    }

    async fn on_message(&self, raw: &str) {
        let message = match KeyChannelMessage::decode(raw) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(channel = %self.ctx.channel, error = %err, "dropping undecodable message");
                return;
            }
        };

        let key = match self.ctx.resolver.registration_key(&message.routing_key) {
            Ok(key) => key,
            Err(err) => {
                tracing::warn!(routing_key = %message.routing_key, error = %err, "dropping message for unresolvable routing key");
                return;
            }
        };

        let events = match self.ctx.serializer.from_json_batch(&message.payload) {
            Ok(events) => events,
            Err(err) => {
                tracing::error!(
                    routing_key = %message.routing_key,
                    bus_id = %message.sender_bus_id,
                    error = %err,
                    "dropping message with undecodable events"
                );
                return;
            }
        };

        let from_self = message.sender_bus_id == self.ctx.bus_id;
        let targets: Vec<_> = self
            .ctx
            .registry
            .listeners_for(&key)
            .into_iter()
            .filter(|listener| !from_self || listener.execution_mode() == ExecutionMode::Asynchronous)
            .map(|listener| (key.clone(), listener))
            .collect();

        if targets.is_empty() {
            tracing::trace!(registration_key = %key, from_self, "no local listener for inbound message");
            return;
        }

        for event in events.iter().filter(|event| !event.is_noop()) {
            self.ctx
                .executor
                .execute_all(&targets, event, self.ctx.config.concurrency_limit())
                .await;
        }
    }
}
