//! Test fixtures: a small event family, recording/failing listeners and
//! fault-injecting transport doubles.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{ListenerError, TransportError};
use crate::events::{Event, EventId, JsonEvent};
use crate::listeners::{ExecutionMode, Listener};
use crate::transport::{
    InMemoryDirectory, InMemoryPubSub, MessageStream, PubSub, RegistrationDirectory,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum TestEvent {
    CalendarChange {
        id: EventId,
        owner: String,
        calendar: String,
    },
    Noop {
        id: EventId,
        owner: String,
    },
}

impl TestEvent {
    pub(crate) fn change(owner: &str) -> Self {
        TestEvent::CalendarChange {
            id: EventId::random(),
            owner: owner.to_string(),
            calendar: "personal".to_string(),
        }
    }

    pub(crate) fn noop(owner: &str) -> Self {
        TestEvent::Noop {
            id: EventId::random(),
            owner: owner.to_string(),
        }
    }
}

impl Event for TestEvent {
    fn event_id(&self) -> EventId {
        match self {
            TestEvent::CalendarChange { id, .. } | TestEvent::Noop { id, .. } => *id,
        }
    }

    fn owner(&self) -> &str {
        match self {
            TestEvent::CalendarChange { owner, .. } | TestEvent::Noop { owner, .. } => owner,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            TestEvent::CalendarChange { .. } => "calendar_change",
            TestEvent::Noop { .. } => "noop",
        }
    }

    fn is_noop(&self) -> bool {
        matches!(self, TestEvent::Noop { .. })
    }
}

impl JsonEvent for TestEvent {
    const KINDS: &'static [&'static str] = &["calendar_change", "noop"];
}

/// Records the ids of the events it receives.
pub(crate) struct RecordingListener {
    name: String,
    mode: ExecutionMode,
    received: Mutex<Vec<EventId>>,
}

impl RecordingListener {
    pub(crate) fn arc(name: &str) -> Arc<Self> {
        Self::with_mode(name, ExecutionMode::Synchronous)
    }

    pub(crate) fn asynchronous(name: &str) -> Arc<Self> {
        Self::with_mode(name, ExecutionMode::Asynchronous)
    }

    fn with_mode(name: &str, mode: ExecutionMode) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            mode,
            received: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn count(&self) -> usize {
        self.received.lock().len()
    }

    pub(crate) fn received(&self) -> Vec<EventId> {
        self.received.lock().clone()
    }
}

#[async_trait]
impl Listener<TestEvent> for RecordingListener {
    async fn on_event(&self, event: &TestEvent) -> Result<(), ListenerError> {
        self.received.lock().push(event.event_id());
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn execution_mode(&self) -> ExecutionMode {
        self.mode
    }
}

/// Always returns an error.
pub(crate) struct FailingListener {
    name: String,
}

impl FailingListener {
    pub(crate) fn arc(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
        })
    }
}

#[async_trait]
impl Listener<TestEvent> for FailingListener {
    async fn on_event(&self, _event: &TestEvent) -> Result<(), ListenerError> {
        Err(ListenerError::failed(format!("{} refused the event", self.name)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Always panics.
pub(crate) struct PanickingListener {
    name: String,
}

impl PanickingListener {
    pub(crate) fn arc(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
        })
    }
}

#[async_trait]
impl Listener<TestEvent> for PanickingListener {
    async fn on_event(&self, _event: &TestEvent) -> Result<(), ListenerError> {
        panic!("{} exploded", self.name);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// [`InMemoryPubSub`] that records successful publishes and can hang or fail
/// chosen channels.
#[derive(Default)]
pub(crate) struct RecordingPubSub {
    inner: InMemoryPubSub,
    published: Mutex<Vec<(String, String)>>,
    hung: Mutex<HashSet<String>>,
    failing: Mutex<HashMap<String, TransportError>>,
    subscribe_error: Mutex<Option<TransportError>>,
}

impl RecordingPubSub {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Publishes to `channel` never complete.
    pub(crate) fn hang(&self, channel: &str) {
        self.hung.lock().insert(channel.to_string());
    }

    /// Publishes to `channel` fail with `err`.
    pub(crate) fn fail(&self, channel: &str, err: TransportError) {
        self.failing.lock().insert(channel.to_string(), err);
    }

    /// Subscriptions fail with `err`.
    pub(crate) fn fail_subscriptions(&self, err: TransportError) {
        *self.subscribe_error.lock() = Some(err);
    }

    /// Successful publishes as `(channel, payload)`, in order.
    pub(crate) fn published(&self) -> Vec<(String, String)> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl PubSub for RecordingPubSub {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), TransportError> {
        let failure = self.failing.lock().get(channel).cloned();
        if let Some(err) = failure {
            return Err(err);
        }
        let hung = self.hung.lock().contains(channel);
        if hung {
            futures::future::pending::<()>().await;
        }
        self.published
            .lock()
            .push((channel.to_string(), payload.to_string()));
        self.inner.publish(channel, payload).await
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream, TransportError> {
        let failure = self.subscribe_error.lock().clone();
        if let Some(err) = failure {
            return Err(err);
        }
        self.inner.subscribe(channel).await
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), TransportError> {
        self.inner.unsubscribe(channel).await
    }
}

/// [`InMemoryDirectory`] that counts calls and injects failures.
#[derive(Default)]
pub(crate) struct FaultyDirectory {
    inner: InMemoryDirectory,
    lookups: AtomicUsize,
    adds: AtomicUsize,
    lookup_error: Mutex<Option<TransportError>>,
    add_failures: AtomicU32,
    add_error: Mutex<Option<TransportError>>,
    remove_delay: Mutex<Option<Duration>>,
}

impl FaultyDirectory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every `members` call fails with `err`.
    pub(crate) fn fail_lookups(&self, err: TransportError) {
        *self.lookup_error.lock() = Some(err);
    }

    /// The next `times` calls to `add` fail with `err`.
    pub(crate) fn fail_next_adds(&self, times: u32, err: TransportError) {
        *self.add_error.lock() = Some(err);
        self.add_failures.store(times, Ordering::SeqCst);
    }

    /// Every `remove` sleeps for `delay` before taking effect.
    pub(crate) fn delay_removes(&self, delay: Duration) {
        *self.remove_delay.lock() = Some(delay);
    }

    pub(crate) fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub(crate) fn adds(&self) -> usize {
        self.adds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistrationDirectory for FaultyDirectory {
    async fn members(&self, set: &str) -> Result<HashSet<String>, TransportError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let failure = self.lookup_error.lock().clone();
        if let Some(err) = failure {
            return Err(err);
        }
        self.inner.members(set).await
    }

    async fn add(&self, set: &str, member: &str) -> Result<(), TransportError> {
        self.adds.fetch_add(1, Ordering::SeqCst);
        let should_fail = self
            .add_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if should_fail {
            let err = self.add_error.lock().clone();
            if let Some(err) = err {
                return Err(err);
            }
        }
        self.inner.add(set, member).await
    }

    async fn remove(&self, set: &str, member: &str) -> Result<(), TransportError> {
        let delay = *self.remove_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.remove(set, member).await
    }
}

/// Polls `check` until it holds, panicking after two seconds.
pub(crate) async fn eventually(mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !check() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
