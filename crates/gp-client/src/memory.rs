// memory.rs — In-process loopback transport.
//
// MemoryTransport routes messages between bindings created from the same
// instance (or its clones) without any network. Publishing on a topic calls
// every subscription handler on that topic synchronously. It also records
// every published message so tests can assert on outbound traffic, and can
// be told to delay or fail the release of a topic's bindings.
//
// Peer counts are derived from local bindings: a publisher's subscriber count
// is the number of live subscriptions on its topic, and vice versa.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::transport::{MessageHandler, Publisher, QosProfile, Subscription, Transport};

#[derive(Default)]
struct TopicState {
    message_type: Option<String>,
    published: Vec<serde_json::Value>,
    latched: Option<serde_json::Value>,
    publishers: usize,
    handlers: Vec<(u64, Arc<MessageHandler>)>,
    release_failure: Option<String>,
    release_delay: Option<Duration>,
    releases: usize,
}

#[derive(Default)]
struct Bus {
    topics: HashMap<String, TopicState>,
    next_handler_id: u64,
}

/// Loopback pub/sub transport. Clones share the same bus.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    bus: Arc<Mutex<Bus>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a message to every subscription on `topic`, as if a remote
    /// peer had published it. Returns the number of handlers invoked.
    pub fn inject(&self, topic: &str, message: serde_json::Value) -> usize {
        let handlers = self.handlers(topic);
        for handler in &handlers {
            handler(message.clone());
        }
        handlers.len()
    }

    /// Messages published on `topic` by bindings of this transport.
    pub fn published(&self, topic: &str) -> Vec<serde_json::Value> {
        lock(&self.bus)
            .topics
            .get(topic)
            .map(|t| t.published.clone())
            .unwrap_or_default()
    }

    /// Message type the topic was first advertised or subscribed with.
    pub fn message_type(&self, topic: &str) -> Option<String> {
        lock(&self.bus)
            .topics
            .get(topic)
            .and_then(|t| t.message_type.clone())
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        lock(&self.bus)
            .topics
            .get(topic)
            .map_or(0, |t| t.handlers.len())
    }

    pub fn publisher_count(&self, topic: &str) -> usize {
        lock(&self.bus)
            .topics
            .get(topic)
            .map_or(0, |t| t.publishers)
    }

    /// Number of bindings on `topic` that released successfully.
    pub fn release_count(&self, topic: &str) -> usize {
        lock(&self.bus).topics.get(topic).map_or(0, |t| t.releases)
    }

    /// Make every release of a binding on `topic` fail with `reason`.
    pub fn fail_release(&self, topic: &str, reason: impl Into<String>) {
        lock(&self.bus)
            .topics
            .entry(topic.to_string())
            .or_default()
            .release_failure = Some(reason.into());
    }

    /// Undo `fail_release`: later releases on `topic` succeed again.
    pub fn restore_release(&self, topic: &str) {
        if let Some(state) = lock(&self.bus).topics.get_mut(topic) {
            state.release_failure = None;
        }
    }

    /// Make every release of a binding on `topic` take `delay`.
    pub fn delay_release(&self, topic: &str, delay: Duration) {
        lock(&self.bus)
            .topics
            .entry(topic.to_string())
            .or_default()
            .release_delay = Some(delay);
    }

    fn handlers(&self, topic: &str) -> Vec<Arc<MessageHandler>> {
        lock(&self.bus)
            .topics
            .get(topic)
            .map(|t| t.handlers.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default()
    }

    /// Delay and failure configured for releases on `topic`.
    fn release_plan(&self, topic: &str) -> (Option<Duration>, Option<String>) {
        lock(&self.bus)
            .topics
            .get(topic)
            .map_or((None, None), |t| {
                (t.release_delay, t.release_failure.clone())
            })
    }
}

impl Transport for MemoryTransport {
    fn advertise(
        &self,
        topic: &str,
        message_type: &str,
        qos: QosProfile,
    ) -> Result<Arc<dyn Publisher>, TransportError> {
        let mut bus = lock(&self.bus);
        let state = bus.topics.entry(topic.to_string()).or_default();
        state
            .message_type
            .get_or_insert_with(|| message_type.to_string());
        state.publishers += 1;
        tracing::debug!(topic, message_type, %qos, "memory transport: advertise");

        Ok(Arc::new(MemoryPublisher {
            topic: topic.to_string(),
            qos,
            transport: self.clone(),
            closed: AtomicBool::new(false),
        }))
    }

    fn subscribe(
        &self,
        topic: &str,
        message_type: &str,
        qos: QosProfile,
        handler: MessageHandler,
    ) -> Result<Arc<dyn Subscription>, TransportError> {
        let handler = Arc::new(handler);
        let (id, latched) = {
            let mut bus = lock(&self.bus);
            let id = bus.next_handler_id;
            bus.next_handler_id += 1;
            let state = bus.topics.entry(topic.to_string()).or_default();
            state
                .message_type
                .get_or_insert_with(|| message_type.to_string());
            state.handlers.push((id, Arc::clone(&handler)));
            (id, state.latched.clone())
        };
        tracing::debug!(topic, message_type, %qos, "memory transport: subscribe");

        if let Some(message) = latched {
            handler(message);
        }

        Ok(Arc::new(MemorySubscription {
            topic: topic.to_string(),
            id,
            transport: self.clone(),
            closed: AtomicBool::new(false),
        }))
    }
}

struct MemoryPublisher {
    topic: String,
    qos: QosProfile,
    transport: MemoryTransport,
    closed: AtomicBool,
}

#[async_trait]
impl Publisher for MemoryPublisher {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn publish(&self, message: serde_json::Value) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed(self.topic.clone()));
        }
        {
            let mut bus = lock(&self.transport.bus);
            let state = bus.topics.entry(self.topic.clone()).or_default();
            state.published.push(message.clone());
            if self.qos.latched {
                state.latched = Some(message.clone());
            }
        }
        self.transport.inject(&self.topic, message);
        Ok(())
    }

    fn subscriber_count(&self) -> usize {
        if self.closed.load(Ordering::SeqCst) {
            return 0;
        }
        self.transport.subscriber_count(&self.topic)
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        let (delay, failure) = self.transport.release_plan(&self.topic);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = failure {
            return Err(TransportError::Release {
                topic: self.topic.clone(),
                reason,
            });
        }
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut bus = lock(&self.transport.bus);
        if let Some(state) = bus.topics.get_mut(&self.topic) {
            state.publishers = state.publishers.saturating_sub(1);
            state.releases += 1;
        }
        Ok(())
    }
}

struct MemorySubscription {
    topic: String,
    id: u64,
    transport: MemoryTransport,
    closed: AtomicBool,
}

#[async_trait]
impl Subscription for MemorySubscription {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn publisher_count(&self) -> usize {
        if self.closed.load(Ordering::SeqCst) {
            return 0;
        }
        self.transport.publisher_count(&self.topic)
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        let (delay, failure) = self.transport.release_plan(&self.topic);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = failure {
            return Err(TransportError::Release {
                topic: self.topic.clone(),
                reason,
            });
        }
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut bus = lock(&self.transport.bus);
        if let Some(state) = bus.topics.get_mut(&self.topic) {
            state.handlers.retain(|(id, _)| *id != self.id);
            state.releases += 1;
        }
        Ok(())
    }
}

// A panic inside a handler never leaves the bus half-updated, so a poisoned
// lock is still safe to use.
fn lock(bus: &Mutex<Bus>) -> MutexGuard<'_, Bus> {
    bus.lock().unwrap_or_else(|e| e.into_inner())
}
