// transport.rs — Boundary with the publish/subscribe substrate.
//
// The client never encodes bytes or talks to the network itself. It asks a
// Transport for five bindings at construction time and hands it JSON values
// to publish. Inbound messages arrive through the handler passed to
// `subscribe`, one message at a time per subscription.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Quality-of-service options for one binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QosProfile {
    /// Outbound/inbound queue depth.
    pub queue_size: usize,

    /// Whether the last published message is replayed to late subscribers.
    #[serde(default)]
    pub latched: bool,
}

impl QosProfile {
    /// Goal and cancel publishers: queue 10, latched.
    pub fn publisher_default() -> Self {
        Self {
            queue_size: 10,
            latched: true,
        }
    }

    /// Status, feedback and result subscriptions: queue 1.
    pub fn subscriber_default() -> Self {
        Self {
            queue_size: 1,
            latched: false,
        }
    }
}

impl fmt::Display for QosProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue={}, latched={}", self.queue_size, self.latched)
    }
}

/// Callback invoked by the transport for each inbound message.
pub type MessageHandler = Box<dyn Fn(serde_json::Value) + Send + Sync>;

/// An outbound binding.
#[async_trait]
pub trait Publisher: Send + Sync {
    fn topic(&self) -> &str;

    fn publish(&self, message: serde_json::Value) -> Result<(), TransportError>;

    /// Number of remote subscribers currently connected.
    fn subscriber_count(&self) -> usize;

    /// Release the binding. Further publishes fail with `Closed`.
    async fn shutdown(&self) -> Result<(), TransportError>;
}

/// An inbound binding.
#[async_trait]
pub trait Subscription: Send + Sync {
    fn topic(&self) -> &str;

    /// Number of remote publishers currently connected.
    fn publisher_count(&self) -> usize;

    /// Release the binding. The handler is not invoked after this resolves.
    async fn shutdown(&self) -> Result<(), TransportError>;
}

/// Factory for bindings on the pub/sub substrate.
pub trait Transport: Send + Sync {
    fn advertise(
        &self,
        topic: &str,
        message_type: &str,
        qos: QosProfile,
    ) -> Result<Arc<dyn Publisher>, TransportError>;

    fn subscribe(
        &self,
        topic: &str,
        message_type: &str,
        qos: QosProfile,
        handler: MessageHandler,
    ) -> Result<Arc<dyn Subscription>, TransportError>;
}

/// Join an action server name and a channel suffix into a topic.
pub fn action_topic(server_name: &str, channel: &str) -> String {
    format!("{}/{}", server_name.trim_end_matches('/'), channel)
}

/// The five bindings one action client holds.
pub(crate) struct ChannelBindings {
    pub goal: Arc<dyn Publisher>,
    pub cancel: Arc<dyn Publisher>,
    pub status: Arc<dyn Subscription>,
    pub feedback: Arc<dyn Subscription>,
    pub result: Arc<dyn Subscription>,
    /// Topics whose release has succeeded.
    released: Arc<Mutex<HashSet<String>>>,
}

impl ChannelBindings {
    pub fn new(
        goal: Arc<dyn Publisher>,
        cancel: Arc<dyn Publisher>,
        status: Arc<dyn Subscription>,
        feedback: Arc<dyn Subscription>,
        result: Arc<dyn Subscription>,
    ) -> Self {
        Self {
            goal,
            cancel,
            status,
            feedback,
            result,
            released: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// True when every outbound binding has a subscriber and every inbound
    /// binding has a publisher.
    pub fn peers_connected(&self) -> bool {
        self.goal.subscriber_count() > 0
            && self.cancel.subscriber_count() > 0
            && self.status.publisher_count() > 0
            && self.feedback.publisher_count() > 0
            && self.result.publisher_count() > 0
    }

    /// True once all five bindings have released successfully.
    pub fn is_released(&self) -> bool {
        lock_released(&self.released).len() == 5
    }

    /// Release all five bindings concurrently.
    ///
    /// Resolves once every release has finished, or with the first failure.
    /// Each release runs as its own task, so releases still in flight when
    /// one fails run to completion in the background. Bindings that already
    /// released on an earlier call are skipped; the rest are attempted again.
    pub async fn release(&self) -> Result<(), TransportError> {
        let goal = self.release_one(self.goal.topic(), {
            let goal = Arc::clone(&self.goal);
            async move { goal.shutdown().await }
        });
        let cancel = self.release_one(self.cancel.topic(), {
            let cancel = Arc::clone(&self.cancel);
            async move { cancel.shutdown().await }
        });
        let status = self.release_one(self.status.topic(), {
            let status = Arc::clone(&self.status);
            async move { status.shutdown().await }
        });
        let feedback = self.release_one(self.feedback.topic(), {
            let feedback = Arc::clone(&self.feedback);
            async move { feedback.shutdown().await }
        });
        let result = self.release_one(self.result.topic(), {
            let result = Arc::clone(&self.result);
            async move { result.shutdown().await }
        });

        tokio::try_join!(goal, cancel, status, feedback, result)?;
        Ok(())
    }

    /// Release one binding on its own task unless it already released, and
    /// surface a panicked task as a release failure for that topic.
    async fn release_one<F>(&self, topic: &str, release: F) -> Result<(), TransportError>
    where
        F: Future<Output = Result<(), TransportError>> + Send + 'static,
    {
        if lock_released(&self.released).contains(topic) {
            return Ok(());
        }
        let released = Arc::clone(&self.released);
        let done = topic.to_string();
        let task = tokio::spawn(async move {
            release.await?;
            lock_released(&released).insert(done);
            Ok(())
        });
        task.await.map_err(|e| TransportError::Release {
            topic: topic.to_string(),
            reason: e.to_string(),
        })?
    }
}

fn lock_released(released: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    released.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
