// events.rs — Event surface: relaying accepted inbound traffic to consumers.
//
// The dispatch core hands every status broadcast, and every feedback/result
// that passed the registry filter, to an EventDispatcher. Consumers attach in
// two ways:
//   - EventSink implementations, called synchronously in arrival order
//   - broadcast receivers from `subscribe()`, for async consumers
//
// Sink errors are logged but never stop other sinks from receiving the event.
// `detach_all()` drops every sink and closes the broadcast channel; nothing is
// dispatched after it returns.

use std::fmt;
use std::sync::Arc;

use gp_msgs::{ActionFeedback, ActionResult, ActionSpec, Correlated, GoalStatusArray};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::ClientError;

/// A notification surfaced to consumers of an action client.
#[derive(Serialize, Deserialize)]
#[serde(tag = "event_type", content = "message", rename_all = "snake_case")]
#[serde(bound = "")]
pub enum ActionEvent<A: ActionSpec> {
    /// Server-wide status snapshot, relayed unfiltered.
    Status(GoalStatusArray),

    /// Progress for a goal this client submitted.
    Feedback(ActionFeedback<A::Feedback>),

    /// Terminal outcome for a goal this client submitted.
    Result(ActionResult<A::Result>),
}

impl<A: ActionSpec> ActionEvent<A> {
    /// Get the event type name as a string.
    pub fn event_type(&self) -> &'static str {
        match self {
            ActionEvent::Status(_) => "status",
            ActionEvent::Feedback(_) => "feedback",
            ActionEvent::Result(_) => "result",
        }
    }

    /// Goal the event concerns. Status broadcasts concern no single goal.
    pub fn goal_id(&self) -> Option<&str> {
        match self {
            ActionEvent::Status(_) => None,
            ActionEvent::Feedback(feedback) => Some(feedback.correlation_id()),
            ActionEvent::Result(result) => Some(result.correlation_id()),
        }
    }
}

impl<A: ActionSpec> Clone for ActionEvent<A> {
    fn clone(&self) -> Self {
        match self {
            ActionEvent::Status(status) => ActionEvent::Status(status.clone()),
            ActionEvent::Feedback(feedback) => ActionEvent::Feedback(feedback.clone()),
            ActionEvent::Result(result) => ActionEvent::Result(result.clone()),
        }
    }
}

impl<A: ActionSpec> fmt::Debug for ActionEvent<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionEvent::Status(status) => f.debug_tuple("Status").field(status).finish(),
            ActionEvent::Feedback(feedback) => f.debug_tuple("Feedback").field(feedback).finish(),
            ActionEvent::Result(result) => f.debug_tuple("Result").field(result).finish(),
        }
    }
}

/// Receives action events.
///
/// Sinks run on whichever thread the transport delivers on, outside the
/// client's locks, so they may call back into the client.
pub trait EventSink<A: ActionSpec>: Send + Sync {
    /// Handle an event. Errors are logged but don't stop the client.
    fn send(&self, event: &ActionEvent<A>) -> Result<(), ClientError>;
}

/// Adapts a closure into an [`EventSink`].
pub struct FnSink<F>(pub F);

impl<A, F> EventSink<A> for FnSink<F>
where
    A: ActionSpec,
    F: Fn(&ActionEvent<A>) + Send + Sync,
{
    fn send(&self, event: &ActionEvent<A>) -> Result<(), ClientError> {
        (self.0)(event);
        Ok(())
    }
}

/// Dispatches events to sinks and broadcast subscribers.
pub struct EventDispatcher<A: ActionSpec> {
    sinks: Vec<Arc<dyn EventSink<A>>>,
    broadcast: Option<broadcast::Sender<ActionEvent<A>>>,
}

impl<A: ActionSpec> EventDispatcher<A> {
    /// Create a dispatcher whose broadcast channel buffers `capacity` events
    /// per lagging receiver.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sinks: Vec::new(),
            broadcast: Some(sender),
        }
    }

    pub fn add_sink(&mut self, sink: Box<dyn EventSink<A>>) {
        self.sinks.push(Arc::from(sink));
    }

    /// New broadcast receiver, or `None` once detached.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<ActionEvent<A>>> {
        self.broadcast.as_ref().map(|sender| sender.subscribe())
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Snapshot of the current consumers.
    ///
    /// Delivering through the snapshot needs no access to the dispatcher, so
    /// a caller guarding the dispatcher with a lock can release it first and
    /// let sinks re-enter.
    pub fn fanout(&self) -> Fanout<A> {
        Fanout {
            sinks: self.sinks.clone(),
            broadcast: self.broadcast.clone(),
        }
    }

    /// Dispatch an event to all sinks, then to broadcast subscribers.
    pub fn dispatch(&self, event: &ActionEvent<A>) {
        self.fanout().deliver(event);
    }

    /// Remove every sink and close the broadcast channel.
    pub fn detach_all(&mut self) {
        self.sinks.clear();
        self.broadcast = None;
    }

    pub fn is_detached(&self) -> bool {
        self.broadcast.is_none()
    }
}

/// The consumers attached to a dispatcher at one point in time.
pub struct Fanout<A: ActionSpec> {
    sinks: Vec<Arc<dyn EventSink<A>>>,
    broadcast: Option<broadcast::Sender<ActionEvent<A>>>,
}

impl<A: ActionSpec> Fanout<A> {
    pub fn deliver(&self, event: &ActionEvent<A>) {
        for sink in &self.sinks {
            if let Err(e) = sink.send(event) {
                tracing::warn!(event_type = event.event_type(), "event sink error: {}", e);
            }
        }
        if let Some(sender) = &self.broadcast {
            // No receivers is fine; the event just isn't buffered.
            let _ = sender.send(event.clone());
        }
    }
}
