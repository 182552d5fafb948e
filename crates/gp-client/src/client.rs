// client.rs — ActionClient: goal dispatch, cancellation and inbound demux.
//
// The client owns the five channel bindings and the goal registry. Outbound:
// `send_goal` stamps and registers a goal then publishes it; `cancel` publishes
// a targeted or cancel-all request. Inbound: the transport calls the handlers
// registered at construction, which filter feedback and results against the
// registry before handing them to the event dispatcher.
//
// Status broadcasts describe every goal the server knows about, including
// other clients' goals, so they are relayed unfiltered.
//
// Locks: `state` (registry, id generator, sequence counter) and `events`
// (dispatcher) are never held at the same time, and neither is held while
// publishing or while sinks run. Sinks may call back into the client,
// including `send_goal` on a transport that delivers replies synchronously.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use gp_msgs::{
    ActionFeedback, ActionGoal, ActionResult, ActionSpec, Correlated, GoalId, GoalRequest,
    GoalStatusArray, Header,
};
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::events::{ActionEvent, EventDispatcher, EventSink};
use crate::goal_id::GoalIdGenerator;
use crate::registry::GoalRegistry;
use crate::transport::{action_topic, ChannelBindings, MessageHandler, Transport};

/// Message type of cancel requests.
pub const CANCEL_MESSAGE_TYPE: &str = "actionlib_msgs/GoalID";

/// Message type of status broadcasts.
pub const STATUS_MESSAGE_TYPE: &str = "actionlib_msgs/GoalStatusArray";

struct DispatchState<G> {
    registry: GoalRegistry<G>,
    ids: GoalIdGenerator,
    next_seq: u64,
}

/// State reachable from both the client and the transport's handlers.
struct Shared<A: ActionSpec> {
    state: Mutex<DispatchState<A::Goal>>,
    events: Mutex<EventDispatcher<A>>,
    shut_down: AtomicBool,
}

/// Client side of the action protocol for one action server.
pub struct ActionClient<A: ActionSpec> {
    config: ClientConfig,
    clock: Arc<dyn Clock>,
    shared: Arc<Shared<A>>,
    bindings: ChannelBindings,
}

impl<A: ActionSpec> ActionClient<A> {
    /// Bind to an action server using wall-clock timestamps.
    pub fn new(transport: &dyn Transport, config: ClientConfig) -> Result<Self> {
        Self::with_clock(transport, config, Arc::new(SystemClock))
    }

    /// Bind to an action server using the given time source.
    pub fn with_clock(
        transport: &dyn Transport,
        config: ClientConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(DispatchState {
                registry: GoalRegistry::new(),
                ids: GoalIdGenerator::new(&config.action_type),
                next_seq: 0,
            }),
            events: Mutex::new(EventDispatcher::new(config.event_capacity)),
            shut_down: AtomicBool::new(false),
        });

        let server = &config.server_name;
        let goal = transport.advertise(
            &action_topic(server, "goal"),
            &config.goal_type(),
            config.goal_qos,
        )?;
        let cancel = transport.advertise(
            &action_topic(server, "cancel"),
            CANCEL_MESSAGE_TYPE,
            config.cancel_qos,
        )?;

        let status = transport.subscribe(
            &action_topic(server, "status"),
            STATUS_MESSAGE_TYPE,
            config.status_qos,
            relay(&shared, Shared::handle_status),
        )?;
        let feedback = transport.subscribe(
            &action_topic(server, "feedback"),
            &config.feedback_type(),
            config.feedback_qos,
            relay(&shared, Shared::handle_feedback),
        )?;
        let result = transport.subscribe(
            &action_topic(server, "result"),
            &config.result_type(),
            config.result_qos,
            relay(&shared, Shared::handle_result),
        )?;

        info!(
            server = %config.server_name,
            action_type = %config.action_type,
            "action client bound"
        );

        Ok(Self {
            config,
            clock,
            shared,
            bindings: ChannelBindings::new(goal, cancel, status, feedback, result),
        })
    }

    pub fn action_type(&self) -> &str {
        &self.config.action_type
    }

    pub fn server_name(&self) -> &str {
        &self.config.server_name
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Stamp, register and publish a goal.
    ///
    /// A missing goal id is generated (`<actionType>.<8 hex>`, stamped now);
    /// a missing header gets the next sequence number, the goal id's stamp and
    /// the configured frame id. The returned record is exactly what was
    /// published. If the publish fails the goal is unregistered again, but
    /// the sequence number it took stays consumed.
    pub fn send_goal(&self, request: GoalRequest<A::Goal>) -> Result<ActionGoal<A::Goal>> {
        self.ensure_running()?;

        let (goal, message) = {
            let mut state = self.shared.lock_state()?;
            let goal_id = match request.goal_id {
                Some(goal_id) => goal_id,
                None => GoalId::new(state.ids.generate(), self.clock.now()),
            };
            let header = match request.header {
                Some(header) => header,
                None => {
                    let seq = state.next_seq;
                    state.next_seq += 1;
                    Header::new(seq, goal_id.stamp, self.config.frame_id.as_str())
                }
            };
            let goal = ActionGoal {
                header,
                goal_id,
                goal: request.goal,
            };
            let message = serde_json::to_value(&goal)?;
            state.registry.insert(goal.clone());
            (goal, message)
        };

        if let Err(e) = self.bindings.goal.publish(message) {
            self.shared
                .lock_state()?
                .registry
                .remove(goal.correlation_id());
            return Err(e.into());
        }

        debug!(goal_id = %goal.goal_id.id, seq = goal.header.seq, "goal sent");
        Ok(goal)
    }

    /// Request cancellation of one goal, or of all goals when `goal_id` is
    /// `None`.
    ///
    /// Targeting a goal this client is not tracking publishes nothing. The
    /// registry is left untouched either way: a cancelled goal stays
    /// outstanding until the server reports its result.
    pub fn cancel(&self, goal_id: Option<&str>) -> Result<()> {
        self.ensure_running()?;

        let request = match goal_id {
            None => GoalId::all(self.clock.now()),
            Some(id) => {
                if !self.shared.lock_state()?.registry.contains(id) {
                    debug!(goal_id = %id, "cancel for unknown goal ignored");
                    return Ok(());
                }
                GoalId::new(id, self.clock.now())
            }
        };

        self.bindings.cancel.publish(serde_json::to_value(&request)?)?;
        debug!(goal_id = %request.id, all = request.is_all(), "cancel sent");
        Ok(())
    }

    /// Request cancellation of every goal on the server.
    pub fn cancel_all(&self) -> Result<()> {
        self.cancel(None)
    }

    /// Whether a result is still awaited for this goal.
    pub fn is_outstanding(&self, goal_id: &str) -> bool {
        self.shared
            .lock_state()
            .map(|state| state.registry.contains(goal_id))
            .unwrap_or(false)
    }

    pub fn outstanding_count(&self) -> usize {
        self.shared
            .lock_state()
            .map(|state| state.registry.len())
            .unwrap_or(0)
    }

    /// Identifiers of outstanding goals, sorted.
    pub fn outstanding_ids(&self) -> Vec<String> {
        self.shared
            .lock_state()
            .map(|state| state.registry.ids())
            .unwrap_or_default()
    }

    /// Attach a sink that receives every surfaced event.
    pub fn add_sink(&self, sink: Box<dyn EventSink<A>>) -> Result<()> {
        self.ensure_running()?;
        self.shared.lock_events()?.add_sink(sink);
        Ok(())
    }

    /// Receive surfaced events on a broadcast channel.
    ///
    /// The channel closes when the client shuts down.
    pub fn subscribe(&self) -> Result<broadcast::Receiver<ActionEvent<A>>> {
        self.ensure_running()?;
        self.shared
            .lock_events()?
            .subscribe()
            .ok_or(ClientError::ShutDown)
    }

    /// True when the server side of all five channels is present.
    pub fn is_server_connected(&self) -> bool {
        !self.is_shut_down() && self.bindings.peers_connected()
    }

    /// Wait until the server is connected, polling at the configured
    /// interval. Returns false on timeout or if the client is shut down.
    /// `None` waits indefinitely.
    pub async fn wait_for_server(&self, timeout: Option<Duration>) -> bool {
        let interval = Duration::from_millis(self.config.connect_poll_interval_ms.max(1));
        let wait = async {
            loop {
                if self.is_shut_down() {
                    return false;
                }
                if self.bindings.peers_connected() {
                    return true;
                }
                tokio::time::sleep(interval).await;
            }
        };

        match timeout {
            Some(limit) => tokio::time::timeout(limit, wait).await.unwrap_or(false),
            None => wait.await,
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.shut_down.load(Ordering::SeqCst)
    }

    /// Detach all consumers, then release the five bindings concurrently.
    ///
    /// Resolves once every binding is released, or fails with the first
    /// release error. No events are delivered after this is called. Goals
    /// still outstanding stay in the registry and get no notification.
    ///
    /// A later call retries only the bindings that failed to release, so it
    /// keeps failing until every binding is actually gone. Once all five have
    /// released, further calls return `Ok(())` without touching the transport.
    pub async fn shutdown(&self) -> Result<()> {
        let first = !self.shared.shut_down.swap(true, Ordering::SeqCst);
        self.shared.lock_events()?.detach_all();

        if first {
            info!(
                server = %self.config.server_name,
                outstanding_goals = self.outstanding_count(),
                "shutting down action client"
            );
        } else if self.bindings.is_released() {
            return Ok(());
        }

        self.bindings.release().await?;
        debug!(server = %self.config.server_name, "channel bindings released");
        Ok(())
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_shut_down() {
            return Err(ClientError::ShutDown);
        }
        Ok(())
    }
}

/// Wrap a handler for the transport. The handler holds a weak reference so a
/// dropped client stops relaying.
fn relay<A: ActionSpec>(
    shared: &Arc<Shared<A>>,
    handle: fn(&Shared<A>, serde_json::Value),
) -> MessageHandler {
    let weak = Arc::downgrade(shared);
    Box::new(move |message| {
        if let Some(shared) = weak.upgrade() {
            handle(&shared, message);
        }
    })
}

fn decode<T: DeserializeOwned>(channel: &str, message: serde_json::Value) -> Option<T> {
    match serde_json::from_value(message) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(channel, "dropping undecodable message: {}", e);
            None
        }
    }
}

impl<A: ActionSpec> Shared<A> {
    fn lock_state(&self) -> Result<MutexGuard<'_, DispatchState<A::Goal>>> {
        self.state
            .lock()
            .map_err(|e| ClientError::LockPoisoned(format!("goal registry: {}", e)))
    }

    fn lock_events(&self) -> Result<MutexGuard<'_, EventDispatcher<A>>> {
        self.events
            .lock()
            .map_err(|e| ClientError::LockPoisoned(format!("event dispatcher: {}", e)))
    }

    fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn handle_status(&self, message: serde_json::Value) {
        if self.is_shut_down() {
            return;
        }
        if let Some(status) = decode::<GoalStatusArray>("status", message) {
            self.emit(ActionEvent::Status(status));
        }
    }

    fn handle_feedback(&self, message: serde_json::Value) {
        if self.is_shut_down() {
            return;
        }
        let Some(feedback) = decode::<ActionFeedback<A::Feedback>>("feedback", message) else {
            return;
        };

        let known = match self.lock_state() {
            Ok(state) => state.registry.contains(feedback.correlation_id()),
            Err(e) => {
                warn!("dropping feedback: {}", e);
                return;
            }
        };
        if !known {
            debug!(goal_id = %feedback.correlation_id(), "feedback for unknown goal dropped");
            return;
        }
        self.emit(ActionEvent::Feedback(feedback));
    }

    fn handle_result(&self, message: serde_json::Value) {
        if self.is_shut_down() {
            return;
        }
        let Some(result) = decode::<ActionResult<A::Result>>("result", message) else {
            return;
        };

        let retired = match self.lock_state() {
            Ok(mut state) => state.registry.remove(result.correlation_id()).is_some(),
            Err(e) => {
                warn!("dropping result: {}", e);
                return;
            }
        };
        if !retired {
            debug!(goal_id = %result.correlation_id(), "result for unknown goal dropped");
            return;
        }
        debug!(
            goal_id = %result.correlation_id(),
            status = %result.status.status,
            "goal retired"
        );
        self.emit(ActionEvent::Result(result));
    }

    fn emit(&self, event: ActionEvent<A>) {
        let fanout = match self.lock_events() {
            Ok(dispatcher) => dispatcher.fanout(),
            Err(e) => {
                warn!(event_type = event.event_type(), "dropping event: {}", e);
                return;
            }
        };
        // The lock is released here; shutdown may have detached in between.
        if self.is_shut_down() {
            return;
        }
        fanout.deliver(&event);
    }
}
