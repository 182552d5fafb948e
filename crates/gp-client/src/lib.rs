//! # gp-client
//!
//! Client side of the action protocol for Goalpost.
//!
//! An [`ActionClient`] sends long-running goals to a remote action server over
//! a publish/subscribe [`Transport`], keeps track of which goals are still
//! outstanding, cancels one or all of them, and relays status, feedback and
//! result traffic to its consumers. Feedback and results are only relayed for
//! goals this client submitted; status broadcasts are relayed as-is.
//!
//! ## Key components
//!
//! - [`ActionClient`] — goal submission, cancellation, inbound demux, shutdown
//! - [`GoalRegistry`] — outstanding goals keyed by identifier
//! - [`GoalIdGenerator`] — `<actionType>.<8 hex>` identifiers
//! - [`EventDispatcher`] / [`EventSink`] — the event surface
//! - [`Transport`], [`Publisher`], [`Subscription`] — the pub/sub boundary
//! - [`MemoryTransport`] — in-process loopback transport
//! - [`ClientConfig`] — server/type names, QoS profiles, client knobs

pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod goal_id;
pub mod memory;
pub mod registry;
pub mod transport;

pub use client::{ActionClient, CANCEL_MESSAGE_TYPE, STATUS_MESSAGE_TYPE};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ClientConfig;
pub use error::{ClientError, TransportError};
pub use events::{ActionEvent, EventDispatcher, EventSink, Fanout, FnSink};
pub use goal_id::GoalIdGenerator;
pub use memory::MemoryTransport;
pub use registry::GoalRegistry;
pub use transport::{action_topic, MessageHandler, Publisher, QosProfile, Subscription, Transport};
