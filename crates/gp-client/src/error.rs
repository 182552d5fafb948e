// error.rs — Error types for the action client.

use thiserror::Error;

/// Errors raised by a transport binding.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport refused to create a publisher.
    #[error("failed to advertise {topic}: {reason}")]
    Advertise { topic: String, reason: String },

    /// The transport refused to create a subscription.
    #[error("failed to subscribe to {topic}: {reason}")]
    Subscribe { topic: String, reason: String },

    /// A message could not be handed to the transport.
    #[error("failed to publish on {topic}: {reason}")]
    Publish { topic: String, reason: String },

    /// Releasing a binding failed.
    #[error("failed to release {topic}: {reason}")]
    Release { topic: String, reason: String },

    /// The binding was already released.
    #[error("channel closed: {0}")]
    Closed(String),
}

/// Errors that can occur during action client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Failed to encode an outbound message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An event sink failed (non-fatal, logged by the dispatcher).
    #[error("event sink error: {0}")]
    Sink(String),

    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// The client was shut down; no further traffic is accepted.
    #[error("action client has been shut down")]
    ShutDown,

    /// A configuration file could not be read or parsed.
    #[error("config error at {path}: {reason}")]
    Config { path: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TransportError::Release {
            topic: "/fib/status".into(),
            reason: "peer gone".into(),
        };
        assert_eq!(err.to_string(), "failed to release /fib/status: peer gone");

        let err = ClientError::from(err);
        assert!(err.to_string().starts_with("transport error:"));
        assert_eq!(
            ClientError::ShutDown.to_string(),
            "action client has been shut down"
        );
    }
}
