//! Connection identity carried by every request.

use std::fmt;

/// Reserved queue connection identity addressing every connection of a
/// sender at once. Only valid in broker directives, never in requests
/// routed through the pipeline.
pub const WILDCARD_CONNECTION: &str = "*";

/// Opaque identity used to route a [`Response`](crate::Response) back to
/// the socket or worker slot its request arrived on.
///
/// The pipeline never inspects this value beyond cloning it; only the
/// originating transport adapter knows how to interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionIdentity {
    /// In-process invocation with no wire attached (tests, embedding).
    #[default]
    Local,

    /// An event-socket connection, identified by its peer address.
    Socket {
        /// Remote peer address as reported by the listener.
        peer: String,
    },

    /// A queue-worker slot: the broker's sender identity plus the
    /// connection identity within that sender.
    Queue {
        /// Broker sender identity.
        sender: String,
        /// Connection identity within the sender.
        connection: String,
    },
}

impl ConnectionIdentity {
    /// Creates a socket identity from a peer address.
    pub fn socket(peer: impl Into<String>) -> Self {
        Self::Socket { peer: peer.into() }
    }

    /// Creates a queue identity from sender and connection ids.
    pub fn queue(sender: impl Into<String>, connection: impl Into<String>) -> Self {
        Self::Queue {
            sender: sender.into(),
            connection: connection.into(),
        }
    }
}

impl fmt::Display for ConnectionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Socket { peer } => write!(f, "socket:{peer}"),
            Self::Queue { sender, connection } => write!(f, "queue:{sender}/{connection}"),
        }
    }
}
