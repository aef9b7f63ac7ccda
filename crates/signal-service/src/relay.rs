//! Signaling relay: fire-and-forget delivery of server events to
//! connections addressed by connection id.
//!
//! Each live connection registers an unbounded outbound channel; the socket
//! task on the other end pumps it into the WebSocket. Sends are never
//! awaited for delivery confirmation, and a send to a connection that no
//! longer exists (or whose socket task has exited) is silently dropped -
//! callers decide whether that matters.

use crate::protocol::ServerEvent;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::debug;

/// Outbound channel to one connection's socket task.
pub type OutboundSender = mpsc::UnboundedSender<ServerEvent>;

/// Maps live connection ids to their outbound channels.
#[derive(Debug, Default)]
pub struct RelayTable {
    connections: HashMap<String, OutboundSender>,
}

impl RelayTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection's outbound channel.
    pub fn attach(&mut self, connection_id: &str, sender: OutboundSender) {
        self.connections.insert(connection_id.to_string(), sender);
    }

    /// Drop a connection's outbound channel.
    pub fn detach(&mut self, connection_id: &str) {
        self.connections.remove(connection_id);
    }

    /// Whether `connection_id` currently has a live channel.
    #[must_use]
    pub fn is_attached(&self, connection_id: &str) -> bool {
        self.connections.contains_key(connection_id)
    }

    /// Send `event` to `target_connection_id`, fire-and-forget.
    ///
    /// Returns whether the event was handed to a live channel. A missing
    /// target or a closed channel is not an error.
    pub fn forward(&self, target_connection_id: &str, event: ServerEvent) -> bool {
        let Some(sender) = self.connections.get(target_connection_id) else {
            debug!(
                target: "signal.relay",
                connection_id = %target_connection_id,
                "Dropping event for unknown connection"
            );
            return false;
        };

        if sender.send(event).is_err() {
            debug!(
                target: "signal.relay",
                connection_id = %target_connection_id,
                "Dropping event for closed connection"
            );
            return false;
        }
        true
    }

    /// Number of attached connections (for logging).
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no connections are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn call_rejected(call_id: &str) -> ServerEvent {
        ServerEvent::CallRejected {
            call_id: call_id.to_string(),
        }
    }

    #[test]
    fn test_forward_delivers_to_attached_connection() {
        let mut relay = RelayTable::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        relay.attach("conn-1", tx);

        assert!(relay.forward("conn-1", call_rejected("c1")));
        assert_eq!(rx.try_recv().expect("event delivered"), call_rejected("c1"));
    }

    #[test]
    fn test_forward_to_unknown_connection_is_dropped() {
        let relay = RelayTable::new();
        assert!(!relay.forward("conn-missing", call_rejected("c1")));
    }

    #[test]
    fn test_forward_to_closed_channel_is_dropped() {
        let mut relay = RelayTable::new();
        let (tx, rx) = mpsc::unbounded_channel();
        relay.attach("conn-1", tx);
        drop(rx);

        assert!(!relay.forward("conn-1", call_rejected("c1")));
    }

    #[test]
    fn test_detach_removes_connection() {
        let mut relay = RelayTable::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        relay.attach("conn-1", tx);
        assert!(relay.is_attached("conn-1"));

        relay.detach("conn-1");
        assert!(!relay.is_attached("conn-1"));
        assert!(relay.is_empty());
    }
}
