//! Broadcast-group membership for peer discovery.
//!
//! `join{room}` is a minimal presence-discovery primitive orthogonal to the
//! call protocol: on join, every other member of the room is told
//! `new-user{connectionId}` so it can address the newcomer directly.

use std::collections::{HashMap, HashSet};

/// Room membership, keyed by room name.
#[derive(Debug, Default)]
pub struct RoomDirectory {
    members: HashMap<String, HashSet<String>>,
}

impl RoomDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `connection_id` to `room` and return the other members that
    /// should be notified. Joining a room twice is a no-op that notifies
    /// nobody.
    pub fn join(&mut self, room: &str, connection_id: &str) -> Vec<String> {
        let members = self.members.entry(room.to_string()).or_default();
        if !members.insert(connection_id.to_string()) {
            return Vec::new();
        }
        members
            .iter()
            .filter(|m| m.as_str() != connection_id)
            .cloned()
            .collect()
    }

    /// Remove a connection from every room it joined; empty rooms are
    /// dropped.
    pub fn remove_connection(&mut self, connection_id: &str) {
        self.members.retain(|_, members| {
            members.remove(connection_id);
            !members.is_empty()
        });
    }

    /// Number of rooms with at least one member (for logging).
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.members.len()
    }
}
