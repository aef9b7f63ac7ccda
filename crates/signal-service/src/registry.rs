//! Connection registry: presence mapping from `userId` to the live
//! connection addressable for that identity.
//!
//! The registry is plain owned state; the coordinator actor is its only
//! writer, which serializes all access (one exclusion domain for presence
//! and call state).

use std::collections::HashMap;

/// Maps registered user ids to their current connection id.
///
/// At most one connection per user at any instant; a re-registration
/// silently supersedes the previous mapping without closing the old
/// connection.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    by_user: HashMap<String, String>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Unconditional upsert: last registration wins.
    pub fn register(&mut self, user_id: &str, connection_id: &str) {
        self.by_user
            .insert(user_id.to_string(), connection_id.to_string());
    }

    /// Look up the connection currently addressable for `user_id`.
    ///
    /// Absence means the user is not reachable.
    #[must_use]
    pub fn resolve(&self, user_id: &str) -> Option<&str> {
        self.by_user.get(user_id).map(String::as_str)
    }

    /// Remove the mapping for `user_id`, but only if it still points at
    /// `connection_id`.
    ///
    /// A stale disconnect must not evict a fresher registration, so the
    /// stored connection id is checked before removal. Returns whether the
    /// mapping was removed.
    pub fn unregister(&mut self, user_id: &str, connection_id: &str) -> bool {
        match self.by_user.get(user_id) {
            Some(current) if current == connection_id => {
                self.by_user.remove(user_id);
                true
            }
            _ => false,
        }
    }

    /// Number of registered users (for logging).
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_user.len()
    }

    /// Whether no users are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_user.is_empty()
    }
}
