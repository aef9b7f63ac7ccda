//! Call-session records and their state machine.
//!
//! One [`CallSession`] per call attempt, keyed by a call id derived from
//! caller, callee and creation time. Status only moves forward:
//!
//! ```text
//! ringing -> accepted            (callee only)
//! ringing -> rejected            (either party)
//! ringing | accepted -> cancelled (caller only)
//! ringing -> ended               (forced on disconnect)
//! ```
//!
//! `rejected`, `cancelled` and `ended` are terminal. `accepted` is
//! semi-terminal: the call hands off to an out-of-band media session and
//! the record is cleaned up shortly after. Terminal records are retained
//! for a grace window (scheduled by the coordinator) so that straggling
//! messages referencing them fail with `wrong-state` instead of
//! `not-found`.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Status of a call session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    /// Waiting for the callee to respond.
    Ringing,
    /// Callee accepted; media session handed off.
    Accepted,
    /// Declined by caller or callee.
    Rejected,
    /// Withdrawn by the caller.
    Cancelled,
    /// Forced closed (party disconnected).
    Ended,
}

impl CallStatus {
    /// Protocol-facing name of the status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CallStatus::Ringing => "ringing",
            CallStatus::Accepted => "accepted",
            CallStatus::Rejected => "rejected",
            CallStatus::Cancelled => "cancelled",
            CallStatus::Ended => "ended",
        }
    }

    /// Whether no further transitions are permitted.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CallStatus::Rejected | CallStatus::Cancelled | CallStatus::Ended
        )
    }
}

/// A single call attempt between two registered users.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSession {
    /// Unique call id (caller, callee and creation time).
    pub call_id: String,
    /// Initiating user.
    pub caller_id: String,
    /// Target user.
    pub callee_id: String,
    /// Display name shown to the callee while ringing.
    pub caller_name: String,
    /// Optional avatar reference shown to the callee.
    pub caller_avatar: Option<String>,
    /// Current status.
    pub status: CallStatus,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session left `ringing` (accepted/rejected/cancelled/ended).
    pub settled_at: Option<DateTime<Utc>>,
}

impl CallSession {
    /// Whether `user_id` is the caller or the callee.
    #[must_use]
    pub fn is_party(&self, user_id: &str) -> bool {
        self.caller_id == user_id || self.callee_id == user_id
    }
}

/// Why a transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// No session with that call id.
    NotFound,
    /// The session is not in the status the transition requires.
    InvalidState {
        /// The session's actual status.
        status: CallStatus,
    },
    /// The acting user is not permitted to drive this transition.
    Unauthorized,
}

/// Expected current status for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    /// The session must be in exactly this status.
    Status(CallStatus),
    /// Any non-terminal status is acceptable (used by cancel).
    AnyNonTerminal,
}

/// Owns all live call sessions.
///
/// Like the other stores, this is plain owned state mutated only by the
/// coordinator actor.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, CallSession>,
}

impl SessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new session in `ringing` status and return it.
    pub fn create(
        &mut self,
        caller_id: &str,
        callee_id: &str,
        caller_name: &str,
        caller_avatar: Option<String>,
    ) -> CallSession {
        let created_at = Utc::now();
        let base = format!("{caller_id}-{callee_id}-{}", created_at.timestamp_millis());

        // The time component varies per attempt; the suffix only kicks in
        // if two attempts land on the same millisecond.
        let mut call_id = base.clone();
        let mut attempt = 1u32;
        while self.sessions.contains_key(&call_id) {
            call_id = format!("{base}-{attempt}");
            attempt += 1;
        }

        let session = CallSession {
            call_id: call_id.clone(),
            caller_id: caller_id.to_string(),
            callee_id: callee_id.to_string(),
            caller_name: caller_name.to_string(),
            caller_avatar,
            status: CallStatus::Ringing,
            created_at,
            settled_at: None,
        };

        self.sessions.insert(call_id, session.clone());
        session
    }

    /// Look up a session by call id.
    #[must_use]
    pub fn get(&self, call_id: &str) -> Option<&CallSession> {
        self.sessions.get(call_id)
    }

    /// Atomically check-and-move a session to `new_status`.
    ///
    /// Verifies, in order: the session exists, it is in the expected
    /// status, and `actor_id` is authorized for the transition. The order
    /// matters for racing clients: a straggling reject after an accept
    /// surfaces `wrong-state` against the retained record.
    ///
    /// # Errors
    ///
    /// [`TransitionError`] when any of the three checks fails; the session
    /// is left untouched.
    pub fn transition(
        &mut self,
        call_id: &str,
        expected: Expected,
        new_status: CallStatus,
        actor_id: &str,
    ) -> Result<CallSession, TransitionError> {
        let session = self
            .sessions
            .get_mut(call_id)
            .ok_or(TransitionError::NotFound)?;

        let state_ok = match expected {
            Expected::Status(status) => session.status == status,
            Expected::AnyNonTerminal => !session.status.is_terminal(),
        };
        if !state_ok {
            return Err(TransitionError::InvalidState {
                status: session.status,
            });
        }

        let authorized = match new_status {
            CallStatus::Accepted => session.callee_id == actor_id,
            CallStatus::Rejected | CallStatus::Ended => session.is_party(actor_id),
            CallStatus::Cancelled => session.caller_id == actor_id,
            CallStatus::Ringing => false,
        };
        if !authorized {
            return Err(TransitionError::Unauthorized);
        }

        session.status = new_status;
        session.settled_at = Some(Utc::now());
        Ok(session.clone())
    }

    /// Delete a session. Deleting an already-removed session is a silent
    /// no-op; returns whether anything was removed.
    pub fn remove(&mut self, call_id: &str) -> bool {
        self.sessions.remove(call_id).is_some()
    }

    /// Find every non-terminal session `user_id` is party to, force any
    /// still-ringing ones to `ended`, and return the affected call ids so
    /// the coordinator can schedule their removal.
    pub fn purge_for_user(&mut self, user_id: &str) -> Vec<String> {
        let now = Utc::now();
        let mut affected = Vec::new();

        for session in self.sessions.values_mut() {
            if session.status.is_terminal() || !session.is_party(user_id) {
                continue;
            }
            if session.status == CallStatus::Ringing {
                session.status = CallStatus::Ended;
                session.settled_at = Some(now);
            }
            affected.push(session.call_id.clone());
        }

        affected
    }

    /// Number of live session records (for logging).
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
