//! Message types for the coordinator actor.

use crate::protocol::ClientEvent;
use crate::relay::OutboundSender;
use crate::session::CallSession;
use tokio::sync::oneshot;

/// Messages processed by the coordinator actor.
#[derive(Debug)]
pub enum CoordinatorMessage {
    /// A transport connection came up; register its outbound channel.
    Attach {
        connection_id: String,
        sender: OutboundSender,
    },

    /// An inbound client event from a live connection.
    Inbound {
        connection_id: String,
        event: ClientEvent,
    },

    /// A transport connection went away (close or read error).
    Detach { connection_id: String },

    /// A scheduled grace-window removal fired.
    ExpireSession { call_id: String },

    /// Look up a call session (queries from tests and diagnostics).
    InspectSession {
        call_id: String,
        respond_to: oneshot::Sender<Option<CallSession>>,
    },

    /// Resolve a user's current connection id.
    ResolveUser {
        user_id: String,
        respond_to: oneshot::Sender<Option<String>>,
    },
}
