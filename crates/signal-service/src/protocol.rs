//! Wire protocol for the signaling channel.
//!
//! Messages are JSON objects tagged with a `type` field (kebab-case event
//! names, camelCase payload fields). Fields the coordinator validates at
//! runtime are `Option` on the wire so that an absent field surfaces as a
//! `missing-argument` error instead of a deserialization failure that would
//! drop the whole frame.
//!
//! Negotiation payloads (`sdp`, `candidate`) are relayed verbatim and kept
//! as raw [`serde_json::Value`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages received from clients.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Bind the sender's identity to this connection.
    Register { user_id: Option<String> },

    /// Join a broadcast group; other members are notified `new-user`.
    Join { room: Option<String> },

    /// Initiate a call to another user.
    CallRequest {
        to_user_id: Option<String>,
        caller_name: Option<String>,
        caller_avatar: Option<String>,
    },

    /// Callee accepts a ringing call.
    CallAccept { call_id: Option<String> },

    /// Either party declines a ringing call.
    CallReject { call_id: Option<String> },

    /// Caller withdraws a call attempt.
    CallCancel { call_id: Option<String> },

    /// Relay an SDP offer to a connection.
    Offer {
        to: Option<String>,
        #[serde(default)]
        sdp: Value,
    },

    /// Relay an SDP answer to a connection.
    Answer {
        to: Option<String>,
        #[serde(default)]
        sdp: Value,
    },

    /// Relay an ICE candidate to a connection.
    Candidate {
        to: Option<String>,
        #[serde(default)]
        candidate: Value,
    },
}

/// Messages sent to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// A new member joined a room this connection is in.
    NewUser { connection_id: String },

    /// A call is ringing for this connection's user.
    IncomingCall {
        call_id: String,
        caller_id: String,
        caller_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        caller_avatar: Option<String>,
    },

    /// The callee accepted; both parties should join `room_id`.
    CallAccepted { call_id: String, room_id: String },

    /// The call was declined.
    CallRejected { call_id: String },

    /// The caller withdrew the call.
    CallCancelled { call_id: String },

    /// A request failed validation; the connection stays open.
    CallError { reason: String, message: String },

    /// Relayed SDP offer, tagged with the sender's connection id.
    Offer { from: String, sdp: Value },

    /// Relayed SDP answer, tagged with the sender's connection id.
    Answer { from: String, sdp: Value },

    /// Relayed ICE candidate, tagged with the sender's connection id.
    Candidate { from: String, candidate: Value },
}
