//! Signal Service error types.
//!
//! Protocol failures map to a machine-readable `reason` string carried in
//! `call-error` notifications. Internal details are logged server-side but
//! never exposed to clients.

use thiserror::Error;

/// Signal Service error type.
///
/// The first five variants form the protocol taxonomy; every one of them is
/// recovered locally and surfaced to the originating sender as a
/// `call-error`, never by closing the connection.
#[derive(Debug, Error)]
pub enum SignalError {
    /// A required field was absent (or empty) in an inbound message.
    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    /// Referenced call is unknown or already purged.
    #[error("Call not found: {0}")]
    NotFound(String),

    /// Transition attempted from a status that does not permit it.
    #[error("Call {call_id} is {status}, operation requires {expected}")]
    InvalidState {
        call_id: String,
        status: &'static str,
        expected: &'static str,
    },

    /// Actor is not a legitimate party to the session/action.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resolved recipient has no live connection.
    #[error("Target unreachable: {0}")]
    TargetUnreachable(String),

    /// Configuration error (startup only).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SignalError {
    /// The machine-readable reason carried in `call-error` notifications.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            SignalError::MissingArgument(_) => "missing-argument",
            SignalError::NotFound(_) => "not-found",
            SignalError::InvalidState { .. } => "wrong-state",
            SignalError::Unauthorized(_) => "unauthorized",
            SignalError::TargetUnreachable(_) => "target-offline",
            SignalError::Config(_) | SignalError::Internal(_) => "internal-error",
        }
    }

    /// A client-safe message (no internal details).
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            SignalError::MissingArgument(field) => format!("missing required field: {field}"),
            SignalError::NotFound(call_id) => format!("call {call_id} not found"),
            SignalError::InvalidState {
                call_id,
                status,
                expected,
            } => format!("call {call_id} is {status}, expected {expected}"),
            SignalError::Unauthorized(msg) => msg.clone(),
            SignalError::TargetUnreachable(user_id) => format!("user {user_id} is offline"),
            SignalError::Config(_) | SignalError::Internal(_) => {
                "an internal error occurred".to_string()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_mapping() {
        assert_eq!(
            SignalError::MissingArgument("toUserId").reason(),
            "missing-argument"
        );
        assert_eq!(
            SignalError::NotFound("call-1".to_string()).reason(),
            "not-found"
        );
        assert_eq!(
            SignalError::InvalidState {
                call_id: "call-1".to_string(),
                status: "rejected",
                expected: "ringing",
            }
            .reason(),
            "wrong-state"
        );
        assert_eq!(
            SignalError::Unauthorized("not a party to this call".to_string()).reason(),
            "unauthorized"
        );
        assert_eq!(
            SignalError::TargetUnreachable("bob".to_string()).reason(),
            "target-offline"
        );
        assert_eq!(
            SignalError::Internal("channel closed".to_string()).reason(),
            "internal-error"
        );
    }

    #[test]
    fn test_client_messages_hide_internal_details() {
        let err = SignalError::Internal("mpsc send failed at coordinator:142".to_string());
        assert!(!err.client_message().contains("mpsc"));
        assert_eq!(err.client_message(), "an internal error occurred");

        let err = SignalError::Config("SIGNAL_TOKEN_API_SECRET missing".to_string());
        assert!(!err.client_message().contains("SECRET"));
    }

    #[test]
    fn test_offline_message_mentions_offline() {
        // Clients match on the word "offline" when a callee is unreachable.
        let err = SignalError::TargetUnreachable("carol".to_string());
        assert!(err.client_message().contains("offline"));
        assert!(err.client_message().contains("carol"));
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(
            format!("{}", SignalError::MissingArgument("callId")),
            "Missing argument: callId"
        );
        assert_eq!(
            format!(
                "{}",
                SignalError::InvalidState {
                    call_id: "c1".to_string(),
                    status: "cancelled",
                    expected: "ringing",
                }
            ),
            "Call c1 is cancelled, operation requires ringing"
        );
    }
}
