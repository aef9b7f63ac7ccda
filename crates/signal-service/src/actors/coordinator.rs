//! Coordinator actor - the protocol logic of the signaling service.
//!
//! The coordinator validates inbound events against current state, drives
//! call-session transitions, and emits notifications through the relay
//! table. It is the only writer of the presence registry, room directory
//! and session store; processing one mailbox message at a time serializes
//! every access to them.
//!
//! Grace-window deletions are implemented as spawned timers that post an
//! `ExpireSession` message back to the mailbox. A timer firing for a
//! session that is already gone is a no-op, so removals need no explicit
//! cancellation.

use crate::errors::SignalError;
use crate::protocol::{ClientEvent, ServerEvent};
use crate::registry::ConnectionRegistry;
use crate::relay::{OutboundSender, RelayTable};
use crate::rooms::RoomDirectory;
use crate::session::{CallSession, CallStatus, Expected, SessionStore, TransitionError};

use super::messages::CoordinatorMessage;

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Default channel buffer size for the coordinator mailbox.
const COORDINATOR_CHANNEL_BUFFER: usize = 1000;

/// Handle to the coordinator actor.
///
/// This is the public interface for the transport layer and for tests.
/// Cloning is cheap; all clones address the same actor.
#[derive(Clone)]
pub struct CoordinatorHandle {
    sender: mpsc::Sender<CoordinatorMessage>,
    cancel_token: CancellationToken,
}

impl CoordinatorHandle {
    /// Spawn a coordinator actor and return a handle to it.
    #[must_use]
    pub fn new(instance_id: String, reject_grace: Duration, disconnect_grace: Duration) -> Self {
        let (sender, receiver) = mpsc::channel(COORDINATOR_CHANNEL_BUFFER);
        let cancel_token = CancellationToken::new();

        let actor = Coordinator::new(
            instance_id,
            receiver,
            sender.clone(),
            cancel_token.clone(),
            reject_grace,
            disconnect_grace,
        );

        tokio::spawn(actor.run());

        Self {
            sender,
            cancel_token,
        }
    }

    /// Register a new connection's outbound channel.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Internal`] if the actor is gone.
    pub async fn attach(
        &self,
        connection_id: String,
        sender: OutboundSender,
    ) -> Result<(), SignalError> {
        self.send(CoordinatorMessage::Attach {
            connection_id,
            sender,
        })
        .await
    }

    /// Deliver an inbound client event for processing.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Internal`] if the actor is gone.
    pub async fn inbound(
        &self,
        connection_id: String,
        event: ClientEvent,
    ) -> Result<(), SignalError> {
        self.send(CoordinatorMessage::Inbound {
            connection_id,
            event,
        })
        .await
    }

    /// Signal that a connection has gone away.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Internal`] if the actor is gone.
    pub async fn detach(&self, connection_id: String) -> Result<(), SignalError> {
        self.send(CoordinatorMessage::Detach { connection_id }).await
    }

    /// Look up a call session by id.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Internal`] if the actor is gone.
    pub async fn inspect_session(&self, call_id: String) -> Result<Option<CallSession>, SignalError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.send(CoordinatorMessage::InspectSession {
            call_id,
            respond_to: tx,
        })
        .await?;

        rx.await
            .map_err(|e| SignalError::Internal(format!("response receive failed: {e}")))
    }

    /// Resolve a user's current connection id.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Internal`] if the actor is gone.
    pub async fn resolve_user(&self, user_id: String) -> Result<Option<String>, SignalError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.send(CoordinatorMessage::ResolveUser {
            user_id,
            respond_to: tx,
        })
        .await?;

        rx.await
            .map_err(|e| SignalError::Internal(format!("response receive failed: {e}")))
    }

    /// Cancel the actor (for shutdown).
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Check if the actor is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Get a child token for tying other tasks to the actor's lifetime.
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }

    async fn send(&self, message: CoordinatorMessage) -> Result<(), SignalError> {
        self.sender
            .send(message)
            .await
            .map_err(|e| SignalError::Internal(format!("channel send failed: {e}")))
    }
}

/// The coordinator actor implementation.
///
/// Owns all mutable signaling state and runs the message loop.
struct Coordinator {
    /// Service instance ID (log context).
    instance_id: String,
    /// Message receiver.
    receiver: mpsc::Receiver<CoordinatorMessage>,
    /// Sender back into our own mailbox, used by removal timers.
    self_sender: mpsc::Sender<CoordinatorMessage>,
    /// Cancellation token (root).
    cancel_token: CancellationToken,
    /// Presence: userId -> connectionId.
    registry: ConnectionRegistry,
    /// Broadcast groups for peer discovery.
    rooms: RoomDirectory,
    /// Live call sessions.
    sessions: SessionStore,
    /// Outbound channels by connection id.
    relay: RelayTable,
    /// Inverse binding: connectionId -> userId (set by `register`).
    bound_user: HashMap<String, String>,
    /// Retention for rejected calls.
    reject_grace: Duration,
    /// Retention for calls ended by a disconnect.
    disconnect_grace: Duration,
}

impl Coordinator {
    fn new(
        instance_id: String,
        receiver: mpsc::Receiver<CoordinatorMessage>,
        self_sender: mpsc::Sender<CoordinatorMessage>,
        cancel_token: CancellationToken,
        reject_grace: Duration,
        disconnect_grace: Duration,
    ) -> Self {
        Self {
            instance_id,
            receiver,
            self_sender,
            cancel_token,
            registry: ConnectionRegistry::new(),
            rooms: RoomDirectory::new(),
            sessions: SessionStore::new(),
            relay: RelayTable::new(),
            bound_user: HashMap::new(),
            reject_grace,
            disconnect_grace,
        }
    }

    /// Run the actor message loop.
    #[instrument(skip_all, name = "signal.coordinator", fields(instance_id = %self.instance_id))]
    async fn run(mut self) {
        info!(
            target: "signal.coordinator",
            instance_id = %self.instance_id,
            "Coordinator started"
        );

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "signal.coordinator",
                        instance_id = %self.instance_id,
                        "Coordinator received cancellation signal"
                    );
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => self.handle_message(message),
                        None => {
                            debug!(
                                target: "signal.coordinator",
                                "Coordinator channel closed, exiting"
                            );
                            break;
                        }
                    }
                }
            }
        }

        info!(
            target: "signal.coordinator",
            instance_id = %self.instance_id,
            connections = self.relay.len(),
            sessions = self.sessions.len(),
            "Coordinator stopped"
        );
    }

    fn handle_message(&mut self, message: CoordinatorMessage) {
        match message {
            CoordinatorMessage::Attach {
                connection_id,
                sender,
            } => {
                self.relay.attach(&connection_id, sender);
                debug!(
                    target: "signal.coordinator",
                    connection_id = %connection_id,
                    connections = self.relay.len(),
                    "Connection attached"
                );
            }

            CoordinatorMessage::Inbound {
                connection_id,
                event,
            } => {
                if let Err(err) = self.handle_event(&connection_id, event) {
                    debug!(
                        target: "signal.coordinator",
                        connection_id = %connection_id,
                        reason = err.reason(),
                        error = %err,
                        "Rejected inbound event"
                    );
                    self.relay.forward(
                        &connection_id,
                        ServerEvent::CallError {
                            reason: err.reason().to_string(),
                            message: err.client_message(),
                        },
                    );
                }
            }

            CoordinatorMessage::Detach { connection_id } => {
                self.handle_disconnect(&connection_id);
            }

            CoordinatorMessage::ExpireSession { call_id } => {
                // Idempotent: the session may have been removed earlier.
                if self.sessions.remove(&call_id) {
                    debug!(
                        target: "signal.coordinator",
                        call_id = %call_id,
                        "Session removed after grace window"
                    );
                }
            }

            CoordinatorMessage::InspectSession {
                call_id,
                respond_to,
            } => {
                let _ = respond_to.send(self.sessions.get(&call_id).cloned());
            }

            CoordinatorMessage::ResolveUser {
                user_id,
                respond_to,
            } => {
                let _ = respond_to.send(self.registry.resolve(&user_id).map(String::from));
            }
        }
    }

    fn handle_event(
        &mut self,
        connection_id: &str,
        event: ClientEvent,
    ) -> Result<(), SignalError> {
        match event {
            ClientEvent::Register { user_id } => {
                let user_id = require(user_id, "userId")?;
                self.handle_register(connection_id, &user_id);
                Ok(())
            }

            ClientEvent::Join { room } => {
                let room = require(room, "room")?;
                self.handle_join(connection_id, &room);
                Ok(())
            }

            ClientEvent::CallRequest {
                to_user_id,
                caller_name,
                caller_avatar,
            } => {
                let to_user_id = require(to_user_id, "toUserId")?;
                self.handle_call_request(connection_id, &to_user_id, caller_name, caller_avatar)
            }

            ClientEvent::CallAccept { call_id } => {
                let call_id = require(call_id, "callId")?;
                self.handle_call_accept(connection_id, &call_id)
            }

            ClientEvent::CallReject { call_id } => {
                let call_id = require(call_id, "callId")?;
                self.handle_call_reject(connection_id, &call_id)
            }

            ClientEvent::CallCancel { call_id } => {
                let call_id = require(call_id, "callId")?;
                self.handle_call_cancel(connection_id, &call_id)
            }

            ClientEvent::Offer { to, sdp } => {
                let to = require(to, "to")?;
                self.relay.forward(
                    &to,
                    ServerEvent::Offer {
                        from: connection_id.to_string(),
                        sdp,
                    },
                );
                Ok(())
            }

            ClientEvent::Answer { to, sdp } => {
                let to = require(to, "to")?;
                self.relay.forward(
                    &to,
                    ServerEvent::Answer {
                        from: connection_id.to_string(),
                        sdp,
                    },
                );
                Ok(())
            }

            ClientEvent::Candidate { to, candidate } => {
                let to = require(to, "to")?;
                self.relay.forward(
                    &to,
                    ServerEvent::Candidate {
                        from: connection_id.to_string(),
                        candidate,
                    },
                );
                Ok(())
            }
        }
    }

    fn handle_register(&mut self, connection_id: &str, user_id: &str) {
        // A connection re-registering under a new identity releases the
        // old one, but never someone else's fresher mapping.
        if let Some(previous) = self
            .bound_user
            .insert(connection_id.to_string(), user_id.to_string())
        {
            if previous != user_id {
                self.registry.unregister(&previous, connection_id);
            }
        }

        self.registry.register(user_id, connection_id);
        info!(
            target: "signal.coordinator",
            connection_id = %connection_id,
            user_id = %user_id,
            registered = self.registry.len(),
            "User registered"
        );
    }

    fn handle_join(&mut self, connection_id: &str, room: &str) {
        let others = self.rooms.join(room, connection_id);
        debug!(
            target: "signal.coordinator",
            connection_id = %connection_id,
            room = %room,
            notified = others.len(),
            "Connection joined room"
        );

        for member in others {
            self.relay.forward(
                &member,
                ServerEvent::NewUser {
                    connection_id: connection_id.to_string(),
                },
            );
        }
    }

    fn handle_call_request(
        &mut self,
        connection_id: &str,
        to_user_id: &str,
        caller_name: Option<String>,
        caller_avatar: Option<String>,
    ) -> Result<(), SignalError> {
        let caller_id = self.actor_id(connection_id)?;
        let caller_name = caller_name.unwrap_or_else(|| caller_id.clone());

        let session = self
            .sessions
            .create(&caller_id, to_user_id, &caller_name, caller_avatar);

        let Some(callee_connection) = self.registry.resolve(to_user_id).map(String::from) else {
            // Offline callee: discard immediately, no grace window.
            self.sessions.remove(&session.call_id);
            return Err(SignalError::TargetUnreachable(to_user_id.to_string()));
        };

        info!(
            target: "signal.coordinator",
            call_id = %session.call_id,
            caller_id = %caller_id,
            callee_id = %to_user_id,
            "Call ringing"
        );

        self.relay.forward(
            &callee_connection,
            ServerEvent::IncomingCall {
                call_id: session.call_id,
                caller_id,
                caller_name: session.caller_name,
                caller_avatar: session.caller_avatar,
            },
        );
        Ok(())
    }

    fn handle_call_accept(
        &mut self,
        connection_id: &str,
        call_id: &str,
    ) -> Result<(), SignalError> {
        let actor = self.actor_id(connection_id)?;
        let session = self
            .sessions
            .transition(
                call_id,
                Expected::Status(CallStatus::Ringing),
                CallStatus::Accepted,
                &actor,
            )
            .map_err(|e| transition_error(e, call_id, "ringing"))?;

        // A room id distinct from the call id: the media session lives in
        // its own namespace.
        let room_id = Uuid::new_v4().to_string();

        info!(
            target: "signal.coordinator",
            call_id = %call_id,
            room_id = %room_id,
            "Call accepted"
        );

        if let Some(caller_connection) = self.registry.resolve(&session.caller_id) {
            self.relay.forward(
                caller_connection,
                ServerEvent::CallAccepted {
                    call_id: call_id.to_string(),
                    room_id,
                },
            );
        }

        // Accepted is a handoff: the media session lives elsewhere from
        // here on. Retain the record briefly for straggling messages,
        // then drop it so the store does not grow with every call.
        self.schedule_removal(call_id.to_string(), self.disconnect_grace);
        Ok(())
    }

    fn handle_call_reject(
        &mut self,
        connection_id: &str,
        call_id: &str,
    ) -> Result<(), SignalError> {
        let actor = self.actor_id(connection_id)?;
        let session = self
            .sessions
            .transition(
                call_id,
                Expected::Status(CallStatus::Ringing),
                CallStatus::Rejected,
                &actor,
            )
            .map_err(|e| transition_error(e, call_id, "ringing"))?;

        info!(
            target: "signal.coordinator",
            call_id = %call_id,
            actor = %actor,
            "Call rejected"
        );

        if let Some(caller_connection) = self.registry.resolve(&session.caller_id) {
            self.relay.forward(
                caller_connection,
                ServerEvent::CallRejected {
                    call_id: call_id.to_string(),
                },
            );
        }

        self.schedule_removal(call_id.to_string(), self.reject_grace);
        Ok(())
    }

    fn handle_call_cancel(
        &mut self,
        connection_id: &str,
        call_id: &str,
    ) -> Result<(), SignalError> {
        let actor = self.actor_id(connection_id)?;
        let session = self
            .sessions
            .transition(
                call_id,
                Expected::AnyNonTerminal,
                CallStatus::Cancelled,
                &actor,
            )
            .map_err(|e| transition_error(e, call_id, "ringing or accepted"))?;

        info!(
            target: "signal.coordinator",
            call_id = %call_id,
            "Call cancelled"
        );

        if let Some(callee_connection) = self.registry.resolve(&session.callee_id) {
            self.relay.forward(
                callee_connection,
                ServerEvent::CallCancelled {
                    call_id: call_id.to_string(),
                },
            );
        }

        // Cancelled calls are removed immediately: the caller withdrew,
        // nothing in flight should still reference the attempt.
        self.sessions.remove(call_id);
        Ok(())
    }

    fn handle_disconnect(&mut self, connection_id: &str) {
        self.relay.detach(connection_id);
        self.rooms.remove_connection(connection_id);

        let Some(user_id) = self.bound_user.remove(connection_id) else {
            debug!(
                target: "signal.coordinator",
                connection_id = %connection_id,
                "Unregistered connection disconnected"
            );
            return;
        };

        // Guarded: a newer connection may have superseded this one, in
        // which case the user is still reachable and nothing is purged.
        if !self.registry.unregister(&user_id, connection_id) {
            debug!(
                target: "signal.coordinator",
                connection_id = %connection_id,
                user_id = %user_id,
                "Stale disconnect, registration already superseded"
            );
            return;
        }

        let affected = self.sessions.purge_for_user(&user_id);
        info!(
            target: "signal.coordinator",
            connection_id = %connection_id,
            user_id = %user_id,
            purged = affected.len(),
            "User disconnected"
        );

        for call_id in affected {
            self.schedule_removal(call_id, self.disconnect_grace);
        }
    }

    /// Arrange for a session to be deleted after `delay`.
    ///
    /// The timer posts back into the mailbox; if the session is already
    /// gone when it fires, the removal is a no-op.
    fn schedule_removal(&self, call_id: String, delay: Duration) {
        let sender = self.self_sender.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = sender
                .send(CoordinatorMessage::ExpireSession { call_id })
                .await;
        });
    }

    /// The registered identity acting through `connection_id`.
    fn actor_id(&self, connection_id: &str) -> Result<String, SignalError> {
        self.bound_user
            .get(connection_id)
            .cloned()
            .ok_or_else(|| {
                SignalError::Unauthorized("connection has no registered identity".to_string())
            })
    }
}

fn require(field: Option<String>, name: &'static str) -> Result<String, SignalError> {
    match field {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(SignalError::MissingArgument(name)),
    }
}

fn transition_error(err: TransitionError, call_id: &str, expected: &'static str) -> SignalError {
    match err {
        TransitionError::NotFound => SignalError::NotFound(call_id.to_string()),
        TransitionError::InvalidState { status } => SignalError::InvalidState {
            call_id: call_id.to_string(),
            status: status.as_str(),
            expected,
        },
        TransitionError::Unauthorized => {
            SignalError::Unauthorized(format!("not permitted to act on call {call_id}"))
        }
    }
}
