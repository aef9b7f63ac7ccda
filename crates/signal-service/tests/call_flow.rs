//! End-to-end call-flow scenarios driven through the coordinator handle.
//!
//! These tests stand in for real WebSocket clients: each "client" is a
//! connection id plus the receiving half of its outbound channel, exactly
//! what the socket task would hold.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use signal_service::actors::CoordinatorHandle;
use signal_service::protocol::{ClientEvent, ServerEvent};
use signal_service::session::CallStatus;
use std::time::Duration;
use tokio::sync::mpsc;

const REJECT_GRACE: Duration = Duration::from_secs(5);
const DISCONNECT_GRACE: Duration = Duration::from_secs(10);

struct TestClient {
    id: String,
    rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl TestClient {
    async fn next_event(&mut self) -> ServerEvent {
        self.rx.recv().await.expect("client channel open")
    }

    fn no_pending_events(&mut self) -> bool {
        self.rx.try_recv().is_err()
    }
}

fn test_handle() -> CoordinatorHandle {
    CoordinatorHandle::new("signal-test".to_string(), REJECT_GRACE, DISCONNECT_GRACE)
}

async fn connect(handle: &CoordinatorHandle, id: &str) -> TestClient {
    let (tx, rx) = mpsc::unbounded_channel();
    handle.attach(id.to_string(), tx).await.expect("attach");
    TestClient {
        id: id.to_string(),
        rx,
    }
}

async fn connect_registered(handle: &CoordinatorHandle, id: &str, user: &str) -> TestClient {
    let client = connect(handle, id).await;
    handle
        .inbound(
            client.id.clone(),
            ClientEvent::Register {
                user_id: Some(user.to_string()),
            },
        )
        .await
        .expect("register");
    client
}

async fn send(handle: &CoordinatorHandle, client: &TestClient, event: ClientEvent) {
    handle
        .inbound(client.id.clone(), event)
        .await
        .expect("inbound");
}

fn call_request(to: &str, name: &str) -> ClientEvent {
    ClientEvent::CallRequest {
        to_user_id: Some(to.to_string()),
        caller_name: Some(name.to_string()),
        caller_avatar: None,
    }
}

fn call_accept(call_id: &str) -> ClientEvent {
    ClientEvent::CallAccept {
        call_id: Some(call_id.to_string()),
    }
}

/// Let spawned timer tasks and the coordinator mailbox settle.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn request_and_accept_delivers_one_notification_each() {
    let handle = test_handle();
    let mut alice = connect_registered(&handle, "conn-a", "alice").await;
    let mut bob = connect_registered(&handle, "conn-b", "bob").await;

    send(&handle, &alice, call_request("bob", "Alice")).await;

    let call_id = match bob.next_event().await {
        ServerEvent::IncomingCall {
            call_id,
            caller_id,
            caller_name,
            caller_avatar,
        } => {
            assert_eq!(caller_id, "alice");
            assert_eq!(caller_name, "Alice");
            assert_eq!(caller_avatar, None);
            call_id
        }
        other => panic!("expected incoming-call, got {other:?}"),
    };
    assert!(bob.no_pending_events(), "exactly one incoming-call");

    send(&handle, &bob, call_accept(&call_id)).await;

    match alice.next_event().await {
        ServerEvent::CallAccepted {
            call_id: accepted_id,
            room_id,
        } => {
            assert_eq!(accepted_id, call_id);
            assert_ne!(room_id, call_id, "media room id must be fresh");
        }
        other => panic!("expected call-accepted, got {other:?}"),
    }
    assert!(alice.no_pending_events(), "exactly one call-accepted");

    let session = handle
        .inspect_session(call_id)
        .await
        .expect("inspect")
        .expect("session retained");
    assert_eq!(session.status, CallStatus::Accepted);

    handle.cancel();
}

#[tokio::test]
async fn request_to_offline_user_reaches_nobody() {
    let handle = test_handle();
    let mut alice = connect_registered(&handle, "conn-a", "alice").await;
    let mut bob = connect_registered(&handle, "conn-b", "bob").await;

    send(&handle, &alice, call_request("carol", "Alice")).await;

    match alice.next_event().await {
        ServerEvent::CallError { reason, message } => {
            assert_eq!(reason, "target-offline");
            assert!(message.contains("offline"), "message: {message}");
        }
        other => panic!("expected call-error, got {other:?}"),
    }
    assert!(bob.no_pending_events(), "no message reaches any connection");

    handle.cancel();
}

#[tokio::test]
async fn accept_requires_callee_identity() {
    let handle = test_handle();
    let alice = connect_registered(&handle, "conn-a", "alice").await;
    let mut bob = connect_registered(&handle, "conn-b", "bob").await;
    let mut mallory = connect_registered(&handle, "conn-m", "mallory").await;

    send(&handle, &alice, call_request("bob", "Alice")).await;
    let call_id = match bob.next_event().await {
        ServerEvent::IncomingCall { call_id, .. } => call_id,
        other => panic!("expected incoming-call, got {other:?}"),
    };

    send(&handle, &mallory, call_accept(&call_id)).await;
    match mallory.next_event().await {
        ServerEvent::CallError { reason, .. } => assert_eq!(reason, "unauthorized"),
        other => panic!("expected call-error, got {other:?}"),
    }

    // Status unchanged: the callee can still accept.
    let session = handle
        .inspect_session(call_id)
        .await
        .expect("inspect")
        .expect("session present");
    assert_eq!(session.status, CallStatus::Ringing);

    handle.cancel();
}

#[tokio::test]
async fn reject_allowed_from_either_party_never_a_third() {
    let handle = test_handle();
    let mut alice = connect_registered(&handle, "conn-a", "alice").await;
    let mut bob = connect_registered(&handle, "conn-b", "bob").await;
    let mut mallory = connect_registered(&handle, "conn-m", "mallory").await;

    send(&handle, &alice, call_request("bob", "Alice")).await;
    let call_id = match bob.next_event().await {
        ServerEvent::IncomingCall { call_id, .. } => call_id,
        other => panic!("expected incoming-call, got {other:?}"),
    };

    send(
        &handle,
        &mallory,
        ClientEvent::CallReject {
            call_id: Some(call_id.clone()),
        },
    )
    .await;
    match mallory.next_event().await {
        ServerEvent::CallError { reason, .. } => assert_eq!(reason, "unauthorized"),
        other => panic!("expected call-error, got {other:?}"),
    }

    send(
        &handle,
        &bob,
        ClientEvent::CallReject {
            call_id: Some(call_id.clone()),
        },
    )
    .await;
    match alice.next_event().await {
        ServerEvent::CallRejected {
            call_id: rejected_id,
        } => assert_eq!(rejected_id, call_id),
        other => panic!("expected call-rejected, got {other:?}"),
    }

    handle.cancel();
}

#[tokio::test(start_paused = true)]
async fn straggling_accept_after_reject_sees_wrong_state_then_not_found() {
    let handle = test_handle();
    let mut alice = connect_registered(&handle, "conn-a", "alice").await;
    let mut bob = connect_registered(&handle, "conn-b", "bob").await;

    send(&handle, &alice, call_request("bob", "Alice")).await;
    let call_id = match bob.next_event().await {
        ServerEvent::IncomingCall { call_id, .. } => call_id,
        other => panic!("expected incoming-call, got {other:?}"),
    };

    send(
        &handle,
        &alice,
        ClientEvent::CallReject {
            call_id: Some(call_id.clone()),
        },
    )
    .await;
    match alice.next_event().await {
        ServerEvent::CallRejected { .. } => {}
        other => panic!("expected call-rejected, got {other:?}"),
    }

    // Within the grace window the record is retained, so a straggling
    // accept resolves to a meaningful wrong-state error.
    send(&handle, &bob, call_accept(&call_id)).await;
    match bob.next_event().await {
        ServerEvent::CallError { reason, .. } => assert_eq!(reason, "wrong-state"),
        other => panic!("expected call-error, got {other:?}"),
    }

    // After the grace window the record is gone for good.
    tokio::time::advance(REJECT_GRACE + Duration::from_secs(1)).await;
    settle().await;

    assert!(handle
        .inspect_session(call_id.clone())
        .await
        .expect("inspect")
        .is_none());

    send(&handle, &bob, call_accept(&call_id)).await;
    match bob.next_event().await {
        ServerEvent::CallError { reason, .. } => assert_eq!(reason, "not-found"),
        other => panic!("expected call-error, got {other:?}"),
    }

    handle.cancel();
}

#[tokio::test(start_paused = true)]
async fn accepted_session_cleaned_up_after_handoff() {
    let handle = test_handle();
    let mut alice = connect_registered(&handle, "conn-a", "alice").await;
    let mut bob = connect_registered(&handle, "conn-b", "bob").await;

    send(&handle, &alice, call_request("bob", "Alice")).await;
    let call_id = match bob.next_event().await {
        ServerEvent::IncomingCall { call_id, .. } => call_id,
        other => panic!("expected incoming-call, got {other:?}"),
    };

    send(&handle, &bob, call_accept(&call_id)).await;
    match alice.next_event().await {
        ServerEvent::CallAccepted { .. } => {}
        other => panic!("expected call-accepted, got {other:?}"),
    }

    // The record is retained briefly after the handoff ...
    let session = handle
        .inspect_session(call_id.clone())
        .await
        .expect("inspect")
        .expect("session retained after accept");
    assert_eq!(session.status, CallStatus::Accepted);

    // ... but not forever: the store must not grow with every call.
    tokio::time::advance(DISCONNECT_GRACE + Duration::from_secs(1)).await;
    settle().await;

    assert!(handle
        .inspect_session(call_id)
        .await
        .expect("inspect")
        .is_none());

    handle.cancel();
}

#[tokio::test]
async fn cancel_removes_session_immediately() {
    let handle = test_handle();
    let alice = connect_registered(&handle, "conn-a", "alice").await;
    let mut bob = connect_registered(&handle, "conn-b", "bob").await;

    send(&handle, &alice, call_request("bob", "Alice")).await;
    let call_id = match bob.next_event().await {
        ServerEvent::IncomingCall { call_id, .. } => call_id,
        other => panic!("expected incoming-call, got {other:?}"),
    };

    send(
        &handle,
        &alice,
        ClientEvent::CallCancel {
            call_id: Some(call_id.clone()),
        },
    )
    .await;
    match bob.next_event().await {
        ServerEvent::CallCancelled {
            call_id: cancelled_id,
        } => assert_eq!(cancelled_id, call_id),
        other => panic!("expected call-cancelled, got {other:?}"),
    }

    assert!(handle
        .inspect_session(call_id.clone())
        .await
        .expect("inspect")
        .is_none());

    // A subsequent accept fails with not-found: nothing was retained.
    send(&handle, &bob, call_accept(&call_id)).await;
    match bob.next_event().await {
        ServerEvent::CallError { reason, .. } => assert_eq!(reason, "not-found"),
        other => panic!("expected call-error, got {other:?}"),
    }

    handle.cancel();
}

#[tokio::test]
async fn cancel_requires_caller_identity() {
    let handle = test_handle();
    let alice = connect_registered(&handle, "conn-a", "alice").await;
    let mut bob = connect_registered(&handle, "conn-b", "bob").await;

    send(&handle, &alice, call_request("bob", "Alice")).await;
    let call_id = match bob.next_event().await {
        ServerEvent::IncomingCall { call_id, .. } => call_id,
        other => panic!("expected incoming-call, got {other:?}"),
    };

    // The callee cannot cancel, only reject.
    send(
        &handle,
        &bob,
        ClientEvent::CallCancel {
            call_id: Some(call_id.clone()),
        },
    )
    .await;
    match bob.next_event().await {
        ServerEvent::CallError { reason, .. } => assert_eq!(reason, "unauthorized"),
        other => panic!("expected call-error, got {other:?}"),
    }

    handle.cancel();
}

#[tokio::test(start_paused = true)]
async fn disconnect_ends_ringing_calls_after_grace_window() {
    let handle = test_handle();
    let alice = connect_registered(&handle, "conn-a", "alice").await;
    let mut bob = connect_registered(&handle, "conn-b", "bob").await;

    send(&handle, &alice, call_request("bob", "Alice")).await;
    let call_id = match bob.next_event().await {
        ServerEvent::IncomingCall { call_id, .. } => call_id,
        other => panic!("expected incoming-call, got {other:?}"),
    };

    handle.detach(alice.id.clone()).await.expect("detach");

    // Presence is gone at once; the session is forced to ended but
    // retained for the grace window.
    assert_eq!(
        handle.resolve_user("alice".to_string()).await.expect("resolve"),
        None
    );
    let session = handle
        .inspect_session(call_id.clone())
        .await
        .expect("inspect")
        .expect("session retained during grace window");
    assert_eq!(session.status, CallStatus::Ended);

    tokio::time::advance(DISCONNECT_GRACE + Duration::from_secs(1)).await;
    settle().await;

    assert!(handle
        .inspect_session(call_id)
        .await
        .expect("inspect")
        .is_none());

    handle.cancel();
}
