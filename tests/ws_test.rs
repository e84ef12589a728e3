//! Integration tests for WebSocket connection and messaging.

mod helpers;

use std::time::Duration;

use futures::SinkExt;
use http::StatusCode;
use serde_json::json;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use parley_entity::user::PresenceStatus;
use parley_realtime::testing::TestBackends;

use helpers::{TestApp, connect_ws, next_event_named, next_frame, send_frame, stays_quiet};

#[tokio::test]
async fn test_ws_upgrade_without_cookie() {
    let app = TestApp::new().await;
    let addr = app.serve().await;

    match connect_ws(addr, None).await {
        Err(WsError::Http(response)) => assert_eq!(response.status(), StatusCode::UNAUTHORIZED),
        Err(other) => panic!("expected HTTP 401, got {other}"),
        Ok(_) => panic!("handshake without cookie must be rejected"),
    }
}

#[tokio::test]
async fn test_ws_upgrade_with_bad_token() {
    let app = TestApp::new().await;
    let addr = app.serve().await;

    match connect_ws(addr, Some("token=garbage")).await {
        Err(WsError::Http(response)) => assert_eq!(response.status(), StatusCode::UNAUTHORIZED),
        Err(other) => panic!("expected HTTP 401, got {other}"),
        Ok(_) => panic!("handshake with a bad token must be rejected"),
    }
}

#[tokio::test]
async fn test_first_frame_is_connected() {
    let app = TestApp::new().await;
    let alice = app.backends.users.add_user("alice");
    let addr = app.serve().await;

    let mut ws = connect_ws(addr, Some(&app.cookie_for(alice.id))).await.unwrap();
    let frame = next_frame(&mut ws).await;

    assert_eq!(frame["event"], "connected");
    assert!(frame["data"]["socketId"].is_string());
    assert_eq!(app.backends.users.status_of(alice.id), Some(PresenceStatus::Online));
}

#[tokio::test]
async fn test_friends_see_each_other_and_exchange_messages() {
    let app = TestApp::new().await;
    let alice = app.backends.users.add_user("alice");
    let bob = app.backends.users.add_user("bob");
    app.backends.users.befriend(alice.id, bob.id);
    let addr = app.serve().await;

    let mut alice_ws = connect_ws(addr, Some(&app.cookie_for(alice.id))).await.unwrap();
    next_event_named(&mut alice_ws, "connected").await;

    let mut bob_ws = connect_ws(addr, Some(&app.cookie_for(bob.id))).await.unwrap();
    next_event_named(&mut bob_ws, "connected").await;

    let online = next_event_named(&mut alice_ws, "user_status_change").await;
    assert_eq!(online["data"]["userId"], bob.id.to_string());
    assert_eq!(online["data"]["status"], "ONLINE");

    send_frame(
        &mut bob_ws,
        json!({
            "event": "dm_message",
            "data": {"to": "alice", "content": "hello", "timeStamp": "2024-01-01T10:00:00Z"}
        }),
    )
    .await;

    let dm = next_event_named(&mut alice_ws, "dm_message").await;
    assert_eq!(dm["data"]["from"], bob.id.to_string());
    assert_eq!(dm["data"]["senderName"], "Bob");
    assert_eq!(dm["data"]["message"]["content"], "hello");
    assert_eq!(dm["data"]["message"]["timeStamp"], "2024-01-01T10:00:00Z");
    assert!(stays_quiet(&mut bob_ws).await);

    bob_ws.send(Message::Close(None)).await.unwrap();
    let offline = next_event_named(&mut alice_ws, "user_status_change").await;
    assert_eq!(offline["data"]["userId"], bob.id.to_string());
    assert_eq!(offline["data"]["status"], "OFFLINE");
}

#[tokio::test]
async fn test_dm_between_two_servers() {
    let backends = TestBackends::new();
    let node_a = TestApp::on(&backends, "node-a").await;
    let node_b = TestApp::on(&backends, "node-b").await;
    let alice = backends.users.add_user("alice");
    let bob = backends.users.add_user("bob");
    let addr_a = node_a.serve().await;
    let addr_b = node_b.serve().await;

    let mut alice_ws = connect_ws(addr_a, Some(&node_a.cookie_for(alice.id))).await.unwrap();
    next_event_named(&mut alice_ws, "connected").await;
    let mut bob_ws = connect_ws(addr_b, Some(&node_b.cookie_for(bob.id))).await.unwrap();
    next_event_named(&mut bob_ws, "connected").await;

    send_frame(
        &mut alice_ws,
        json!({"event": "dm_message", "data": {"to": "bob", "content": "across"}}),
    )
    .await;

    let dm = next_event_named(&mut bob_ws, "dm_message").await;
    assert_eq!(dm["data"]["message"]["content"], "across");
    assert_eq!(dm["data"]["to"], bob.id.to_string());
    assert!(stays_quiet(&mut bob_ws).await);
}

#[tokio::test]
async fn test_malformed_frames_are_dropped() {
    let app = TestApp::new().await;
    let alice = app.backends.users.add_user("alice");
    let bob = app.backends.users.add_user("bob");
    let addr = app.serve().await;

    let mut alice_ws = connect_ws(addr, Some(&app.cookie_for(alice.id))).await.unwrap();
    next_event_named(&mut alice_ws, "connected").await;
    let mut bob_ws = connect_ws(addr, Some(&app.cookie_for(bob.id))).await.unwrap();
    next_event_named(&mut bob_ws, "connected").await;

    bob_ws.send(Message::Text("not json".into())).await.unwrap();
    send_frame(&mut bob_ws, json!({"event": "dm_message", "data": {"content": "no recipient"}})).await;
    send_frame(&mut bob_ws, json!({"event": "teleport", "data": {}})).await;
    assert!(stays_quiet(&mut bob_ws).await);

    // The connection survives and keeps working
    send_frame(
        &mut bob_ws,
        json!({"event": "dm_message", "data": {"to": "alice", "content": "still here"}}),
    )
    .await;
    let dm = next_event_named(&mut alice_ws, "dm_message").await;
    assert_eq!(dm["data"]["message"]["content"], "still here");
    assert_eq!(app.backends.messages.all().await.len(), 1);
}

#[tokio::test]
async fn test_heartbeat_refreshes_last_seen() {
    let app = TestApp::new().await;
    let alice = app.backends.users.add_user("alice");
    let addr = app.serve().await;

    let mut ws = connect_ws(addr, Some(&app.cookie_for(alice.id))).await.unwrap();
    next_event_named(&mut ws, "connected").await;
    let admitted_at = app.backends.users.last_seen_of(alice.id).unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    send_frame(&mut ws, json!({"event": "heartbeat"})).await;

    let refreshed = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match app.backends.users.last_seen_of(alice.id) {
                Some(seen) if seen > admitted_at => return seen,
                _ => tokio::time::sleep(Duration::from_millis(10)).await,
            }
        }
    })
    .await
    .expect("last_seen was not refreshed");

    assert!(refreshed > admitted_at);
    assert!(stays_quiet(&mut ws).await);
}
