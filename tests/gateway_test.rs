//! End-to-end gateway scenarios over real WebSocket connections.

mod common;

use futures::SinkExt;
use serde_json::json;

use stealth_core::types::MessageId;
use stealth_database::store::MessageStore;

use common::{TestApp, emit, expect_event, expect_silence};

#[tokio::test]
async fn test_send_reaches_recipient_and_echoes_to_sender() {
    let app = TestApp::new().await;
    let server = app.spawn().await;
    let (a, token_a) = app.user("alice").await;
    let (b, token_b) = app.user("bob").await;

    let mut ws_a = server.join(a, &token_a).await;
    let mut ws_b = server.join(b, &token_b).await;

    emit(
        &mut ws_a,
        "send-message",
        json!({"senderId": a.to_string(), "recipientId": b.to_string(), "message": "hi", "messageType": "text"}),
    )
    .await;

    let received = expect_event(&mut ws_b, "new-message").await;
    let echoed = expect_event(&mut ws_a, "message-sent").await;

    assert_eq!(received["id"], echoed["id"]);
    assert_eq!(received["message"], "hi");
    assert_eq!(received["senderId"], a.to_string());
    assert_eq!(received["delivered"], false);

    let id: MessageId = received["id"].as_str().unwrap().parse().unwrap();
    assert!(app.store.find_message(id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_offline_recipient_reads_through_history() {
    let app = TestApp::new().await;
    let server = app.spawn().await;
    let (a, token_a) = app.user("alice").await;
    let (b, token_b) = app.user("bob").await;

    let mut ws_a = server.join(a, &token_a).await;
    emit(
        &mut ws_a,
        "send-message",
        json!({"senderId": a.to_string(), "recipientId": b.to_string(), "message": "are you there?"}),
    )
    .await;
    let sent = expect_event(&mut ws_a, "message-sent").await;
    let id: MessageId = sent["id"].as_str().unwrap().parse().unwrap();

    let stored = app.store.find_message(id).await.unwrap().unwrap();
    assert!(!stored.delivered && !stored.read);

    let response = app
        .request("GET", &format!("/api/messages/{a}"), None, Some(&token_b))
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["messages"][0]["id"], sent["id"]);
    assert_eq!(response.body["messages"][0]["read"], true);

    let receipt = expect_event(&mut ws_a, "message-read").await;
    assert_eq!(receipt["messageId"], sent["id"]);
}

#[tokio::test]
async fn test_disconnect_announces_offline() {
    let app = TestApp::new().await;
    let server = app.spawn().await;
    let (a, token_a) = app.user("alice").await;
    let (b, token_b) = app.user("bob").await;

    let mut ws_a = server.join(a, &token_a).await;
    let mut ws_b = server.join(b, &token_b).await;

    ws_a.close(None).await.unwrap();

    let offline = expect_event(&mut ws_b, "user-offline").await;
    assert_eq!(offline["userId"], a.to_string());
    assert_eq!(offline["isOnline"], false);
    assert!(!offline["lastSeen"].is_null());

    emit(&mut ws_b, "check-user-status", json!(a.to_string())).await;
    let status = expect_event(&mut ws_b, "user-status-response").await;
    assert_eq!(status["isOnline"], false);
    assert!(!status["lastSeen"].is_null());
}

#[tokio::test]
async fn test_stale_disconnect_does_not_mark_offline() {
    let app = TestApp::new().await;
    let server = app.spawn().await;
    let (a, token_a) = app.user("alice").await;
    let (b, token_b) = app.user("bob").await;

    let mut first = server.join(a, &token_a).await;
    let _second = server.join(a, &token_a).await;
    let mut ws_b = server.join(b, &token_b).await;

    first.close(None).await.unwrap();

    expect_silence(&mut ws_b, "user-offline").await;
    assert!(app.state.realtime.presence.query_status(a).is_online);
}

#[tokio::test]
async fn test_typing_is_forwarded() {
    let app = TestApp::new().await;
    let server = app.spawn().await;
    let (a, token_a) = app.user("alice").await;
    let (b, token_b) = app.user("bob").await;

    let mut ws_a = server.join(a, &token_a).await;
    let mut ws_b = server.join(b, &token_b).await;

    emit(
        &mut ws_a,
        "typing",
        json!({"recipientId": b.to_string(), "isTyping": true}),
    )
    .await;

    let typing = expect_event(&mut ws_b, "user-typing").await;
    assert_eq!(typing["userId"], a.to_string());
    assert_eq!(typing["isTyping"], true);
}

#[tokio::test]
async fn test_upgrade_without_token_is_rejected() {
    let app = TestApp::new().await;
    let server = app.spawn().await;

    let url = format!("ws://{}/ws", server.addr);
    assert!(tokio_tungstenite::connect_async(url).await.is_err());

    let url = format!("ws://{}/ws?token=garbage", server.addr);
    assert!(tokio_tungstenite::connect_async(url).await.is_err());
}
