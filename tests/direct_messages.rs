//! Integration tests for direct message routing.

mod common;

use std::time::Duration;

use common::TestServer;
use imsg_proto::{Message, MessageKind};

#[tokio::test]
async fn test_direct_message_is_delivered_and_acknowledged() {
    let server = TestServer::spawn().await.unwrap();
    let mut alice = server.login("alice").await.unwrap();
    let mut bob = server.login("bob").await.unwrap();
    alice.expect(MessageKind::Broadcast).await.unwrap();

    alice
        .send(Message::direct_message("bob", "hi"))
        .await
        .unwrap();

    let got = bob.expect(MessageKind::DirectMessage).await.unwrap();
    assert_eq!(got.destinatary(), Some("alice"), "first field names the sender");
    assert_eq!(got.body(), Some("hi"));
    alice.expect(MessageKind::MessageAck).await.unwrap();
}

#[tokio::test]
async fn test_message_to_unknown_user_is_refused() {
    let server = TestServer::spawn().await.unwrap();
    let mut alice = server.login("alice").await.unwrap();

    alice
        .send(Message::direct_message("carol", "hi"))
        .await
        .unwrap();

    let refused = alice.expect(MessageKind::MessageRefused).await.unwrap();
    assert!(
        refused.value().contains("carol"),
        "refusal should name the destinatary: {:?}",
        refused.value()
    );
}

#[tokio::test]
async fn test_message_before_connect_is_refused() {
    let server = TestServer::spawn().await.unwrap();
    let mut bob = server.login("bob").await.unwrap();
    let mut anon = server.connect().await.unwrap();

    anon.send(Message::direct_message("bob", "hi")).await.unwrap();

    anon.expect(MessageKind::MessageRefused).await.unwrap();
    bob.expect_silence(Duration::from_millis(200)).await.unwrap();
}

#[tokio::test]
async fn test_message_without_separator_is_refused() {
    let server = TestServer::spawn().await.unwrap();
    let mut alice = server.login("alice").await.unwrap();

    alice
        .send(Message::new(MessageKind::DirectMessage, "bob says hi"))
        .await
        .unwrap();
    alice.expect(MessageKind::MessageRefused).await.unwrap();

    // The connection stays usable.
    alice.send(Message::list_request()).await.unwrap();
    alice.expect(MessageKind::ListResponse).await.unwrap();
}

#[tokio::test]
async fn test_messages_arrive_in_send_order() {
    const COUNT: usize = 100;
    let server = TestServer::spawn().await.unwrap();
    let mut alice = server.login("alice").await.unwrap();
    let mut bob = server.login("bob").await.unwrap();
    alice.expect(MessageKind::Broadcast).await.unwrap();

    for i in 0..COUNT {
        alice
            .send(Message::direct_message("bob", &format!("message {i}")))
            .await
            .unwrap();
    }

    for i in 0..COUNT {
        let got = bob.expect(MessageKind::DirectMessage).await.unwrap();
        assert_eq!(got.body(), Some(format!("message {i}").as_str()));
    }
    for _ in 0..COUNT {
        alice.expect(MessageKind::MessageAck).await.unwrap();
    }
}

#[tokio::test]
async fn test_message_to_self_arrives_before_ack() {
    let server = TestServer::spawn().await.unwrap();
    let mut alice = server.login("alice").await.unwrap();

    alice
        .send(Message::direct_message("alice", "note to self"))
        .await
        .unwrap();

    let got = alice.expect(MessageKind::DirectMessage).await.unwrap();
    assert_eq!(got.fields(), Some(("alice", "note to self")));
    alice.expect(MessageKind::MessageAck).await.unwrap();
}

#[tokio::test]
async fn test_body_may_contain_separator() {
    let server = TestServer::spawn().await.unwrap();
    let mut alice = server.login("alice").await.unwrap();
    let mut bob = server.login("bob").await.unwrap();
    alice.expect(MessageKind::Broadcast).await.unwrap();

    alice
        .send(Message::direct_message("bob", "a|b|c"))
        .await
        .unwrap();

    let got = bob.expect(MessageKind::DirectMessage).await.unwrap();
    assert_eq!(got.fields(), Some(("alice", "a|b|c")));
}
