//! Integration tests for the `imsg_proto::client` driver against a live
//! server.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::TestServer;
use imsg_proto::ProtocolError;
use imsg_proto::client::{Client, ClientHandler};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::timeout;

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
    changed: Notify,
}

impl Recorder {
    fn push(&self, event: String) {
        self.events.lock().push(event);
        self.changed.notify_waiters();
    }

    /// Wait until an event starting with `prefix` has been recorded.
    async fn wait_for(&self, prefix: &str) -> String {
        timeout(Duration::from_secs(5), async {
            loop {
                let notified = self.changed.notified();
                if let Some(e) = self.events.lock().iter().find(|e| e.starts_with(prefix)) {
                    return e.clone();
                }
                notified.await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("no event starting with {prefix:?}: {:?}", self.events.lock()))
    }
}

impl ClientHandler for Recorder {
    fn on_server_message(&self, text: &str) {
        self.push(format!("server:{text}"));
    }

    fn on_roster(&self, nicknames: Vec<String>) {
        self.push(format!("roster:{}", nicknames.join(",")));
    }

    fn on_direct_message(&self, from: &str, body: &str) {
        self.push(format!("dm:{from}:{body}"));
    }

    fn on_connection_lost(&self, _error: &ProtocolError) {
        self.push("lost".to_string());
    }
}

#[tokio::test]
async fn test_two_clients_chat() {
    let server = TestServer::spawn().await.unwrap();
    let alice_events = Arc::new(Recorder::default());
    let bob_events = Arc::new(Recorder::default());

    let alice = Client::connect(server.address(), "alice", alice_events.clone())
        .await
        .unwrap();
    alice_events.wait_for("server:Welcome").await;
    assert!(alice.is_registered());

    let bob = Client::connect(server.address(), "bob", bob_events.clone())
        .await
        .unwrap();
    bob_events.wait_for("server:Welcome").await;
    alice_events.wait_for("server:bob has logged in.").await;

    alice.send_direct_message("bob", "hi").await.unwrap();
    bob_events.wait_for("dm:alice:hi").await;
    alice_events.wait_for("server:Message delivered").await;

    bob.request_list().await.unwrap();
    assert_eq!(bob_events.wait_for("roster:").await, "roster:alice,bob");

    bob.disconnect().await.unwrap();
    timeout(Duration::from_secs(5), bob.closed()).await.unwrap();
    assert!(!bob.is_connected());
    alice_events.wait_for("server:bob has logged out.").await;
    assert!(!bob_events.events.lock().contains(&"lost".to_string()));
}

#[tokio::test]
async fn test_refused_client_is_closed() {
    let server = TestServer::spawn().await.unwrap();
    let first = Arc::new(Recorder::default());
    let second = Arc::new(Recorder::default());

    let _alice = Client::connect(server.address(), "alice", first.clone())
        .await
        .unwrap();
    first.wait_for("server:Welcome").await;

    let imposter = Client::connect(server.address(), "alice", second.clone())
        .await
        .unwrap();
    timeout(Duration::from_secs(5), imposter.closed())
        .await
        .unwrap();
    assert!(!imposter.is_registered());
    assert!(second.wait_for("server:").await.contains("alice"));
    assert!(matches!(
        imposter.request_list().await,
        Err(ProtocolError::NotConnected)
    ));
}

#[tokio::test]
async fn test_server_shutdown_is_reported_as_lost() {
    let server = TestServer::spawn().await.unwrap();
    let events = Arc::new(Recorder::default());
    let alice = Client::connect(server.address(), "alice", events.clone())
        .await
        .unwrap();
    events.wait_for("server:Welcome").await;

    server.manager().shutdown();

    timeout(Duration::from_secs(5), alice.closed()).await.unwrap();
    events.wait_for("lost").await;
}

#[tokio::test]
async fn test_invalid_body_is_rejected_locally() {
    let server = TestServer::spawn().await.unwrap();
    let events = Arc::new(Recorder::default());
    let alice = Client::connect(server.address(), "alice", events.clone())
        .await
        .unwrap();

    let err = alice
        .send_direct_message("bob", &"x".repeat(513))
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::BodyTooLong { .. }));
}
