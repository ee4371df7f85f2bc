//! Test server management.
//!
//! Runs an imsgd gateway in-process on an ephemeral port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use imsgd::{Gateway, SessionManager};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use super::client::TestClient;

/// A test server instance.
pub struct TestServer {
    addr: SocketAddr,
    manager: Arc<SessionManager>,
    task: JoinHandle<()>,
}

impl TestServer {
    /// Spawn a server with the default send queue.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with_queue(256).await
    }

    /// Spawn a server whose sessions buffer `send_queue` frames.
    pub async fn spawn_with_queue(send_queue: usize) -> anyhow::Result<Self> {
        let manager = Arc::new(SessionManager::new(send_queue));
        let gateway = Gateway::bind("127.0.0.1:0".parse()?, Arc::clone(&manager)).await?;
        let addr = gateway.local_addr()?;
        let task = tokio::spawn(async move {
            let _ = gateway.run().await;
        });
        Ok(Self {
            addr,
            manager,
            task,
        })
    }

    /// Get the server address.
    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    /// Shared server state, for assertions.
    #[allow(dead_code)]
    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// Open a connection without registering.
    pub async fn connect(&self) -> anyhow::Result<TestClient> {
        TestClient::connect(self.addr).await
    }

    /// Open a connection and register `nick`, consuming the ack.
    pub async fn login(&self, nick: &str) -> anyhow::Result<TestClient> {
        let mut client = self.connect().await?;
        client.register(nick).await?;
        Ok(client)
    }

    /// Poll until `predicate` holds on the server state, for up to 5 seconds.
    #[allow(dead_code)]
    pub async fn wait_for<F>(&self, mut predicate: F) -> anyhow::Result<()>
    where
        F: FnMut(&SessionManager) -> bool,
    {
        for _ in 0..500 {
            if predicate(&self.manager) {
                return Ok(());
            }
            sleep(Duration::from_millis(10)).await;
        }
        anyhow::bail!("server state did not converge within 5 seconds")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.manager.shutdown();
        self.task.abort();
    }
}
