//! Test protocol client.
//!
//! Speaks raw frames so tests can send anything, including garbage, and
//! assert on exactly what comes back.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::StreamExt;
use imsg_proto::{ImCodec, Message, MessageKind};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;
use tokio_util::codec::FramedRead;

/// A test client.
pub struct TestClient {
    reader: FramedRead<OwnedReadHalf, ImCodec>,
    writer: OwnedWriteHalf,
}

#[allow(dead_code)]
impl TestClient {
    /// Connect to a test server.
    pub async fn connect(addr: SocketAddr) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: FramedRead::new(read_half, ImCodec::new()),
            writer: write_half,
        })
    }

    /// Write raw bytes.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Send one message.
    pub async fn send(&mut self, msg: Message) -> anyhow::Result<()> {
        self.send_raw(&msg.to_bytes()).await
    }

    /// Receive a single message from the server.
    pub async fn recv(&mut self) -> anyhow::Result<Message> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    /// Receive a message with a timeout.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<Message> {
        match timeout(dur, self.reader.next()).await? {
            Some(result) => Ok(result?),
            None => anyhow::bail!("connection closed"),
        }
    }

    /// Receive one message and check its kind.
    pub async fn expect(&mut self, kind: MessageKind) -> anyhow::Result<Message> {
        let msg = self.recv().await?;
        if msg.kind() != kind {
            anyhow::bail!("expected {kind}, got {} {:?}", msg.kind(), msg.value());
        }
        Ok(msg)
    }

    /// Register `nick` and wait for the acknowledgement.
    pub async fn register(&mut self, nick: &str) -> anyhow::Result<()> {
        self.send(Message::connect(nick)).await?;
        self.expect(MessageKind::ConnectAck).await?;
        Ok(())
    }

    /// Assert nothing arrives for `dur`.
    pub async fn expect_silence(&mut self, dur: Duration) -> anyhow::Result<()> {
        match timeout(dur, self.reader.next()).await {
            Err(_) => Ok(()),
            Ok(Some(Ok(msg))) => anyhow::bail!("unexpected {} {:?}", msg.kind(), msg.value()),
            Ok(Some(Err(e))) => anyhow::bail!("unexpected error: {e}"),
            Ok(None) => anyhow::bail!("connection closed"),
        }
    }

    /// Wait for the server to close the connection, skipping any messages
    /// still in flight.
    pub async fn expect_closed(&mut self) -> anyhow::Result<()> {
        let deadline = Duration::from_secs(5);
        let drained = timeout(deadline, async {
            loop {
                match self.reader.next().await {
                    None | Some(Err(_)) => return,
                    Some(Ok(_)) => continue,
                }
            }
        })
        .await;
        if drained.is_err() {
            anyhow::bail!("server did not close the connection");
        }
        Ok(())
    }

    /// Close our side of the connection.
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
