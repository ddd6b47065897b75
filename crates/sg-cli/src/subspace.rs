//! Subspace protocol client: deliver one framed message to a peer gate.
//!
//! One fresh TCP connection per call, one attempt, every step bounded
//! by the configured timeout. An unreachable peer is a normal outcome,
//! not an error: all transport failures collapse into
//! `delivered: false` at this boundary and go no further.

use std::net::IpAddr;
use std::time::Duration;

use anyhow::anyhow;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use sg_core::{DISCONNECT, STATUS_IDLE, STATUS_REPLY_LEN, SubspaceMessage, wire};

/// Outcome of one delivery attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: bool,
    pub reply: Option<String>,
}

impl Delivery {
    fn failed() -> Self {
        Self {
            delivered: false,
            reply: None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SubspaceClient {
    port: u16,
    timeout: Duration,
}

impl SubspaceClient {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    /// Send one message and, for a status query, await the fixed-size
    /// reply. Always follows up with the disconnect payload before
    /// releasing the connection. There is no retry.
    pub async fn send(&self, ip: IpAddr, message: &SubspaceMessage) -> Delivery {
        match self.exchange(ip, message).await {
            Ok(reply) => Delivery {
                delivered: true,
                reply,
            },
            Err(e) => {
                tracing::warn!("error sending to remote gate {ip}: {e}");
                Delivery::failed()
            }
        }
    }

    /// Ask whether the remote wormhole is active. Only a literal
    /// `"False"` reply means no; any other reply, or no answer at all,
    /// reads as active.
    pub async fn query_status(&self, ip: IpAddr) -> bool {
        let delivery = self.send(ip, &SubspaceMessage::StatusQuery).await;
        delivery.reply.as_deref() != Some(STATUS_IDLE)
    }

    async fn exchange(
        &self,
        ip: IpAddr,
        message: &SubspaceMessage,
    ) -> anyhow::Result<Option<String>> {
        let mut stream = timeout(self.timeout, TcpStream::connect((ip, self.port)))
            .await
            .map_err(|_| anyhow!("connect timed out"))??;

        self.send_frame(&mut stream, &message.render()).await?;

        let reply = if message.expects_reply() {
            let mut buf = [0u8; STATUS_REPLY_LEN];
            timeout(self.timeout, stream.read_exact(&mut buf))
                .await
                .map_err(|_| anyhow!("status reply timed out"))??;
            Some(wire::decode_status_reply(&buf))
        } else {
            None
        };

        self.send_frame(&mut stream, DISCONNECT).await?;
        Ok(reply)
    }

    /// Header and payload go out as two separate writes.
    async fn send_frame(&self, stream: &mut TcpStream, payload: &str) -> anyhow::Result<()> {
        let bytes = payload.as_bytes();
        let header = wire::encode_header(bytes.len())?;
        timeout(self.timeout, stream.write_all(&header)).await??;
        timeout(self.timeout, stream.write_all(bytes)).await??;
        Ok(())
    }
}
