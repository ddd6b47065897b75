//! Subspace listener: the receiving side of the wire contract.
//!
//! Peers open one connection per exchange and close it after their
//! disconnect payload, so connections are served one at a time in
//! arrival order, which also keeps session events strictly FIFO.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::anyhow;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use sg_core::{
    AddressBook, Direction, HEADER_LEN, SessionEvent, SubspaceMessage, WormholeState, wire,
};

/// Frames on this wire are addresses and short sentinels; anything
/// bigger than this is garbage, not traffic.
const MAX_PAYLOAD_BYTES: usize = 1024;

pub struct SubspaceListener {
    listener: TcpListener,
    events: mpsc::Sender<SessionEvent>,
    state: watch::Receiver<WormholeState>,
    book: AddressBook,
    timeout: Duration,
}

impl SubspaceListener {
    pub async fn bind(
        bind: &str,
        port: u16,
        events: mpsc::Sender<SessionEvent>,
        state: watch::Receiver<WormholeState>,
        book: AddressBook,
        timeout: Duration,
    ) -> anyhow::Result<(Self, SocketAddr)> {
        let listener = TcpListener::bind((bind, port)).await?;
        let local = listener.local_addr()?;
        Ok((
            Self {
                listener,
                events,
                state,
                book,
                timeout,
            },
            local,
        ))
    }

    /// Accept until cancelled. A failed connection never stops the loop.
    pub async fn run(self, cancel: CancellationToken) {
        loop {
            let accepted = tokio::select! {
                _ = cancel.cancelled() => return,
                accepted = self.listener.accept() => accepted,
            };
            match accepted {
                Ok((stream, peer)) => {
                    let name = self.book.resolve_name(peer.ip()).to_string();
                    tracing::info!("subspace connection from {name} ({peer})");
                    if let Err(e) = self.serve_connection(stream).await {
                        tracing::warn!("subspace connection from {peer} ended: {e}");
                    }
                }
                Err(e) => tracing::warn!("subspace accept failed: {e}"),
            }
        }
    }

    async fn serve_connection(&self, mut stream: TcpStream) -> anyhow::Result<()> {
        loop {
            let payload = match self.read_frame(&mut stream).await? {
                Some(payload) => payload,
                None => return Ok(()),
            };
            match SubspaceMessage::parse(&payload) {
                Some(SubspaceMessage::Disconnect) => return Ok(()),
                Some(SubspaceMessage::StatusQuery) => {
                    let token = self.state.borrow().status_token();
                    stream.write_all(&wire::encode_status_reply(token)).await?;
                }
                Some(SubspaceMessage::Dial(address)) if !address.is_empty() => {
                    tracing::info!("incoming wormhole request for {address}");
                    let _ = self
                        .events
                        .send(SessionEvent::WormholeOpened(Direction::Incoming))
                        .await;
                }
                Some(SubspaceMessage::CentreButtonIncoming) => {
                    tracing::info!("remote gate pressed its centre button");
                    let _ = self.events.send(SessionEvent::WormholeClosed).await;
                }
                Some(SubspaceMessage::Dial(_)) | None => {
                    tracing::warn!("unrecognized subspace payload: {payload:?}");
                }
            }
        }
    }

    /// Read one framed payload; `None` on a clean EOF before a header.
    async fn read_frame(&self, stream: &mut TcpStream) -> anyhow::Result<Option<String>> {
        let mut header = [0u8; HEADER_LEN];
        match timeout(self.timeout, stream.read_exact(&mut header)).await {
            Err(_) => return Err(anyhow!("idle connection timed out")),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Ok(Err(e)) => return Err(e.into()),
            Ok(Ok(_)) => {}
        }

        let len = wire::decode_header(&header)?;
        anyhow::ensure!(len <= MAX_PAYLOAD_BYTES, "oversized frame: {len} bytes");

        let mut payload = vec![0u8; len];
        timeout(self.timeout, stream.read_exact(&mut payload))
            .await
            .map_err(|_| anyhow!("payload read timed out"))??;
        Ok(Some(String::from_utf8(payload)?))
    }
}
