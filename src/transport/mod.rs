//! # Transport Module
//!
//! TCP listener for phone sessions. Each connection is one session speaking
//! the newline-delimited JSON [`protocol`].
//!
//! Per connection:
//! - a reader loop parses lines and forwards them to the engine
//! - a writer task drains the session's outbound queue onto the socket
//! - EOF or a read error disconnects the session
//!
//! A failed `accept` is logged and retried after [`ACCEPT_BACKOFF`]; only the
//! shutdown future ends the listener.

pub mod protocol;

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::EngineHandle;
use crate::error::Result;
use crate::session::SessionId;
use protocol::{ClientMessage, ServerMessage};

/// Pause after a failed accept so a persistent error (e.g. fd exhaustion)
/// does not spin the loop.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Source of incoming phone connections.
pub trait Accept: Send {
    fn accept(&mut self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send;
}

impl Accept for TcpListener {
    fn accept(&mut self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        TcpListener::accept(self)
    }
}

/// Accepts sessions until `shutdown` resolves.
///
/// Accept errors are transient from the bridge's point of view: they are
/// logged and the loop keeps listening. Per-connection errors are only logged.
pub async fn serve<L, F>(mut listener: L, engine: EngineHandle, queue_size: usize, shutdown: F)
where
    L: Accept,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let mut next_id: u64 = 0;
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("Accept failed, retrying in {:?}: {}", ACCEPT_BACKOFF, e);
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                };
                next_id += 1;
                let session = SessionId(next_id);
                info!("{} connected from {}", session, peer);

                let engine = engine.clone();
                tokio::spawn(async move {
                    if let Err(e) = run_session(stream, session, engine, queue_size).await {
                        warn!("{} ended with error: {}", session, e);
                    }
                });
            }
            () = &mut shutdown => {
                info!("Listener stopped");
                return;
            }
        }
    }
}

async fn run_session(
    stream: TcpStream,
    session: SessionId,
    engine: EngineHandle,
    queue_size: usize,
) -> Result<()> {
    let (reader, writer) = stream.into_split();
    let (outbound, outbound_rx) = mpsc::channel(queue_size.max(1));
    let writer_task = tokio::spawn(write_loop(writer, outbound_rx, session));

    engine.connect(session, outbound.clone()).await?;

    let mut lines = BufReader::new(reader).lines();
    let result = loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(e) => break Err(e.into()),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<ClientMessage>(line) {
            Ok(message) => {
                if let Err(e) = dispatch(&engine, session, message).await {
                    break Err(e);
                }
            }
            Err(e) => {
                debug!("{} sent an invalid message: {}", session, e);
                let _ = outbound.try_send(ServerMessage::Error {
                    message: format!("invalid message: {}", e),
                });
            }
        }
    };

    info!("{} disconnected", session);
    let _ = engine.disconnect(session).await;
    drop(outbound);
    let _ = writer_task.await;
    result
}

async fn dispatch(engine: &EngineHandle, session: SessionId, message: ClientMessage) -> Result<()> {
    match message {
        ClientMessage::GyroData { alpha, beta, gamma } => {
            engine.gyro_sample(session, alpha, beta, gamma);
        }
        ClientMessage::SliderValue { id, value } => {
            engine.slider_value(session, id, value);
        }
        ClientMessage::SetMainDevice { is_main } => engine.set_main(session, is_main).await?,
        ClientMessage::ButtonDown { id } => engine.button_down(session, id).await?,
        ClientMessage::ButtonUp { id } => engine.button_up(session, id).await?,
        ClientMessage::HideOverlay => engine.hide_overlay().await?,
    }
    Ok(())
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<ServerMessage>,
    session: SessionId,
) {
    while let Some(message) = outbound.recv().await {
        let line = match message.to_line() {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to encode message for {}: {}", session, e);
                continue;
            }
        };
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            debug!("Write to {} failed: {}", session, e);
            break;
        }
    }
    let _ = writer.shutdown().await;
}
