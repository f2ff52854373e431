//! Async front door to the engine thread.

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::config::MappingSnapshot;
use crate::error::{BridgeError, Result};
use crate::session::SessionId;
use crate::transport::protocol::ServerMessage;

/// Message processed by the engine thread, in arrival order.
#[derive(Debug)]
pub enum EngineCommand {
    Connect {
        session: SessionId,
        outbound: mpsc::Sender<ServerMessage>,
    },
    Disconnect {
        session: SessionId,
    },
    Gyro {
        session: SessionId,
        alpha: f64,
        beta: f64,
        gamma: f64,
    },
    Slider {
        session: SessionId,
        id: String,
        value: f64,
    },
    SetMain {
        session: SessionId,
        want_main: bool,
    },
    ButtonDown {
        session: SessionId,
        id: String,
    },
    ButtonUp {
        session: SessionId,
        id: String,
    },
    HideOverlay,
    Reconfigure {
        snapshot: MappingSnapshot,
        reply: oneshot::Sender<Result<()>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable handle for sending events to the engine.
///
/// Samples use `try_send` and are dropped when the queue is full; every other
/// event waits for queue space.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    pub(crate) fn new(tx: mpsc::Sender<EngineCommand>) -> Self {
        Self { tx }
    }

    async fn send(&self, command: EngineCommand) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| BridgeError::EngineStopped)
    }

    fn offer(&self, command: EngineCommand) -> bool {
        match self.tx.try_send(command) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("Engine queue full, sample dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// # Errors
    ///
    /// Returns `EngineStopped` if the engine has exited.
    pub async fn connect(
        &self,
        session: SessionId,
        outbound: mpsc::Sender<ServerMessage>,
    ) -> Result<()> {
        self.send(EngineCommand::Connect { session, outbound }).await
    }

    /// # Errors
    ///
    /// Returns `EngineStopped` if the engine has exited.
    pub async fn disconnect(&self, session: SessionId) -> Result<()> {
        self.send(EngineCommand::Disconnect { session }).await
    }

    /// Offers a gyro reading. Returns `false` if it was dropped.
    pub fn gyro_sample(&self, session: SessionId, alpha: f64, beta: f64, gamma: f64) -> bool {
        self.offer(EngineCommand::Gyro {
            session,
            alpha,
            beta,
            gamma,
        })
    }

    /// Offers a slider position. Returns `false` if it was dropped.
    pub fn slider_value(&self, session: SessionId, id: impl Into<String>, value: f64) -> bool {
        self.offer(EngineCommand::Slider {
            session,
            id: id.into(),
            value,
        })
    }

    /// # Errors
    ///
    /// Returns `EngineStopped` if the engine has exited.
    pub async fn set_main(&self, session: SessionId, want_main: bool) -> Result<()> {
        self.send(EngineCommand::SetMain { session, want_main }).await
    }

    /// # Errors
    ///
    /// Returns `EngineStopped` if the engine has exited.
    pub async fn button_down(&self, session: SessionId, id: impl Into<String>) -> Result<()> {
        self.send(EngineCommand::ButtonDown {
            session,
            id: id.into(),
        })
        .await
    }

    /// # Errors
    ///
    /// Returns `EngineStopped` if the engine has exited.
    pub async fn button_up(&self, session: SessionId, id: impl Into<String>) -> Result<()> {
        self.send(EngineCommand::ButtonUp {
            session,
            id: id.into(),
        })
        .await
    }

    /// # Errors
    ///
    /// Returns `EngineStopped` if the engine has exited.
    pub async fn hide_overlay(&self) -> Result<()> {
        self.send(EngineCommand::HideOverlay).await
    }

    /// Swaps the active mapping. Waits for the engine's verdict.
    ///
    /// # Errors
    ///
    /// * `TopologyMismatch` or `InvalidAxisConfig` if the snapshot was
    ///   rejected; the previous mapping stays active
    /// * `EngineStopped` if the engine has exited
    pub async fn reconfigure(&self, snapshot: MappingSnapshot) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::Reconfigure { snapshot, reply }).await?;
        rx.await.map_err(|_| BridgeError::EngineStopped)?
    }

    /// Resets and closes the controller, then stops the engine thread.
    ///
    /// # Errors
    ///
    /// Returns `EngineStopped` if the engine had already exited.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::Shutdown { reply }).await?;
        rx.await.map_err(|_| BridgeError::EngineStopped)
    }
}
