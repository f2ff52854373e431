//! # Overlay Module
//!
//! On-screen notification feed. The engine posts commands to a bounded queue
//! without ever blocking; a background task drains the queue into an
//! [`OverlayRenderer`].
//!
//! Drops are counted, not reported: the overlay is advisory and a full queue
//! just means the renderer is behind.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Command for the overlay worker.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayCommand {
    /// Show `text`, replacing whatever is on screen.
    Show(String),
    Hide,
    /// Live orientation readout of the main device.
    Gyro { alpha: f64, beta: f64, gamma: f64 },
    /// Stop the worker.
    Quit,
}

/// Draws overlay commands.
#[cfg_attr(test, mockall::automock)]
pub trait OverlayRenderer: Send {
    fn show(&mut self, text: &str);
    fn hide(&mut self);
    fn gyro(&mut self, alpha: f64, beta: f64, gamma: f64);
}

/// Renderer that writes the overlay to the log.
#[derive(Debug, Default)]
pub struct LogRenderer {
    visible: bool,
}

impl OverlayRenderer for LogRenderer {
    fn show(&mut self, text: &str) {
        self.visible = true;
        info!("[overlay] {}", text);
    }

    fn hide(&mut self) {
        if self.visible {
            debug!("[overlay] hidden");
        }
        self.visible = false;
    }

    fn gyro(&mut self, alpha: f64, beta: f64, gamma: f64) {
        debug!("[overlay] alpha={:.1} beta={:.1} gamma={:.1}", alpha, beta, gamma);
    }
}

/// Cheap, cloneable sender side of the overlay queue.
#[derive(Debug, Clone)]
pub struct OverlayHandle {
    tx: Option<mpsc::Sender<OverlayCommand>>,
    dropped: Arc<AtomicU64>,
}

impl OverlayHandle {
    /// Handle that discards every command.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            tx: None,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Bounded queue and the receiving end a worker drains.
    #[must_use]
    pub fn channel(queue_size: usize) -> (Self, mpsc::Receiver<OverlayCommand>) {
        let (tx, rx) = mpsc::channel(queue_size.max(1));
        let handle = Self {
            tx: Some(tx),
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (handle, rx)
    }

    /// Posts a command without waiting. Returns whether it was queued.
    pub fn post(&self, command: OverlayCommand) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        match tx.try_send(command) {
            Ok(()) => true,
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn show(&self, text: impl Into<String>) -> bool {
        self.post(OverlayCommand::Show(text.into()))
    }

    pub fn hide(&self) -> bool {
        self.post(OverlayCommand::Hide)
    }

    /// Number of commands dropped because the queue was full or closed.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Running overlay task.
#[derive(Debug)]
pub struct OverlayWorker {
    handle: OverlayHandle,
    task: JoinHandle<()>,
}

impl OverlayWorker {
    /// Spawns the worker on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn spawn<R>(queue_size: usize, renderer: R) -> Self
    where
        R: OverlayRenderer + 'static,
    {
        let (handle, rx) = OverlayHandle::channel(queue_size);
        let task = tokio::spawn(run(rx, renderer));
        info!("Overlay worker started (queue size {})", queue_size);

        Self { handle, task }
    }

    #[must_use]
    pub fn handle(&self) -> OverlayHandle {
        self.handle.clone()
    }

    /// Asks the worker to quit, waits up to `grace`, then aborts it.
    ///
    /// Returns `true` if the worker exited on its own.
    pub async fn shutdown(self, grace: Duration) -> bool {
        let Self { handle, mut task } = self;

        if let Some(tx) = &handle.tx {
            // Quit must not be lost to a full queue, so wait for room up to the grace period
            let _ = tokio::time::timeout(grace, tx.send(OverlayCommand::Quit)).await;
        }

        match tokio::time::timeout(grace, &mut task).await {
            Ok(_) => {
                info!(
                    "Overlay worker stopped ({} commands dropped)",
                    handle.dropped()
                );
                true
            }
            Err(_) => {
                warn!("Overlay worker did not stop within {:?}, aborting", grace);
                task.abort();
                false
            }
        }
    }
}

async fn run<R: OverlayRenderer>(mut rx: mpsc::Receiver<OverlayCommand>, mut renderer: R) {
    while let Some(command) = rx.recv().await {
        match command {
            OverlayCommand::Show(text) => renderer.show(&text),
            OverlayCommand::Hide => renderer.hide(),
            OverlayCommand::Gyro { alpha, beta, gamma } => renderer.gyro(alpha, beta, gamma),
            OverlayCommand::Quit => break,
        }
    }
    renderer.hide();
    debug!("Overlay worker exiting");
}
