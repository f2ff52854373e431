//! # Engine Module
//!
//! The single owner of all mapping state. Router, controller, sessions,
//! slider cache and telemetry live on one dedicated thread that processes
//! [`EngineCommand`]s in arrival order, so a route always sees one complete
//! mapping and device writes never run on the async runtime.
//!
//! ## Event handling
//!
//! | Event | Effect |
//! |-------|--------|
//! | connect | register session, ask it about the main role (driving mode) |
//! | gyro | main session only: overlay readout, route alpha/beta/gamma, zero unbound axes |
//! | slider | overlay label, route, hide overlay when an auto-center slider rests |
//! | button down / up | overlay, gamepad button, key combination on release |
//! | reconfigure | atomic mapping swap, zero released and unbound axes |
//! | shutdown | reset and close the controller, stop |

pub mod handle;

use std::collections::HashMap;
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::{LayoutEntry, MappingSnapshot, Mode};
use crate::device::VirtualDeviceBackend;
use crate::error::Result;
use crate::keystroke::{KeystrokeSink, LoggingKeystrokeSink};
use crate::mapping::axis::{AxisId, Topology};
use crate::mapping::router::{AxisRouter, AxisWrite};
use crate::mapping::source::{GyroAxis, Sample};
use crate::overlay::{OverlayCommand, OverlayHandle};
use crate::session::{InputSessionRegistry, SessionId};
use crate::telemetry::AxisLogger;
use crate::transport::protocol::ServerMessage;

pub use handle::{EngineCommand, EngineHandle};

/// Distance from an auto-center slider's rest value that counts as resting.
const SLIDER_REST_EPSILON: f64 = 1e-3;

/// Mapping engine state. Construct, configure, then [`spawn`](Engine::spawn).
pub struct Engine {
    mode: Mode,
    router: AxisRouter,
    device: Box<dyn VirtualDeviceBackend>,
    registry: InputSessionRegistry,
    layout: HashMap<String, LayoutEntry>,
    slider_cache: HashMap<String, f64>,
    overlay: OverlayHandle,
    telemetry: Option<AxisLogger>,
    keystrokes: Box<dyn KeystrokeSink>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("mode", &self.mode)
            .field("router", &self.router)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Creates an engine for `snapshot` writing to `device`.
    ///
    /// The overlay is disabled, telemetry is off and keystrokes are only
    /// logged until replaced with the `with_*` methods.
    ///
    /// # Errors
    ///
    /// * `TopologyMismatch` if the device was opened for another topology
    /// * `InvalidAxisConfig` if the snapshot does not validate, including a
    ///   slider binding missing from the layout
    pub fn new(
        mode: Mode,
        snapshot: MappingSnapshot,
        device: Box<dyn VirtualDeviceBackend>,
    ) -> Result<Self> {
        if device.topology() != snapshot.topology {
            return Err(crate::error::BridgeError::TopologyMismatch {
                active: device.topology().to_string(),
                requested: snapshot.topology.to_string(),
            });
        }
        snapshot.validate()?;
        let router = AxisRouter::new(snapshot.topology, snapshot.axes)?;

        Ok(Self {
            mode,
            router,
            device,
            registry: InputSessionRegistry::new(),
            layout: index_layout(snapshot.layout),
            slider_cache: HashMap::new(),
            overlay: OverlayHandle::disabled(),
            telemetry: None,
            keystrokes: Box::new(LoggingKeystrokeSink),
        })
    }

    #[must_use]
    pub fn with_overlay(mut self, overlay: OverlayHandle) -> Self {
        self.overlay = overlay;
        self
    }

    #[must_use]
    pub fn with_telemetry(mut self, telemetry: AxisLogger) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    #[must_use]
    pub fn with_keystrokes(mut self, keystrokes: Box<dyn KeystrokeSink>) -> Self {
        self.keystrokes = keystrokes;
        self
    }

    /// Moves the engine onto its own thread.
    ///
    /// The thread exits on [`EngineHandle::shutdown`] or once every handle is
    /// dropped; either way the controller is closed.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the thread cannot be spawned.
    pub fn spawn(mut self, queue_size: usize) -> Result<(EngineHandle, thread::JoinHandle<()>)> {
        let (tx, mut rx) = mpsc::channel(queue_size.max(1));

        let join = thread::Builder::new()
            .name("gyropad-engine".to_string())
            .spawn(move || {
                info!(
                    "Engine started: {} on {} backend, {} axis bindings",
                    self.router.topology(),
                    self.device.kind(),
                    self.router.configs().len()
                );
                self.write_unbound();

                while let Some(command) = rx.blocking_recv() {
                    if !self.handle(command) {
                        break;
                    }
                }
                self.stop();
                info!("Engine stopped");
            })?;

        Ok((EngineHandle::new(tx), join))
    }

    /// Processes one command. Returns `false` once the engine should stop.
    pub fn handle(&mut self, command: EngineCommand) -> bool {
        match command {
            EngineCommand::Connect { session, outbound } => self.on_connect(session, outbound),
            EngineCommand::Disconnect { session } => {
                self.registry.disconnect(session);
            }
            EngineCommand::Gyro {
                session,
                alpha,
                beta,
                gamma,
            } => self.on_gyro(session, alpha, beta, gamma),
            EngineCommand::Slider { session, id, value } => self.on_slider(session, &id, value),
            EngineCommand::SetMain { session, want_main } => {
                let result = if want_main {
                    self.registry.elect_main(session)
                } else {
                    self.registry.resign_main(session)
                };
                if let Err(e) = result {
                    warn!("set_main from {} ignored: {}", session, e);
                }
            }
            EngineCommand::ButtonDown { session, id } => self.on_button_down(session, &id),
            EngineCommand::ButtonUp { session, id } => self.on_button_up(session, &id),
            EngineCommand::HideOverlay => {
                self.overlay.hide();
            }
            EngineCommand::Reconfigure { snapshot, reply } => {
                let result = self.reconfigure(snapshot);
                if let Err(e) = &result {
                    warn!("Reconfiguration rejected: {}", e);
                }
                let _ = reply.send(result);
            }
            EngineCommand::Shutdown { reply } => {
                self.stop();
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    fn on_connect(&mut self, session: SessionId, outbound: mpsc::Sender<ServerMessage>) {
        self.registry.connect(session, outbound);
        if self.mode == Mode::Driving {
            let current_main = self.registry.main_session().is_some();
            self.registry
                .notify(session, ServerMessage::AskMainDevice { current_main });
        }
    }

    fn on_gyro(&mut self, session: SessionId, alpha: f64, beta: f64, gamma: f64) {
        if !self.registry.is_main(session) {
            return;
        }
        self.overlay.post(OverlayCommand::Gyro { alpha, beta, gamma });

        if self.mode != Mode::Driving {
            return;
        }

        let mut writes = Vec::new();
        for (axis, degrees) in GyroAxis::ALL.into_iter().zip([alpha, beta, gamma]) {
            writes.extend(self.router.route(&Sample::gyro(axis, degrees)));
        }
        if self.router.topology() == Topology::FixedGamepad {
            writes.extend(self.router.unbound_writes());
        }
        self.apply(&writes);
    }

    fn on_slider(&mut self, session: SessionId, id: &str, value: f64) {
        debug!("Slider {} = {:.3} from {}", id, value, session);
        self.slider_cache.insert(id.to_string(), value);

        let entry = self.layout.get(id);
        let label = entry.map_or(id, |e| e.display_label());
        self.overlay.show(format!("{}: {:.2}", label, value));

        let resting = entry
            .filter(|e| e.auto_center)
            .map_or(false, |e| (value - e.range_mode.rest_value()).abs() < SLIDER_REST_EPSILON);

        if self.mode == Mode::Driving {
            let writes = self.router.route(&Sample::slider(id, value));
            if writes.is_empty() {
                debug!("Slider {} is not mapped to an axis", id);
            }
            self.apply(&writes);
        }

        if resting {
            self.overlay.hide();
        }
    }

    fn on_button_down(&mut self, session: SessionId, id: &str) {
        let entry = self.layout.get(id);
        let label = entry.map_or(id, |e| e.display_label());
        debug!("Button {} down from {}", id, session);
        self.overlay.show(format!("Holding: {}", label));

        if let Some(button) = entry.and_then(LayoutEntry::button) {
            if let Err(e) = self.device.press_button(button) {
                warn!("Failed to press {}: {}", button, e);
            }
        }
    }

    fn on_button_up(&mut self, session: SessionId, id: &str) {
        info!("Button released: {} ({})", id, session);
        self.overlay.hide();

        let Some(entry) = self.layout.get(id) else {
            debug!("Button {} is not in the layout", id);
            return;
        };
        if let Some(button) = entry.button() {
            if let Err(e) = self.device.release_button(button) {
                warn!("Failed to release {}: {}", button, e);
            }
        }
        if let Err(e) = self.keystrokes.execute(&entry.keys) {
            warn!("Key combination for {} failed: {}", id, e);
        }
    }

    fn reconfigure(&mut self, snapshot: MappingSnapshot) -> Result<()> {
        snapshot.validate()?;
        let previous: Vec<AxisId> = self.router.configs().iter().map(|cfg| cfg.output_axis).collect();

        self.router.reconfigure(snapshot.topology, snapshot.axes)?;
        self.layout = index_layout(snapshot.layout);

        // Axes the new table no longer drives would otherwise hold their last value
        let active = self.router.configs();
        let mut writes: Vec<AxisWrite> = previous
            .into_iter()
            .filter(|axis| !active.iter().any(|cfg| cfg.output_axis == *axis))
            .map(|axis| AxisWrite { axis, value: 0.0 })
            .collect();
        for write in &writes {
            debug!("Axis {} released by reconfiguration", write.axis);
        }
        writes.extend(self.router.unbound_writes());
        self.apply(&writes);
        Ok(())
    }

    fn write_unbound(&mut self) {
        let writes = self.router.unbound_writes();
        self.apply(&writes);
    }

    fn apply(&mut self, writes: &[AxisWrite]) {
        if writes.is_empty() {
            return;
        }
        if let Err(e) = self.device.set_axes(writes) {
            warn!("Controller write failed, sample dropped: {}", e);
            return;
        }
        if let Some(telemetry) = self.telemetry.as_mut() {
            if let Err(e) = telemetry.record(writes) {
                error!("Telemetry write failed, disabling telemetry: {}", e);
                self.telemetry = None;
            }
        }
    }

    fn stop(&mut self) {
        self.device.close();
        if let Some(telemetry) = self.telemetry.as_mut() {
            if let Err(e) = telemetry.flush() {
                warn!("Failed to flush telemetry: {}", e);
            }
        }
    }

    /// Last value received from a slider.
    #[must_use]
    pub fn slider_value(&self, id: &str) -> Option<f64> {
        self.slider_cache.get(id).copied()
    }
}

fn index_layout(layout: Vec<LayoutEntry>) -> HashMap<String, LayoutEntry> {
    layout.into_iter().map(|e| (e.id.clone(), e)).collect()
}
