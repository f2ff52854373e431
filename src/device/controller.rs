//! Virtual controller: device state plus frame emission over an [`EventSink`].

use evdev::{EventType, InputEvent};
use tracing::{debug, info, warn};

use super::layout::{axis_code, button_code, frame_of};
use super::sink::{EventSink, NullSink};
use super::{BackendKind, DeviceState, GamepadButton, VirtualDeviceBackend};
use crate::error::{BridgeError, Result};
use crate::mapping::axis::{AxisId, AxisRange, Topology};
use crate::mapping::router::AxisWrite;
use crate::mapping::transform::{to_native_axis, trigger_to_native};

/// Controller of either topology writing to one event sink.
///
/// The sink is dropped on [`close`](VirtualDeviceBackend::close); after that
/// every write is rejected and the state stays frozen.
pub struct VirtualController {
    topology: Topology,
    kind: BackendKind,
    sink: Option<Box<dyn EventSink>>,
    state: DeviceState,
}

impl std::fmt::Debug for VirtualController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualController")
            .field("topology", &self.topology)
            .field("kind", &self.kind)
            .field("open", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}

impl VirtualController {
    #[must_use]
    pub fn new(topology: Topology, kind: BackendKind, sink: Box<dyn EventSink>) -> Self {
        Self {
            topology,
            kind,
            sink: Some(sink),
            state: DeviceState::new(topology),
        }
    }

    /// Controller that keeps state but discards every frame.
    #[must_use]
    pub fn null(topology: Topology) -> Self {
        Self::new(topology, BackendKind::Null, Box::new(NullSink))
    }

    fn check_open(&self) -> Result<()> {
        if self.sink.is_some() {
            Ok(())
        } else {
            Err(BridgeError::Device("controller is closed".to_string()))
        }
    }

    fn check_axis(&self, axis: AxisId) -> Result<()> {
        if self.topology.contains(axis) {
            Ok(())
        } else {
            Err(BridgeError::InvalidAxisConfig {
                entry: axis.to_string(),
                reason: format!("axis is out of bounds for topology {}", self.topology),
            })
        }
    }

    fn axis_event(&self, axis: AxisId) -> Option<InputEvent> {
        let code = axis_code(axis)?;
        let value = self.state.axis(axis)?;
        let native = match axis.range() {
            AxisRange::Bipolar => to_native_axis(value),
            AxisRange::Unipolar => trigger_to_native(value),
        };
        Some(InputEvent::new(EventType::ABSOLUTE, code.0, native))
    }

    fn emit(&mut self, events: &[InputEvent]) -> Result<()> {
        let Some(sink) = self.sink.as_mut() else {
            return Ok(());
        };
        sink.emit(events)
            .map_err(|e| BridgeError::Device(format!("write failed: {}", e)))
    }

    fn emit_frame(&mut self, frame: &[AxisId]) -> Result<()> {
        let events: Vec<InputEvent> = frame.iter().filter_map(|&axis| self.axis_event(axis)).collect();
        debug!("Frame {:?}", frame);
        self.emit(&events)
    }

    fn set_button(&mut self, button: GamepadButton, pressed: bool) -> Result<()> {
        self.check_open()?;
        self.state.set_button(button, pressed);
        let event = InputEvent::new(EventType::KEY, button_code(button).code(), i32::from(pressed));
        self.emit(&[event])
    }
}

impl VirtualDeviceBackend for VirtualController {
    fn topology(&self) -> Topology {
        self.topology
    }

    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn set_axis(&mut self, axis: AxisId, value: f64) -> Result<()> {
        self.check_open()?;
        self.check_axis(axis)?;
        self.state.set_axis(axis, axis.range().clamp(value));
        self.emit_frame(&frame_of(self.topology, axis))
    }

    fn set_axes(&mut self, writes: &[AxisWrite]) -> Result<()> {
        self.check_open()?;
        let mut first_error = None;
        let mut frames: Vec<Vec<AxisId>> = Vec::new();

        for write in writes {
            if let Err(e) = self.check_axis(write.axis) {
                first_error.get_or_insert(e);
                continue;
            }
            self.state.set_axis(write.axis, write.axis.range().clamp(write.value));

            let frame = frame_of(self.topology, write.axis);
            if !frames.contains(&frame) {
                frames.push(frame);
            }
        }

        for frame in &frames {
            if let Err(e) = self.emit_frame(frame) {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn press_button(&mut self, button: GamepadButton) -> Result<()> {
        self.set_button(button, true)
    }

    fn release_button(&mut self, button: GamepadButton) -> Result<()> {
        self.set_button(button, false)
    }

    fn reset(&mut self) -> Result<()> {
        if self.sink.is_none() {
            return Ok(());
        }

        self.state.clear();
        let mut events: Vec<InputEvent> = self
            .topology
            .axes()
            .into_iter()
            .filter_map(|axis| self.axis_event(axis))
            .collect();
        events.extend(
            GamepadButton::ALL
                .iter()
                .map(|&button| InputEvent::new(EventType::KEY, button_code(button).code(), 0)),
        );
        self.emit(&events)
    }

    fn close(&mut self) {
        if self.sink.is_none() {
            return;
        }
        if let Err(e) = self.reset() {
            warn!("Failed to reset controller before close: {}", e);
        }
        self.sink = None;
        info!("Virtual controller closed ({})", self.kind);
    }

    fn state(&self) -> &DeviceState {
        &self.state
    }
}

impl Drop for VirtualController {
    fn drop(&mut self) {
        self.close();
    }
}
