//! # Virtual Device Module
//!
//! The emulated game controller that routed axis values are written to.
//!
//! This module handles:
//! - Keeping the current value of every output axis and button
//! - Converting values to the native 0..32767 encoding
//! - Emitting stick pairs as single synchronized frames
//! - Falling back to a discarding backend when uinput is unavailable

pub mod controller;
pub mod layout;
pub mod sink;

use std::fmt;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::mapping::axis::{AxisId, Topology};
use crate::mapping::router::AxisWrite;

pub use controller::VirtualController;
pub use sink::{EventSink, NullSink, UinputSink};

/// Face buttons of the gamepad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GamepadButton {
    A,
    B,
    X,
    Y,
}

impl GamepadButton {
    pub const ALL: [GamepadButton; 4] = [
        GamepadButton::A,
        GamepadButton::B,
        GamepadButton::X,
        GamepadButton::Y,
    ];

    /// Parses a button name, case-insensitive.
    ///
    /// # Examples
    ///
    /// ```
    /// use gyropad_bridge::device::GamepadButton;
    ///
    /// assert_eq!(GamepadButton::parse("A"), Some(GamepadButton::A));
    /// assert_eq!(GamepadButton::parse("start"), None);
    /// ```
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "a" => Some(GamepadButton::A),
            "b" => Some(GamepadButton::B),
            "x" => Some(GamepadButton::X),
            "y" => Some(GamepadButton::Y),
            _ => None,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for GamepadButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GamepadButton::A => "a",
            GamepadButton::B => "b",
            GamepadButton::X => "x",
            GamepadButton::Y => "y",
        };
        f.write_str(name)
    }
}

/// Platform facility behind the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Linux `/dev/uinput`.
    Uinput,
    /// Accepts writes and discards them.
    Null,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Uinput => f.write_str("uinput"),
            BackendKind::Null => f.write_str("null"),
        }
    }
}

/// Current output of the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceState {
    topology: Topology,
    axes: Vec<f64>,
    buttons: [bool; 4],
}

impl DeviceState {
    /// All axes neutral, all buttons released.
    #[must_use]
    pub fn new(topology: Topology) -> Self {
        Self {
            topology,
            axes: vec![0.0; topology.axis_count()],
            buttons: [false; 4],
        }
    }

    /// Value of an axis, `None` if the axis is not part of the topology.
    #[must_use]
    pub fn axis(&self, axis: AxisId) -> Option<f64> {
        self.topology.slot(axis).map(|slot| self.axes[slot])
    }

    #[must_use]
    pub fn is_pressed(&self, button: GamepadButton) -> bool {
        self.buttons[button.index()]
    }

    pub(crate) fn set_axis(&mut self, axis: AxisId, value: f64) -> bool {
        match self.topology.slot(axis) {
            Some(slot) => {
                self.axes[slot] = value;
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_button(&mut self, button: GamepadButton, pressed: bool) {
        self.buttons[button.index()] = pressed;
    }

    pub(crate) fn clear(&mut self) {
        self.axes.iter_mut().for_each(|value| *value = 0.0);
        self.buttons = [false; 4];
    }
}

/// Capability interface of the emulated controller.
///
/// All methods run on the engine thread. Write errors are reported to the
/// caller but leave the device usable.
pub trait VirtualDeviceBackend: Send {
    /// Shape of the controller.
    fn topology(&self) -> Topology;

    /// Platform facility in use.
    fn kind(&self) -> BackendKind;

    /// Clamps `value` to the axis range and emits the axis' frame.
    ///
    /// # Errors
    ///
    /// * `InvalidAxisConfig` if the axis is not part of the topology
    /// * `Device` if the platform write failed
    fn set_axis(&mut self, axis: AxisId, value: f64) -> Result<()>;

    /// Applies a batch of writes, emitting each touched frame once.
    ///
    /// # Errors
    ///
    /// Same as [`VirtualDeviceBackend::set_axis`]. Valid writes in the batch
    /// are still applied when another one fails.
    fn set_axes(&mut self, writes: &[AxisWrite]) -> Result<()>;

    /// # Errors
    ///
    /// Returns `Device` if the platform write failed.
    fn press_button(&mut self, button: GamepadButton) -> Result<()>;

    /// # Errors
    ///
    /// Returns `Device` if the platform write failed.
    fn release_button(&mut self, button: GamepadButton) -> Result<()>;

    /// Returns every axis to neutral and releases every button.
    ///
    /// Idempotent; a no-op on a closed device.
    ///
    /// # Errors
    ///
    /// Returns `Device` if the platform write failed.
    fn reset(&mut self) -> Result<()>;

    /// Resets and releases the device handle. Safe to call repeatedly.
    fn close(&mut self);

    /// Current axis and button values.
    fn state(&self) -> &DeviceState;
}

/// Opens the controller for `topology` on the requested backend.
///
/// A uinput failure is logged once and degrades to the null backend, so this
/// never fails.
#[must_use]
pub fn open_backend(
    topology: Topology,
    kind: BackendKind,
    name: &str,
) -> Box<dyn VirtualDeviceBackend> {
    match kind {
        BackendKind::Uinput => match UinputSink::open(topology, name) {
            Ok(sink) => Box::new(VirtualController::new(
                topology,
                BackendKind::Uinput,
                Box::new(sink),
            )),
            Err(e) => {
                warn!(
                    "{}. Is the uinput module loaded and writable? Continuing with the null backend",
                    e
                );
                Box::new(VirtualController::null(topology))
            }
        },
        BackendKind::Null => {
            info!("Using null controller backend ({})", topology);
            Box::new(VirtualController::null(topology))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::axis::GamepadAxis;

    #[test]
    fn test_button_parse() {
        for button in GamepadButton::ALL {
            assert_eq!(GamepadButton::parse(&button.to_string()), Some(button));
        }
        assert_eq!(GamepadButton::parse("Y"), Some(GamepadButton::Y));
        assert_eq!(GamepadButton::parse(""), None);
    }

    #[test]
    fn test_device_state_starts_neutral() {
        let state = DeviceState::new(Topology::FixedGamepad);
        for axis in Topology::FixedGamepad.axes() {
            assert_eq!(state.axis(axis), Some(0.0));
        }
        assert!(!state.is_pressed(GamepadButton::A));
        assert_eq!(state.axis(AxisId::Custom(0)), None);
    }

    #[test]
    fn test_device_state_set_and_clear() {
        let mut state = DeviceState::new(Topology::FixedGamepad);
        assert!(state.set_axis(AxisId::Gamepad(GamepadAxis::RightY), -0.4));
        assert!(!state.set_axis(AxisId::Custom(1), 0.4));
        state.set_button(GamepadButton::B, true);

        assert_eq!(state.axis(AxisId::Gamepad(GamepadAxis::RightY)), Some(-0.4));
        assert!(state.is_pressed(GamepadButton::B));

        state.clear();
        assert_eq!(state, DeviceState::new(Topology::FixedGamepad));
    }

    #[test]
    fn test_null_backend_discards_writes() {
        let mut backend = open_backend(Topology::FixedGamepad, BackendKind::Null, "test");
        assert_eq!(backend.kind(), BackendKind::Null);
        backend
            .set_axis(AxisId::Gamepad(GamepadAxis::LeftX), 0.5)
            .unwrap();
        assert_eq!(backend.state().axis(AxisId::Gamepad(GamepadAxis::LeftX)), Some(0.5));
        backend.close();
        backend.close();
    }

    #[test]
    fn test_uinput_failure_is_device_unavailable() {
        // Only fails where /dev/uinput is missing or not writable
        if let Err(e) = UinputSink::open(Topology::CustomDevice { axis_count: 2 }, "test") {
            assert!(matches!(e, crate::error::BridgeError::DeviceUnavailable(_)));
        }

        let backend = open_backend(Topology::FixedGamepad, BackendKind::Uinput, "test");
        assert_eq!(backend.topology(), Topology::FixedGamepad);
    }

    #[test]
    fn test_backend_kind_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            backend: BackendKind,
        }
        let parsed: Wrapper = toml::from_str("backend = \"uinput\"").unwrap();
        assert_eq!(parsed.backend, BackendKind::Uinput);
        assert!(toml::from_str::<Wrapper>("backend = \"vjoy\"").is_err());
    }
}
