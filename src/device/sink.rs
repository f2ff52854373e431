//! Event sink abstraction for the virtual controller, so that device logic can
//! be tested without `/dev/uinput`.

use std::io;

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AbsInfo, AttributeSet, BusType, InputEvent, InputId, Key, UinputAbsSetup};
use tracing::{info, warn};

use super::layout::{axis_code, button_code, TABLET_FREE_AXES};
use super::GamepadButton;
use crate::error::{BridgeError, Result};
use crate::mapping::axis::{AxisRange, Topology};
use crate::mapping::transform::{NATIVE_AXIS_CENTER, NATIVE_AXIS_MAX, NATIVE_AXIS_MIN};

/// USB ids of a wired Xbox 360 pad; games pick their default bindings from these.
const GAMEPAD_VENDOR_ID: u16 = 0x045e;
const GAMEPAD_PRODUCT_ID: u16 = 0x028e;

/// Destination for one synchronized frame of input events.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send {
    /// Posts the events as one frame, terminated by a sync report.
    fn emit(&mut self, events: &[InputEvent]) -> io::Result<()>;
}

/// Sink that accepts and discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _events: &[InputEvent]) -> io::Result<()> {
        Ok(())
    }
}

/// Linux uinput device created through `evdev`.
pub struct UinputSink {
    device: VirtualDevice,
}

impl std::fmt::Debug for UinputSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UinputSink").finish_non_exhaustive()
    }
}

impl UinputSink {
    /// Creates a virtual controller with the axes of `topology` and the four
    /// face buttons.
    ///
    /// # Errors
    ///
    /// Returns `DeviceUnavailable` when `/dev/uinput` is missing or not
    /// writable.
    pub fn open(topology: Topology, name: &str) -> Result<Self> {
        if topology.axis_count() > TABLET_FREE_AXES {
            warn!(
                "More than {} axes use tablet axis codes; some games may see a stylus",
                TABLET_FREE_AXES
            );
        }
        let device = Self::build(topology, name)
            .map_err(|e| BridgeError::DeviceUnavailable(format!("/dev/uinput: {}", e)))?;
        info!("Created uinput device '{}' ({})", name, topology);

        Ok(Self { device })
    }

    fn build(topology: Topology, name: &str) -> io::Result<VirtualDevice> {
        let mut keys = AttributeSet::<Key>::new();
        for button in GamepadButton::ALL {
            keys.insert(button_code(button));
        }

        let mut builder = VirtualDeviceBuilder::new()?.name(name).with_keys(&keys)?;

        if topology == Topology::FixedGamepad {
            builder = builder.input_id(InputId::new(
                BusType::BUS_USB,
                GAMEPAD_VENDOR_ID,
                GAMEPAD_PRODUCT_ID,
                1,
            ));
        }

        for axis in topology.axes() {
            let Some(code) = axis_code(axis) else {
                continue;
            };
            let rest = match axis.range() {
                AxisRange::Bipolar => NATIVE_AXIS_CENTER,
                AxisRange::Unipolar => NATIVE_AXIS_MIN,
            };
            let info = AbsInfo::new(rest, NATIVE_AXIS_MIN, NATIVE_AXIS_MAX, 0, 0, 0);
            builder = builder.with_absolute_axis(&UinputAbsSetup::new(code, info))?;
        }

        builder.build()
    }
}

impl EventSink for UinputSink {
    fn emit(&mut self, events: &[InputEvent]) -> io::Result<()> {
        self.device.emit(events)
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Recording sink for testing; every `emit` call is one stored frame.
    #[derive(Clone, Default)]
    pub struct RecordingSink {
        pub frames: Arc<Mutex<Vec<Vec<InputEvent>>>>,
        pub emit_error: Arc<Mutex<Option<io::ErrorKind>>>,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn get_frames(&self) -> Vec<Vec<InputEvent>> {
            self.frames.lock().unwrap().clone()
        }

        pub fn set_emit_error(&self, error: Option<io::ErrorKind>) {
            *self.emit_error.lock().unwrap() = error;
        }
    }

    impl EventSink for RecordingSink {
        fn emit(&mut self, events: &[InputEvent]) -> io::Result<()> {
            if let Some(error) = *self.emit_error.lock().unwrap() {
                return Err(io::Error::new(error, "Mock emit error"));
            }
            self.frames.lock().unwrap().push(events.to_vec());
            Ok(())
        }
    }
}
