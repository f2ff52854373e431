//! # Native Device Layout
//!
//! Linux input codes used by the virtual controller, and the grouping of
//! axes into frames that are always emitted together.
//!
//! ## Gamepad codes
//!
//! | Axis / button | Code |
//! |---------------|------|
//! | `left_x` / `left_y` | `ABS_X` / `ABS_Y` |
//! | `right_x` / `right_y` | `ABS_RX` / `ABS_RY` |
//! | `left_trigger` / `right_trigger` | `ABS_Z` / `ABS_RZ` |
//! | a / b / x / y | `BTN_SOUTH` / `BTN_EAST` / `BTN_NORTH` / `BTN_WEST` |
//!
//! A custom device takes its codes from [`CUSTOM_AXIS_CODES`] in order.

use evdev::{AbsoluteAxisType, Key};

use super::GamepadButton;
use crate::mapping::axis::{AxisId, GamepadAxis, Topology, MAX_CUSTOM_AXES};

/// Absolute axis codes for custom device axes 0..32.
///
/// Multitouch codes (0x2f and up) are skipped so the device is never
/// mistaken for a touchscreen. The tablet codes (PRESSURE .. TOOL_WIDTH) make
/// some joystick stacks classify the device as a stylus, so they come last
/// and are only used by devices with more than 27 axes.
pub const CUSTOM_AXIS_CODES: [u16; MAX_CUSTOM_AXES as usize] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, // X .. BRAKE
    0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, // HAT0X .. HAT3Y
    0x0b, 0x0c, 0x0d, 0x0e, 0x0f, // unnamed
    0x20, 0x21, 0x28, // VOLUME, PROFILE, MISC
    0x18, 0x19, 0x1a, 0x1b, 0x1c, // PRESSURE .. TOOL_WIDTH
];

/// Custom axis count that stays clear of the tablet codes.
pub const TABLET_FREE_AXES: usize = 27;

/// Native code for a gamepad axis.
#[must_use]
pub fn gamepad_axis_code(axis: GamepadAxis) -> AbsoluteAxisType {
    match axis {
        GamepadAxis::LeftX => AbsoluteAxisType::ABS_X,
        GamepadAxis::LeftY => AbsoluteAxisType::ABS_Y,
        GamepadAxis::RightX => AbsoluteAxisType::ABS_RX,
        GamepadAxis::RightY => AbsoluteAxisType::ABS_RY,
        GamepadAxis::LeftTrigger => AbsoluteAxisType::ABS_Z,
        GamepadAxis::RightTrigger => AbsoluteAxisType::ABS_RZ,
    }
}

/// Native code for any axis, `None` for an index past the code table.
#[must_use]
pub fn axis_code(axis: AxisId) -> Option<AbsoluteAxisType> {
    match axis {
        AxisId::Gamepad(axis) => Some(gamepad_axis_code(axis)),
        AxisId::Custom(index) => CUSTOM_AXIS_CODES
            .get(index as usize)
            .map(|&code| AbsoluteAxisType(code)),
    }
}

/// Native key for a face button.
#[must_use]
pub fn button_code(button: GamepadButton) -> Key {
    match button {
        GamepadButton::A => Key::BTN_SOUTH,
        GamepadButton::B => Key::BTN_EAST,
        GamepadButton::X => Key::BTN_NORTH,
        GamepadButton::Y => Key::BTN_WEST,
    }
}

/// Axes that share a frame with `axis`, including `axis` itself.
///
/// Stick halves travel together so a game never reads a diagonal with one
/// stale component. Custom axes pair up as (2k, 2k+1).
#[must_use]
pub fn frame_of(topology: Topology, axis: AxisId) -> Vec<AxisId> {
    match (topology, axis) {
        (Topology::FixedGamepad, AxisId::Gamepad(pad)) => match pad.stick_partner() {
            Some(partner) if partner < pad => vec![AxisId::Gamepad(partner), axis],
            Some(partner) => vec![axis, AxisId::Gamepad(partner)],
            None => vec![axis],
        },
        (Topology::CustomDevice { axis_count }, AxisId::Custom(index)) => {
            let first = index - index % 2;
            if first + 1 < axis_count {
                vec![AxisId::Custom(first), AxisId::Custom(first + 1)]
            } else {
                vec![AxisId::Custom(first)]
            }
        }
        _ => vec![axis],
    }
}
