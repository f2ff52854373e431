//! # Axis and Topology Types
//!
//! Output-side vocabulary of the mapping engine: which axes exist on the
//! emulated controller, which range each one accepts, and how the two
//! controller shapes lay them out.
//!
//! ## Fixed gamepad layout
//!
//! | Axis | Range | Stick pair |
//! |------|-------|------------|
//! | `left_x` | -1.0..1.0 | left |
//! | `left_y` | -1.0..1.0 | left |
//! | `right_x` | -1.0..1.0 | right |
//! | `right_y` | -1.0..1.0 | right |
//! | `left_trigger` | 0.0..1.0 | - |
//! | `right_trigger` | 0.0..1.0 | - |
//!
//! A custom device exposes 1 to 32 bipolar axes addressed by index.

use std::fmt;

/// Largest axis count a custom device may declare.
pub const MAX_CUSTOM_AXES: u8 = 32;

/// Value range accepted by an output axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisRange {
    /// Stick-like axis, -1.0 to 1.0 with 0.0 at rest.
    Bipolar,
    /// Trigger-like axis, 0.0 (released) to 1.0 (fully pressed).
    Unipolar,
}

impl AxisRange {
    /// Clamps a value into this range. NaN collapses to the neutral value.
    #[must_use]
    pub fn clamp(self, value: f64) -> f64 {
        if value.is_nan() {
            return self.neutral();
        }
        match self {
            AxisRange::Bipolar => value.clamp(-1.0, 1.0),
            AxisRange::Unipolar => value.clamp(0.0, 1.0),
        }
    }

    /// Rest value for this range.
    #[must_use]
    pub fn neutral(self) -> f64 {
        0.0
    }
}

/// The six canonical axes of the fixed gamepad topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GamepadAxis {
    LeftX,
    LeftY,
    RightX,
    RightY,
    LeftTrigger,
    RightTrigger,
}

impl GamepadAxis {
    /// All gamepad axes in slot order.
    pub const ALL: [GamepadAxis; 6] = [
        GamepadAxis::LeftX,
        GamepadAxis::LeftY,
        GamepadAxis::RightX,
        GamepadAxis::RightY,
        GamepadAxis::LeftTrigger,
        GamepadAxis::RightTrigger,
    ];

    /// Configuration name of the axis.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            GamepadAxis::LeftX => "left_x",
            GamepadAxis::LeftY => "left_y",
            GamepadAxis::RightX => "right_x",
            GamepadAxis::RightY => "right_y",
            GamepadAxis::LeftTrigger => "left_trigger",
            GamepadAxis::RightTrigger => "right_trigger",
        }
    }

    /// Looks up an axis by its configuration name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|axis| axis.name() == name)
    }

    /// Accepted value range.
    #[must_use]
    pub fn range(self) -> AxisRange {
        match self {
            GamepadAxis::LeftTrigger | GamepadAxis::RightTrigger => AxisRange::Unipolar,
            _ => AxisRange::Bipolar,
        }
    }

    /// Index into device state.
    #[must_use]
    pub fn slot(self) -> usize {
        self as usize
    }

    /// The other half of this axis' stick, if it belongs to one.
    #[must_use]
    pub fn stick_partner(self) -> Option<GamepadAxis> {
        match self {
            GamepadAxis::LeftX => Some(GamepadAxis::LeftY),
            GamepadAxis::LeftY => Some(GamepadAxis::LeftX),
            GamepadAxis::RightX => Some(GamepadAxis::RightY),
            GamepadAxis::RightY => Some(GamepadAxis::RightX),
            GamepadAxis::LeftTrigger | GamepadAxis::RightTrigger => None,
        }
    }
}

/// Address of one output axis on either topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AxisId {
    /// Named axis of the fixed gamepad.
    Gamepad(GamepadAxis),
    /// Zero-based axis index of a custom device.
    Custom(u8),
}

impl AxisId {
    /// Parses a mapping key: an axis name (`"left_x"`) or a custom index (`"3"`).
    ///
    /// # Examples
    ///
    /// ```
    /// use gyropad_bridge::mapping::axis::{AxisId, GamepadAxis};
    ///
    /// assert_eq!(AxisId::parse("left_x"), Some(AxisId::Gamepad(GamepadAxis::LeftX)));
    /// assert_eq!(AxisId::parse("3"), Some(AxisId::Custom(3)));
    /// assert_eq!(AxisId::parse("wheel"), None);
    /// ```
    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        if let Some(axis) = GamepadAxis::from_name(key) {
            return Some(AxisId::Gamepad(axis));
        }
        key.parse::<u8>().ok().map(AxisId::Custom)
    }

    /// Accepted value range. Custom axes are always bipolar.
    #[must_use]
    pub fn range(self) -> AxisRange {
        match self {
            AxisId::Gamepad(axis) => axis.range(),
            AxisId::Custom(_) => AxisRange::Bipolar,
        }
    }
}

impl fmt::Display for AxisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisId::Gamepad(axis) => f.write_str(axis.name()),
            AxisId::Custom(index) => write!(f, "axis{}", index),
        }
    }
}

/// Shape of the emulated controller. Chosen once per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// Xbox-style pad: two sticks, two triggers, four face buttons.
    FixedGamepad,
    /// Generic joystick with `axis_count` bipolar axes.
    CustomDevice { axis_count: u8 },
}

impl Topology {
    /// Number of output axes.
    #[must_use]
    pub fn axis_count(self) -> usize {
        match self {
            Topology::FixedGamepad => GamepadAxis::ALL.len(),
            Topology::CustomDevice { axis_count } => axis_count as usize,
        }
    }

    /// Whether the axis exists on this topology.
    #[must_use]
    pub fn contains(self, axis: AxisId) -> bool {
        self.slot(axis).is_some()
    }

    /// Device state index of an axis, `None` when the axis is not part of this topology.
    #[must_use]
    pub fn slot(self, axis: AxisId) -> Option<usize> {
        match (self, axis) {
            (Topology::FixedGamepad, AxisId::Gamepad(axis)) => Some(axis.slot()),
            (Topology::CustomDevice { axis_count }, AxisId::Custom(index))
                if index < axis_count =>
            {
                Some(index as usize)
            }
            _ => None,
        }
    }

    /// Every axis of the topology in slot order.
    #[must_use]
    pub fn axes(self) -> Vec<AxisId> {
        match self {
            Topology::FixedGamepad => GamepadAxis::ALL.into_iter().map(AxisId::Gamepad).collect(),
            Topology::CustomDevice { axis_count } => (0..axis_count).map(AxisId::Custom).collect(),
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topology::FixedGamepad => f.write_str("gamepad"),
            Topology::CustomDevice { axis_count } => write!(f, "custom({} axes)", axis_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gamepad_axis_names_round_trip() {
        for axis in GamepadAxis::ALL {
            assert_eq!(GamepadAxis::from_name(axis.name()), Some(axis));
        }
        assert_eq!(GamepadAxis::from_name("throttle"), None);
    }

    #[test]
    fn test_trigger_axes_are_unipolar() {
        assert_eq!(GamepadAxis::LeftTrigger.range(), AxisRange::Unipolar);
        assert_eq!(GamepadAxis::RightTrigger.range(), AxisRange::Unipolar);
        assert_eq!(GamepadAxis::LeftX.range(), AxisRange::Bipolar);
        assert_eq!(AxisId::Custom(5).range(), AxisRange::Bipolar);
    }

    #[test]
    fn test_range_clamp() {
        assert_eq!(AxisRange::Bipolar.clamp(1.7), 1.0);
        assert_eq!(AxisRange::Bipolar.clamp(-3.0), -1.0);
        assert_eq!(AxisRange::Unipolar.clamp(-0.4), 0.0);
        assert_eq!(AxisRange::Unipolar.clamp(0.4), 0.4);
        assert_eq!(AxisRange::Bipolar.clamp(f64::NAN), 0.0);
    }

    #[test]
    fn test_stick_partners() {
        assert_eq!(GamepadAxis::LeftX.stick_partner(), Some(GamepadAxis::LeftY));
        assert_eq!(GamepadAxis::RightY.stick_partner(), Some(GamepadAxis::RightX));
        assert_eq!(GamepadAxis::LeftTrigger.stick_partner(), None);
    }

    #[test]
    fn test_parse_axis_keys() {
        assert_eq!(AxisId::parse("right_trigger"), Some(AxisId::Gamepad(GamepadAxis::RightTrigger)));
        assert_eq!(AxisId::parse("0"), Some(AxisId::Custom(0)));
        assert_eq!(AxisId::parse("31"), Some(AxisId::Custom(31)));
        assert_eq!(AxisId::parse("-1"), None);
        assert_eq!(AxisId::parse(""), None);
    }

    #[test]
    fn test_fixed_gamepad_bounds() {
        let topology = Topology::FixedGamepad;
        assert_eq!(topology.axis_count(), 6);
        assert!(topology.contains(AxisId::Gamepad(GamepadAxis::RightTrigger)));
        assert!(!topology.contains(AxisId::Custom(0)));
    }

    #[test]
    fn test_custom_device_bounds() {
        let topology = Topology::CustomDevice { axis_count: 4 };
        assert_eq!(topology.axis_count(), 4);
        assert_eq!(topology.slot(AxisId::Custom(3)), Some(3));
        assert!(!topology.contains(AxisId::Custom(4)));
        assert!(!topology.contains(AxisId::Gamepad(GamepadAxis::LeftX)));
        assert_eq!(topology.axes().len(), 4);
    }

    #[test]
    fn test_display() {
        assert_eq!(AxisId::Gamepad(GamepadAxis::LeftY).to_string(), "left_y");
        assert_eq!(AxisId::Custom(7).to_string(), "axis7");
        assert_eq!(Topology::CustomDevice { axis_count: 8 }.to_string(), "custom(8 axes)");
    }
}
