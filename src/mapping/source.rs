//! # Input Sources and Axis Bindings
//!
//! Input-side vocabulary: the samples a phone produces and the per-axis
//! binding ([`AxisConfig`]) that says which source drives which output.

use std::fmt;

use super::axis::{AxisId, Topology};
use crate::error::{BridgeError, Result};

/// Default dead-zone fraction for a unified axis entry.
pub const DEFAULT_DEADZONE: f64 = 0.05;

/// Default peak scale factor.
pub const DEFAULT_PEAK_VALUE: f64 = 1.0;

/// Default full-scale tilt in degrees for gamepad axes.
pub const DEFAULT_GAMEPAD_GYRO_RANGE: f64 = 45.0;

/// Default full-scale tilt in degrees for custom-device axes.
pub const DEFAULT_CUSTOM_GYRO_RANGE: f64 = 90.0;

/// Orientation angle reported by the phone, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GyroAxis {
    /// Rotation around Z (yaw), 0 to 360.
    Alpha,
    /// Front-back tilt, -180 to 180.
    Beta,
    /// Left-right tilt, -90 to 90.
    Gamma,
}

impl GyroAxis {
    pub const ALL: [GyroAxis; 3] = [GyroAxis::Alpha, GyroAxis::Beta, GyroAxis::Gamma];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            GyroAxis::Alpha => "alpha",
            GyroAxis::Beta => "beta",
            GyroAxis::Gamma => "gamma",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|axis| axis.name() == name)
    }
}

/// Producer of one sample.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleSource {
    Gyro(GyroAxis),
    Slider(String),
}

/// One inbound reading, created per event and discarded after routing.
#[derive(Debug, Clone)]
pub struct Sample {
    pub source: SampleSource,
    pub raw_value: f64,
}

impl Sample {
    /// Gyroscope reading in degrees.
    #[must_use]
    pub fn gyro(axis: GyroAxis, degrees: f64) -> Self {
        Self {
            source: SampleSource::Gyro(axis),
            raw_value: degrees,
        }
    }

    /// Slider position, already normalized by the phone.
    #[must_use]
    pub fn slider(id: impl Into<String>, value: f64) -> Self {
        Self {
            source: SampleSource::Slider(id.into()),
            raw_value: value,
        }
    }
}

/// What drives an output axis.
#[derive(Debug, Clone, PartialEq)]
pub enum AxisSource {
    Gyro(GyroAxis),
    Slider(String),
    /// Explicitly unbound; the axis is held at zero.
    None,
}

impl AxisSource {
    /// Builds a source from the configuration pair `source` / `source_id`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAxisConfig` for an unknown source type, an unknown
    /// gyro angle, or a slider without an id.
    pub fn from_parts(entry: &str, kind: &str, id: Option<&str>) -> Result<Self> {
        match kind {
            "gyro" => {
                let id = id.unwrap_or_default();
                GyroAxis::from_name(id).map(AxisSource::Gyro).ok_or_else(|| {
                    BridgeError::InvalidAxisConfig {
                        entry: entry.to_string(),
                        reason: format!("unknown gyro source '{}' (expected alpha, beta or gamma)", id),
                    }
                })
            }
            "slider" => match id {
                Some(id) if !id.is_empty() => Ok(AxisSource::Slider(id.to_string())),
                _ => Err(BridgeError::InvalidAxisConfig {
                    entry: entry.to_string(),
                    reason: "slider source requires a source_id".to_string(),
                }),
            },
            "none" => Ok(AxisSource::None),
            other => Err(BridgeError::InvalidAxisConfig {
                entry: entry.to_string(),
                reason: format!("unknown source type '{}'", other),
            }),
        }
    }

    /// Whether a sample comes from this source.
    #[must_use]
    pub fn matches(&self, sample: &SampleSource) -> bool {
        match (self, sample) {
            (AxisSource::Gyro(a), SampleSource::Gyro(b)) => a == b,
            (AxisSource::Slider(a), SampleSource::Slider(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for AxisSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisSource::Gyro(axis) => write!(f, "gyro:{}", axis.name()),
            AxisSource::Slider(id) => write!(f, "slider:{}", id),
            AxisSource::None => f.write_str("none"),
        }
    }
}

/// Binding of one output axis to its source plus transform parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisConfig {
    pub output_axis: AxisId,
    pub source: AxisSource,
    /// Scale applied after the dead-zone (>= 0).
    pub peak_value: f64,
    /// Dead-zone fraction in [0, 1).
    pub deadzone: f64,
    /// Tilt in degrees that produces full deflection (> 0).
    pub gyro_range: f64,
    /// Negate the output (bipolar axes only).
    pub invert: bool,
}

impl AxisConfig {
    /// Creates a binding with default transform parameters.
    #[must_use]
    pub fn new(output_axis: AxisId, source: AxisSource) -> Self {
        let gyro_range = match output_axis {
            AxisId::Gamepad(_) => DEFAULT_GAMEPAD_GYRO_RANGE,
            AxisId::Custom(_) => DEFAULT_CUSTOM_GYRO_RANGE,
        };
        Self {
            output_axis,
            source,
            peak_value: DEFAULT_PEAK_VALUE,
            deadzone: DEFAULT_DEADZONE,
            gyro_range,
            invert: false,
        }
    }

    #[must_use]
    pub fn with_deadzone(mut self, deadzone: f64) -> Self {
        self.deadzone = deadzone;
        self
    }

    #[must_use]
    pub fn with_peak_value(mut self, peak_value: f64) -> Self {
        self.peak_value = peak_value;
        self
    }

    #[must_use]
    pub fn with_gyro_range(mut self, gyro_range: f64) -> Self {
        self.gyro_range = gyro_range;
        self
    }

    #[must_use]
    pub fn inverted(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    /// Checks parameters and that the output axis exists on `topology`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAxisConfig` naming this entry's output axis.
    pub fn validate(&self, topology: Topology) -> Result<()> {
        let fail = |reason: String| {
            Err(BridgeError::InvalidAxisConfig {
                entry: self.output_axis.to_string(),
                reason,
            })
        };

        if !topology.contains(self.output_axis) {
            return fail(format!("axis is out of bounds for topology {}", topology));
        }
        if !(0.0..1.0).contains(&self.deadzone) {
            return fail(format!("deadzone {} must be in [0, 1)", self.deadzone));
        }
        if !self.peak_value.is_finite() || self.peak_value < 0.0 {
            return fail(format!("peak_value {} must be a finite value >= 0", self.peak_value));
        }
        if !self.gyro_range.is_finite() || self.gyro_range <= 0.0 {
            return fail(format!("gyro_range {} must be greater than 0", self.gyro_range));
        }
        if let AxisSource::Slider(id) = &self.source {
            if id.is_empty() {
                return fail("slider source requires a source_id".to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::axis::GamepadAxis;

    fn left_x() -> AxisId {
        AxisId::Gamepad(GamepadAxis::LeftX)
    }

    #[test]
    fn test_sample_constructors() {
        let sample = Sample::gyro(GyroAxis::Gamma, 12.0);
        assert_eq!(sample.source, SampleSource::Gyro(GyroAxis::Gamma));
        assert_eq!(sample.raw_value, 12.0);

        let sample = Sample::slider("s1", 0.25);
        assert_eq!(sample.source, SampleSource::Slider("s1".to_string()));
        assert_eq!(sample.raw_value, 0.25);
    }

    #[test]
    fn test_source_from_parts() {
        assert_eq!(
            AxisSource::from_parts("left_x", "gyro", Some("beta")).unwrap(),
            AxisSource::Gyro(GyroAxis::Beta)
        );
        assert_eq!(
            AxisSource::from_parts("left_x", "slider", Some("s1")).unwrap(),
            AxisSource::Slider("s1".to_string())
        );
        assert_eq!(AxisSource::from_parts("left_x", "none", None).unwrap(), AxisSource::None);
    }

    #[test]
    fn test_source_from_parts_rejects_unknown_gyro() {
        match AxisSource::from_parts("right_x", "gyro", Some("delta")) {
            Err(BridgeError::InvalidAxisConfig { entry, reason }) => {
                assert_eq!(entry, "right_x");
                assert!(reason.contains("delta"));
            }
            other => panic!("Expected InvalidAxisConfig, got: {:?}", other),
        }
    }

    #[test]
    fn test_source_from_parts_rejects_missing_slider_id() {
        assert!(AxisSource::from_parts("0", "slider", None).is_err());
        assert!(AxisSource::from_parts("0", "slider", Some("")).is_err());
        assert!(AxisSource::from_parts("0", "touchpad", Some("x")).is_err());
    }

    #[test]
    fn test_source_matching() {
        let gamma = AxisSource::Gyro(GyroAxis::Gamma);
        assert!(gamma.matches(&SampleSource::Gyro(GyroAxis::Gamma)));
        assert!(!gamma.matches(&SampleSource::Gyro(GyroAxis::Beta)));
        assert!(!gamma.matches(&SampleSource::Slider("gamma".to_string())));
        assert!(!AxisSource::None.matches(&SampleSource::Slider("s1".to_string())));
    }

    #[test]
    fn test_axis_config_defaults() {
        let cfg = AxisConfig::new(left_x(), AxisSource::None);
        assert_eq!(cfg.deadzone, DEFAULT_DEADZONE);
        assert_eq!(cfg.peak_value, DEFAULT_PEAK_VALUE);
        assert_eq!(cfg.gyro_range, DEFAULT_GAMEPAD_GYRO_RANGE);
        assert!(!cfg.invert);

        let cfg = AxisConfig::new(AxisId::Custom(0), AxisSource::None);
        assert_eq!(cfg.gyro_range, DEFAULT_CUSTOM_GYRO_RANGE);
    }

    #[test]
    fn test_validate_accepts_defaults() {
        let cfg = AxisConfig::new(left_x(), AxisSource::Gyro(GyroAxis::Gamma));
        assert!(cfg.validate(Topology::FixedGamepad).is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_bounds_axis() {
        let cfg = AxisConfig::new(AxisId::Custom(8), AxisSource::Gyro(GyroAxis::Gamma));
        assert!(cfg.validate(Topology::CustomDevice { axis_count: 8 }).is_err());
        assert!(cfg.validate(Topology::FixedGamepad).is_err());
        assert!(cfg.validate(Topology::CustomDevice { axis_count: 9 }).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        let base = AxisConfig::new(left_x(), AxisSource::Gyro(GyroAxis::Gamma));
        assert!(base.clone().with_deadzone(1.0).validate(Topology::FixedGamepad).is_err());
        assert!(base.clone().with_deadzone(-0.1).validate(Topology::FixedGamepad).is_err());
        assert!(base.clone().with_peak_value(-1.0).validate(Topology::FixedGamepad).is_err());
        assert!(base.clone().with_gyro_range(0.0).validate(Topology::FixedGamepad).is_err());
        assert!(base.with_gyro_range(f64::NAN).validate(Topology::FixedGamepad).is_err());
    }
}
