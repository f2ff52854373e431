//! # Axis Transform
//!
//! Turns a raw sample into an output axis value.
//!
//! The pipeline runs in a fixed order:
//!
//! 1. **Normalize**: gyro degrees are divided by `gyro_range` (alpha is folded
//!    from 0..360 into -180..180 first). Slider values pass through.
//! 2. **Dead-zone**: magnitudes at or below `deadzone` become 0, the rest is
//!    rescaled so the output still reaches full deflection.
//! 3. **Peak**: multiply by `peak_value`.
//! 4. **Invert**: negate, bipolar axes only.
//! 5. **Clamp** to the axis range.
//!
//! ## Usage
//!
//! ```
//! use gyropad_bridge::mapping::axis::{AxisId, GamepadAxis};
//! use gyropad_bridge::mapping::source::{AxisConfig, AxisSource, GyroAxis};
//! use gyropad_bridge::mapping::transform::transform;
//!
//! let cfg = AxisConfig::new(AxisId::Gamepad(GamepadAxis::LeftX), AxisSource::Gyro(GyroAxis::Gamma))
//!     .with_gyro_range(90.0);
//!
//! // 45 degrees of tilt is half range, minus the 5% dead-zone
//! assert!((transform(45.0, &cfg) - 0.4737).abs() < 0.0001);
//! ```

use super::source::{AxisConfig, AxisSource, GyroAxis};

/// Native value of a bipolar axis at full negative deflection.
pub const NATIVE_AXIS_MIN: i32 = 0;

/// Native value of any axis at full positive deflection.
pub const NATIVE_AXIS_MAX: i32 = 32767;

/// Native value of a centered bipolar axis.
pub const NATIVE_AXIS_CENTER: i32 = 16383;

/// Converts gyro degrees to a normalized value in -1.0..1.0.
///
/// # Examples
///
/// ```
/// use gyropad_bridge::mapping::source::GyroAxis;
/// use gyropad_bridge::mapping::transform::normalize_gyro;
///
/// assert_eq!(normalize_gyro(GyroAxis::Beta, 45.0, 90.0), 0.5);
/// // 350 degrees of yaw is -10 degrees
/// assert!((normalize_gyro(GyroAxis::Alpha, 350.0, 90.0) + 0.1111).abs() < 0.0001);
/// ```
#[must_use]
pub fn normalize_gyro(axis: GyroAxis, degrees: f64, gyro_range: f64) -> f64 {
    if gyro_range <= 0.0 || !degrees.is_finite() {
        return 0.0;
    }

    let degrees = match axis {
        GyroAxis::Alpha if degrees > 180.0 => degrees - 360.0,
        _ => degrees,
    };

    (degrees / gyro_range).clamp(-1.0, 1.0)
}

/// Applies a dead-zone to a normalized value.
///
/// Values with `|value| <= deadzone` map to 0. Outside the zone the remaining
/// span is rescaled so that 1.0 still maps to 1.0. A dead-zone of 1.0 or more
/// swallows everything.
///
/// # Examples
///
/// ```
/// use gyropad_bridge::mapping::transform::apply_deadzone;
///
/// assert_eq!(apply_deadzone(0.05, 0.05), 0.0);
/// assert!((apply_deadzone(0.06, 0.05) - 0.01053).abs() < 0.00001);
/// assert!((apply_deadzone(-1.0, 0.05) + 1.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn apply_deadzone(value: f64, deadzone: f64) -> f64 {
    if deadzone >= 1.0 {
        return 0.0;
    }
    let deadzone = deadzone.max(0.0);

    let magnitude = value.abs();
    if magnitude <= deadzone {
        0.0
    } else {
        value.signum() * (magnitude - deadzone) / (1.0 - deadzone)
    }
}

/// Scales a value by the peak factor.
#[inline]
#[must_use]
pub fn apply_peak(value: f64, peak_value: f64) -> f64 {
    value * peak_value
}

/// Runs the full pipeline for one raw value under `cfg`.
///
/// A `None` source yields 0 regardless of `raw`.
#[must_use]
pub fn transform(raw: f64, cfg: &AxisConfig) -> f64 {
    let range = cfg.output_axis.range();

    let normalized = match &cfg.source {
        AxisSource::Gyro(axis) => normalize_gyro(*axis, raw, cfg.gyro_range),
        AxisSource::Slider(_) => raw,
        AxisSource::None => return range.neutral(),
    };

    let mut value = apply_peak(apply_deadzone(normalized, cfg.deadzone), cfg.peak_value);

    if cfg.invert && range == super::axis::AxisRange::Bipolar {
        value = -value;
    }

    range.clamp(value)
}

/// Converts a bipolar value (-1.0 to 1.0) to the native 0..32767 encoding.
///
/// # Examples
///
/// ```
/// use gyropad_bridge::mapping::transform::to_native_axis;
///
/// assert_eq!(to_native_axis(-1.0), 0);
/// assert_eq!(to_native_axis(0.0), 16383);
/// assert_eq!(to_native_axis(1.0), 32767);
/// ```
#[must_use]
pub fn to_native_axis(value: f64) -> i32 {
    let clamped = if value.is_nan() { 0.0 } else { value.clamp(-1.0, 1.0) };
    let scaled = (clamped + 1.0) * 16383.5;
    (scaled as i32).clamp(NATIVE_AXIS_MIN, NATIVE_AXIS_MAX)
}

/// Converts a unipolar trigger value (0.0 to 1.0) to the native 0..32767 encoding.
#[must_use]
pub fn trigger_to_native(value: f64) -> i32 {
    let clamped = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    ((clamped * f64::from(NATIVE_AXIS_MAX)) as i32).clamp(0, NATIVE_AXIS_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::axis::{AxisId, GamepadAxis};

    fn gamma_on(axis: GamepadAxis) -> AxisConfig {
        AxisConfig::new(AxisId::Gamepad(axis), AxisSource::Gyro(GyroAxis::Gamma))
    }

    // ==================== Normalization Tests ====================

    #[test]
    fn test_normalize_gyro_divides_by_range() {
        assert_eq!(normalize_gyro(GyroAxis::Gamma, 45.0, 90.0), 0.5);
        assert_eq!(normalize_gyro(GyroAxis::Beta, -30.0, 60.0), -0.5);
    }

    #[test]
    fn test_normalize_gyro_clamps() {
        assert_eq!(normalize_gyro(GyroAxis::Gamma, 120.0, 45.0), 1.0);
        assert_eq!(normalize_gyro(GyroAxis::Beta, -170.0, 45.0), -1.0);
    }

    #[test]
    fn test_alpha_wraparound() {
        let value = normalize_gyro(GyroAxis::Alpha, 350.0, 90.0);
        assert!((value - (-10.0 / 90.0)).abs() < 1e-12);

        // 180 is the fold boundary and stays positive
        assert_eq!(normalize_gyro(GyroAxis::Alpha, 180.0, 180.0), 1.0);
        assert_eq!(normalize_gyro(GyroAxis::Alpha, 90.0, 90.0), 1.0);
    }

    #[test]
    fn test_non_alpha_axes_do_not_fold() {
        assert_eq!(normalize_gyro(GyroAxis::Beta, 350.0, 90.0), 1.0);
    }

    #[test]
    fn test_normalize_gyro_guards_bad_input() {
        assert_eq!(normalize_gyro(GyroAxis::Gamma, 10.0, 0.0), 0.0);
        assert_eq!(normalize_gyro(GyroAxis::Gamma, f64::NAN, 45.0), 0.0);
    }

    // ==================== Deadzone Tests ====================

    #[test]
    fn test_deadzone_boundary() {
        assert_eq!(apply_deadzone(0.05, 0.05), 0.0);
        assert_eq!(apply_deadzone(-0.05, 0.05), 0.0);
        assert!((apply_deadzone(0.06, 0.05) - 0.01 / 0.95).abs() < 1e-12);
    }

    #[test]
    fn test_deadzone_is_continuous_at_boundary() {
        for deadzone in [0.0, 0.05, 0.2, 0.5, 0.9, 0.999] {
            for sign in [1.0, -1.0] {
                let edge = sign * deadzone;
                let just_outside = sign * (deadzone + 1e-9);
                assert_eq!(apply_deadzone(edge, deadzone), 0.0);
                assert!(apply_deadzone(just_outside, deadzone).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_deadzone_preserves_full_deflection() {
        for deadzone in [0.0, 0.1, 0.5] {
            assert!((apply_deadzone(1.0, deadzone) - 1.0).abs() < 1e-12);
            assert!((apply_deadzone(-1.0, deadzone) + 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_deadzone_of_one_swallows_everything() {
        assert_eq!(apply_deadzone(1.0, 1.0), 0.0);
        assert_eq!(apply_deadzone(-0.7, 1.5), 0.0);
    }

    #[test]
    fn test_deadzone_and_peak_are_odd_symmetric() {
        for deadzone in [0.0, 0.05, 0.3] {
            for peak in [0.0, 0.5, 1.0, 2.0] {
                for x in [0.01, 0.2, 0.55, 0.9, 1.0] {
                    let positive = apply_peak(apply_deadzone(x, deadzone), peak);
                    let negative = apply_peak(apply_deadzone(-x, deadzone), peak);
                    assert!((positive + negative).abs() < 1e-12);
                }
            }
        }
    }

    // ==================== Transform Tests ====================

    #[test]
    fn test_slider_passes_through() {
        let cfg = AxisConfig::new(AxisId::Custom(0), AxisSource::Slider("s1".to_string()))
            .with_deadzone(0.0)
            .with_peak_value(1.0);
        assert_eq!(transform(0.5, &cfg), 0.5);
    }

    #[test]
    fn test_end_to_end_gamma_on_left_x() {
        let cfg = gamma_on(GamepadAxis::LeftX).with_gyro_range(90.0);
        let value = transform(45.0, &cfg);
        assert!((value - 0.45 / 0.95).abs() < 1e-12);
        assert!((value - 0.4737).abs() < 0.0001);
    }

    #[test]
    fn test_invert_bipolar() {
        let cfg = gamma_on(GamepadAxis::RightY).with_deadzone(0.0).inverted(true);
        assert_eq!(transform(22.5, &cfg), -0.5);
    }

    #[test]
    fn test_invert_ignored_on_trigger() {
        let cfg = gamma_on(GamepadAxis::RightTrigger).with_deadzone(0.0).inverted(true);
        assert_eq!(transform(22.5, &cfg), 0.5);
    }

    #[test]
    fn test_trigger_clamps_negative_to_zero() {
        let cfg = gamma_on(GamepadAxis::LeftTrigger);
        assert_eq!(transform(-30.0, &cfg), 0.0);
    }

    #[test]
    fn test_peak_scaling_clamped_to_range() {
        let cfg = gamma_on(GamepadAxis::LeftX).with_deadzone(0.0).with_peak_value(3.0);
        assert_eq!(transform(30.0, &cfg), 1.0);
        assert_eq!(transform(-30.0, &cfg), -1.0);

        let cfg = gamma_on(GamepadAxis::LeftX).with_deadzone(0.0).with_peak_value(0.5);
        assert_eq!(transform(45.0, &cfg), 0.5);
    }

    #[test]
    fn test_none_source_is_zero() {
        let cfg = AxisConfig::new(AxisId::Gamepad(GamepadAxis::LeftY), AxisSource::None);
        assert_eq!(transform(123.0, &cfg), 0.0);
        assert_eq!(transform(f64::NAN, &cfg), 0.0);
    }

    // ==================== Native Encoding Tests ====================

    #[test]
    fn test_to_native_axis() {
        assert_eq!(to_native_axis(-1.0), NATIVE_AXIS_MIN);
        assert_eq!(to_native_axis(0.0), NATIVE_AXIS_CENTER);
        assert_eq!(to_native_axis(1.0), NATIVE_AXIS_MAX);
    }

    #[test]
    fn test_to_native_axis_clamps() {
        assert_eq!(to_native_axis(-2.0), NATIVE_AXIS_MIN);
        assert_eq!(to_native_axis(2.0), NATIVE_AXIS_MAX);
        assert_eq!(to_native_axis(f64::NAN), NATIVE_AXIS_CENTER);
    }

    #[test]
    fn test_trigger_to_native() {
        assert_eq!(trigger_to_native(0.0), 0);
        assert_eq!(trigger_to_native(1.0), NATIVE_AXIS_MAX);
        assert_eq!(trigger_to_native(-0.3), 0);
        assert_eq!(trigger_to_native(1.3), NATIVE_AXIS_MAX);
    }
}
