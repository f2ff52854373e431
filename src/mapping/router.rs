//! # Axis Router
//!
//! Owns the active mapping table and resolves samples to axis writes.
//!
//! One source may drive several output axes. Each output axis has at most one
//! binding. Axes bound to `none` never see samples; they are pinned to zero
//! via [`AxisRouter::unbound_writes`].

use std::collections::HashSet;

use tracing::{debug, info};

use super::axis::{AxisId, Topology, MAX_CUSTOM_AXES};
use super::source::{AxisConfig, AxisSource, Sample};
use super::transform::transform;
use crate::error::{BridgeError, Result};

/// One routed value for one output axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisWrite {
    pub axis: AxisId,
    pub value: f64,
}

/// Maps samples to output axes for one topology.
#[derive(Debug, Clone)]
pub struct AxisRouter {
    topology: Topology,
    axes: Vec<AxisConfig>,
}

impl AxisRouter {
    /// Creates a router after validating `axes` against `topology`.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure, see [`AxisRouter::validate`].
    pub fn new(topology: Topology, axes: Vec<AxisConfig>) -> Result<Self> {
        Self::validate(topology, &axes)?;
        Ok(Self { topology, axes })
    }

    /// Checks a complete mapping table.
    ///
    /// # Errors
    ///
    /// * `InvalidAxisConfig` for a custom axis count outside 1..=32, an entry
    ///   with bad parameters or an axis outside the topology, or two entries
    ///   for the same output axis.
    pub fn validate(topology: Topology, axes: &[AxisConfig]) -> Result<()> {
        if let Topology::CustomDevice { axis_count } = topology {
            if axis_count == 0 || axis_count > MAX_CUSTOM_AXES {
                return Err(BridgeError::InvalidAxisConfig {
                    entry: "device".to_string(),
                    reason: format!(
                        "axis_count {} must be between 1 and {}",
                        axis_count, MAX_CUSTOM_AXES
                    ),
                });
            }
        }

        let mut seen = HashSet::new();
        for cfg in axes {
            cfg.validate(topology)?;
            if !seen.insert(cfg.output_axis) {
                return Err(BridgeError::InvalidAxisConfig {
                    entry: cfg.output_axis.to_string(),
                    reason: "output axis is mapped more than once".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Resolves a sample to zero or more writes.
    ///
    /// Returns an empty vector when no axis listens to the sample's source.
    #[must_use]
    pub fn route(&self, sample: &Sample) -> Vec<AxisWrite> {
        self.axes
            .iter()
            .filter(|cfg| cfg.source.matches(&sample.source))
            .map(|cfg| AxisWrite {
                axis: cfg.output_axis,
                value: transform(sample.raw_value, cfg),
            })
            .collect()
    }

    /// Zero writes for every axis bound to `none`.
    #[must_use]
    pub fn unbound_writes(&self) -> Vec<AxisWrite> {
        self.axes
            .iter()
            .filter(|cfg| cfg.source == AxisSource::None)
            .map(|cfg| AxisWrite {
                axis: cfg.output_axis,
                value: 0.0,
            })
            .collect()
    }

    /// Replaces the mapping table.
    ///
    /// The swap is all-or-nothing: on error the previous table stays active.
    ///
    /// # Errors
    ///
    /// * `TopologyMismatch` if `topology` differs from the active one
    /// * any error from [`AxisRouter::validate`]
    pub fn reconfigure(&mut self, topology: Topology, axes: Vec<AxisConfig>) -> Result<()> {
        if topology != self.topology {
            return Err(BridgeError::TopologyMismatch {
                active: self.topology.to_string(),
                requested: topology.to_string(),
            });
        }
        Self::validate(topology, &axes)?;

        for cfg in &axes {
            debug!("Axis {} <- {}", cfg.output_axis, cfg.source);
        }
        info!("Mapping reconfigured: {} axis bindings on {}", axes.len(), topology);

        self.axes = axes;
        Ok(())
    }

    #[must_use]
    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Active bindings in configuration order.
    #[must_use]
    pub fn configs(&self) -> &[AxisConfig] {
        &self.axes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::axis::GamepadAxis;
    use crate::mapping::source::GyroAxis;

    fn pad(axis: GamepadAxis) -> AxisId {
        AxisId::Gamepad(axis)
    }

    fn gamma_left_x() -> AxisConfig {
        AxisConfig::new(pad(GamepadAxis::LeftX), AxisSource::Gyro(GyroAxis::Gamma))
    }

    // ==================== Construction Tests ====================

    #[test]
    fn test_new_accepts_valid_table() {
        let router = AxisRouter::new(Topology::FixedGamepad, vec![gamma_left_x()]).unwrap();
        assert_eq!(router.topology(), Topology::FixedGamepad);
        assert_eq!(router.configs().len(), 1);
    }

    #[test]
    fn test_new_rejects_duplicate_output_axis() {
        let result = AxisRouter::new(
            Topology::FixedGamepad,
            vec![
                gamma_left_x(),
                AxisConfig::new(pad(GamepadAxis::LeftX), AxisSource::Gyro(GyroAxis::Beta)),
            ],
        );
        match result {
            Err(BridgeError::InvalidAxisConfig { entry, .. }) => assert_eq!(entry, "left_x"),
            other => panic!("Expected InvalidAxisConfig, got: {:?}", other),
        }
    }

    #[test]
    fn test_new_rejects_custom_axis_out_of_bounds() {
        let result = AxisRouter::new(
            Topology::CustomDevice { axis_count: 2 },
            vec![AxisConfig::new(AxisId::Custom(2), AxisSource::Gyro(GyroAxis::Gamma))],
        );
        match result {
            Err(BridgeError::InvalidAxisConfig { entry, .. }) => assert_eq!(entry, "axis2"),
            other => panic!("Expected InvalidAxisConfig, got: {:?}", other),
        }
    }

    #[test]
    fn test_new_rejects_bad_axis_count() {
        assert!(AxisRouter::new(Topology::CustomDevice { axis_count: 0 }, vec![]).is_err());
        assert!(AxisRouter::new(Topology::CustomDevice { axis_count: 33 }, vec![]).is_err());
        assert!(AxisRouter::new(Topology::CustomDevice { axis_count: 32 }, vec![]).is_ok());
    }

    // ==================== Routing Tests ====================

    #[test]
    fn test_route_end_to_end() {
        let router = AxisRouter::new(
            Topology::FixedGamepad,
            vec![gamma_left_x().with_gyro_range(90.0)],
        )
        .unwrap();

        let writes = router.route(&Sample::gyro(GyroAxis::Gamma, 45.0));
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].axis, pad(GamepadAxis::LeftX));
        assert!((writes[0].value - 0.4737).abs() < 0.0001);
    }

    #[test]
    fn test_route_unmapped_source_is_noop() {
        let router = AxisRouter::new(Topology::FixedGamepad, vec![gamma_left_x()]).unwrap();
        assert!(router.route(&Sample::gyro(GyroAxis::Beta, 30.0)).is_empty());
        assert!(router.route(&Sample::slider("s9", 0.3)).is_empty());
    }

    #[test]
    fn test_route_fans_out() {
        let router = AxisRouter::new(
            Topology::FixedGamepad,
            vec![
                gamma_left_x().with_deadzone(0.0),
                AxisConfig::new(pad(GamepadAxis::RightX), AxisSource::Gyro(GyroAxis::Gamma))
                    .with_deadzone(0.0)
                    .inverted(true),
            ],
        )
        .unwrap();

        let writes = router.route(&Sample::gyro(GyroAxis::Gamma, 22.5));
        assert_eq!(
            writes,
            vec![
                AxisWrite { axis: pad(GamepadAxis::LeftX), value: 0.5 },
                AxisWrite { axis: pad(GamepadAxis::RightX), value: -0.5 },
            ]
        );
    }

    #[test]
    fn test_route_slider_on_custom_device() {
        let router = AxisRouter::new(
            Topology::CustomDevice { axis_count: 4 },
            vec![AxisConfig::new(AxisId::Custom(3), AxisSource::Slider("s1".to_string()))
                .with_deadzone(0.0)],
        )
        .unwrap();

        let writes = router.route(&Sample::slider("s1", 0.5));
        assert_eq!(writes, vec![AxisWrite { axis: AxisId::Custom(3), value: 0.5 }]);
    }

    #[test]
    fn test_unbound_writes_are_zero() {
        let router = AxisRouter::new(
            Topology::FixedGamepad,
            vec![
                gamma_left_x(),
                AxisConfig::new(pad(GamepadAxis::LeftY), AxisSource::None),
                AxisConfig::new(pad(GamepadAxis::RightTrigger), AxisSource::None),
            ],
        )
        .unwrap();

        let writes = router.unbound_writes();
        assert_eq!(writes.len(), 2);
        assert!(writes.iter().all(|w| w.value == 0.0));
        assert!(router.route(&Sample::gyro(GyroAxis::Alpha, 10.0)).is_empty());
    }

    // ==================== Reconfigure Tests ====================

    #[test]
    fn test_reconfigure_swaps_table() {
        let mut router = AxisRouter::new(Topology::FixedGamepad, vec![gamma_left_x()]).unwrap();
        router
            .reconfigure(
                Topology::FixedGamepad,
                vec![AxisConfig::new(pad(GamepadAxis::RightY), AxisSource::Gyro(GyroAxis::Beta))],
            )
            .unwrap();

        assert!(router.route(&Sample::gyro(GyroAxis::Gamma, 30.0)).is_empty());
        assert_eq!(router.route(&Sample::gyro(GyroAxis::Beta, 30.0)).len(), 1);
    }

    #[test]
    fn test_reconfigure_failure_keeps_old_table() {
        let mut router = AxisRouter::new(Topology::FixedGamepad, vec![gamma_left_x()]).unwrap();
        let result = router.reconfigure(
            Topology::FixedGamepad,
            vec![gamma_left_x(), gamma_left_x().with_deadzone(0.2)],
        );

        assert!(result.is_err());
        assert_eq!(router.configs(), &[gamma_left_x()]);
    }

    #[test]
    fn test_reconfigure_rejects_topology_change() {
        let mut router = AxisRouter::new(Topology::FixedGamepad, vec![gamma_left_x()]).unwrap();
        let result = router.reconfigure(Topology::CustomDevice { axis_count: 8 }, vec![]);

        match result {
            Err(BridgeError::TopologyMismatch { active, requested }) => {
                assert_eq!(active, "gamepad");
                assert_eq!(requested, "custom(8 axes)");
            }
            other => panic!("Expected TopologyMismatch, got: {:?}", other),
        }
        assert_eq!(router.topology(), Topology::FixedGamepad);
    }
}
