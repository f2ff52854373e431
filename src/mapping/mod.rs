//! # Mapping Module
//!
//! Sample-to-axis pipeline: output axis vocabulary, source bindings, the
//! per-axis transform and the router that applies them.

pub mod axis;
pub mod router;
pub mod source;
pub mod transform;

pub use axis::{AxisId, AxisRange, GamepadAxis, Topology};
pub use router::{AxisRouter, AxisWrite};
pub use source::{AxisConfig, AxisSource, GyroAxis, Sample, SampleSource};
