//! # Gyropad Bridge Library
//!
//! Turn a phone's gyroscope and touch sliders into a virtual game controller.
//!
//! Phones connect over TCP and stream orientation, slider and button events.
//! The engine routes them through per-axis transforms onto a virtual device:
//! a fixed six-axis gamepad or a custom device with up to 32 axes.

pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod keystroke;
pub mod mapping;
pub mod overlay;
pub mod session;
pub mod telemetry;
pub mod transport;
