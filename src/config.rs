//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files, and
//! resolving the mapping sections into the snapshot the engine runs on.
//!
//! ## Mapping resolution
//!
//! Exactly one tier supplies the axis bindings:
//!
//! 1. `[mapping.axes]`: one table per output axis, keyed by axis name
//!    (`left_x`) or custom axis index (`"0"`)
//! 2. `[mapping.legacy] gyro_axis_mapping` plus layout sliders that name an
//!    `axis`; gyro uses a 45 degree range with no dead-zone, sliders pass through
//! 3. built-in default: gamma tilt drives `left_x` (axis 0 on a custom device)

use serde::de::Error;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use crate::device::{BackendKind, GamepadButton};
use crate::error::{BridgeError, Result};
use crate::mapping::axis::{AxisId, GamepadAxis, Topology, MAX_CUSTOM_AXES};
use crate::mapping::router::AxisRouter;
use crate::mapping::source::{AxisConfig, AxisSource, GyroAxis};

/// Full-scale tilt for legacy gyro bindings, in degrees.
pub const LEGACY_GYRO_RANGE: f64 = 45.0;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub mapping: MappingConfig,
    #[serde(default)]
    pub layout: Vec<LayoutEntry>,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Session listener configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Outbound messages buffered per session
    #[serde(default = "default_session_queue_size")]
    pub session_queue_size: usize,

    /// Inbound events buffered for the engine
    #[serde(default = "default_engine_queue_size")]
    pub engine_queue_size: usize,
}

/// Operating mode
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Gyro and sliders drive a virtual controller
    Driving,
    /// Buttons fire keystrokes only; no controller is created
    CustomKeys,
}

/// Controller shape as written in the config file
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TopologyKind {
    Gamepad,
    Custom,
}

/// Virtual controller configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    #[serde(default = "default_mode")]
    pub mode: Mode,

    #[serde(default = "default_topology")]
    pub topology: TopologyKind,

    /// Axis count of a custom device (1 to 32)
    #[serde(default = "default_axis_count")]
    pub axis_count: u8,

    #[serde(default = "default_backend")]
    pub backend: BackendKind,

    #[serde(default = "default_device_name")]
    pub name: String,
}

/// One `[mapping.axes.<key>]` table
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AxisEntry {
    /// `gyro`, `slider` or `none`
    pub source: String,

    #[serde(default)]
    pub source_id: Option<String>,

    #[serde(default)]
    pub deadzone: Option<f64>,

    #[serde(default)]
    pub peak_value: Option<f64>,

    #[serde(default)]
    pub gyro_range: Option<f64>,

    #[serde(default)]
    pub invert: Option<bool>,
}

/// Older gyro-only mapping format
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LegacyMappingConfig {
    /// Gyro angle name to axis name; an empty axis leaves the angle unbound
    #[serde(default)]
    pub gyro_axis_mapping: BTreeMap<String, String>,
}

/// Axis mapping configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct MappingConfig {
    #[serde(default)]
    pub axes: BTreeMap<String, AxisEntry>,

    #[serde(default)]
    pub legacy: LegacyMappingConfig,
}

/// Layout control type
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    Button,
    Slider,
}

/// Slider travel
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RangeMode {
    /// -1.0 to 1.0, rests at 0.0
    #[default]
    Bipolar,
    /// 0.0 to 1.0, rests at 0.5
    Unipolar,
}

impl RangeMode {
    /// Value an auto-centering slider returns to.
    #[must_use]
    pub fn rest_value(self) -> f64 {
        match self {
            RangeMode::Bipolar => 0.0,
            RangeMode::Unipolar => 0.5,
        }
    }
}

/// One `[[layout]]` control shown on the phone
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LayoutEntry {
    pub id: String,

    #[serde(default)]
    pub label: String,

    #[serde(default = "default_layout_kind")]
    pub kind: LayoutKind,

    /// Key combination fired on release
    #[serde(default)]
    pub keys: Vec<String>,

    /// Gamepad face button held while the control is held
    #[serde(default)]
    pub gamepad_button: Option<String>,

    /// Legacy slider target axis
    #[serde(default)]
    pub axis: Option<String>,

    #[serde(default)]
    pub auto_center: bool,

    #[serde(default)]
    pub range_mode: RangeMode,
}

impl LayoutEntry {
    /// Label if set, otherwise the id.
    #[must_use]
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.id
        } else {
            &self.label
        }
    }

    /// Parsed gamepad button, `None` when unset or invalid.
    #[must_use]
    pub fn button(&self) -> Option<GamepadButton> {
        self.gamepad_button.as_deref().and_then(GamepadButton::parse)
    }
}

/// Overlay configuration
#[derive(Debug, Deserialize, Clone)]
pub struct OverlayConfig {
    #[serde(default = "default_overlay_enabled")]
    pub enabled: bool,

    #[serde(default = "default_overlay_queue_size")]
    pub queue_size: usize,

    /// How long shutdown waits for the overlay worker before aborting it
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_interval_ms")]
    pub log_interval_ms: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily-rolling log files; console only when unset
    #[serde(default)]
    pub file: Option<String>,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 5000 }
fn default_session_queue_size() -> usize { 32 }
fn default_engine_queue_size() -> usize { 256 }

fn default_mode() -> Mode { Mode::Driving }
fn default_topology() -> TopologyKind { TopologyKind::Gamepad }
fn default_axis_count() -> u8 { 8 }
fn default_backend() -> BackendKind { BackendKind::Uinput }
fn default_device_name() -> String { "Gyropad Virtual Controller".to_string() }

fn default_layout_kind() -> LayoutKind { LayoutKind::Button }

fn default_overlay_enabled() -> bool { true }
fn default_overlay_queue_size() -> usize { 64 }
fn default_shutdown_grace_ms() -> u64 { 2000 }

fn default_telemetry_enabled() -> bool { false }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_interval_ms() -> u64 { 100 }

fn default_log_level() -> String { "info".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            session_queue_size: default_session_queue_size(),
            engine_queue_size: default_engine_queue_size(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            topology: default_topology(),
            axis_count: default_axis_count(),
            backend: default_backend(),
            name: default_device_name(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enabled: default_overlay_enabled(),
            queue_size: default_overlay_queue_size(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            log_interval_ms: default_log_interval_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Resolved mapping handed to the engine at startup and on reconfiguration.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingSnapshot {
    pub topology: Topology,
    pub axes: Vec<AxisConfig>,
    pub layout: Vec<LayoutEntry>,
}

impl MappingSnapshot {
    /// Checks the axis table against the topology and the layout.
    ///
    /// Slider bindings must name a layout slider whenever the layout defines
    /// any sliders.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAxisConfig` naming the first offending entry.
    pub fn validate(&self) -> Result<()> {
        AxisRouter::validate(self.topology, &self.axes)?;

        let sliders: HashSet<&str> = self
            .layout
            .iter()
            .filter(|e| e.kind == LayoutKind::Slider)
            .map(|e| e.id.as_str())
            .collect();
        if sliders.is_empty() {
            return Ok(());
        }

        for cfg in &self.axes {
            if let AxisSource::Slider(id) = &cfg.source {
                if !sliders.contains(id.as_str()) {
                    return Err(BridgeError::InvalidAxisConfig {
                        entry: cfg.output_axis.to_string(),
                        reason: format!("slider '{}' is not defined in the layout", id),
                    });
                }
            }
        }
        Ok(())
    }
}

fn config_error(msg: impl std::fmt::Display) -> BridgeError {
    BridgeError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails, including an unresolvable axis mapping
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gyropad_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns error if parsing or validation fails
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Controller shape selected by `[device]`
    #[must_use]
    pub fn topology(&self) -> Topology {
        match self.device.topology {
            TopologyKind::Gamepad => Topology::FixedGamepad,
            TopologyKind::Custom => Topology::CustomDevice {
                axis_count: self.device.axis_count,
            },
        }
    }

    /// Backend to open; `custom_keys` mode never creates a controller
    #[must_use]
    pub fn backend(&self) -> BackendKind {
        match self.device.mode {
            Mode::Driving => self.device.backend,
            Mode::CustomKeys => BackendKind::Null,
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        // Validate server configuration
        if self.server.host.is_empty() {
            return Err(config_error("server host cannot be empty"));
        }

        if self.server.session_queue_size == 0 || self.server.engine_queue_size == 0 {
            return Err(config_error("server queue sizes must be greater than 0"));
        }

        // Validate device configuration
        if self.device.topology == TopologyKind::Custom
            && (self.device.axis_count == 0 || self.device.axis_count > MAX_CUSTOM_AXES)
        {
            return Err(config_error(format!(
                "axis_count must be between 1 and {}",
                MAX_CUSTOM_AXES
            )));
        }

        if self.device.name.is_empty() {
            return Err(config_error("device name cannot be empty"));
        }

        // Validate layout
        let mut ids = HashSet::new();
        for entry in &self.layout {
            if entry.id.is_empty() {
                return Err(config_error("layout id cannot be empty"));
            }
            if !ids.insert(entry.id.as_str()) {
                return Err(config_error(format!("duplicate layout id '{}'", entry.id)));
            }
            if let Some(name) = &entry.gamepad_button {
                if GamepadButton::parse(name).is_none() {
                    return Err(config_error(format!(
                        "layout '{}': gamepad_button '{}' must be one of a, b, x, y",
                        entry.id, name
                    )));
                }
            }
        }

        // Validate overlay configuration
        if self.overlay.queue_size == 0 {
            return Err(config_error("overlay queue_size must be greater than 0"));
        }

        if self.overlay.shutdown_grace_ms > 60000 {
            return Err(config_error("shutdown_grace_ms must be at most 60000"));
        }

        // Validate telemetry configuration
        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(config_error("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.log_interval_ms == 0 || self.telemetry.log_interval_ms > 60000 {
            return Err(config_error("log_interval_ms must be between 1 and 60000"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(config_error("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(config_error("max_files_to_keep must be greater than 0"));
        }

        // Validate log level
        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(config_error(
                "logging level must be one of: trace, debug, info, warn, error",
            ));
        }

        // Mapping must resolve against the topology
        self.mapping_snapshot()?;

        Ok(())
    }

    /// Resolves the mapping sections into a validated snapshot
    ///
    /// # Errors
    ///
    /// Returns `InvalidAxisConfig` naming the first entry that cannot be
    /// resolved or fails validation against the topology
    pub fn mapping_snapshot(&self) -> Result<MappingSnapshot> {
        let topology = self.topology();

        let axes = if !self.mapping.axes.is_empty() {
            self.unified_axes()?
        } else {
            let legacy = self.legacy_axes()?;
            if legacy.is_empty() {
                default_axes(topology)
            } else {
                legacy
            }
        };

        let snapshot = MappingSnapshot {
            topology,
            axes,
            layout: self.layout.clone(),
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    fn unified_axes(&self) -> Result<Vec<AxisConfig>> {
        // Numeric keys in numeric order ("2" before "10"), then axis names
        let mut entries: Vec<(&String, &AxisEntry)> = self.mapping.axes.iter().collect();
        entries.sort_by_key(|(key, _)| (key.parse::<u32>().unwrap_or(u32::MAX), key.as_str()));

        entries
            .into_iter()
            .map(|(key, entry)| {
                let axis = parse_axis(key, key)?;
                let source = AxisSource::from_parts(key, &entry.source, entry.source_id.as_deref())?;

                let mut cfg = AxisConfig::new(axis, source);
                if let Some(deadzone) = entry.deadzone {
                    cfg = cfg.with_deadzone(deadzone);
                }
                if let Some(peak_value) = entry.peak_value {
                    cfg = cfg.with_peak_value(peak_value);
                }
                if let Some(gyro_range) = entry.gyro_range {
                    cfg = cfg.with_gyro_range(gyro_range);
                }
                if let Some(invert) = entry.invert {
                    cfg = cfg.inverted(invert);
                }
                Ok(cfg)
            })
            .collect()
    }

    fn legacy_axes(&self) -> Result<Vec<AxisConfig>> {
        let mut axes = Vec::new();

        for (gyro_name, axis_name) in &self.mapping.legacy.gyro_axis_mapping {
            if axis_name.is_empty() {
                continue;
            }
            let gyro = GyroAxis::from_name(gyro_name).ok_or_else(|| BridgeError::InvalidAxisConfig {
                entry: gyro_name.clone(),
                reason: format!("unknown gyro source '{}' (expected alpha, beta or gamma)", gyro_name),
            })?;
            let axis = parse_axis(gyro_name, axis_name)?;
            axes.push(
                AxisConfig::new(axis, AxisSource::Gyro(gyro))
                    .with_gyro_range(LEGACY_GYRO_RANGE)
                    .with_deadzone(0.0),
            );
        }

        for entry in self.layout.iter().filter(|e| e.kind == LayoutKind::Slider) {
            if let Some(axis_name) = entry.axis.as_deref().filter(|name| !name.is_empty()) {
                let axis = parse_axis(&entry.id, axis_name)?;
                axes.push(
                    AxisConfig::new(axis, AxisSource::Slider(entry.id.clone())).with_deadzone(0.0),
                );
            }
        }

        Ok(axes)
    }
}

fn parse_axis(entry: &str, key: &str) -> Result<AxisId> {
    AxisId::parse(key).ok_or_else(|| BridgeError::InvalidAxisConfig {
        entry: entry.to_string(),
        reason: format!("unknown output axis '{}'", key),
    })
}

fn default_axes(topology: Topology) -> Vec<AxisConfig> {
    let axis = match topology {
        Topology::FixedGamepad => AxisId::Gamepad(GamepadAxis::LeftX),
        Topology::CustomDevice { .. } => AxisId::Custom(0),
    };
    vec![AxisConfig::new(axis, AxisSource::Gyro(GyroAxis::Gamma)).with_gyro_range(LEGACY_GYRO_RANGE)]
}
