//! Configuration Management

use crate::engine::pose::PoseConfig;
use crate::engine::trigger::TriggerMode;
use crate::engine::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Touch source device
    pub device: DeviceConfig,
    /// Usable-range warmup
    pub calibration: CalibrationConfig,
    /// Reference/action split
    pub roles: RolesConfig,
    /// Recording triggers
    pub trigger: TriggerConfig,
    /// Pose geometry tuning
    pub pose: PoseConfig,
    /// Renderer socket
    pub bridge: BridgeConfig,
    /// On-disk session copies
    pub archive: ArchiveConfig,
}

/// Touch source device configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DeviceConfig {
    /// evdev node, e.g. /dev/input/event5
    pub path: Option<PathBuf>,
    /// Try to grab the device exclusively
    pub grab: bool,
    /// Abort if the exclusive grab fails
    pub require_grab: bool,
}

/// Calibration configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Warmup window length (seconds, 0 = use declared bounds)
    pub window_secs: f64,
    /// Inward margin as a fraction of each axis width
    pub margin: f64,
}

/// Role configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolesConfig {
    /// Number of earliest fingers held as references
    pub ref_count: usize,
}

/// Trigger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    pub mode: TriggerMode,
    /// evdev key name
    pub hotkey: String,
    /// Keyboards to watch (empty = every node with key events)
    pub hotkey_devices: Vec<PathBuf>,
    /// How long the gesture must be held (ms)
    pub gesture_hold_ms: u64,
    /// Keyboard readiness wait (ms)
    pub poll_interval_ms: u64,
}

/// Bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Socket path (default /tmp/touchpad2touch.<uid>.sock)
    pub socket_path: Option<PathBuf>,
    /// Outbound queue size
    pub queue_capacity: usize,
}

/// Archive configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Directory for session JSON files (unset = no archive)
    pub sessions_dir: Option<PathBuf>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            window_secs: 1.5,
            margin: 0.02,
        }
    }
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self { ref_count: 1 }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            mode: TriggerMode::Both,
            hotkey: "KEY_SPACE".to_string(),
            hotkey_devices: Vec::new(),
            gesture_hold_ms: 400,
            poll_interval_ms: 100,
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            queue_capacity: 4096,
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    /// Returns Ok(()) if valid, or Err with a description of the first invalid field.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.roles.ref_count == 0 {
            return Err(crate::Error::Config("ref_count must be at least 1".to_string()));
        }
        if !self.calibration.window_secs.is_finite() || self.calibration.window_secs < 0.0 {
            return Err(crate::Error::Config(format!(
                "window_secs must be a finite value >= 0, got {}",
                self.calibration.window_secs
            )));
        }
        if Duration::try_from_secs_f64(self.calibration.window_secs).is_err() {
            return Err(crate::Error::Config(format!(
                "window_secs is too large, got {}",
                self.calibration.window_secs
            )));
        }
        if !self.calibration.margin.is_finite() || self.calibration.margin < 0.0 {
            return Err(crate::Error::Config(format!(
                "margin must be a finite value >= 0, got {}",
                self.calibration.margin
            )));
        }
        if self.trigger.mode.uses_keyboard() && self.trigger.hotkey.trim().is_empty() {
            return Err(crate::Error::Config(
                "hotkey must not be empty when the keyboard trigger is enabled".to_string(),
            ));
        }
        if self.trigger.poll_interval_ms == 0 {
            return Err(crate::Error::Config("poll_interval_ms must be > 0".to_string()));
        }
        let pose = &self.pose;
        let knobs = [
            ("outer_scale", pose.outer_scale),
            ("inner_ratio", pose.inner_ratio),
            ("center_shift_gamma", pose.center_shift_gamma),
            ("mark_slope", pose.mark_slope),
            ("mark_deg", pose.mark_deg),
            ("inner_guard_a", pose.inner_guard_a),
            ("inner_guard_b", pose.inner_guard_b),
            ("mid_guard_a", pose.mid_guard_a),
            ("mid_guard_b", pose.mid_guard_b),
        ];
        if let Some((name, value)) = knobs.iter().find(|(_, v)| !v.is_finite()) {
            return Err(crate::Error::Config(format!("{} must be finite, got {}", name, value)));
        }
        if pose.frame_width < 2 || pose.frame_height < 2 {
            return Err(crate::Error::Config(format!(
                "pose frame must be at least 2x2, got {}x{}",
                pose.frame_width, pose.frame_height
            )));
        }
        let capacity = self.bridge.queue_capacity;
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(crate::Error::Config(format!(
                "queue_capacity must be a power of 2, got {}",
                capacity
            )));
        }
        Ok(())
    }

    /// Load config from file
    pub fn load(path: &PathBuf) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from default location
    pub fn load_default() -> Result<Self, crate::Error> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &PathBuf) -> Result<(), crate::Error> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".touchpad2touch").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Generate TOML representation
    pub fn to_toml(&self) -> Result<String, crate::Error> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Engine settings derived from this config
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            calibration_window: Duration::try_from_secs_f64(self.calibration.window_secs)
                .unwrap_or(Duration::ZERO),
            margin: self.calibration.margin,
            ref_count: self.roles.ref_count,
            trigger_mode: self.trigger.mode,
            gesture_hold: Duration::from_millis(self.trigger.gesture_hold_ms),
            pose: self.pose,
        }
    }

    /// Socket path, falling back to the per-user default
    pub fn socket_path(&self) -> PathBuf {
        self.bridge
            .socket_path
            .clone()
            .unwrap_or_else(crate::output::bridge::default_socket_path)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.trigger.poll_interval_ms)
    }
}
