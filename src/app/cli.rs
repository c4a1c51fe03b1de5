//! Command-Line Interface

use super::config::Config;
use crate::engine::trigger::TriggerMode;
use clap::Parser;
use std::path::PathBuf;

/// touchpad2touch - Use a multi-touch touchpad as an absolute touchscreen
#[derive(Parser, Debug)]
#[command(name = "touchpad2touch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Touch device node (e.g. /dev/input/event5)
    pub device: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Grab the touch device exclusively
    #[arg(long)]
    pub grab: bool,

    /// Abort if the exclusive grab fails
    #[arg(long)]
    pub require_grab: bool,

    /// Calibration window in seconds (0 = use declared bounds)
    #[arg(long, value_name = "SECS")]
    pub calib_seconds: Option<f64>,

    /// Calibration margin as a fraction of each axis
    #[arg(long)]
    pub margin: Option<f64>,

    /// Number of reference fingers
    #[arg(long, value_name = "N")]
    pub ref_count: Option<usize>,

    /// Recording trigger
    #[arg(long, value_enum)]
    pub trigger: Option<TriggerMode>,

    /// Hotkey name (e.g. KEY_SPACE, KEY_F9)
    #[arg(long)]
    pub hotkey: Option<String>,

    /// Keyboard node to watch for the hotkey (repeatable)
    #[arg(long = "hotkey-dev", value_name = "PATH")]
    pub hotkey_devices: Vec<PathBuf>,

    /// Gesture hold time in milliseconds
    #[arg(long, value_name = "MS")]
    pub gesture_hold_ms: Option<u64>,

    /// Renderer socket path
    #[arg(long, value_name = "PATH")]
    pub socket_path: Option<PathBuf>,

    /// Also write completed sessions to this directory
    #[arg(long, value_name = "DIR")]
    pub sessions_dir: Option<PathBuf>,

    #[arg(long)]
    pub outer_scale: Option<f64>,

    #[arg(long)]
    pub inner_ratio: Option<f64>,

    #[arg(long)]
    pub center_shift_gamma: Option<f64>,

    #[arg(long)]
    pub mark_slope: Option<f64>,

    /// Marker rotation in degrees (negative = clockwise on screen)
    #[arg(long, allow_negative_numbers = true)]
    pub mark_deg: Option<f64>,

    #[arg(long)]
    pub inner_guard_a: Option<f64>,

    #[arg(long)]
    pub inner_guard_b: Option<f64>,

    #[arg(long)]
    pub mid_guard_a: Option<f64>,

    #[arg(long)]
    pub mid_guard_b: Option<f64>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,

    /// List input device nodes and exit
    #[arg(long)]
    pub list_devices: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Overlay every flag that was given onto `config`.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(device) = &self.device {
            config.device.path = Some(device.clone());
        }
        config.device.grab |= self.grab;
        config.device.require_grab |= self.require_grab;

        set(&mut config.calibration.window_secs, self.calib_seconds);
        set(&mut config.calibration.margin, self.margin);
        set(&mut config.roles.ref_count, self.ref_count);

        set(&mut config.trigger.mode, self.trigger);
        set(&mut config.trigger.hotkey, self.hotkey.clone());
        if !self.hotkey_devices.is_empty() {
            config.trigger.hotkey_devices = self.hotkey_devices.clone();
        }
        set(&mut config.trigger.gesture_hold_ms, self.gesture_hold_ms);

        if let Some(path) = &self.socket_path {
            config.bridge.socket_path = Some(path.clone());
        }
        if let Some(dir) = &self.sessions_dir {
            config.archive.sessions_dir = Some(dir.clone());
        }

        let pose = &mut config.pose;
        set(&mut pose.outer_scale, self.outer_scale);
        set(&mut pose.inner_ratio, self.inner_ratio);
        set(&mut pose.center_shift_gamma, self.center_shift_gamma);
        set(&mut pose.mark_slope, self.mark_slope);
        set(&mut pose.mark_deg, self.mark_deg);
        set(&mut pose.inner_guard_a, self.inner_guard_a);
        set(&mut pose.inner_guard_b, self.inner_guard_b);
        set(&mut pose.mid_guard_a, self.mid_guard_a);
        set(&mut pose.mid_guard_b, self.mid_guard_b);
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}
