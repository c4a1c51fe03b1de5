//! Hotkey Monitor
//!
//! Watches any number of keyboard-like evdev nodes from one thread and turns
//! the logical OR of the hotkey across all of them into edge commands for the
//! touch loop. The monitor never touches engine state; it only enqueues
//! [`ControlCommand`]s.

use super::readiness::{Readiness, ReadinessSet};
use super::ring_buffer::RingProducer;
use crate::engine::trigger::ControlCommand;
use evdev_rs::enums::{EventCode, EventType};
use evdev_rs::{Device, DeviceWrapper, ReadFlag};
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::fd::AsFd;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

const INPUT_DIR: &str = "/dev/input";

/// Key value reported on press
const KEY_PRESS: i32 = 1;
/// Key value reported on release. Autorepeat (2) is ignored.
const KEY_RELEASE: i32 = 0;

/// Resolve a key name such as `KEY_SPACE` or `KEY_F9`.
pub fn parse_hotkey(name: &str) -> crate::Result<EventCode> {
    match EventCode::from_str(&EventType::EV_KEY, name) {
        Some(code @ EventCode::EV_KEY(_)) => Ok(code),
        _ => Err(crate::Error::Config(format!("unknown key name '{}'", name))),
    }
}

/// Every `/dev/input/event*` node, sorted by path.
pub(super) fn event_nodes() -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(INPUT_DIR) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("event"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();
    paths
}

/// Every input node that reports key events, sorted by path.
/// Nodes in `exclude` and nodes that cannot be opened are skipped.
pub fn discover_keyboards(exclude: &[PathBuf]) -> Vec<PathBuf> {
    event_nodes()
        .into_iter()
        .filter(|p| !exclude.contains(p))
        .filter(|p| match open_nonblocking(p) {
            Ok((device, _)) => device.has(EventType::EV_KEY),
            Err(e) => {
                debug!(device = %p.display(), error = %e, "skipping input node");
                false
            }
        })
        .collect()
}

/// Open an evdev node for non-blocking reads. The returned file shares the
/// device's descriptor and is what readiness waits register.
pub(super) fn open_nonblocking(path: &Path) -> io::Result<(Device, File)> {
    let file = OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)?;
    let handle = file.try_clone()?;
    let device = Device::new_from_file(file)?;
    Ok((device, handle))
}

/// Queue a command for the touch loop. A full queue drops it.
fn forward(commands: &mut RingProducer<ControlCommand>, cmd: ControlCommand) -> bool {
    if commands.push(cmd.clone()) {
        return true;
    }
    warn!(?cmd, "control queue full, hotkey command dropped");
    false
}

/// Per-source pressed flags and their logical OR
#[derive(Debug, Clone, Default)]
pub struct HotkeyState {
    pressed: Vec<bool>,
    any: bool,
}

impl HotkeyState {
    pub fn new(sources: usize) -> Self {
        Self {
            pressed: vec![false; sources],
            any: false,
        }
    }

    pub fn is_down(&self) -> bool {
        self.any
    }

    pub fn sources(&self) -> usize {
        self.pressed.len()
    }

    /// Apply a key value from source `index`; returns the command for an OR
    /// edge.
    pub fn update(&mut self, index: usize, value: i32) -> Option<ControlCommand> {
        let flag = self.pressed.get_mut(index)?;
        match value {
            KEY_PRESS => *flag = true,
            KEY_RELEASE => *flag = false,
            _ => return None,
        }
        self.edge()
    }

    /// Forget source `index`. A key held on it counts as released.
    pub fn remove(&mut self, index: usize) -> Option<ControlCommand> {
        if index >= self.pressed.len() {
            return None;
        }
        self.pressed.remove(index);
        self.edge()
    }

    fn edge(&mut self) -> Option<ControlCommand> {
        let any_now = self.pressed.iter().any(|p| *p);
        match (self.any, any_now) {
            (false, true) => {
                self.any = true;
                Some(ControlCommand::HotkeyDown)
            }
            (true, false) => {
                self.any = false;
                Some(ControlCommand::HotkeyUp)
            }
            _ => None,
        }
    }
}

struct KeyboardSource {
    path: PathBuf,
    device: Device,
    file: File,
}

pub struct HotkeyMonitor {
    sources: Vec<KeyboardSource>,
    key: EventCode,
    state: HotkeyState,
    commands: RingProducer<ControlCommand>,
    poll_interval: Duration,
}

impl HotkeyMonitor {
    /// Open every path that can be opened.
    ///
    /// Fails with [`crate::Error::Keyboard`] when none can.
    pub fn open(
        paths: &[PathBuf],
        key: EventCode,
        commands: RingProducer<ControlCommand>,
        poll_interval: Duration,
    ) -> crate::Result<Self> {
        let mut sources = Vec::new();
        for path in paths {
            match open_nonblocking(path) {
                Ok((device, file)) => {
                    info!(device = %path.display(), name = device.name().unwrap_or("unknown"), "watching for hotkey");
                    sources.push(KeyboardSource {
                        path: path.clone(),
                        device,
                        file,
                    });
                }
                Err(e) => warn!(device = %path.display(), error = %e, "cannot open keyboard"),
            }
        }
        if sources.is_empty() {
            return Err(crate::Error::Keyboard(
                "no keyboard-like devices available".to_string(),
            ));
        }

        Ok(Self {
            state: HotkeyState::new(sources.len()),
            sources,
            key,
            commands,
            poll_interval,
        })
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn spawn(mut self, running: Arc<AtomicBool>) -> io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("hotkey".into())
            .spawn(move || self.run(&running))
    }

    fn watch_all(&self) -> io::Result<ReadinessSet> {
        let mut set = ReadinessSet::new()?;
        for source in &self.sources {
            set.watch(source.file.as_fd())?;
        }
        Ok(set)
    }

    fn run(&mut self, running: &AtomicBool) {
        let mut set = match self.watch_all() {
            Ok(set) => set,
            Err(e) => {
                self.fail(format!("hotkey wait setup failed: {}", e));
                return;
            }
        };

        while running.load(Ordering::SeqCst) {
            let readiness = match set.wait(self.poll_interval) {
                Ok(r) => r,
                Err(e) => {
                    self.fail(format!("hotkey wait failed: {}", e));
                    return;
                }
            };

            let mut gone = Vec::new();
            for (index, ready) in readiness.into_iter().enumerate() {
                match ready {
                    Readiness::Readable => {
                        if let Err(e) = self.drain_source(index) {
                            warn!(device = %self.sources[index].path.display(), error = %e, "keyboard read failed");
                            gone.push(index);
                        }
                    }
                    Readiness::Gone => gone.push(index),
                    Readiness::Idle => {}
                }
            }

            for index in gone.into_iter().rev() {
                set.remove(index);
                let source = self.sources.remove(index);
                warn!(device = %source.path.display(), "keyboard disappeared");
                if let Some(cmd) = self.state.remove(index) {
                    forward(&mut self.commands, cmd);
                }
            }
            if self.sources.is_empty() {
                self.fail("all keyboard devices disappeared".to_string());
                return;
            }
        }
        debug!("hotkey monitor stopped");
    }

    fn drain_source(&mut self, index: usize) -> io::Result<()> {
        loop {
            match self.sources[index].device.next_event(ReadFlag::NORMAL) {
                Ok((_, event)) => {
                    if event.event_code == self.key {
                        if let Some(cmd) = self.state.update(index, event.value) {
                            debug!(?cmd, "hotkey edge");
                            forward(&mut self.commands, cmd);
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    fn fail(&mut self, reason: String) {
        warn!(%reason, "hotkey monitor giving up");
        forward(&mut self.commands, ControlCommand::HotkeyFailed(reason));
    }
}
