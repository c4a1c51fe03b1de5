//! Touch Source Device
//!
//! Opens the touchpad's evdev node, probes its absolute axes and translates
//! kernel events into [`RawEvent`]s. Reads are non-blocking behind a bounded
//! readiness wait so the caller can observe shutdown between waits.

use super::keyboard::{event_nodes, open_nonblocking};
use super::readiness::{Readiness, ReadinessSet};
use super::types::{Axis, AxisRange, ContactProtocol, RawEvent, SurfaceBounds};
use evdev_rs::enums::{EventCode, EventType, EV_ABS, EV_SYN};
use evdev_rs::{Device, DeviceWrapper, GrabMode, ReadFlag, ReadStatus};
use std::io;
use std::os::fd::AsFd;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, trace, warn};

/// What the device reports and how
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceInfo {
    pub name: String,
    pub protocol: ContactProtocol,
    /// Axis bounds as declared by the driver
    pub declared: SurfaceBounds,
    pub grabbed: bool,
}

pub struct TouchDevice {
    device: Device,
    readiness: ReadinessSet,
    path: PathBuf,
    info: SurfaceInfo,
}

impl TouchDevice {
    /// Open `path`, probe its capabilities and optionally grab it.
    ///
    /// Fails with [`crate::Error::Device`] when the node lacks absolute X or
    /// Y. A failed grab is fatal only when `require_grab` is set.
    pub fn open(path: &Path, grab: bool, require_grab: bool) -> crate::Result<Self> {
        let (mut device, file) = open_nonblocking(path)
            .map_err(|e| crate::Error::Device(format!("open {}: {}", path.display(), e)))?;

        let (protocol, declared) = probe_axes(&device).ok_or_else(|| {
            crate::Error::Device(format!(
                "{} does not report absolute X/Y positions",
                path.display()
            ))
        })?;

        let grabbed = if grab || require_grab {
            match device.grab(GrabMode::Grab) {
                Ok(()) => true,
                Err(e) if require_grab => {
                    return Err(crate::Error::Grab(format!("{}: {}", path.display(), e)));
                }
                Err(e) => {
                    warn!(device = %path.display(), error = %e, "exclusive grab failed, sharing the device");
                    false
                }
            }
        } else {
            false
        };

        let info = SurfaceInfo {
            name: device.name().unwrap_or("unknown").to_string(),
            protocol,
            declared,
            grabbed,
        };
        info!(
            device = %path.display(),
            name = %info.name,
            protocol = ?info.protocol,
            x_min = declared.x.min,
            x_max = declared.x.max,
            y_min = declared.y.min,
            y_max = declared.y.max,
            grabbed,
            "touch device opened"
        );

        let mut readiness = ReadinessSet::new()?;
        readiness.watch(file.as_fd())?;

        Ok(Self {
            device,
            readiness,
            path: path.to_path_buf(),
            info,
        })
    }

    pub fn info(&self) -> &SurfaceInfo {
        &self.info
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait up to `timeout` for input and append every pending event.
    ///
    /// Returns the number of events appended. Undecodable events are skipped.
    /// A vanished device is reported as [`crate::Error::Device`].
    pub fn read_events(&mut self, timeout: Duration, out: &mut Vec<RawEvent>) -> crate::Result<usize> {
        match self.readiness.wait(timeout)?.first() {
            Some(Readiness::Readable) => {}
            Some(Readiness::Gone) => {
                return Err(crate::Error::Device(format!("{} disappeared", self.path.display())));
            }
            _ => return Ok(0),
        }

        let before = out.len();
        let mut flag = ReadFlag::NORMAL;
        loop {
            match self.device.next_event(flag) {
                Ok((ReadStatus::Success, event)) => {
                    if let Some(raw) = translate(self.info.protocol, &event.event_code, event.value) {
                        out.push(raw);
                    }
                }
                Ok((ReadStatus::Sync, event)) => {
                    if flag == ReadFlag::NORMAL {
                        warn!("input events dropped by the kernel, resyncing");
                        flag = ReadFlag::SYNC;
                    } else if let Some(raw) = translate(self.info.protocol, &event.event_code, event.value) {
                        out.push(raw);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if flag == ReadFlag::SYNC {
                        flag = ReadFlag::NORMAL;
                        continue;
                    }
                    break;
                }
                Err(e) if e.raw_os_error() == Some(libc::ENODEV) => {
                    return Err(crate::Error::Device(format!("{} disappeared", self.path.display())));
                }
                Err(e) => {
                    trace!(error = %e, "skipping unreadable event");
                    break;
                }
            }
        }
        Ok(out.len() - before)
    }
}

/// One input node as reported by `--list-devices`
#[derive(Debug, Clone, PartialEq)]
pub struct InputNode {
    pub path: PathBuf,
    pub name: String,
    /// Contact protocol when the node reports absolute X/Y
    pub touch: Option<ContactProtocol>,
    pub keys: bool,
}

/// Describe every input node that can be opened.
pub fn list_input_nodes() -> Vec<InputNode> {
    event_nodes()
        .into_iter()
        .filter_map(|path| {
            let (device, _) = open_nonblocking(&path).ok()?;
            Some(InputNode {
                name: device.name().unwrap_or("unknown").to_string(),
                touch: probe_axes(&device).map(|(protocol, _)| protocol),
                keys: device.has(EventType::EV_KEY),
                path,
            })
        })
        .collect()
}

/// Absolute axes of `device`: multi-contact axes when present, else
/// single-contact ones.
fn probe_axes(device: &Device) -> Option<(ContactProtocol, SurfaceBounds)> {
    let multi = (
        EventCode::EV_ABS(EV_ABS::ABS_MT_POSITION_X),
        EventCode::EV_ABS(EV_ABS::ABS_MT_POSITION_Y),
    );
    let single = (
        EventCode::EV_ABS(EV_ABS::ABS_X),
        EventCode::EV_ABS(EV_ABS::ABS_Y),
    );

    for (protocol, (x, y)) in [
        (ContactProtocol::MultiTouch, multi),
        (ContactProtocol::SingleTouch, single),
    ] {
        if !(device.has(x.clone()) && device.has(y.clone())) {
            continue;
        }
        let (Some(xi), Some(yi)) = (device.abs_info(&x), device.abs_info(&y)) else {
            continue;
        };
        let bounds = SurfaceBounds::new(
            AxisRange::new(xi.minimum, xi.maximum),
            AxisRange::new(yi.minimum, yi.maximum),
        );
        return Some((protocol, bounds));
    }
    None
}

/// Map one kernel event onto the contact protocol. Events the engine does
/// not use map to `None`.
///
/// Multi-contact surfaces also emit single-contact axes for legacy pointer
/// emulation; those are ignored so each finger is reported once.
pub fn translate(protocol: ContactProtocol, code: &EventCode, value: i32) -> Option<RawEvent> {
    match (protocol, code) {
        (_, EventCode::EV_SYN(EV_SYN::SYN_REPORT)) => Some(RawEvent::Sync),
        (ContactProtocol::MultiTouch, EventCode::EV_ABS(abs)) => match abs {
            EV_ABS::ABS_MT_SLOT => Some(RawEvent::Slot(value)),
            EV_ABS::ABS_MT_TRACKING_ID => Some(RawEvent::TrackingId(value)),
            EV_ABS::ABS_MT_POSITION_X => Some(RawEvent::Position { axis: Axis::X, value }),
            EV_ABS::ABS_MT_POSITION_Y => Some(RawEvent::Position { axis: Axis::Y, value }),
            _ => None,
        },
        (ContactProtocol::SingleTouch, EventCode::EV_ABS(abs)) => match abs {
            EV_ABS::ABS_X => Some(RawEvent::Position { axis: Axis::X, value }),
            EV_ABS::ABS_Y => Some(RawEvent::Position { axis: Axis::Y, value }),
            _ => None,
        },
        _ => None,
    }
}
