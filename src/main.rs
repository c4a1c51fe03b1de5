//! touchpad2touch - Touchpad to Virtual Touchscreen Bridge
//!
//! Reads a multi-touch touchpad, drives a uinput touchscreen with the action
//! finger and streams pose and session data to a local overlay socket.

use anyhow::{bail, Context};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use touchpad2touch::app::cli::Cli;
use touchpad2touch::app::config::Config;
use touchpad2touch::capture::{
    discover_keyboards, list_input_nodes, parse_hotkey, HotkeyMonitor, MessageRing, TouchDevice,
};
use touchpad2touch::engine::{ControlCommand, Engine};
use touchpad2touch::output::{Publisher, SessionArchive, SocketBridge, VirtualTouchscreen};
use touchpad2touch::time::timebase::{Timebase, Timestamp};
use touchpad2touch::{Error, OutboundMessage, RawEvent};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Capacity of the keyboard -> touch loop queue
const CONTROL_QUEUE_CAPACITY: usize = 64;
/// Bounded wait between shutdown checks
const READ_TIMEOUT: Duration = Duration::from_millis(100);

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments first so we can use --verbose to set log level
    let cli = Cli::parse_args();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = if let Some(path) = &cli.config {
        Config::load(path)?
    } else {
        Config::load_default()?
    };
    cli.apply_overrides(&mut config);
    config.validate()?;

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }
    if cli.list_devices {
        run_list_devices();
        return Ok(());
    }

    Timebase::init();
    run(&config)
}

fn run_list_devices() {
    let nodes = list_input_nodes();
    if nodes.is_empty() {
        println!("No readable input devices (try running as root or joining the 'input' group).");
        return;
    }
    for node in nodes {
        let touch = match node.touch {
            Some(protocol) => format!("touch:{:?}", protocol),
            None => "-".to_string(),
        };
        let keys = if node.keys { "keys" } else { "-" };
        println!("{:<22} {:<18} {:<5} {}", node.path.display(), touch, keys, node.name);
    }
}

fn run(config: &Config) -> anyhow::Result<()> {
    let Some(device_path) = config.device.path.clone() else {
        bail!("no touch device given (pass a path such as /dev/input/event5, see --list-devices)");
    };

    let mut touch = TouchDevice::open(&device_path, config.device.grab, config.device.require_grab)
        .with_context(|| format!("cannot use {} as the touch source", device_path.display()))?;
    let surface = touch.info().clone();

    let mut screen = VirtualTouchscreen::create().context("cannot create the virtual touchscreen")?;

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        handler_flag.store(false, Ordering::SeqCst);
    })?;

    let (control_tx, control_rx) = MessageRing::<ControlCommand>::with_capacity(CONTROL_QUEUE_CAPACITY).split();
    let outbound = MessageRing::<OutboundMessage>::with_capacity(config.bridge.queue_capacity);
    let outbound_stats = outbound.stats();
    let (mut out_tx, out_rx) = outbound.split();

    let mut workers: Vec<JoinHandle<()>> = Vec::new();

    if config.trigger.mode.uses_keyboard() {
        let key = parse_hotkey(&config.trigger.hotkey)?;
        let paths = if config.trigger.hotkey_devices.is_empty() {
            discover_keyboards(std::slice::from_ref(&device_path))
        } else {
            config.trigger.hotkey_devices.clone()
        };
        let monitor = HotkeyMonitor::open(&paths, key, control_tx, config.poll_interval())
            .context("hotkey trigger enabled but no keyboard could be opened")?;
        info!(hotkey = %config.trigger.hotkey, keyboards = monitor.source_count(), "hotkey monitor ready");
        workers.push(monitor.spawn(Arc::clone(&running))?);
    }

    let socket_path = config.socket_path();
    let bridge = SocketBridge::bind(&socket_path)
        .with_context(|| format!("cannot bind {}", socket_path.display()))?;
    let archive = match &config.archive.sessions_dir {
        Some(dir) => Some(SessionArchive::open(dir.clone())?),
        None => None,
    };
    workers.push(Publisher::new(out_rx, bridge, archive).spawn(Arc::clone(&running))?);

    let mut engine = Engine::new(
        config.engine_config(),
        surface.protocol,
        surface.declared,
        Timestamp::now(),
    );
    engine.attach_controls(control_rx);

    info!(
        trigger = ?config.trigger.mode,
        ref_count = config.roles.ref_count,
        socket = %socket_path.display(),
        "running, press Ctrl+C to stop"
    );

    let mut events: Vec<RawEvent> = Vec::with_capacity(64);
    while running.load(Ordering::SeqCst) {
        events.clear();
        match touch.read_events(READ_TIMEOUT, &mut events) {
            Ok(_) => {}
            Err(Error::Device(reason)) => {
                error!(%reason, "touch device lost");
                break;
            }
            Err(e) => {
                warn!(error = %e, "touch read failed");
                continue;
            }
        }

        for event in &events {
            match engine.apply(event, Timestamp::now(), &mut screen, &mut out_tx) {
                Ok(()) => {}
                Err(Error::Protocol(reason)) => debug!(%reason, "event skipped"),
                Err(e) => warn!(error = %e, "event failed"),
            }
        }
    }

    info!(frames = engine.frames(), "shutting down");
    if let Err(e) = engine.finish(Timestamp::now(), &mut screen, &mut out_tx) {
        warn!(error = %e, "failed to release the virtual touchscreen");
    }

    running.store(false, Ordering::SeqCst);
    for worker in workers {
        if worker.join().is_err() {
            warn!("worker thread panicked");
        }
    }

    info!(
        pushed = outbound_stats.pushed.load(Ordering::Relaxed),
        dropped = outbound_stats.dropped.load(Ordering::Relaxed),
        peak = outbound_stats.peak_occupancy.load(Ordering::Relaxed),
        "outbound queue"
    );
    Ok(())
}
