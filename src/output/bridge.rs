//! Socket Bridge
//!
//! Delivers the outbound message stream to the external renderer over a Unix
//! socket, one JSON object per line. A single reader is served at a time; a
//! newer connection replaces the old one. With no reader connected, or after
//! a failed or stalled write, messages are dropped and the publisher keeps
//! going.

use super::archive::SessionArchive;
use super::messages::OutboundMessage;
use crate::capture::ring_buffer::RingConsumer;
use parking_lot::Mutex;
use std::io::{self, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const ACCEPT_INTERVAL: Duration = Duration::from_millis(50);
const IDLE_INTERVAL: Duration = Duration::from_millis(2);
const PUBLISH_BATCH: usize = 256;
/// A reader that stops draining is dropped after this long
const WRITE_TIMEOUT: Duration = Duration::from_millis(100);

/// Default socket path: `/tmp/touchpad2touch.<uid>.sock`, where uid is the
/// invoking user's when run through sudo.
pub fn default_socket_path() -> PathBuf {
    let uid = std::env::var("SUDO_UID")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or_else(|| unsafe { libc::getuid() });
    PathBuf::from(format!("/tmp/touchpad2touch.{}.sock", uid))
}

/// Delivery counters
#[derive(Debug, Default)]
pub struct BridgeStats {
    pub sent: AtomicU64,
    /// Messages dropped with no reader connected
    pub unconnected: AtomicU64,
    /// Connections dropped after a failed write
    pub disconnects: AtomicU64,
}

pub struct SocketBridge {
    path: PathBuf,
    client: Arc<Mutex<Option<UnixStream>>>,
    running: Arc<AtomicBool>,
    acceptor: Option<JoinHandle<()>>,
    stats: Arc<BridgeStats>,
}

impl SocketBridge {
    /// Bind the socket at `path` and start accepting readers.
    ///
    /// A stale socket file is removed first. The socket is world-writable so
    /// an unprivileged renderer can connect to a root-owned engine.
    pub fn bind(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }

        let listener = UnixListener::bind(path)
            .map_err(|e| crate::Error::Bridge(format!("bind {}: {}", path.display(), e)))?;
        listener.set_nonblocking(true)?;

        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o666))?;
        }

        info!(socket = %path.display(), "bridge listening");

        let client = Arc::new(Mutex::new(None));
        let running = Arc::new(AtomicBool::new(true));
        let acceptor = {
            let client = Arc::clone(&client);
            let running = Arc::clone(&running);
            std::thread::Builder::new()
                .name("bridge-accept".into())
                .spawn(move || accept_loop(listener, client, running))?
        };

        Ok(Self {
            path: path.to_path_buf(),
            client,
            running,
            acceptor: Some(acceptor),
            stats: Arc::new(BridgeStats::default()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_connected(&self) -> bool {
        self.client.lock().is_some()
    }

    pub fn stats(&self) -> Arc<BridgeStats> {
        Arc::clone(&self.stats)
    }

    /// Write one line to the connected reader.
    ///
    /// Returns false if the line was dropped. A failed write, including one
    /// that hits the write timeout, disconnects the reader.
    pub fn send_line(&self, line: &str) -> bool {
        let mut guard = self.client.lock();
        let Some(stream) = guard.as_mut() else {
            self.stats.unconnected.fetch_add(1, Ordering::Relaxed);
            return false;
        };
        match stream.write_all(line.as_bytes()) {
            Ok(()) => {
                self.stats.sent.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(e) => {
                warn!(error = %e, "renderer disconnected");
                *guard = None;
                self.stats.disconnects.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn send(&self, message: &OutboundMessage) -> crate::Result<bool> {
        Ok(self.send_line(&message.to_line()?))
    }

    /// Stop accepting and remove the socket file
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.acceptor.take() {
            if handle.join().is_err() {
                error!("bridge acceptor panicked");
            }
        }
        *self.client.lock() = None;
        let _ = std::fs::remove_file(&self.path);
    }
}

impl Drop for SocketBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn accept_loop(
    listener: UnixListener,
    client: Arc<Mutex<Option<UnixStream>>>,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, _addr)) => {
                let configured = stream
                    .set_nonblocking(false)
                    .and_then(|()| stream.set_write_timeout(Some(WRITE_TIMEOUT)));
                if let Err(e) = configured {
                    warn!(error = %e, "could not configure renderer connection");
                    continue;
                }
                let replaced = client.lock().replace(stream).is_some();
                info!(replaced, "renderer connected");
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                std::thread::sleep(ACCEPT_INTERVAL);
            }
            Err(e) => {
                error!("accept error: {}", e);
                std::thread::sleep(ACCEPT_INTERVAL);
            }
        }
    }
}

/// Drains the outbound queue into the bridge and the optional archive
pub struct Publisher {
    messages: RingConsumer<OutboundMessage>,
    bridge: SocketBridge,
    archive: Option<SessionArchive>,
}

impl Publisher {
    pub fn new(
        messages: RingConsumer<OutboundMessage>,
        bridge: SocketBridge,
        archive: Option<SessionArchive>,
    ) -> Self {
        Self {
            messages,
            bridge,
            archive,
        }
    }

    /// Publish everything currently queued. Returns the number of messages
    /// taken off the queue.
    pub fn pump(&mut self) -> usize {
        let batch = self.messages.pop_batch(PUBLISH_BATCH);
        for message in &batch {
            if let (OutboundMessage::SavePaths(session), Some(archive)) = (message, &self.archive) {
                match archive.store(session) {
                    Ok(path) => info!(path = %path.display(), "session archived"),
                    Err(e) => warn!(error = %e, "failed to archive session"),
                }
            }
            match self.bridge.send(message) {
                Ok(true) => {}
                Ok(false) => debug!(kind = message.kind(), "message dropped"),
                Err(e) => warn!(error = %e, "failed to encode message"),
            }
        }
        batch.len()
    }

    /// Run on a dedicated thread until `running` clears, then flush what is
    /// left in the queue.
    pub fn spawn(mut self, running: Arc<AtomicBool>) -> io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("publisher".into())
            .spawn(move || {
                while running.load(Ordering::SeqCst) {
                    if self.pump() == 0 {
                        std::thread::sleep(IDLE_INTERVAL);
                    }
                }
                while self.pump() > 0 {}
                let stats = self.bridge.stats();
                info!(
                    sent = stats.sent.load(Ordering::Relaxed),
                    unconnected = stats.unconnected.load(Ordering::Relaxed),
                    disconnects = stats.disconnects.load(Ordering::Relaxed),
                    "publisher stopped"
                );
            })
    }
}
