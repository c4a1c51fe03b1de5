//! Bounded readiness waits over input file descriptors.
//!
//! Each watched descriptor is a level-triggered calloop source. A wait
//! dispatches the loop once and reports, in registration order, which
//! descriptors fired.

use calloop::generic::Generic;
use calloop::{EventLoop, Interest, Mode, PostAction, RegistrationToken};
use std::io;
use std::os::fd::BorrowedFd;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Readable,
    Idle,
    Gone,
}

/// Sources that fired during one dispatch, by watch id
type Fired = Vec<(usize, Readiness)>;

pub struct ReadinessSet {
    event_loop: EventLoop<'static, Fired>,
    entries: Vec<(usize, RegistrationToken)>,
    next_id: usize,
}

impl ReadinessSet {
    /// The set owns an event loop and must stay on the thread that waits on it.
    pub fn new() -> io::Result<Self> {
        let event_loop = EventLoop::try_new().map_err(io::Error::from)?;
        Ok(Self {
            event_loop,
            entries: Vec::new(),
            next_id: 0,
        })
    }

    /// Watch `fd` for input. It reports at the next free position.
    pub fn watch(&mut self, fd: BorrowedFd<'_>) -> io::Result<()> {
        let owned = fd.try_clone_to_owned()?;
        let id = self.next_id;
        let source = Generic::new(owned, Interest::READ, Mode::Level);
        let token = self
            .event_loop
            .handle()
            .insert_source(source, move |readiness, _fd, fired: &mut Fired| {
                if readiness.readable {
                    fired.push((id, Readiness::Readable));
                } else if readiness.error {
                    fired.push((id, Readiness::Gone));
                }
                Ok(PostAction::Continue)
            })
            .map_err(|e| io::Error::from(e.error))?;
        self.entries.push((id, token));
        self.next_id += 1;
        Ok(())
    }

    /// Stop watching the descriptor at `index`; later positions shift down.
    pub fn remove(&mut self, index: usize) {
        if index < self.entries.len() {
            let (_, token) = self.entries.remove(index);
            self.event_loop.handle().remove(token);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Wait up to `timeout` for any watched descriptor.
    ///
    /// Returns one flag per position. An interrupted wait reports every
    /// descriptor idle.
    pub fn wait(&mut self, timeout: Duration) -> io::Result<Vec<Readiness>> {
        let mut fired = Fired::new();
        match self.event_loop.dispatch(Some(timeout), &mut fired) {
            Ok(()) => {}
            Err(calloop::Error::IoError(e)) if e.kind() == io::ErrorKind::Interrupted => {
                return Ok(vec![Readiness::Idle; self.entries.len()]);
            }
            Err(e) => return Err(io::Error::from(e)),
        }

        Ok(self
            .entries
            .iter()
            .map(|(id, _)| {
                fired
                    .iter()
                    .find(|(fired_id, _)| fired_id == id)
                    .map(|(_, r)| *r)
                    .unwrap_or(Readiness::Idle)
            })
            .collect())
    }
}
