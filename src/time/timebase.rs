//! Monotonic timebase
//!
//! Every timestamp in the engine is a nanosecond offset from a single
//! process-wide anchor taken from `std::time::Instant`. Storing plain `u64`
//! ticks keeps contact records `Copy` and lets tests script time exactly
//! (`Timestamp::from_millis(400)`) without touching the real clock.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Process-wide anchor, initialized on first use
static ANCHOR: OnceLock<Instant> = OnceLock::new();

/// Monotonic clock anchored at process start.
#[derive(Debug, Clone, Copy)]
pub struct Timebase;

impl Timebase {
    /// Pin the anchor. Optional; the first `now_nanos` call does it otherwise.
    pub fn init() {
        ANCHOR.get_or_init(Instant::now);
    }

    /// Nanoseconds elapsed since the anchor.
    #[inline]
    pub fn now_nanos() -> u64 {
        let anchor = *ANCHOR.get_or_init(Instant::now);
        let nanos = anchor.elapsed().as_nanos();
        u64::try_from(nanos).unwrap_or(u64::MAX)
    }

    /// Nanoseconds elapsed between two tick values. Returns 0 if `end < start`.
    #[inline]
    pub fn elapsed_nanos(start: u64, end: u64) -> u64 {
        end.saturating_sub(start)
    }
}

/// A point on the monotonic timeline, in nanoseconds since the anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    #[inline]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis * 1_000_000)
    }

    /// Capture the current monotonic time.
    #[inline]
    pub fn now() -> Self {
        Self(Timebase::now_nanos())
    }

    #[inline]
    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn as_millis(&self) -> u64 {
        self.0 / 1_000_000
    }

    /// Time elapsed since `earlier`, saturating at zero.
    #[inline]
    pub fn duration_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_nanos(Timebase::elapsed_nanos(earlier.0, self.0))
    }

    /// `self + d`, saturating at the end of the timeline.
    #[inline]
    pub fn saturating_add(&self, d: Duration) -> Timestamp {
        let nanos = u64::try_from(d.as_nanos()).unwrap_or(u64::MAX);
        Timestamp(self.0.saturating_add(nanos))
    }

    #[inline]
    pub fn is_after(&self, other: Timestamp) -> bool {
        self.0 > other.0
    }
}

impl serde::Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let nanos = u64::deserialize(deserializer)?;
        Ok(Timestamp(nanos))
    }
}
