//! Monotonic time source for arrival stamps.
//!
//! Orders are prioritized FIFO at equal prices, so arrival timestamps must
//! never go backwards. The wall clock is sampled exactly once per process;
//! every later reading adds the elapsed time of a monotonic [`Instant`] to
//! that anchor, yielding Unix nanoseconds that are immune to system clock
//! adjustments.

use std::sync::OnceLock;
use std::time::Instant;
use time::OffsetDateTime;

/// Unix timestamp in nanoseconds.
pub type Timestamp = u64;

/// Source of monotonic nanosecond timestamps.
pub trait Clock: Send + Sync {
    fn now_ns(&self) -> Timestamp;
}

struct Anchor {
    epoch_ns: u64,
    started: Instant,
}

fn anchor() -> &'static Anchor {
    static ANCHOR: OnceLock<Anchor> = OnceLock::new();
    ANCHOR.get_or_init(|| Anchor {
        epoch_ns: OffsetDateTime::now_utc().unix_timestamp_nanos() as u64,
        started: Instant::now(),
    })
}

/// The default clock: wall-clock anchored, monotonic afterwards.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now_ns(&self) -> Timestamp {
        let anchor = anchor();
        anchor.epoch_ns + anchor.started.elapsed().as_nanos() as u64
    }
}

/// Current time from the process-wide [`MonotonicClock`].
pub fn now() -> Timestamp {
    MonotonicClock.now_ns()
}
