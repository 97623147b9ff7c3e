use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};
use taskwarden::clock::Clock;

/// Deterministic clock: every `now()` returns the current instant and then
/// advances it by a fixed step.
///
/// Two runs that ask for the time in the same order observe identical
/// timestamps.
#[derive(Debug)]
pub struct SteppingClock {
    current: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl SteppingClock {
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            current: Mutex::new(start),
            step,
        }
    }

    /// Fixed epoch used by [`Default`].
    pub fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .expect("valid epoch")
    }
}

impl Default for SteppingClock {
    fn default() -> Self {
        Self::new(Self::epoch(), Duration::seconds(1))
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let mut guard = self.current.lock().expect("clock mutex poisoned");
        let now = *guard;
        *guard = now + self.step;
        now
    }
}
