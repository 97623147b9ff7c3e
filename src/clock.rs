// src/clock.rs

//! Time source used for every timestamp the supervisor records.
//!
//! Injecting the clock keeps the pure core deterministic: tests substitute a
//! stepping clock and get identical results across runs.

use chrono::{DateTime, Utc};

/// Provides the current time.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
