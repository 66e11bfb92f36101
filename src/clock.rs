//! Wall-clock source for the echo handler.
//!
//! Handlers never call `Utc::now()` directly; they ask the [`Clock`] stored in
//! [`crate::api::AppState`]. Production uses [`SystemClock`]; tests swap in a
//! fixed or failing clock to pin the response.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use chrono::{DateTime, Utc};

/// Source of the current UTC time.
pub trait Clock: Send + Sync {
    fn now(&self) -> anyhow::Result<DateTime<Utc>>;
}

/// Reads the operating system's real-time clock.
///
/// Fails when the system time is set before the Unix epoch or lies outside
/// the range chrono can represent.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> anyhow::Result<DateTime<Utc>> {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("system clock is set before the Unix epoch")?;
        let secs = i64::try_from(since_epoch.as_secs()).context("system clock out of range")?;
        DateTime::from_timestamp(secs, since_epoch.subsec_nanos())
            .context("system clock out of range")
    }
}
