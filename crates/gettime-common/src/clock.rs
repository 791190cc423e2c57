//! Kernel clock sampling.
//!
//! Reads go through `clock_gettime` rather than `std::time::Instant` so the
//! value shares its epoch with every other process on the machine, including
//! the kernel's trace clock. Two invocations of the binary can then be
//! compared with each other and with ftrace event stamps.

use std::fmt;

use nix::time::{clock_gettime, ClockId};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::config::ReaderConfig;
use crate::error::{ClockError, ClockResult};
use crate::time::Timestamp;

/// Kernel clock backing a [`TimeReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClockSource {
    /// `CLOCK_MONOTONIC`: steady, slewed by NTP, stops during suspend.
    #[default]
    Monotonic,
    /// `CLOCK_MONOTONIC_RAW`: hardware rate, never slewed (Linux/Android).
    MonotonicRaw,
    /// `CLOCK_BOOTTIME`: like `Monotonic` but keeps counting during suspend (Linux/Android).
    Boottime,
}

impl ClockSource {
    /// All sources, in declaration order.
    pub const ALL: [Self; 3] = [Self::Monotonic, Self::MonotonicRaw, Self::Boottime];

    /// Whether this source can be read on the current platform.
    #[must_use]
    pub fn is_supported(self) -> bool {
        self.clock_id().is_some()
    }

    /// Configuration name of the source.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monotonic => "monotonic",
            Self::MonotonicRaw => "monotonic_raw",
            Self::Boottime => "boottime",
        }
    }

    fn clock_id(self) -> Option<ClockId> {
        match self {
            Self::Monotonic => Some(ClockId::CLOCK_MONOTONIC),
            #[cfg(any(target_os = "linux", target_os = "android"))]
            Self::MonotonicRaw => Some(ClockId::CLOCK_MONOTONIC_RAW),
            #[cfg(any(target_os = "linux", target_os = "android"))]
            Self::Boottime => Some(ClockId::CLOCK_BOOTTIME),
            #[cfg(not(any(target_os = "linux", target_os = "android")))]
            Self::MonotonicRaw | Self::Boottime => None,
        }
    }
}

impl fmt::Display for ClockSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Samples a monotonic clock as whole microseconds.
///
/// Successive reads from the same source never decrease. A single value has
/// no meaning on its own; only the difference between two reads taken on the
/// same boot does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeReader {
    source: ClockSource,
}

impl TimeReader {
    /// Create a reader for the given clock.
    #[must_use]
    pub const fn new(source: ClockSource) -> Self {
        Self { source }
    }

    /// Create a reader from configuration.
    #[must_use]
    pub const fn from_config(config: &ReaderConfig) -> Self {
        Self::new(config.source)
    }

    /// Clock this reader samples.
    #[must_use]
    pub const fn source(&self) -> ClockSource {
        self.source
    }

    /// Sample the clock once.
    ///
    /// Nanoseconds are truncated toward zero to whole microseconds.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::Unsupported`] if the source does not exist on
    /// this platform, [`ClockError::Unavailable`] if the kernel rejects the
    /// query, and [`ClockError::Overflow`] if the value does not fit in
    /// 64-bit microseconds.
    pub fn read(&self) -> ClockResult<Timestamp> {
        let Some(clock_id) = self.source.clock_id() else {
            warn!(source = %self.source, "Clock source not supported on this platform");
            return Err(ClockError::Unsupported(self.source));
        };

        let ts = clock_gettime(clock_id).map_err(|errno| ClockError::Unavailable {
            clock: self.source,
            errno,
        })?;

        let stamp = Timestamp::from_clock_parts(i64::from(ts.tv_sec()), i64::from(ts.tv_nsec()))?;
        trace!(source = %self.source, micros = stamp.as_micros(), "Clock sampled");
        Ok(stamp)
    }
}

/// Sample the default monotonic clock once.
///
/// # Errors
///
/// See [`TimeReader::read`].
pub fn now() -> ClockResult<Timestamp> {
    TimeReader::default().read()
}
