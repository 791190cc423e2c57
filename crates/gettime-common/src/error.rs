use crate::clock::ClockSource;
use nix::errno::Errno;
use thiserror::Error;

/// Failures while sampling a kernel clock.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ClockError {
    /// `clock_gettime` rejected the request.
    #[error("clock {clock} unavailable: {errno}")]
    Unavailable {
        /// Clock that was queried.
        clock: ClockSource,
        /// Error reported by the kernel.
        #[source]
        errno: Errno,
    },

    /// The sampled value does not fit in signed 64-bit microseconds.
    #[error("clock value {secs}s + {nanos}ns overflows 64-bit microseconds")]
    Overflow {
        /// Whole seconds reported by the clock.
        secs: i64,
        /// Nanosecond remainder reported by the clock.
        nanos: i64,
    },

    /// The nanosecond field was outside `0..1_000_000_000`.
    #[error("nanosecond field out of range: {0}")]
    InvalidNanos(i64),

    /// The clock source does not exist on this platform.
    #[error("clock {0} is not supported on this platform")]
    Unsupported(ClockSource),
}

/// Convenience type alias for clock operations.
pub type ClockResult<T> = Result<T, ClockError>;

/// Errors from parsing printed timestamps, trace clock stamps, and capture windows.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseTimestampError {
    /// Nothing but whitespace was supplied.
    #[error("empty timestamp")]
    Empty,

    /// A character other than an optional leading `-` and ASCII digits.
    #[error("invalid character {found:?} in timestamp")]
    InvalidDigit {
        /// First offending character.
        found: char,
    },

    /// Well-formed digits that do not fit in signed 64-bit microseconds.
    #[error("timestamp out of range for 64-bit microseconds")]
    OutOfRange,

    /// Not a `<secs>.<micros>` trace clock stamp.
    #[error("malformed trace clock stamp {0:?}: expected <secs>.<micros>")]
    MalformedTraceClock(String),

    /// Not a `<start> <stop>` capture window line.
    #[error("malformed capture window {0:?}: expected \"<start> <stop>\"")]
    MalformedWindow(String),

    /// A capture window whose stop precedes its start.
    #[error("capture window stops at {stop} before it starts at {start}")]
    ReversedWindow {
        /// Start of the window in microseconds.
        start: i64,
        /// Stop of the window in microseconds.
        stop: i64,
    },
}
