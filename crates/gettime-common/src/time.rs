//! Microsecond timestamps on a monotonic timebase.
//!
//! A [`Timestamp`] renders as a bare decimal integer, which is the line the
//! `gettime` binary prints. Kernel trace stamps (`<secs>.<micros>`) convert
//! into the same unit so both can be compared directly.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ClockError, ClockResult, ParseTimestampError};

/// Microseconds in one second.
pub const MICROS_PER_SEC: i64 = 1_000_000;

const NANOS_PER_SEC: i64 = 1_000_000_000;
const NANOS_PER_MICRO: i128 = 1_000;

/// Microseconds since an unspecified, per-boot epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Wrap a raw microsecond count.
    #[must_use]
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Raw microsecond count.
    #[must_use]
    pub const fn as_micros(self) -> i64 {
        self.0
    }

    /// Combine a kernel `timespec` into whole microseconds.
    ///
    /// Sub-microsecond precision is truncated toward zero, also for negative
    /// values: -1.5µs becomes -1µs.
    ///
    /// # Errors
    ///
    /// [`ClockError::InvalidNanos`] if `nanos` is outside
    /// `0..1_000_000_000`, [`ClockError::Overflow`] if the result does not
    /// fit in an `i64`.
    pub fn from_clock_parts(secs: i64, nanos: i64) -> ClockResult<Self> {
        if !(0..NANOS_PER_SEC).contains(&nanos) {
            return Err(ClockError::InvalidNanos(nanos));
        }

        let total_nanos = i128::from(secs) * i128::from(NANOS_PER_SEC) + i128::from(nanos);
        i64::try_from(total_nanos / NANOS_PER_MICRO)
            .map(Self)
            .map_err(|_| ClockError::Overflow { secs, nanos })
    }

    /// Parse a kernel trace clock stamp such as `1234.567890`.
    ///
    /// The fractional part must be exactly six digits, as ftrace prints it.
    ///
    /// # Errors
    ///
    /// [`ParseTimestampError::MalformedTraceClock`] for anything else, and
    /// [`ParseTimestampError::OutOfRange`] if the value overflows.
    pub fn from_trace_clock(stamp: &str) -> Result<Self, ParseTimestampError> {
        let malformed = || ParseTimestampError::MalformedTraceClock(stamp.to_owned());

        let (secs, micros) = stamp.trim().split_once('.').ok_or_else(malformed)?;
        if secs.is_empty()
            || micros.len() != 6
            || !secs.bytes().all(|b| b.is_ascii_digit())
            || !micros.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(malformed());
        }

        let secs: i64 = secs.parse().map_err(|_| ParseTimestampError::OutOfRange)?;
        let micros: i64 = micros.parse().map_err(|_| malformed())?;

        secs.checked_mul(MICROS_PER_SEC)
            .and_then(|s| s.checked_add(micros))
            .map(Self)
            .ok_or(ParseTimestampError::OutOfRange)
    }

    /// Extract the trace clock stamp from a raw ftrace line.
    ///
    /// ```text
    ///   <idle>-0     [001] d..2  1234.567890: cpu_idle: state=1 cpu_id=1
    /// ```
    ///
    /// Returns `None` if the line carries no `<secs>.<micros>:` field.
    #[must_use]
    pub fn from_trace_line(line: &str) -> Option<Self> {
        line.split_whitespace()
            .filter_map(|field| field.strip_suffix(':'))
            .find_map(|field| Self::from_trace_clock(field).ok())
    }

    /// Time elapsed from `earlier` to `self`, or `None` if `earlier` is later.
    #[must_use]
    pub fn checked_duration_since(self, earlier: Self) -> Option<Duration> {
        let delta = self.0.checked_sub(earlier.0)?;
        u64::try_from(delta).ok().map(Duration::from_micros)
    }

    /// Signed microseconds from `earlier` to `self`, saturating at the `i64` bounds.
    #[must_use]
    pub const fn saturating_micros_since(self, earlier: Self) -> i64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Timestamp {
    type Err = ParseTimestampError;

    /// Parse a printed timestamp line. Surrounding whitespace, including the
    /// trailing newline, is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim_matches(|c: char| c.is_ascii_whitespace());
        let digits = s.strip_prefix('-').unwrap_or(s);
        if digits.is_empty() {
            return Err(ParseTimestampError::Empty);
        }
        if let Some(found) = digits.chars().find(|c| !c.is_ascii_digit()) {
            return Err(ParseTimestampError::InvalidDigit { found });
        }

        s.parse::<i64>()
            .map(Self)
            .map_err(|_| ParseTimestampError::OutOfRange)
    }
}

/// Pair of timestamps bracketing an event.
///
/// Renders as `<start> <stop>` on one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaptureWindow {
    start: Timestamp,
    stop: Timestamp,
}

impl CaptureWindow {
    /// Create a window.
    ///
    /// # Errors
    ///
    /// [`ParseTimestampError::ReversedWindow`] if `stop` precedes `start`.
    pub fn new(start: Timestamp, stop: Timestamp) -> Result<Self, ParseTimestampError> {
        if stop < start {
            return Err(ParseTimestampError::ReversedWindow {
                start: start.as_micros(),
                stop: stop.as_micros(),
            });
        }
        Ok(Self { start, stop })
    }

    /// Start of the window.
    #[must_use]
    pub const fn start(&self) -> Timestamp {
        self.start
    }

    /// End of the window.
    #[must_use]
    pub const fn stop(&self) -> Timestamp {
        self.stop
    }

    /// Length of the window.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.stop
            .checked_duration_since(self.start)
            .unwrap_or(Duration::ZERO)
    }

    /// Whether `stamp` falls inside the window, both ends included.
    #[must_use]
    pub fn contains(&self, stamp: Timestamp) -> bool {
        (self.start..=self.stop).contains(&stamp)
    }
}

impl fmt::Display for CaptureWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.start, self.stop)
    }
}

impl FromStr for CaptureWindow {
    type Err = ParseTimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.split_whitespace();
        let (Some(start), Some(stop), None) = (fields.next(), fields.next(), fields.next()) else {
            return Err(ParseTimestampError::MalformedWindow(s.to_owned()));
        };
        Self::new(start.parse()?, stop.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_parts_truncate() {
        let stamp = Timestamp::from_clock_parts(12, 345_678_999).unwrap();
        assert_eq!(stamp.as_micros(), 12_345_678);

        let stamp = Timestamp::from_clock_parts(0, 999).unwrap();
        assert_eq!(stamp.as_micros(), 0);
    }

    #[test]
    fn test_clock_parts_truncate_toward_zero_when_negative() {
        // -1s + 0.9999985s = -1.5us
        let stamp = Timestamp::from_clock_parts(-1, 999_998_500).unwrap();
        assert_eq!(stamp.as_micros(), -1);

        let stamp = Timestamp::from_clock_parts(-1, 500_000_000).unwrap();
        assert_eq!(stamp.as_micros(), -500_000);
    }

    #[test]
    fn test_clock_parts_bounds() {
        let max = Timestamp::from_clock_parts(9_223_372_036_854, 775_807_000).unwrap();
        assert_eq!(max.as_micros(), i64::MAX);

        let err = Timestamp::from_clock_parts(9_223_372_036_854, 775_808_000).unwrap_err();
        assert_eq!(
            err,
            ClockError::Overflow {
                secs: 9_223_372_036_854,
                nanos: 775_808_000
            }
        );

        assert!(Timestamp::from_clock_parts(i64::MAX, 0).is_err());
    }

    #[test]
    fn test_clock_parts_reject_bad_nanos() {
        assert_eq!(
            Timestamp::from_clock_parts(1, 1_000_000_000),
            Err(ClockError::InvalidNanos(1_000_000_000))
        );
        assert_eq!(
            Timestamp::from_clock_parts(1, -1),
            Err(ClockError::InvalidNanos(-1))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Timestamp::from_micros(0).to_string(), "0");
        assert_eq!(Timestamp::from_micros(1_234_567).to_string(), "1234567");
        assert_eq!(Timestamp::from_micros(-42).to_string(), "-42");
        assert_eq!(
            Timestamp::from_micros(i64::MIN).to_string(),
            "-9223372036854775808"
        );
    }

    #[test]
    fn test_parse_printed_line() {
        assert_eq!(
            "1234567\n".parse::<Timestamp>(),
            Ok(Timestamp::from_micros(1_234_567))
        );
        assert_eq!("-42".parse::<Timestamp>(), Ok(Timestamp::from_micros(-42)));
        assert_eq!("  7 \r\n".parse::<Timestamp>(), Ok(Timestamp::from_micros(7)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!("".parse::<Timestamp>(), Err(ParseTimestampError::Empty));
        assert_eq!("\n".parse::<Timestamp>(), Err(ParseTimestampError::Empty));
        assert_eq!("-".parse::<Timestamp>(), Err(ParseTimestampError::Empty));
        assert_eq!(
            "+5".parse::<Timestamp>(),
            Err(ParseTimestampError::InvalidDigit { found: '+' })
        );
        assert_eq!(
            "12.5".parse::<Timestamp>(),
            Err(ParseTimestampError::InvalidDigit { found: '.' })
        );
        assert_eq!(
            "1 2".parse::<Timestamp>(),
            Err(ParseTimestampError::InvalidDigit { found: ' ' })
        );
        assert_eq!(
            "9223372036854775808".parse::<Timestamp>(),
            Err(ParseTimestampError::OutOfRange)
        );
    }

    #[test]
    fn test_trace_clock() {
        assert_eq!(
            Timestamp::from_trace_clock("1234.567890"),
            Ok(Timestamp::from_micros(1_234_567_890))
        );
        assert_eq!(
            Timestamp::from_trace_clock("0.000001"),
            Ok(Timestamp::from_micros(1))
        );
    }

    #[test]
    fn test_trace_clock_rejects_malformed() {
        for stamp in ["1234", "1234.5678", ".123456", "12a4.123456", "1.1234567", "-1.000000"] {
            assert_eq!(
                Timestamp::from_trace_clock(stamp),
                Err(ParseTimestampError::MalformedTraceClock(stamp.to_owned())),
                "accepted {stamp:?}"
            );
        }
        assert_eq!(
            Timestamp::from_trace_clock("99999999999999999999.000000"),
            Err(ParseTimestampError::OutOfRange)
        );
    }

    #[test]
    fn test_trace_line() {
        let line = "          <idle>-0     [001] d..2  5021.336715: cpu_idle: state=1 cpu_id=1";
        assert_eq!(
            Timestamp::from_trace_line(line),
            Some(Timestamp::from_micros(5_021_336_715))
        );

        let line = " kworker/u16:2-1234  [003] ....  77.000042: net_dev_xmit: dev=wlan0 len=1500";
        assert_eq!(
            Timestamp::from_trace_line(line),
            Some(Timestamp::from_micros(77_000_042))
        );

        assert_eq!(Timestamp::from_trace_line("# tracer: nop"), None);
        assert_eq!(Timestamp::from_trace_line(""), None);
    }

    #[test]
    fn test_differences() {
        let a = Timestamp::from_micros(1_000);
        let b = Timestamp::from_micros(3_500);

        assert_eq!(b.checked_duration_since(a), Some(Duration::from_micros(2_500)));
        assert_eq!(a.checked_duration_since(b), None);
        assert_eq!(a.checked_duration_since(a), Some(Duration::ZERO));
        assert_eq!(a.saturating_micros_since(b), -2_500);
        assert_eq!(
            Timestamp::from_micros(i64::MAX).saturating_micros_since(Timestamp::from_micros(-1)),
            i64::MAX
        );
    }

    #[test]
    fn test_window() {
        let window =
            CaptureWindow::new(Timestamp::from_micros(100), Timestamp::from_micros(250)).unwrap();

        assert_eq!(window.duration(), Duration::from_micros(150));
        assert!(window.contains(Timestamp::from_micros(100)));
        assert!(window.contains(Timestamp::from_micros(250)));
        assert!(!window.contains(Timestamp::from_micros(99)));
        assert!(!window.contains(Timestamp::from_micros(251)));
        assert_eq!(window.to_string(), "100 250");
    }

    #[test]
    fn test_window_parse() {
        let window: CaptureWindow = "5021000000 5023500000\n".parse().unwrap();
        assert_eq!(window.start(), Timestamp::from_micros(5_021_000_000));
        assert_eq!(window.stop(), Timestamp::from_micros(5_023_500_000));

        let empty: CaptureWindow = "7 7".parse().unwrap();
        assert_eq!(empty.duration(), Duration::ZERO);
    }

    #[test]
    fn test_window_rejects_bad_input() {
        assert_eq!(
            "20 10".parse::<CaptureWindow>(),
            Err(ParseTimestampError::ReversedWindow { start: 20, stop: 10 })
        );
        assert_eq!(
            "10".parse::<CaptureWindow>(),
            Err(ParseTimestampError::MalformedWindow("10".to_owned()))
        );
        assert_eq!(
            "1 2 3".parse::<CaptureWindow>(),
            Err(ParseTimestampError::MalformedWindow("1 2 3".to_owned()))
        );
        assert_eq!(
            "1 x".parse::<CaptureWindow>(),
            Err(ParseTimestampError::InvalidDigit { found: 'x' })
        );
    }

    #[test]
    fn test_trace_events_inside_captured_window() {
        let window: CaptureWindow = "5021000000 5022000000".parse().unwrap();
        let trace = "\
            <idle>-0 [000] d..2 5020.999999: cpu_idle: state=0 cpu_id=0\n\
            <idle>-0 [000] d..2 5021.000000: cpu_idle: state=1 cpu_id=0\n\
            <idle>-0 [000] d..2 5021.500000: cpu_frequency: state=1800000 cpu_id=0\n\
            <idle>-0 [000] d..2 5022.000001: cpu_idle: state=0 cpu_id=0\n";

        let inside = trace
            .lines()
            .filter_map(Timestamp::from_trace_line)
            .filter(|&ts| window.contains(ts))
            .count();
        assert_eq!(inside, 2);
    }
}
