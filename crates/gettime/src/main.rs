//! `gettime` entry point.
//!
//! Prints the monotonic clock in whole microseconds on one line and exits.
//! Command-line arguments are ignored.

use std::io::{self, Write};

use anyhow::{Context, Result};
use gettime_common::{ReaderConfig, TimeReader, Timestamp};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Fixed log filter. The environment is never consulted.
const LOG_FILTER: &str = "gettime=warn,gettime_common=warn";

fn main() -> Result<()> {
    init_logging();

    let reader = TimeReader::from_config(&ReaderConfig::default());
    let stamp = reader
        .read()
        .with_context(|| format!("Failed to read {} clock", reader.source()))?;
    debug!(source = %reader.source(), micros = stamp.as_micros(), "Clock sampled");

    write_stamp(&mut io::stdout().lock(), stamp)
}

/// Route diagnostics to stderr so stdout carries only the timestamp.
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(LOG_FILTER))
        .with_writer(io::stderr)
        .with_target(true)
        .init();
}

/// Write the timestamp line and flush.
fn write_stamp<W: Write>(out: &mut W, stamp: Timestamp) -> Result<()> {
    writeln!(out, "{stamp}").context("Failed to write timestamp to stdout")?;
    out.flush().context("Failed to flush stdout")
}
