//! Throughput counters read from the tunnel engine
//!
//! The engine reports its counters as one line of eight integers:
//!
//! ```text
//! bytesIn packetsIn flowIn elapsedIn bytesOut packetsOut flowOut elapsedOut
//! ```
//!
//! `flow` is the number of bytes moved since the previous read and `elapsed`
//! the number of seconds that window covers, so `flow / elapsed` is the
//! current rate for that direction.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Number of fields in a counter line
pub const COUNTER_FIELDS: usize = 8;

/// Raw counters for one poll of the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub bytes_in: u64,
    pub packets_in: u64,
    pub flow_in: u64,
    pub elapsed_in: u64,
    pub bytes_out: u64,
    pub packets_out: u64,
    pub flow_out: u64,
    pub elapsed_out: u64,
}

impl CounterSnapshot {
    /// Download rate in bytes per second; zero when no time has elapsed
    pub fn download_rate(&self) -> f64 {
        rate(self.flow_in, self.elapsed_in)
    }

    /// Upload rate in bytes per second; zero when no time has elapsed
    pub fn upload_rate(&self) -> f64 {
        rate(self.flow_out, self.elapsed_out)
    }

    /// `(download, upload)` rates in bytes per second
    pub fn rates(&self) -> (f64, f64) {
        (self.download_rate(), self.upload_rate())
    }
}

fn rate(flow: u64, elapsed: u64) -> f64 {
    if elapsed == 0 {
        return 0.0;
    }
    flow as f64 / elapsed as f64
}

impl FromStr for CounterSnapshot {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let fields = s
            .split_ascii_whitespace()
            .map(|token| {
                token
                    .parse::<u64>()
                    .map_err(|_| Error::Parse(format!("invalid counter value '{}'", token)))
            })
            .collect::<Result<Vec<u64>>>()?;

        if fields.len() != COUNTER_FIELDS {
            return Err(Error::Parse(format!(
                "counter line has {} field(s), expected {}",
                fields.len(),
                COUNTER_FIELDS
            )));
        }

        Ok(Self {
            bytes_in: fields[0],
            packets_in: fields[1],
            flow_in: fields[2],
            elapsed_in: fields[3],
            bytes_out: fields[4],
            packets_out: fields[5],
            flow_out: fields[6],
            elapsed_out: fields[7],
        })
    }
}

impl fmt::Display for CounterSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {} {}",
            self.bytes_in,
            self.packets_in,
            self.flow_in,
            self.elapsed_in,
            self.bytes_out,
            self.packets_out,
            self.flow_out,
            self.elapsed_out
        )
    }
}

/// What the presentation layer shows for one telemetry tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DisplaySnapshot {
    /// Seconds since the session became active
    pub uptime_secs: u64,
    /// Total bytes received
    pub bytes_in: u64,
    /// Total packets received
    pub packets_in: u64,
    /// Total bytes sent
    pub bytes_out: u64,
    /// Total packets sent
    pub packets_out: u64,
    /// Current download rate in bytes per second
    pub download_rate: f64,
    /// Current upload rate in bytes per second
    pub upload_rate: f64,
}

impl DisplaySnapshot {
    /// Derive the display values from a counter read
    pub fn from_counters(counters: &CounterSnapshot, uptime_secs: u64) -> Self {
        let (download_rate, upload_rate) = counters.rates();
        Self {
            uptime_secs,
            bytes_in: counters.bytes_in,
            packets_in: counters.packets_in,
            bytes_out: counters.bytes_out,
            packets_out: counters.packets_out,
            download_rate,
            upload_rate,
        }
    }
}

impl fmt::Display for DisplaySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Time: {} Seconds", self.uptime_secs)?;
        writeln!(
            f,
            "Total download: {} Bytes, {} Packets",
            self.bytes_in, self.packets_in
        )?;
        writeln!(
            f,
            "Total upload: {} Bytes, {} Packets",
            self.bytes_out, self.packets_out
        )?;
        writeln!(f, "Download speed: {:.1} Bytes/s", self.download_rate)?;
        write!(f, "Uploading speed: {:.1} Bytes/s", self.upload_rate)
    }
}
