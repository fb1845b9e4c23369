//! Network time synchronization
//!
//! A minimal SNTP (RFC 4330) client: one mode-3 query over UDP, read
//! the server's transmit timestamp, compare it against the local wall
//! clock and install the difference as the scheduler's clock offset.
//! Failures leave the previous offset in place; the next cycle retries.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::io;
use std::net::UdpSocket;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::scheduler::{Job, Scheduler};

/// Seconds between the NTP era-0 epoch (1900-01-01) and the Unix epoch.
const NTP_UNIX_OFFSET_SECS: i64 = 2_208_988_800;

/// SNTP packet size; queries and responses use the same layout.
const PACKET_SIZE: usize = 48;

/// Byte offset of the transmit timestamp within the packet.
const TRANSMIT_OFFSET: usize = 40;

/// First packet byte: leap indicator 0, version 4, client mode 3.
const CLIENT_HEADER: u8 = 0x23;

/// How long to wait on the socket before giving the cycle up.
const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Time sync error. Never fatal; the offset simply stays unchanged.
#[derive(Debug, Error)]
pub enum Error {
    /// Socket-level failure (bind, send, receive, timeout).
    #[error("time source I/O error: {0}")]
    Io(#[from] io::Error),
    /// Response shorter than an SNTP packet.
    #[error("short response from time source ({0} bytes)")]
    ShortResponse(usize),
    /// Response was not a server or broadcast reply.
    #[error("unexpected NTP mode {0}")]
    Mode(u8),
    /// Transmit timestamp missing or outside the representable range.
    #[error("time source returned an invalid timestamp")]
    InvalidTimestamp,
}

/// Periodic clock correction against one SNTP source.
pub struct TimeSync {
    source: String,
    scheduler: Arc<Scheduler>,
}

impl TimeSync {
    /// Create an agent querying `source` (host:port) and correcting
    /// the given scheduler's clock.
    pub fn new(source: impl Into<String>, scheduler: Arc<Scheduler>) -> Self {
        Self {
            source: source.into(),
            scheduler,
        }
    }

    /// Run one sync cycle and return the installed offset.
    pub fn sync(&self) -> Result<Duration, Error> {
        let true_time = query(&self.source)?;
        // Sampled immediately after the response returns; any gap
        // between the two reads leaks into the measured offset.
        let local_time = Utc::now();

        let offset = true_time - local_time;
        let previous = self.scheduler.update_time_offset(offset);
        info!(
            "synchronized against {}: offset {}ms (was {}ms)",
            self.source,
            offset.num_milliseconds(),
            previous.num_milliseconds()
        );
        Ok(offset)
    }

    /// Wrap this agent as a scheduler job so sync cycles ride on the
    /// same run loop they correct.
    #[must_use]
    pub fn as_job(self: &Arc<Self>) -> Job {
        let this = Arc::clone(self);
        Arc::new(move || {
            if let Err(e) = this.sync() {
                warn!("unable to get network time - {}", e);
            }
        })
    }
}

/// Send one SNTP query and return the server's transmit time.
fn query(source: &str) -> Result<DateTime<Utc>, Error> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.set_read_timeout(Some(QUERY_TIMEOUT))?;
    socket.set_write_timeout(Some(QUERY_TIMEOUT))?;
    socket.connect(source)?;

    let mut request = [0u8; PACKET_SIZE];
    request[0] = CLIENT_HEADER;
    socket.send(&request)?;

    let mut response = [0u8; PACKET_SIZE];
    let len = socket.recv(&mut response)?;
    parse_response(&response[..len])
}

/// Decode the transmit timestamp out of a server response.
fn parse_response(response: &[u8]) -> Result<DateTime<Utc>, Error> {
    if response.len() < PACKET_SIZE {
        return Err(Error::ShortResponse(response.len()));
    }
    let mode = response[0] & 0x07;
    if mode != 4 && mode != 5 {
        return Err(Error::Mode(mode));
    }

    let secs = u32::from_be_bytes([
        response[TRANSMIT_OFFSET],
        response[TRANSMIT_OFFSET + 1],
        response[TRANSMIT_OFFSET + 2],
        response[TRANSMIT_OFFSET + 3],
    ]);
    let frac = u32::from_be_bytes([
        response[TRANSMIT_OFFSET + 4],
        response[TRANSMIT_OFFSET + 5],
        response[TRANSMIT_OFFSET + 6],
        response[TRANSMIT_OFFSET + 7],
    ]);
    // A zero transmit timestamp is a kiss-of-death reply.
    if secs == 0 && frac == 0 {
        return Err(Error::InvalidTimestamp);
    }

    let unix_secs = i64::from(secs) - NTP_UNIX_OFFSET_SECS;
    let nanos = (u64::from(frac) * 1_000_000_000) >> 32;
    Utc.timestamp_opt(unix_secs, nanos as u32)
        .single()
        .ok_or(Error::InvalidTimestamp)
}
