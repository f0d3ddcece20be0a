//! Tunnel engine interface
//!
//! The engine does the actual 4-over-6 work: it connects to the server over
//! IPv6, performs the handshake, and moves packets between the virtual
//! interface and the transport. This crate only drives it.
//!
//! `open`, `start` and `stop` are not reentrant. The session controller
//! guarantees that at most one of them runs at a time.

use async_trait::async_trait;

use ladder_tun::RawFd;

use crate::error::Result;

/// Operations the session controller needs from a tunnel engine
#[async_trait]
pub trait NativeTunnelEngine: Send + Sync {
    /// Connect to the server and perform the handshake
    ///
    /// Returns the raw bootstrap line, see [`crate::bootstrap`].
    async fn open(&self, address: &str, port: u16) -> Result<String>;

    /// Start forwarding packets through the interface behind `fd`
    async fn start(&self, fd: RawFd);

    /// Stop forwarding and drop the server connection
    ///
    /// Must be safe to call after a failed or partial `open`. The controller
    /// calls it once after every start that got as far as `open`.
    async fn stop(&self);

    /// Read the current counter line, see [`crate::counters`]
    ///
    /// Reading resets the per-window `flow` and `elapsed` values.
    async fn read_counters(&self) -> Result<String>;
}
