//! Host network stack capabilities
//!
//! A tunnel client cannot create interfaces or exempt sockets from routing on
//! its own; the host grants those capabilities. [`NetworkStack`] is the seam
//! between the session logic and the platform, so the controller can run
//! against a fake stack in tests.

use crate::config::InterfaceConfig;
use crate::device::InterfaceDescriptor;
use crate::error::Result;
use crate::RawFd;

/// Capabilities the host platform grants to the tunnel client
pub trait NetworkStack: Send + Sync {
    /// Ask the platform (or the user) for permission to run a tunnel
    ///
    /// Returns `true` when consent is already granted or was just granted.
    fn request_consent(&self) -> bool;

    /// Create and bring up a virtual interface
    ///
    /// Fails if the platform refuses, for example because consent was
    /// revoked or the descriptor table is exhausted.
    fn establish_interface(&self, config: &InterfaceConfig) -> Result<InterfaceDescriptor>;

    /// Exclude a socket from the tunnel's own routing
    ///
    /// Without this, traffic on the tunnel's control socket would be routed
    /// back into the tunnel. Returns `false` if the platform refused.
    fn protect(&self, fd: RawFd) -> bool;
}
