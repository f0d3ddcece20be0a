//! Session events

use std::net::Ipv4Addr;

use ladder_tun::RawFd;

use crate::session::SessionState;

/// Events emitted by the session controller
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// State changed
    StateChanged {
        old: SessionState,
        new: SessionState,
    },

    /// Session is active
    Connected {
        /// Address assigned to the local end of the tunnel
        local_address: Ipv4Addr,
        /// Remote end of the tunnel
        gateway: Ipv4Addr,
        /// DNS servers installed on the interface
        dns_servers: Vec<Ipv4Addr>,
    },

    /// The engine's control socket could not be excluded from tunnel routing
    ProtectFailed {
        /// The socket that stayed unprotected
        fd: RawFd,
    },

    /// Session torn down
    Disconnected {
        /// Reason for disconnection
        reason: String,
    },

    /// Error occurred
    Error {
        /// Error message
        message: String,
        /// Whether the error aborted a start attempt
        fatal: bool,
    },
}

/// Event handler trait for receiving session events
#[async_trait::async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle a session event
    async fn on_event(&self, event: SessionEvent);
}

/// Simple event handler that logs events
pub struct LoggingEventHandler;

#[async_trait::async_trait]
impl EventHandler for LoggingEventHandler {
    async fn on_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::StateChanged { old, new } => {
                log::info!("Session state: {} -> {}", old, new);
            }
            SessionEvent::Connected {
                local_address,
                gateway,
                dns_servers,
            } => {
                log::info!(
                    "Connected: address={}, gateway={}, dns={:?}",
                    local_address,
                    gateway,
                    dns_servers
                );
            }
            SessionEvent::ProtectFailed { fd } => {
                log::warn!(
                    "Failed to protect socket {}; tunnel traffic may loop through itself",
                    fd
                );
            }
            SessionEvent::Disconnected { reason } => {
                log::info!("Disconnected: {}", reason);
            }
            SessionEvent::Error { message, fatal } => {
                if fatal {
                    log::error!("Error: {}", message);
                } else {
                    log::warn!("Recoverable error: {}", message);
                }
            }
        }
    }
}
