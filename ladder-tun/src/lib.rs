//! Virtual interface description for the Ladder 4-over-6 tunnel client
//!
//! This crate describes the virtual interface a tunnel session needs and the
//! capabilities the host platform must grant to create it.
//!
//! # Features
//!
//! - **Interface Configuration**: addresses, routes, DNS servers, MTU and
//!   session label, built with [`InterfaceConfig::builder`]
//! - **Routes**: the default route via [`Route::default_v4`]
//! - **Platform Seam**: [`NetworkStack`] for consent, establishment and
//!   socket protection, and [`TunnelInterface`] for the resulting handle
//!
//! # Example
//!
//! ```
//! use std::net::Ipv4Addr;
//! use ladder_tun::{InterfaceConfig, Route};
//!
//! let config = InterfaceConfig::builder()
//!     .address(Ipv4Addr::new(10, 0, 0, 2), 32)?
//!     .route(Route::default_v4(Ipv4Addr::new(10, 0, 0, 1)))
//!     .dns_server(Ipv4Addr::new(8, 8, 8, 8))
//!     .mtu(1500)
//!     .session("4over6")
//!     .build()?;
//!
//! assert_eq!(config.routes.len(), 1);
//! # Ok::<(), ladder_tun::Error>(())
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod route;
pub mod stack;

pub use config::{InterfaceConfig, InterfaceConfigBuilder};
pub use device::{InterfaceDescriptor, TunnelInterface};
pub use error::{Error, Result};
pub use route::Route;
pub use stack::NetworkStack;

/// Raw file descriptor as exchanged with the platform and the tunnel engine
pub type RawFd = i32;

/// Default MTU for the virtual interface
pub const DEFAULT_MTU: u16 = 1500;
