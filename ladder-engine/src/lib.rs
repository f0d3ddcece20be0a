//! Ladder Engine
//!
//! This crate provides the control plane of a 4-over-6 tunnel client: it
//! bootstraps a session with the tunnel server, brings up the virtual
//! interface, and samples the engine's traffic counters for display.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Application Layer                        │
//! │  ┌─────────────────┐              ┌─────────────────────┐   │
//! │  │   ladder-cli    │              │   Platform UI       │   │
//! │  └────────┬────────┘              └──────────┬──────────┘   │
//! │           │                                   │              │
//! │           └───────────────┬──────────────────┘              │
//! │                           ▼                                  │
//! │  ┌────────────────────────────────────────────────────────┐ │
//! │  │                   ladder-engine                         │ │
//! │  │  - SessionController (state machine)                   │ │
//! │  │  - TelemetryLoop (counter polling)                     │ │
//! │  │  - Config (TOML configuration)                         │ │
//! │  │  - Events (status updates, errors)                     │ │
//! │  └────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Capability Layer                         │
//! │  ┌─────────────────────┐    ┌─────────────────┐            │
//! │  │ NativeTunnelEngine  │    │   ladder-tun    │            │
//! │  │  - Handshake        │    │  - Interface    │            │
//! │  │  - Encapsulation    │    │  - Routes       │            │
//! │  │  - Counters         │    │  - Protect      │            │
//! │  └─────────────────────┘    └─────────────────┘            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use ladder_engine::mock::{MockEngine, MockNetworkStack};
//! use ladder_engine::{SessionController, SessionState};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let engine = Arc::new(MockEngine::new());
//! engine.set_bootstrap("37 10.0.0.2 10.0.0.1 8.8.8.8 8.8.4.4");
//! let controller = SessionController::new(engine, Arc::new(MockNetworkStack::new()));
//!
//! controller.start("2001:db8::1", 5678).await.unwrap();
//! assert_eq!(controller.state(), SessionState::Active);
//! controller.stop().await;
//! # });
//! ```

pub mod bootstrap;
pub mod config;
pub mod counters;
pub mod engine;
pub mod error;
pub mod event;
pub mod interface;
pub mod mock;
pub mod presentation;
pub mod session;
pub mod telemetry;

pub use bootstrap::BootstrapResponse;
pub use config::{Config, InterfaceSection, LoggingConfig, ServerConfig, TelemetrySection};
pub use counters::{CounterSnapshot, DisplaySnapshot};
pub use engine::NativeTunnelEngine;
pub use error::{Error, Result};
pub use event::{EventHandler, LoggingEventHandler, SessionEvent};
pub use interface::{InterfaceConfigurator, InterfacePolicy, DEFAULT_SESSION_NAME};
pub use presentation::{
    snapshot_channel, spawn_renderer, LogPresentation, PresentationBridge, SnapshotReceiver,
    SnapshotSender,
};
pub use session::{SessionController, SessionState, SharedState};
pub use telemetry::{TelemetryConfig, TelemetryHandle, TelemetryLoop};
