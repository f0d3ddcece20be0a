//! Tunnel session controller
//!
//! The controller drives one session at a time through
//!
//! ```text
//! Idle --start--> Establishing --success--> Active --stop--> TearingDown --> Idle
//!                      |
//!                      +--failure / stop requested / start dropped--> Idle
//! ```
//!
//! The state lives in a single atomic tag. Every transition is a
//! compare-and-swap from an expected state, which is what serializes the
//! non-reentrant engine calls: a `start` that finds a teardown or another
//! claim in flight is rejected, and of two concurrent `stop` calls only the
//! one that wins `Active -> TearingDown` releases anything.
//!
//! A `stop` that arrives during `Establishing` is queued: the in-flight start
//! sees the request before going active, releases what it acquired and
//! returns [`Error::Cancelled`], and the `stop` returns once the controller
//! has settled.
//!
//! Both operations survive being dropped mid-way. A dropped `start` releases
//! the engine from a background task and returns the controller to `Idle`;
//! a dropped `stop` still completes its teardown.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use ladder_tun::{InterfaceDescriptor, NetworkStack, RawFd};

use crate::bootstrap::{self, BootstrapResponse};
use crate::counters::DisplaySnapshot;
use crate::engine::NativeTunnelEngine;
use crate::error::{Error, Result};
use crate::event::{EventHandler, LoggingEventHandler, SessionEvent};
use crate::interface::{InterfaceConfigurator, InterfacePolicy};
use crate::presentation::{snapshot_channel, SnapshotReceiver, SnapshotSender};
use crate::telemetry::{TelemetryConfig, TelemetryHandle, TelemetryLoop};

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// No session
    Idle = 0,
    /// Handshake and interface setup in progress
    Establishing = 1,
    /// Tunnel is up and telemetry is running
    Active = 2,
    /// Releasing the session's resources
    TearingDown = 3,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SessionState::Establishing,
            2 => SessionState::Active,
            3 => SessionState::TearingDown,
            _ => SessionState::Idle,
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Establishing => "establishing",
            SessionState::Active => "active",
            SessionState::TearingDown => "tearing down",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Session state shared between the controller and its telemetry worker
///
/// Writes use release ordering and reads use acquire ordering, so the worker
/// sees a stop no later than its next wake-up.
#[derive(Debug)]
pub struct SharedState(AtomicU8);

impl SharedState {
    pub fn new(state: SessionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    /// Current state
    pub fn load(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, state: SessionState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Move from `from` to `to`, or report the state that was found instead
    pub(crate) fn transition(
        &self,
        from: SessionState,
        to: SessionState,
    ) -> std::result::Result<(), SessionState> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(SessionState::from_u8)
    }
}

/// Resources held while a session is active
struct ActiveSession {
    descriptor: InterfaceDescriptor,
    telemetry: TelemetryHandle,
}

/// Owner of an `Establishing` claim
///
/// Until disarmed, dropping it releases the engine from a background task
/// and returns the state to `Idle`. The state is only reset once
/// `engine.stop()` has finished, so a following start cannot overlap it.
struct EstablishGuard {
    engine: Arc<dyn NativeTunnelEngine>,
    state: Arc<SharedState>,
    settled: Arc<Notify>,
    event_handler: Arc<dyn EventHandler>,
    armed: bool,
}

impl EstablishGuard {
    /// Move to `state` and wake any `stop` waiting on the bring-up
    fn settle(mut self, state: SessionState) {
        self.armed = false;
        self.state.store(state);
        self.settled.notify_waiters();
    }
}

impl Drop for EstablishGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        log::warn!("Session start abandoned during bring-up, releasing engine");

        let engine = self.engine.clone();
        let state = self.state.clone();
        let settled = self.settled.clone();
        let event_handler = self.event_handler.clone();

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    engine.stop().await;
                    state.store(SessionState::Idle);
                    settled.notify_waiters();
                    event_handler
                        .on_event(SessionEvent::StateChanged {
                            old: SessionState::Establishing,
                            new: SessionState::Idle,
                        })
                        .await;
                });
            }
            Err(_) => {
                log::warn!("No runtime to stop the engine on, resetting state only");
                state.store(SessionState::Idle);
                settled.notify_waiters();
            }
        }
    }
}

/// Owns the session state and orchestrates bring-up and teardown
///
/// The controller is meant to be shared (`Arc<SessionController>`): `start`
/// and `stop` take `&self` and may be called from independent tasks, such as
/// a user disconnect racing process shutdown.
pub struct SessionController {
    engine: Arc<dyn NativeTunnelEngine>,
    stack: Arc<dyn NetworkStack>,
    configurator: InterfaceConfigurator,
    telemetry: TelemetryConfig,
    state: Arc<SharedState>,
    stop_requested: AtomicBool,
    settled: Arc<Notify>,
    session: Mutex<Option<ActiveSession>>,
    snapshots: Arc<SnapshotSender>,
    event_handler: Arc<dyn EventHandler>,
}

impl SessionController {
    /// Create a controller with the default interface policy and telemetry settings
    pub fn new(engine: Arc<dyn NativeTunnelEngine>, stack: Arc<dyn NetworkStack>) -> Self {
        let (snapshots, _) = snapshot_channel();
        Self {
            engine,
            configurator: InterfaceConfigurator::new(stack.clone()),
            stack,
            telemetry: TelemetryConfig::default(),
            state: Arc::new(SharedState::new(SessionState::Idle)),
            stop_requested: AtomicBool::new(false),
            settled: Arc::new(Notify::new()),
            session: Mutex::new(None),
            snapshots: Arc::new(snapshots),
            event_handler: Arc::new(LoggingEventHandler),
        }
    }

    /// Set the interface policy
    pub fn with_policy(mut self, policy: InterfacePolicy) -> Self {
        self.configurator = InterfaceConfigurator::with_policy(self.stack.clone(), policy);
        self
    }

    /// Set the telemetry settings
    pub fn with_telemetry(mut self, config: TelemetryConfig) -> Self {
        self.telemetry = config;
        self
    }

    /// Set a custom event handler
    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = handler;
        self
    }

    /// Get the current state
    pub fn state(&self) -> SessionState {
        self.state.load()
    }

    /// Subscribe to display snapshots
    pub fn subscribe(&self) -> SnapshotReceiver {
        self.snapshots.subscribe()
    }

    /// Most recently published snapshot of the current session
    pub fn latest_snapshot(&self) -> Option<DisplaySnapshot> {
        *self.snapshots.borrow()
    }

    /// Exclude a socket from the tunnel's own routing
    pub fn protect(&self, fd: RawFd) -> bool {
        self.stack.protect(fd)
    }

    /// Bring up a session with the server at `server_address:server_port`
    ///
    /// Any existing session is torn down first. Fails with
    /// [`Error::Busy`] if another start or stop is still in flight, and with
    /// [`Error::Cancelled`] if a `stop` arrived during bring-up. On any
    /// failure the controller is back in [`SessionState::Idle`] with nothing
    /// left allocated.
    pub async fn start(&self, server_address: &str, server_port: u16) -> Result<()> {
        self.stop().await;

        self.state
            .transition(SessionState::Idle, SessionState::Establishing)
            .map_err(Error::Busy)?;
        // Requests aimed at an earlier bring-up were already served
        self.stop_requested.store(false, Ordering::Release);
        let guard = EstablishGuard {
            engine: self.engine.clone(),
            state: self.state.clone(),
            settled: self.settled.clone(),
            event_handler: self.event_handler.clone(),
            armed: true,
        };
        self.emit_state_changed(SessionState::Idle, SessionState::Establishing)
            .await;
        log::info!("Starting session with [{}]:{}", server_address, server_port);

        let (bootstrap, descriptor) = match self.bring_up(server_address, server_port).await {
            Ok(up) => up,
            Err(e) => {
                self.engine.stop().await;
                guard.settle(SessionState::Idle);
                self.emit_state_changed(SessionState::Establishing, SessionState::Idle)
                    .await;
                self.emit_event(SessionEvent::Error {
                    message: e.to_string(),
                    fatal: e.is_fatal(),
                })
                .await;
                return Err(e);
            }
        };

        if self.stop_requested.swap(false, Ordering::AcqRel) {
            log::info!("Stop requested during bring-up, releasing session");
            self.engine.stop().await;
            if let Err(e) = descriptor.close() {
                log::warn!("Failed to close interface: {}", e);
            }
            guard.settle(SessionState::Idle);
            self.emit_state_changed(SessionState::Establishing, SessionState::Idle)
                .await;
            self.emit_event(SessionEvent::Disconnected {
                reason: "stopped during bring-up".into(),
            })
            .await;
            return Err(Error::Cancelled);
        }

        // No await between here and going active
        let telemetry = TelemetryLoop::new(
            self.engine.clone(),
            self.state.clone(),
            self.snapshots.clone(),
            self.telemetry,
        )
        .spawn();
        *self.session_slot() = Some(ActiveSession {
            descriptor,
            telemetry,
        });
        guard.settle(SessionState::Active);

        self.emit_state_changed(SessionState::Establishing, SessionState::Active)
            .await;
        self.emit_event(SessionEvent::Connected {
            local_address: bootstrap.local_address,
            gateway: bootstrap.gateway,
            dns_servers: bootstrap.dns_servers,
        })
        .await;
        Ok(())
    }

    async fn bring_up(
        &self,
        server_address: &str,
        server_port: u16,
    ) -> Result<(BootstrapResponse, InterfaceDescriptor)> {
        let response = self.engine.open(server_address, server_port).await?;
        let bootstrap = bootstrap::parse(&response)?;
        log::debug!("Bootstrap: {:?}", bootstrap);

        // Left unprotected, control traffic may loop through the tunnel; the
        // session still goes ahead.
        if !self.protect(bootstrap.guarded_socket_fd) {
            log::warn!(
                "Failed to protect engine socket {}",
                bootstrap.guarded_socket_fd
            );
            self.emit_event(SessionEvent::ProtectFailed {
                fd: bootstrap.guarded_socket_fd,
            })
            .await;
        }

        let descriptor = self.configurator.establish(&bootstrap)?;
        self.engine.start(descriptor.fd()).await;

        Ok((bootstrap, descriptor))
    }

    /// Tear down the session, if any
    ///
    /// Returns `true` if this call released an active session or stopped a
    /// bring-up that was in progress. Calls that find the controller idle,
    /// or another stop already in flight, return `false` immediately without
    /// touching any resource.
    pub async fn stop(&self) -> bool {
        loop {
            match self
                .state
                .transition(SessionState::Active, SessionState::TearingDown)
            {
                Ok(()) => break,
                Err(SessionState::Establishing) => {
                    if self.wait_for_bring_up().await != SessionState::Active {
                        return true;
                    }
                    // The start went active before it saw the request
                }
                Err(_) => return false,
            }
        }
        let session = self.session_slot().take();
        let engine = self.engine.clone();
        let state = self.state.clone();
        let snapshots = self.snapshots.clone();

        // Runs to completion even if this future is dropped
        let teardown = tokio::spawn(async move {
            if let Some(session) = session {
                session.telemetry.cancel().await;
                engine.stop().await;
                if let Err(e) = session.descriptor.close() {
                    log::warn!("Failed to close interface: {}", e);
                }
            }
            snapshots.send_replace(None);
            state.store(SessionState::Idle);
        });

        log::info!("Stopping session");
        self.emit_state_changed(SessionState::Active, SessionState::TearingDown)
            .await;
        if let Err(e) = teardown.await {
            log::error!("Session teardown failed: {}", e);
            self.state.store(SessionState::Idle);
        }

        self.emit_state_changed(SessionState::TearingDown, SessionState::Idle)
            .await;
        self.emit_event(SessionEvent::Disconnected {
            reason: "session stopped".into(),
        })
        .await;
        true
    }

    /// Ask the in-flight start to give up and wait until it has settled
    async fn wait_for_bring_up(&self) -> SessionState {
        let settled = self.settled.notified();
        tokio::pin!(settled);
        settled.as_mut().enable();

        self.stop_requested.store(true, Ordering::Release);
        if self.state.load() == SessionState::Establishing {
            log::info!("Stop requested during bring-up, waiting for it to settle");
            settled.await;
        }
        self.state.load()
    }

    fn session_slot(&self) -> MutexGuard<'_, Option<ActiveSession>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn emit_state_changed(&self, old: SessionState, new: SessionState) {
        self.emit_event(SessionEvent::StateChanged { old, new }).await;
    }

    /// Emit an event to the handler
    async fn emit_event(&self, event: SessionEvent) {
        self.event_handler.on_event(event).await;
    }
}
