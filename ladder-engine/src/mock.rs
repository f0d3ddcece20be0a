//! Mock collaborators for testing
//!
//! This module provides in-memory implementations of the traits the session
//! controller depends on, so the whole bring-up and teardown path can be
//! exercised without a tunnel server, a real interface or a UI:
//!
//! - [`MockEngine`]: scripted bootstrap and counter lines, call counters, and
//!   detection of overlapping (reentrant) engine calls
//! - [`MockNetworkStack`]: consent/establish/protect switches and a count of
//!   interfaces that are still open
//! - [`RecordingPresentation`] and [`RecordingEventHandler`]: capture what
//!   would have been shown or logged
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use ladder_engine::mock::{MockEngine, MockNetworkStack};
//! use ladder_engine::SessionController;
//!
//! # tokio_test_block_on(async {
//! let engine = Arc::new(MockEngine::new());
//! engine.set_bootstrap("37 10.0.0.2 10.0.0.1 8.8.8.8");
//! let stack = Arc::new(MockNetworkStack::new());
//!
//! let controller = SessionController::new(engine.clone(), stack.clone());
//! controller.start("2001:db8::1", 5678).await.unwrap();
//! assert_eq!(stack.open_interfaces(), 1);
//!
//! controller.stop().await;
//! assert_eq!(stack.open_interfaces(), 0);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use ladder_tun::{InterfaceConfig, InterfaceDescriptor, NetworkStack, RawFd, TunnelInterface};

use crate::engine::NativeTunnelEngine;
use crate::error::{Error, Result};
use crate::event::{EventHandler, SessionEvent};
use crate::presentation::PresentationBridge;

/// Scripted tunnel engine
#[derive(Default)]
pub struct MockEngine {
    bootstrap: Mutex<String>,
    open_error: Mutex<Option<String>>,
    open_delay: Mutex<Option<Duration>>,
    counters: Mutex<String>,
    opened_with: Mutex<Option<(String, u16)>>,
    started_fd: Mutex<Option<RawFd>>,
    open_count: AtomicUsize,
    start_count: AtomicUsize,
    stop_count: AtomicUsize,
    read_count: AtomicUsize,
    in_flight: AtomicUsize,
    overlaps: AtomicUsize,
}

impl MockEngine {
    /// Create an engine that answers with an empty bootstrap line
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the line returned by `open`
    pub fn set_bootstrap(&self, line: &str) {
        *self.bootstrap.lock().unwrap() = line.to_string();
        *self.open_error.lock().unwrap() = None;
    }

    /// Make `open` fail with the given message
    pub fn fail_open(&self, message: &str) {
        *self.open_error.lock().unwrap() = Some(message.to_string());
    }

    /// Make `open` take this long before answering
    pub fn set_open_delay(&self, delay: Duration) {
        *self.open_delay.lock().unwrap() = Some(delay);
    }

    /// Set the line returned by `read_counters`
    pub fn set_counters(&self, line: &str) {
        *self.counters.lock().unwrap() = line.to_string();
    }

    /// Address and port of the last `open`
    pub fn opened_with(&self) -> Option<(String, u16)> {
        self.opened_with.lock().unwrap().clone()
    }

    /// Descriptor passed to the last `start`
    pub fn started_fd(&self) -> Option<RawFd> {
        *self.started_fd.lock().unwrap()
    }

    pub fn open_count(&self) -> usize {
        self.open_count.load(Ordering::SeqCst)
    }

    pub fn start_count(&self) -> usize {
        self.start_count.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stop_count.load(Ordering::SeqCst)
    }

    pub fn read_count(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }

    /// Number of times an open/start/stop began while another was running
    pub fn overlapping_calls(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    fn enter(&self) -> CallGuard<'_> {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        CallGuard(&self.in_flight)
    }
}

/// Marks an engine call as finished, including calls whose future was dropped
struct CallGuard<'a>(&'a AtomicUsize);

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl NativeTunnelEngine for MockEngine {
    async fn open(&self, address: &str, port: u16) -> Result<String> {
        let _call = self.enter();
        self.open_count.fetch_add(1, Ordering::SeqCst);
        *self.opened_with.lock().unwrap() = Some((address.to_string(), port));

        let delay = *self.open_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let error = self.open_error.lock().unwrap().clone();
        match error {
            Some(message) => Err(Error::Engine(message)),
            None => Ok(self.bootstrap.lock().unwrap().clone()),
        }
    }

    async fn start(&self, fd: RawFd) {
        let _call = self.enter();
        self.start_count.fetch_add(1, Ordering::SeqCst);
        *self.started_fd.lock().unwrap() = Some(fd);
    }

    async fn stop(&self) {
        let _call = self.enter();
        self.stop_count.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
    }

    async fn read_counters(&self) -> Result<String> {
        self.read_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.counters.lock().unwrap().clone())
    }
}

/// Interface handed out by [`MockNetworkStack`]
#[derive(Debug)]
pub struct MockInterface {
    fd: RawFd,
    closes: Arc<AtomicUsize>,
}

impl TunnelInterface for MockInterface {
    fn fd(&self) -> RawFd {
        self.fd
    }

    fn close(self: Box<Self>) -> ladder_tun::Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory network stack
pub struct MockNetworkStack {
    consent: AtomicBool,
    deny_establish: AtomicBool,
    protect_result: AtomicBool,
    next_fd: AtomicI32,
    last_fd: Mutex<Option<RawFd>>,
    establishes: AtomicUsize,
    closes: Arc<AtomicUsize>,
    protected: Mutex<Vec<RawFd>>,
    last_config: Mutex<Option<InterfaceConfig>>,
}

impl Default for MockNetworkStack {
    fn default() -> Self {
        Self {
            consent: AtomicBool::new(true),
            deny_establish: AtomicBool::new(false),
            protect_result: AtomicBool::new(true),
            next_fd: AtomicI32::new(100),
            last_fd: Mutex::new(None),
            establishes: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
            protected: Mutex::new(Vec::new()),
            last_config: Mutex::new(None),
        }
    }
}

impl MockNetworkStack {
    /// Create a stack that grants everything
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_consent(&self, granted: bool) {
        self.consent.store(granted, Ordering::SeqCst);
    }

    pub fn set_deny_establish(&self, deny: bool) {
        self.deny_establish.store(deny, Ordering::SeqCst);
    }

    pub fn set_protect_result(&self, result: bool) {
        self.protect_result.store(result, Ordering::SeqCst);
    }

    /// Number of successfully established interfaces
    pub fn establish_count(&self) -> usize {
        self.establishes.load(Ordering::SeqCst)
    }

    /// Number of interfaces closed
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Interfaces established but not yet closed
    pub fn open_interfaces(&self) -> usize {
        self.establish_count() - self.close_count()
    }

    /// Descriptors passed to `protect`, in call order
    pub fn protected(&self) -> Vec<RawFd> {
        self.protected.lock().unwrap().clone()
    }

    /// Descriptor of the last established interface
    pub fn last_fd(&self) -> Option<RawFd> {
        *self.last_fd.lock().unwrap()
    }

    /// Configuration of the last established interface
    pub fn last_config(&self) -> Option<InterfaceConfig> {
        self.last_config.lock().unwrap().clone()
    }
}

impl NetworkStack for MockNetworkStack {
    fn request_consent(&self) -> bool {
        self.consent.load(Ordering::SeqCst)
    }

    fn establish_interface(&self, config: &InterfaceConfig) -> ladder_tun::Result<InterfaceDescriptor> {
        if self.deny_establish.load(Ordering::SeqCst) {
            return Err(ladder_tun::Error::Denied("mock stack refused".into()));
        }

        let fd = self.next_fd.fetch_add(1, Ordering::SeqCst);
        self.establishes.fetch_add(1, Ordering::SeqCst);
        *self.last_fd.lock().unwrap() = Some(fd);
        *self.last_config.lock().unwrap() = Some(config.clone());

        Ok(InterfaceDescriptor::new(MockInterface {
            fd,
            closes: self.closes.clone(),
        }))
    }

    fn protect(&self, fd: RawFd) -> bool {
        self.protected.lock().unwrap().push(fd);
        self.protect_result.load(Ordering::SeqCst)
    }
}

/// Presentation that keeps every rendered text
#[derive(Default)]
pub struct RecordingPresentation {
    rendered: Mutex<Vec<String>>,
}

impl RecordingPresentation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything rendered so far
    pub fn rendered(&self) -> Vec<String> {
        self.rendered.lock().unwrap().clone()
    }
}

impl PresentationBridge for RecordingPresentation {
    fn render(&self, text: &str) {
        self.rendered.lock().unwrap().push(text.to_string());
    }
}

/// Event handler that keeps every event
#[derive(Default)]
pub struct RecordingEventHandler {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything received so far
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventHandler for RecordingEventHandler {
    async fn on_event(&self, event: SessionEvent) {
        self.events.lock().unwrap().push(event);
    }
}
