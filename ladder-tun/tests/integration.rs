//! Integration tests for ladder-tun
//!
//! These tests exercise the public API against an in-memory network stack;
//! none of them touch a real interface or need elevated privileges.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ladder_tun::{
    Error, InterfaceConfig, InterfaceDescriptor, NetworkStack, RawFd, Result, Route,
    TunnelInterface,
};

#[derive(Debug)]
struct FakeInterface {
    fd: RawFd,
    closed: Arc<AtomicUsize>,
}

impl TunnelInterface for FakeInterface {
    fn fd(&self) -> RawFd {
        self.fd
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct FakeStack {
    deny: bool,
    closed: Arc<AtomicUsize>,
    established: Mutex<Vec<InterfaceConfig>>,
    protected: Mutex<Vec<RawFd>>,
}

impl NetworkStack for FakeStack {
    fn request_consent(&self) -> bool {
        !self.deny
    }

    fn establish_interface(&self, config: &InterfaceConfig) -> Result<InterfaceDescriptor> {
        if self.deny {
            return Err(Error::Denied("consent revoked".into()));
        }
        self.established.lock().unwrap().push(config.clone());
        Ok(InterfaceDescriptor::new(FakeInterface {
            fd: 100,
            closed: self.closed.clone(),
        }))
    }

    fn protect(&self, fd: RawFd) -> bool {
        self.protected.lock().unwrap().push(fd);
        true
    }
}

fn tunnel_config() -> InterfaceConfig {
    InterfaceConfig::builder()
        .address(Ipv4Addr::new(10, 0, 0, 2), 32)
        .unwrap()
        .route(Route::default_v4(Ipv4Addr::new(10, 0, 0, 1)))
        .dns_server(Ipv4Addr::new(8, 8, 8, 8))
        .mtu(1500)
        .session("4over6")
        .build()
        .unwrap()
}

/// Test that a stack receives the exact configuration it was given
#[test]
fn test_establish_passes_config_through() {
    let stack = FakeStack::default();
    let config = tunnel_config();

    let descriptor = stack.establish_interface(&config).unwrap();
    assert_eq!(descriptor.fd(), 100);

    let established = stack.established.lock().unwrap();
    assert_eq!(established.len(), 1);
    assert_eq!(established[0], config);
    assert_eq!(established[0].dns_servers, vec![IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8))]);
}

/// Test that a denied establishment surfaces as a denial
#[test]
fn test_denied_establishment() {
    let stack = FakeStack {
        deny: true,
        ..Default::default()
    };

    assert!(!stack.request_consent());
    let err = stack.establish_interface(&tunnel_config()).unwrap_err();
    assert!(matches!(err, Error::Denied(_)));
}

/// Test that closing a descriptor releases the platform handle exactly once
#[test]
fn test_descriptor_close_is_single_release() {
    let stack = FakeStack::default();
    let descriptor = stack.establish_interface(&tunnel_config()).unwrap();

    descriptor.close().unwrap();
    assert_eq!(stack.closed.load(Ordering::SeqCst), 1);
}

/// Test that protect calls reach the stack
#[test]
fn test_protect_records_fd() {
    let stack = FakeStack::default();
    assert!(stack.protect(37));
    assert_eq!(*stack.protected.lock().unwrap(), vec![37]);
}

/// Test that the default route covers every IPv4 destination
#[test]
fn test_default_route_covers_everything() {
    let config = tunnel_config();
    let route = &config.routes[0];

    assert!(route.is_default());
    assert!(route.destination.contains(&IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4))));
    assert_eq!(route.gateway, Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))));
}
