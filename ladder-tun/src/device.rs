//! Established virtual interface handles
//!
//! The platform hands back an opaque handle once an interface is up. The
//! engine only needs the raw descriptor to read and write packets; closing
//! the handle tears the interface down.
//!
//! [`InterfaceDescriptor`] wraps whatever the platform returned and makes
//! sure it is closed at most once: [`InterfaceDescriptor::close`] consumes
//! it, and dropping an unclosed descriptor closes it with a warning.

use std::fmt;

use crate::error::Result;
use crate::RawFd;

/// A live virtual interface handed out by a [`NetworkStack`](crate::NetworkStack)
pub trait TunnelInterface: Send + Sync + fmt::Debug {
    /// Raw descriptor the tunnel engine reads packets from
    fn fd(&self) -> RawFd;

    /// Release the interface
    fn close(self: Box<Self>) -> Result<()>;
}

/// Owned handle to an established virtual interface
pub struct InterfaceDescriptor {
    fd: RawFd,
    inner: Option<Box<dyn TunnelInterface>>,
}

impl InterfaceDescriptor {
    /// Wrap a platform interface handle
    pub fn new(inner: impl TunnelInterface + 'static) -> Self {
        Self::from_boxed(Box::new(inner))
    }

    /// Wrap an already boxed platform interface handle
    pub fn from_boxed(inner: Box<dyn TunnelInterface>) -> Self {
        Self {
            fd: inner.fd(),
            inner: Some(inner),
        }
    }

    /// Raw descriptor of the interface
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// Release the interface
    pub fn close(mut self) -> Result<()> {
        match self.inner.take() {
            Some(inner) => {
                log::debug!("Closing interface descriptor {}", self.fd);
                inner.close()
            }
            None => Ok(()),
        }
    }
}

impl fmt::Debug for InterfaceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceDescriptor")
            .field("fd", &self.fd)
            .field("open", &self.inner.is_some())
            .finish()
    }
}

impl Drop for InterfaceDescriptor {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            log::warn!("Interface descriptor {} dropped without close", self.fd);
            if let Err(e) = inner.close() {
                log::warn!("Failed to close interface descriptor {}: {}", self.fd, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct CountingInterface {
        fd: RawFd,
        closes: Arc<AtomicUsize>,
    }

    impl TunnelInterface for CountingInterface {
        fn fd(&self) -> RawFd {
            self.fd
        }

        fn close(self: Box<Self>) -> Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_close_releases_once() {
        let closes = Arc::new(AtomicUsize::new(0));
        let descriptor = InterfaceDescriptor::new(CountingInterface {
            fd: 42,
            closes: closes.clone(),
        });
        assert_eq!(descriptor.fd(), 42);

        descriptor.close().unwrap();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_closes_unreleased_descriptor() {
        let closes = Arc::new(AtomicUsize::new(0));
        {
            let _descriptor = InterfaceDescriptor::new(CountingInterface {
                fd: 7,
                closes: closes.clone(),
            });
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
