//! Interface configuration derived from a bootstrap response

use std::sync::Arc;

use ladder_tun::{InterfaceConfig, InterfaceDescriptor, NetworkStack, Route, DEFAULT_MTU};

use crate::bootstrap::BootstrapResponse;
use crate::error::{Error, Result};

/// Session label shown by the platform
pub const DEFAULT_SESSION_NAME: &str = "4over6";

/// Prefix length of the local tunnel address (host-only)
pub const HOST_PREFIX_LEN: u8 = 32;

/// Fixed parts of the interface configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfacePolicy {
    /// Maximum transmission unit
    pub mtu: u16,
    /// Session label
    pub session_name: String,
}

impl Default for InterfacePolicy {
    fn default() -> Self {
        Self {
            mtu: DEFAULT_MTU,
            session_name: DEFAULT_SESSION_NAME.to_string(),
        }
    }
}

/// Turns bootstrap parameters into a live virtual interface
pub struct InterfaceConfigurator {
    stack: Arc<dyn NetworkStack>,
    policy: InterfacePolicy,
}

impl InterfaceConfigurator {
    /// Create a configurator using the default policy
    pub fn new(stack: Arc<dyn NetworkStack>) -> Self {
        Self::with_policy(stack, InterfacePolicy::default())
    }

    /// Create a configurator with a custom policy
    pub fn with_policy(stack: Arc<dyn NetworkStack>, policy: InterfacePolicy) -> Self {
        Self { stack, policy }
    }

    /// The policy applied to every interface
    pub fn policy(&self) -> &InterfacePolicy {
        &self.policy
    }

    /// Build the interface configuration for a bootstrap response
    ///
    /// The local address gets a /32, all IPv4 traffic is routed via the
    /// gateway, and DNS servers are installed in the order received.
    pub fn build_config(&self, bootstrap: &BootstrapResponse) -> Result<InterfaceConfig> {
        let builder = InterfaceConfig::builder()
            .address(bootstrap.local_address, HOST_PREFIX_LEN)?
            .route(Route::default_v4(bootstrap.gateway))
            .mtu(self.policy.mtu)
            .session(self.policy.session_name.clone());

        let config = bootstrap
            .dns_servers
            .iter()
            .fold(builder, |builder, dns| builder.dns_server(*dns))
            .build()?;

        Ok(config)
    }

    /// Establish the virtual interface
    pub fn establish(&self, bootstrap: &BootstrapResponse) -> Result<InterfaceDescriptor> {
        let config = self.build_config(bootstrap)?;

        if !self.stack.request_consent() {
            return Err(Error::ConsentDenied);
        }

        let descriptor = self.stack.establish_interface(&config)?;
        log::info!(
            "Established interface fd={} address={}/{} mtu={} dns={:?}",
            descriptor.fd(),
            bootstrap.local_address,
            HOST_PREFIX_LEN,
            config.mtu,
            config.dns_servers
        );
        Ok(descriptor)
    }
}
