//! Virtual interface configuration

use std::net::{IpAddr, Ipv4Addr};

use ipnet::Ipv4Net;

use crate::error::{Error, Result};
use crate::route::Route;
use crate::DEFAULT_MTU;

/// Everything the platform needs to bring up a virtual interface
///
/// This is the value handed to [`NetworkStack::establish_interface`]. It is
/// a pure description; nothing is created until the network stack accepts it.
///
/// [`NetworkStack::establish_interface`]: crate::NetworkStack::establish_interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceConfig {
    /// Maximum transmission unit
    pub mtu: u16,
    /// Addresses assigned to the interface
    pub addresses: Vec<Ipv4Net>,
    /// Routes sent through the interface
    pub routes: Vec<Route>,
    /// DNS servers, in resolver order
    pub dns_servers: Vec<IpAddr>,
    /// Session label shown by the platform
    pub session: String,
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self {
            mtu: DEFAULT_MTU,
            addresses: Vec::new(),
            routes: Vec::new(),
            dns_servers: Vec::new(),
            session: String::new(),
        }
    }
}

impl InterfaceConfig {
    /// Create a new configuration builder
    pub fn builder() -> InterfaceConfigBuilder {
        InterfaceConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.addresses.is_empty() {
            return Err(Error::Config(
                "at least one IPv4 address must be configured".into(),
            ));
        }

        if self.mtu < 68 {
            return Err(Error::Config(format!(
                "MTU {} is too small (minimum 68)",
                self.mtu
            )));
        }

        if self.session.is_empty() {
            return Err(Error::Config("session name must not be empty".into()));
        }

        Ok(())
    }
}

/// Builder for InterfaceConfig
#[derive(Debug, Default)]
pub struct InterfaceConfigBuilder {
    config: InterfaceConfig,
}

impl InterfaceConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an IPv4 address and prefix length
    pub fn address(mut self, address: impl Into<Ipv4Addr>, prefix_len: u8) -> Result<Self> {
        let net = Ipv4Net::new(address.into(), prefix_len)
            .map_err(|e| Error::InvalidPrefix(e.to_string()))?;
        self.config.addresses.push(net);
        Ok(self)
    }

    /// Add a route
    pub fn route(mut self, route: Route) -> Self {
        self.config.routes.push(route);
        self
    }

    /// Add a DNS server; servers are kept in insertion order
    pub fn dns_server(mut self, server: impl Into<IpAddr>) -> Self {
        self.config.dns_servers.push(server.into());
        self
    }

    /// Set the MTU
    pub fn mtu(mut self, mtu: u16) -> Self {
        self.config.mtu = mtu;
        self
    }

    /// Set the session label
    pub fn session(mut self, name: impl Into<String>) -> Self {
        self.config.session = name.into();
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<InterfaceConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = InterfaceConfig::builder()
            .address(Ipv4Addr::new(10, 0, 0, 2), 32)
            .unwrap()
            .route(Route::default_v4(Ipv4Addr::new(10, 0, 0, 1)))
            .dns_server(Ipv4Addr::new(8, 8, 8, 8))
            .dns_server(Ipv4Addr::new(8, 8, 4, 4))
            .mtu(1500)
            .session("4over6")
            .build()
            .unwrap();

        assert_eq!(config.mtu, 1500);
        assert_eq!(config.addresses[0].addr(), Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(config.addresses[0].prefix_len(), 32);
        assert_eq!(config.routes.len(), 1);
        assert_eq!(
            config.dns_servers,
            vec![
                IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)),
                IpAddr::V4(Ipv4Addr::new(8, 8, 4, 4)),
            ]
        );
        assert_eq!(config.session, "4over6");
    }

    #[test]
    fn test_config_validation_no_address() {
        let result = InterfaceConfig::builder().session("4over6").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_config_validation_invalid_prefix() {
        let result = InterfaceConfig::builder().address(Ipv4Addr::new(10, 0, 0, 1), 33);
        assert!(matches!(result, Err(Error::InvalidPrefix(_))));
    }

    #[test]
    fn test_config_validation_invalid_mtu() {
        let result = InterfaceConfig::builder()
            .address(Ipv4Addr::new(10, 0, 0, 1), 32)
            .unwrap()
            .session("4over6")
            .mtu(10)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_config_validation_empty_session() {
        let result = InterfaceConfig::builder()
            .address(Ipv4Addr::new(10, 0, 0, 1), 32)
            .unwrap()
            .build();
        assert!(result.is_err());
    }
}
