//! Routes installed on a virtual interface

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use ipnet::{IpNet, Ipv4Net};

/// A network route entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Destination network
    pub destination: IpNet,
    /// Gateway address (None for direct/interface routes)
    pub gateway: Option<IpAddr>,
}

impl Route {
    /// Create a default route (0.0.0.0/0) via a gateway
    pub fn default_v4(gateway: Ipv4Addr) -> Self {
        Self {
            destination: IpNet::V4(
                Ipv4Net::new(Ipv4Addr::UNSPECIFIED, 0).expect("prefix length 0 is always valid"),
            ),
            gateway: Some(IpAddr::V4(gateway)),
        }
    }

    /// Whether this route covers every destination of its address family
    pub fn is_default(&self) -> bool {
        self.destination.prefix_len() == 0
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.destination)?;
        if let Some(gw) = self.gateway {
            write!(f, " via {}", gw)?;
        }
        Ok(())
    }
}
