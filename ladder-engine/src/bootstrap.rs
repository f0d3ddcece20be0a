//! Bootstrap response returned by the tunnel engine's handshake
//!
//! The engine answers `open` with a single line of whitespace-separated
//! tokens:
//!
//! ```text
//! <fd> <ipv4-address> <ipv4-gateway> [<dns-ipv4> ...]
//! ```
//!
//! The first token is the engine's control socket, which must be protected
//! from the tunnel's own routing. Every token after the gateway is a DNS
//! server, in resolver order.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use ladder_tun::RawFd;

use crate::error::{Error, Result};

/// Minimum number of tokens in a bootstrap line (fd, address, gateway)
pub const MIN_TOKENS: usize = 3;

/// Parameters the engine hands back after a successful handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapResponse {
    /// Engine socket that must be excluded from tunnel routing
    pub guarded_socket_fd: RawFd,
    /// Address assigned to the local end of the tunnel
    pub local_address: Ipv4Addr,
    /// Remote end of the tunnel; default route target
    pub gateway: Ipv4Addr,
    /// DNS servers, in order
    pub dns_servers: Vec<Ipv4Addr>,
}

/// Parse a bootstrap line
pub fn parse(response: &str) -> Result<BootstrapResponse> {
    let tokens: Vec<&str> = response.split_ascii_whitespace().collect();
    if tokens.len() < MIN_TOKENS {
        return Err(Error::Parse(format!(
            "bootstrap response has {} token(s), expected at least {}",
            tokens.len(),
            MIN_TOKENS
        )));
    }

    let guarded_socket_fd = tokens[0]
        .parse::<RawFd>()
        .map_err(|e| Error::Parse(format!("invalid socket descriptor '{}': {}", tokens[0], e)))?;
    let local_address = parse_ipv4("local address", tokens[1])?;
    let gateway = parse_ipv4("gateway", tokens[2])?;
    let dns_servers = tokens[MIN_TOKENS..]
        .iter()
        .map(|token| parse_ipv4("DNS server", token))
        .collect::<Result<Vec<_>>>()?;

    Ok(BootstrapResponse {
        guarded_socket_fd,
        local_address,
        gateway,
        dns_servers,
    })
}

fn parse_ipv4(what: &str, token: &str) -> Result<Ipv4Addr> {
    token
        .parse()
        .map_err(|_| Error::Parse(format!("invalid {} '{}'", what, token)))
}

impl BootstrapResponse {
    /// Render the response in its wire form
    pub fn to_wire(&self) -> String {
        self.to_string()
    }
}

impl FromStr for BootstrapResponse {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse(s)
    }
}

impl fmt::Display for BootstrapResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.guarded_socket_fd, self.local_address, self.gateway
        )?;
        for dns in &self.dns_servers {
            write!(f, " {}", dns)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_example_response() {
        let response = parse("37 10.0.0.2 10.0.0.1 8.8.8.8 8.8.4.4").unwrap();
        assert_eq!(response.guarded_socket_fd, 37);
        assert_eq!(response.local_address, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(response.gateway, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(
            response.dns_servers,
            vec![Ipv4Addr::new(8, 8, 8, 8), Ipv4Addr::new(8, 8, 4, 4)]
        );
    }

    #[test]
    fn test_parse_without_dns() {
        let response = parse("5 10.1.0.9 10.1.0.1").unwrap();
        assert_eq!(response.guarded_socket_fd, 5);
        assert!(response.dns_servers.is_empty());
    }

    #[test]
    fn test_parse_single_dns() {
        let response = parse("5 10.1.0.9 10.1.0.1 1.1.1.1").unwrap();
        assert_eq!(response.dns_servers, vec![Ipv4Addr::new(1, 1, 1, 1)]);
    }

    #[test]
    fn test_parse_many_dns_keeps_order() {
        let servers: Vec<Ipv4Addr> = (1..=12).map(|i| Ipv4Addr::new(10, 9, 0, i)).collect();
        let line = format!(
            "9 10.0.0.2 10.0.0.1 {}",
            servers.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(" ")
        );

        let response = parse(&line).unwrap();
        assert_eq!(response.dns_servers, servers);
    }

    #[test]
    fn test_parse_tolerates_extra_whitespace() {
        let response = parse("  37\t10.0.0.2   10.0.0.1 \n8.8.8.8\n").unwrap();
        assert_eq!(response.guarded_socket_fd, 37);
        assert_eq!(response.dns_servers.len(), 1);
    }

    #[test]
    fn test_parse_too_few_tokens() {
        for line in ["", "   ", "37", "37 10.0.0.2"] {
            let err = parse(line).unwrap_err();
            assert!(matches!(err, Error::Parse(_)), "line {:?}", line);
        }
    }

    #[test]
    fn test_parse_bad_fd() {
        assert!(matches!(parse("abc 10.0.0.2 10.0.0.1"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_parse_bad_addresses() {
        assert!(parse("37 10.0.0 10.0.0.1").is_err());
        assert!(parse("37 10.0.0.2 fe80::1").is_err());
        assert!(parse("37 10.0.0.2 10.0.0.1 8.8.8.8 dns.google").is_err());
    }

    #[test]
    fn test_wire_form() {
        let line = "37 10.0.0.2 10.0.0.1 8.8.8.8 8.8.4.4";
        let response: BootstrapResponse = line.parse().unwrap();
        assert_eq!(response.to_wire(), line);
    }
}
