//! Configuration types for the tunnel client

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::interface::{InterfacePolicy, DEFAULT_SESSION_NAME};
use crate::telemetry::TelemetryConfig;

/// Smallest MTU accepted for the tunnel interface
pub const MIN_MTU: u16 = 576;

/// Longest telemetry interval that still observes a stop within one second
pub const MAX_TELEMETRY_INTERVAL_MS: u64 = 1000;

/// Main configuration structure
///
/// # Example Configuration
///
/// ```toml
/// [server]
/// address = "2001:db8::1"
/// port = 5678
///
/// [interface]
/// mtu = 1500
/// session_name = "4over6"
///
/// [telemetry]
/// interval_ms = 1000
///
/// [logging]
/// level = "info"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Tunnel server endpoint
    pub server: ServerConfig,

    /// Virtual interface settings
    #[serde(default)]
    pub interface: InterfaceSection,

    /// Counter polling
    #[serde(default)]
    pub telemetry: TelemetrySection,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;

        if self.interface.mtu < MIN_MTU {
            return Err(Error::Config(format!(
                "MTU {} is too small (minimum {})",
                self.interface.mtu, MIN_MTU
            )));
        }

        if self.interface.session_name.trim().is_empty() {
            return Err(Error::Config("session_name must not be empty".into()));
        }

        if self.telemetry.interval_ms == 0
            || self.telemetry.interval_ms > MAX_TELEMETRY_INTERVAL_MS
        {
            return Err(Error::Config(format!(
                "telemetry interval_ms {} out of range (1..={})",
                self.telemetry.interval_ms, MAX_TELEMETRY_INTERVAL_MS
            )));
        }

        Ok(())
    }

    /// Interface policy for the configurator
    pub fn interface_policy(&self) -> InterfacePolicy {
        InterfacePolicy {
            mtu: self.interface.mtu,
            session_name: self.interface.session_name.clone(),
        }
    }

    /// Telemetry settings for the poller
    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            interval: Duration::from_millis(self.telemetry.interval_ms),
        }
    }

    /// Generate a sample configuration
    pub fn sample() -> String {
        r#"# Ladder 4-over-6 Tunnel Configuration

# Tunnel server (required)
[server]
# IPv6 literal of the tunnel server
address = "2001:db8::1"

# Control port of the tunnel server
port = 5678

# Virtual interface settings
[interface]
# MTU for the tunnel interface (default: 1500, minimum: 576)
mtu = 1500

# Session label shown by the platform (default: "4over6")
session_name = "4over6"

# Counter polling
[telemetry]
# Milliseconds between counter reads (default: 1000, range: 1..=1000)
interval_ms = 1000

[logging]
# Log level: "error", "warn", "info", "debug", "trace"
# Overridden by RUST_LOG when set
level = "info"
"#
        .to_string()
    }
}

/// Tunnel server endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server address, usually an IPv6 literal
    pub address: String,

    /// Server control port
    pub port: u16,
}

impl ServerConfig {
    /// Validate the server configuration
    pub fn validate(&self) -> Result<()> {
        self.ip()?;

        if self.port == 0 {
            return Err(Error::Config("server port must be non-zero".into()));
        }

        Ok(())
    }

    /// Parsed server address
    pub fn ip(&self) -> Result<IpAddr> {
        self.address.parse().map_err(|_| {
            Error::Config(format!("invalid server address: {}", self.address))
        })
    }

    /// Whether the server is reached over IPv6
    pub fn is_ipv6(&self) -> bool {
        matches!(self.ip(), Ok(IpAddr::V6(_)))
    }
}

/// `[interface]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceSection {
    #[serde(default = "default_mtu")]
    pub mtu: u16,

    #[serde(default = "default_session_name")]
    pub session_name: String,
}

impl Default for InterfaceSection {
    fn default() -> Self {
        Self {
            mtu: default_mtu(),
            session_name: default_session_name(),
        }
    }
}

/// `[telemetry]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySection {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_mtu() -> u16 {
    ladder_tun::DEFAULT_MTU
}

fn default_session_name() -> String {
    DEFAULT_SESSION_NAME.to_string()
}

fn default_interval_ms() -> u64 {
    MAX_TELEMETRY_INTERVAL_MS
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
address = "2001:db8::1"
port = 5678

[interface]
mtu = 1400
session_name = "ladder"

[telemetry]
interval_ms = 500

[logging]
level = "debug"
"#;

        let config = Config::from_toml(toml).unwrap();
        assert!(config.server.is_ipv6());
        assert_eq!(config.server.port, 5678);
        assert_eq!(config.logging.level, "debug");

        let policy = config.interface_policy();
        assert_eq!(policy.mtu, 1400);
        assert_eq!(policy.session_name, "ladder");

        assert_eq!(
            config.telemetry_config().interval,
            Duration::from_millis(500)
        );
    }

    #[test]
    fn test_defaults_match_fixed_policy() {
        let toml = r#"
[server]
address = "2001:db8::1"
port = 5678
"#;

        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.interface_policy(), InterfacePolicy::default());
        assert_eq!(config.telemetry_config(), TelemetryConfig::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_sample_is_valid() {
        let config = Config::from_toml(&Config::sample()).unwrap();
        assert_eq!(config.server.address, "2001:db8::1");
    }

    #[test]
    fn test_missing_server_fails() {
        let result = Config::from_toml("[interface]\nmtu = 1500\n");
        assert!(matches!(result, Err(Error::ConfigParse(_))));
    }

    #[test]
    fn test_invalid_address_fails() {
        let toml = r#"
[server]
address = "tunnel.example.com"
port = 5678
"#;
        assert!(matches!(Config::from_toml(toml), Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_port_fails() {
        let toml = r#"
[server]
address = "2001:db8::1"
port = 0
"#;
        assert!(Config::from_toml(toml).is_err());
    }

    #[test]
    fn test_small_mtu_fails() {
        let toml = r#"
[server]
address = "2001:db8::1"
port = 5678

[interface]
mtu = 500
"#;
        assert!(Config::from_toml(toml).is_err());
    }

    #[test]
    fn test_telemetry_interval_bounds() {
        for interval in [0, 1001] {
            let toml = format!(
                "[server]\naddress = \"2001:db8::1\"\nport = 5678\n\n[telemetry]\ninterval_ms = {}\n",
                interval
            );
            assert!(Config::from_toml(&toml).is_err(), "interval {}", interval);
        }

        let toml = "[server]\naddress = \"2001:db8::1\"\nport = 5678\n\n[telemetry]\ninterval_ms = 1\n";
        assert!(Config::from_toml(toml).is_ok());
    }
}
