//! Configuration types for clock-echo.
//!
//! The only things worth configuring are where to listen and how loudly to
//! log. Values come from an optional TOML file (path in `CLOCK_ECHO_CONFIG`),
//! then environment overrides, then built-in defaults. Invalid values are
//! rejected before the server opens any ports.
//!
//! # Example
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0"
//! port      = 8080
//! log_level = "clock_echo=debug"
//! ```

use std::{
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;

/// Environment variable naming an optional TOML config file.
pub const CONFIG_PATH_ENV: &str = "CLOCK_ECHO_CONFIG";
pub const BIND_ADDR_ENV: &str = "CLOCK_ECHO_BIND_ADDR";
pub const PORT_ENV: &str = "CLOCK_ECHO_PORT";
pub const LOG_LEVEL_ENV: &str = "CLOCK_ECHO_LOG_LEVEL";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Resolve the effective configuration from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Resolve configuration using `lookup` in place of the process environment.
    ///
    /// Reads the file named by [`CONFIG_PATH_ENV`] when set, applies the
    /// per-key overrides on top, and validates the result.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = match lookup(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            Some(path) => {
                let path = PathBuf::from(path);
                Self::load(&path)
                    .with_context(|| format!("Failed to load config from {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let config: Self = toml::from_str(&content).context("parsing config TOML")?;
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(addr) = lookup(BIND_ADDR_ENV) {
            self.server.bind_addr = addr
                .trim()
                .parse()
                .with_context(|| format!("{BIND_ADDR_ENV}=`{addr}` is not an IP address"))?;
        }
        if let Some(port) = lookup(PORT_ENV) {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("{PORT_ENV}=`{port}` is not a valid port"))?;
        }
        if let Some(level) = lookup(LOG_LEVEL_ENV).filter(|l| !l.is_empty()) {
            self.server.log_level = Some(level);
        }
        Ok(())
    }

    fn validate(&self) -> anyhow::Result<()> {
        if let Some(level) = &self.server.log_level {
            tracing_subscriber::EnvFilter::try_new(level)
                .with_context(|| format!("log_level `{level}` is not a valid filter"))?;
        }
        Ok(())
    }
}

/// Listener settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to bind (default: `0.0.0.0`, all IPv4 interfaces).
    #[serde(default = "defaults::bind_addr")]
    pub bind_addr: IpAddr,

    /// TCP port (default: 8080). `0` asks the OS for an ephemeral port.
    #[serde(default = "defaults::port")]
    pub port: u16,

    /// Log filter override (`RUST_LOG` still wins when set).
    #[serde(default)]
    pub log_level: Option<String>,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    /// Address a local client should dial to reach this listener.
    ///
    /// Wildcard binds are reached via loopback of the same address family.
    pub fn probe_addr(&self) -> SocketAddr {
        let ip = match self.bind_addr {
            IpAddr::V4(v4) if v4.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(v6) if v6.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
            ip => ip,
        };
        SocketAddr::new(ip, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: defaults::bind_addr(),
            port: defaults::port(),
            log_level: None,
        }
    }
}

mod defaults {
    use std::net::{IpAddr, Ipv4Addr};

    pub fn bind_addr() -> IpAddr { IpAddr::V4(Ipv4Addr::UNSPECIFIED) }
    pub fn port() -> u16 { 8080 }
}
