//! Server configuration, read once from the environment at startup.
//!
//!   STRAIN_MODE    – `test` (loopback only) or `public` (all interfaces) (default: test)
//!   STRAIN_PORT    – TCP port to listen on                              (default: 8001)
//!   STRAIN_WORKERS – handler invocations allowed in flight at once      (default: 12)

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::{ensure, Context};

use strain_core::ServiceMode;

pub const DEFAULT_PORT: u16 = 8001;
pub const DEFAULT_WORKERS: usize = 12;

/// Resolved server settings. Immutable once built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub mode: ServiceMode,
    pub port: u16,
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            mode:    ServiceMode::Test,
            port:    DEFAULT_PORT,
            workers: DEFAULT_WORKERS,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let mode = match lookup("STRAIN_MODE") {
            Some(raw) => raw.parse::<ServiceMode>().context("STRAIN_MODE")?,
            None      => defaults.mode,
        };

        let port = match lookup("STRAIN_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("STRAIN_PORT must be a port number, got {raw:?}"))?,
            None => defaults.port,
        };

        let workers = match lookup("STRAIN_WORKERS") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("STRAIN_WORKERS must be a positive integer, got {raw:?}"))?,
            None => defaults.workers,
        };
        ensure!(workers > 0, "STRAIN_WORKERS must be at least 1");

        Ok(Self { mode, port, workers })
    }

    /// Loopback in test mode, every interface in public mode.
    pub fn bind_addr(&self) -> SocketAddr {
        let ip = if self.mode.is_public() {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        } else {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        };
        SocketAddr::new(ip, self.port)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr(), "127.0.0.1:8001".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn public_mode_binds_all_interfaces() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("STRAIN_MODE", "public"),
            ("STRAIN_PORT", "9000"),
            ("STRAIN_WORKERS", "4"),
        ]))
        .unwrap();
        assert_eq!(config.mode, ServiceMode::Public);
        assert_eq!(config.workers, 4);
        assert_eq!(config.bind_addr(), "0.0.0.0:9000".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(ServerConfig::from_lookup(lookup(&[("STRAIN_MODE", "prod")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("STRAIN_PORT", "70000")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("STRAIN_WORKERS", "0")])).is_err());
    }
}
