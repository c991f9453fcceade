// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names and defaults for the demo server. The SDK
//! itself is configured in code through [`SessionConfig`](crate::fhevm::SessionConfig).
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `FHEVM_NETWORK` | Network preset (`sepolia`, `localhost`) | `sepolia` |
//! | `FHEVM_CHAIN_ID` | Chain id, overrides the preset's | preset |
//! | `FHEVM_GATEWAY_URL` | Gateway endpoint | preset, else none |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::{env, net::SocketAddr};

use url::Url;

use crate::fhevm::{network_by_name, NetworkConfig, SEPOLIA};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const NETWORK_ENV: &str = "FHEVM_NETWORK";
pub const CHAIN_ID_ENV: &str = "FHEVM_CHAIN_ID";
pub const GATEWAY_URL_ENV: &str = "FHEVM_GATEWAY_URL";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    /// Unknown values fall back to `pretty`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Demo server configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub network: NetworkConfig,
    pub chain_id: u64,
    pub gateway_url: Option<Url>,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            network: SEPOLIA,
            chain_id: SEPOLIA.chain_id,
            gateway_url: None,
            log_format: LogFormat::default(),
        }
    }
}

impl ServerConfig {
    /// Load from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Invalid values fall back to defaults
    /// with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(host) = lookup(HOST_ENV) {
            config.host = host;
        }

        if let Some(raw) = lookup(PORT_ENV) {
            match raw.parse() {
                Ok(port) => config.port = port,
                Err(_) => tracing::warn!(value = %raw, "Invalid {PORT_ENV}, using {DEFAULT_PORT}"),
            }
        }

        if let Some(raw) = lookup(NETWORK_ENV) {
            match network_by_name(&raw) {
                Some(network) => config.network = network,
                None => tracing::warn!(value = %raw, "Unknown {NETWORK_ENV}, using sepolia"),
            }
        }
        config.chain_id = config.network.chain_id;
        config.gateway_url = config.network.gateway_url.and_then(|u| u.parse().ok());

        if let Some(raw) = lookup(CHAIN_ID_ENV) {
            match raw.parse() {
                Ok(chain_id) => config.chain_id = chain_id,
                Err(_) => tracing::warn!(value = %raw, "Invalid {CHAIN_ID_ENV}, ignoring"),
            }
        }

        if let Some(raw) = lookup(GATEWAY_URL_ENV) {
            match raw.parse() {
                Ok(url) => config.gateway_url = Some(url),
                Err(e) => tracing::warn!(value = %raw, error = %e, "Invalid {GATEWAY_URL_ENV}, ignoring"),
            }
        }

        if let Some(raw) = lookup(LOG_FORMAT_ENV) {
            config.log_format = LogFormat::parse(&raw);
        }

        config
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
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
    fn defaults_target_sepolia() {
        let config = ServerConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.chain_id, 11155111);
        assert_eq!(config.bind_addr().unwrap().port(), 8080);
    }

    #[test]
    fn reads_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9000"),
            ("FHEVM_NETWORK", "localhost"),
            ("FHEVM_GATEWAY_URL", "http://localhost:7077"),
            ("LOG_FORMAT", "JSON"),
        ]));
        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:9000");
        assert_eq!(config.chain_id, 31337);
        assert_eq!(config.gateway_url.unwrap().as_str(), "http://localhost:7077/");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("PORT", "not-a-port"),
            ("FHEVM_NETWORK", "mainnet"),
            ("FHEVM_CHAIN_ID", "abc"),
            ("LOG_FORMAT", "xml"),
        ]));
        assert_eq!(config.port, 8080);
        assert_eq!(config.chain_id, 11155111);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }
}
