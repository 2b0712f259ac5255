//! Application configuration, loaded from environment variables.

use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::engine::EngineConfig;

/// Complete application configuration, loaded from environment variables or
/// default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment
    /// variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            engine: engine_config_from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;

    fn from_env() -> Self {
        let host_value =
            env_string("BOX_ADVISOR_API_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                tracing::warn!(
                    "Could not parse BOX_ADVISOR_API_HOST ('{}'): {}. Using {}.",
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match env_string("BOX_ADVISOR_API_PORT") {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    tracing::warn!(
                        "BOX_ADVISOR_API_PORT must not be 0. Using {}.",
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    tracing::warn!(
                        "Could not parse BOX_ADVISOR_API_PORT ('{}'): {}. Using {}.",
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host: effective_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }
}

const WEIGHT_CEILING_VAR: &str = "BOX_ADVISOR_WEIGHT_CEILING";
const PACKING_EFFICIENCY_VAR: &str = "BOX_ADVISOR_PACKING_EFFICIENCY";

fn engine_config_from_env() -> EngineConfig {
    let weight_ceiling = match env_string(WEIGHT_CEILING_VAR) {
        Some(raw) => match raw.parse::<u64>() {
            Ok(value) if value > 0 => value,
            Ok(_) => {
                tracing::warn!(
                    "{} must be greater than 0. Using {}.",
                    WEIGHT_CEILING_VAR,
                    EngineConfig::DEFAULT_WEIGHT_CEILING
                );
                EngineConfig::DEFAULT_WEIGHT_CEILING
            }
            Err(err) => {
                tracing::warn!(
                    "Could not parse {} ('{}'): {}. Using {}.",
                    WEIGHT_CEILING_VAR,
                    raw,
                    err,
                    EngineConfig::DEFAULT_WEIGHT_CEILING
                );
                EngineConfig::DEFAULT_WEIGHT_CEILING
            }
        },
        None => EngineConfig::DEFAULT_WEIGHT_CEILING,
    };

    let packing_efficiency = load_f64_in_range(
        PACKING_EFFICIENCY_VAR,
        EngineConfig::DEFAULT_PACKING_EFFICIENCY,
        |value| value > 0.0 && value <= 1.0,
        "must be within (0, 1]",
    );

    EngineConfig {
        weight_ceiling,
        packing_efficiency,
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            tracing::warn!("Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn load_f64_in_range(
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
) -> f64 {
    match env_string(var_name) {
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) => {
                if validator(value) {
                    value
                } else {
                    tracing::warn!(
                        "{} contains invalid value '{}': {}. Using {}.",
                        var_name,
                        raw,
                        invalid_hint,
                        default
                    );
                    default
                }
            }
            Err(err) => {
                tracing::warn!(
                    "Could not parse {} ('{}') as number: {}. Using {}.",
                    var_name,
                    raw,
                    err,
                    default
                );
                default
            }
        },
        None => default,
    }
}
