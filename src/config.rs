//! Service configuration loaded from the environment (and `.env`).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::engine::{
    EngineParams, DEFAULT_CREATION_FEE, DEFAULT_CREATOR_REWARD, DEFAULT_TRADE_REWARD,
    DEFAULT_WINNER_MULTIPLIER,
};
use crate::error::ConfigError;
use crate::market_resolve::{
    BondingCurve, FeeDistributor, DEFAULT_CREATOR_FEE_BP, DEFAULT_CURVE_K, DEFAULT_PLATFORM_FEE_BP,
};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:1234";
pub const DEFAULT_STATE_PATH: &str = "data/state.json";
pub const DEFAULT_OWNER: &str = "OWNER";

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl LoggingConfig {
    /// Install the global tracing subscriber. `RUST_LOG` wins over `level`.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        match self.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub state_path: PathBuf,
    pub owner: String,
    pub params: EngineParams,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load `.env` if present, then read `PDM_*` variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fees = FeeDistributor::new(
            parse_or(&lookup, "PDM_CREATOR_FEE_BP", DEFAULT_CREATOR_FEE_BP)?,
            parse_or(&lookup, "PDM_PLATFORM_FEE_BP", DEFAULT_PLATFORM_FEE_BP)?,
        )
        .map_err(|e| ConfigError::InvalidValue {
            field: "PDM_CREATOR_FEE_BP/PDM_PLATFORM_FEE_BP",
            reason: e.to_string(),
        })?;

        let params = EngineParams {
            creation_fee: parse_or(&lookup, "PDM_CREATION_FEE", DEFAULT_CREATION_FEE)?,
            curve: BondingCurve::new(parse_or(&lookup, "PDM_CURVE_K", DEFAULT_CURVE_K)?),
            fees,
            creator_reward: parse_or(&lookup, "PDM_CREATOR_REWARD", DEFAULT_CREATOR_REWARD)?,
            trade_reward: parse_or(&lookup, "PDM_TRADE_REWARD", DEFAULT_TRADE_REWARD)?,
            winner_multiplier: parse_or(&lookup, "PDM_WINNER_MULTIPLIER", DEFAULT_WINNER_MULTIPLIER)?,
        };

        let owner = lookup("PDM_OWNER")
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| DEFAULT_OWNER.to_string());
        if owner.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "PDM_OWNER",
                reason: "must not be empty".into(),
            });
        }

        let mut logging = LoggingConfig::default();
        if let Some(level) = lookup("PDM_LOG_LEVEL") {
            logging.level = level;
        }
        if let Some(format) = lookup("PDM_LOG_FORMAT") {
            if format != "json" && format != "pretty" {
                return Err(ConfigError::InvalidValue {
                    field: "PDM_LOG_FORMAT",
                    reason: format!("expected 'pretty' or 'json', got '{}'", format),
                });
            }
            logging.format = format;
        }

        Ok(Self {
            bind_addr: parse_or(&lookup, "PDM_BIND_ADDR", default_bind_addr())?,
            state_path: lookup("PDM_STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_PATH)),
            owner,
            params,
            logging,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            owner: DEFAULT_OWNER.to_string(),
            params: EngineParams::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 1234))
}

fn parse_or<F, T>(lookup: &F, field: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(field) {
        Some(raw) => raw
            .trim()
            .replace('_', "")
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                field,
                reason: format!("'{}': {}", raw, e),
            }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.state_path, PathBuf::from(DEFAULT_STATE_PATH));
        assert_eq!(config.owner, "OWNER");
        assert_eq!(config.params, EngineParams::default());
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PDM_BIND_ADDR", "127.0.0.1:8080"),
            ("PDM_OWNER", "ADMIN"),
            ("PDM_CURVE_K", "1_000"),
            ("PDM_CREATOR_FEE_BP", "50"),
            ("PDM_LOG_FORMAT", "json"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.owner, "ADMIN");
        assert_eq!(config.params.curve.k, 1_000);
        assert_eq!(config.params.fees.creator_fee_bp, 50);
        assert_eq!(config.params.fees.platform_fee_bp, DEFAULT_PLATFORM_FEE_BP);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_invalid_values() {
        assert!(Config::from_lookup(lookup(&[("PDM_CURVE_K", "lots")])).is_err());
        assert!(Config::from_lookup(lookup(&[("PDM_BIND_ADDR", "nowhere")])).is_err());
        assert!(Config::from_lookup(lookup(&[("PDM_LOG_FORMAT", "xml")])).is_err());
        assert!(Config::from_lookup(lookup(&[
            ("PDM_CREATOR_FEE_BP", "6000"),
            ("PDM_PLATFORM_FEE_BP", "5000"),
        ]))
        .is_err());
    }
}
