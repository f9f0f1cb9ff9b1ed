//! Gateway configuration loading (spec §6 "Configuration").
//!
//! All settings come from the environment; there is no config file.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub env: String,
    pub allowed_origins: Vec<String>,
    pub rollup_url: String,
    pub continuum_grpc_url: String,
    pub continuum_rest_url: String,
    pub database_url: Option<String>,
    pub rate_limit_rollup: u32,
    pub rate_limit_continuum_grpc: u32,
    pub rate_limit_continuum_rest: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            port: parse_num("PORT", 8080)?,
            env: env::var("ENV").unwrap_or_else(|_| "development".to_owned()),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_owned())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            rollup_url: env::var("ROLLUP_URL").map_err(|_| ConfigError::Missing("ROLLUP_URL"))?,
            continuum_grpc_url: env::var("CONTINUUM_GRPC_URL")
                .map_err(|_| ConfigError::Missing("CONTINUUM_GRPC_URL"))?,
            continuum_rest_url: env::var("CONTINUUM_REST_URL")
                .map_err(|_| ConfigError::Missing("CONTINUUM_REST_URL"))?,
            database_url: env::var("DATABASE_URL").ok(),
            rate_limit_rollup: parse_num("RATE_LIMIT_ROLLUP", 1000)?,
            rate_limit_continuum_grpc: parse_num("RATE_LIMIT_CONTINUUM_GRPC", 500)?,
            rate_limit_continuum_rest: parse_num("RATE_LIMIT_CONTINUUM_REST", 2000)?,
        })
    }

    /// Token-bucket `(rate_per_sec, burst)` for a route family, derived from
    /// the configured requests-per-minute limits (spec §4.2, §6).
    pub fn rate_limit_for(&self, family: RouteFamily) -> (f64, u32) {
        let per_minute = match family {
            RouteFamily::Rollup => self.rate_limit_rollup,
            RouteFamily::ContinuumGrpc => self.rate_limit_continuum_grpc,
            RouteFamily::ContinuumRest => self.rate_limit_continuum_rest,
        };
        (f64::from(per_minute) / 60.0, per_minute)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteFamily {
    Rollup,
    ContinuumGrpc,
    ContinuumRest,
}

fn parse_num<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Deadlines named in spec §5 "Cancellation and timeouts".
pub mod deadlines {
    use super::Duration;

    pub const UNARY_RPC: Duration = Duration::from_secs(10);
    pub const POINT_QUERY: Duration = Duration::from_secs(5);
    pub const BATCH_SUBMIT: Duration = Duration::from_secs(30);
    pub const REST_FETCH: Duration = Duration::from_secs(10);
    pub const CANDLES_QUERY: Duration = Duration::from_secs(10);
    pub const COMPOSITE_STATUS: Duration = Duration::from_secs(10);
    /// Spec §5: "HTTP servers are given 30 s for in-flight requests, then
    /// forcibly closed."
    pub const SHUTDOWN_DRAIN: Duration = Duration::from_secs(30);
}
