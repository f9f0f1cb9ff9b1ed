//! Ingester configuration loading.
//!
//! All settings come from the environment; there is no config file. See
//! `Config::from_env` for the full list of variables and their defaults.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub continuum_grpc_url: String,
    pub database_url: Option<String>,
    pub start_tick: u64,
    pub buffer_size: usize,
    pub worker_count: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub output_mode: OutputMode,
    pub output_format: OutputFormat,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_max_conn_lifetime: Duration,
    pub db_max_conn_idle_time: Duration,
    pub health_check_port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Timescale,
    Console,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Compact,
    Table,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{0} must be set when OUTPUT_MODE=timescale")]
    MissingForTimescale(&'static str),
    #[error("invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let continuum_grpc_url =
            env::var("CONTINUUM_GRPC_URL").map_err(|_| ConfigError::Missing("CONTINUUM_GRPC_URL"))?;

        let output_mode = parse_enum(
            "OUTPUT_MODE",
            env::var("OUTPUT_MODE").ok().as_deref(),
            "console",
            |s| match s {
                "timescale" => Some(OutputMode::Timescale),
                "console" => Some(OutputMode::Console),
                _ => None,
            },
        )?;

        let database_url = env::var("DATABASE_URL").ok();
        if output_mode == OutputMode::Timescale && database_url.is_none() {
            return Err(ConfigError::MissingForTimescale("DATABASE_URL"));
        }

        let output_format = parse_enum(
            "OUTPUT_FORMAT",
            env::var("OUTPUT_FORMAT").ok().as_deref(),
            "json",
            |s| match s {
                "json" => Some(OutputFormat::Json),
                "compact" => Some(OutputFormat::Compact),
                "table" => Some(OutputFormat::Table),
                _ => None,
            },
        )?;

        Ok(Config {
            continuum_grpc_url,
            database_url,
            start_tick: parse_num("START_TICK", 0)?,
            buffer_size: parse_num("BUFFER_SIZE", 10_000)?,
            worker_count: parse_num("WORKER_COUNT", 8)?,
            batch_size: parse_num("BATCH_SIZE", 250)?,
            flush_interval: Duration::from_millis(parse_num("FLUSH_INTERVAL", 100)?),
            output_mode,
            output_format,
            db_max_connections: parse_num("DB_MAX_CONNECTIONS", 10)?,
            db_min_connections: parse_num("DB_MIN_CONNECTIONS", 0)?,
            db_max_conn_lifetime: Duration::from_secs(parse_num("DB_MAX_CONN_LIFETIME", 1800)?),
            db_max_conn_idle_time: Duration::from_secs(parse_num("DB_MAX_CONN_IDLE_TIME", 600)?),
            health_check_port: parse_num("HEALTH_CHECK_PORT", 8081)?,
        })
    }
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

fn parse_enum<T>(
    name: &'static str,
    raw: Option<&str>,
    default: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, ConfigError> {
    let value = raw.unwrap_or(default);
    parse(value).ok_or_else(|| ConfigError::InvalidValue {
        name,
        value: value.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_num_falls_back_to_default_when_unset() {
        // SAFETY: tests run single-threaded within this module via serial env access.
        unsafe { env::remove_var("SEQ_TEST_NUM") };
        let v: u32 = parse_num("SEQ_TEST_NUM", 42).unwrap();
        assert_eq!(v, 42);
    }

    #[test]
    fn parse_enum_rejects_unknown_values() {
        let err = parse_enum("OUTPUT_MODE", Some("bogus"), "timescale", |s| match s {
            "timescale" => Some(OutputMode::Timescale),
            "console" => Some(OutputMode::Console),
            _ => None,
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "OUTPUT_MODE", .. }));
    }
}
