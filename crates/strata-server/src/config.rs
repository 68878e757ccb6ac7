//! Environment-driven configuration (spec §6 "Configuration via
//! environment"). Parsed once at startup into an immutable struct; an
//! invalid value is a startup error, never a silently-ignored default
//! (spec §10.3).

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid { key: &'static str, value: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub db_path: String,
    pub db_max_open_conns: u32,
    pub db_max_idle_conns: u32,
    pub db_conn_max_lifetime: Option<Duration>,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub idle_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Human,
    Json,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            port: env_parsed("PORT", 8080)?,
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "strata.db".to_string()),
            db_max_open_conns: env_parsed("DB_MAX_OPEN_CONNS", 10)?,
            db_max_idle_conns: env_parsed("DB_MAX_IDLE_CONNS", 5)?,
            db_conn_max_lifetime: env_duration_opt("DB_CONN_MAX_LIFETIME")?,
            read_timeout: env_duration("READ_TIMEOUT", Duration::from_secs(10))?,
            write_timeout: env_duration("WRITE_TIMEOUT", Duration::from_secs(10))?,
            idle_timeout: env_duration("IDLE_TIMEOUT", Duration::from_secs(120))?,
            shutdown_timeout: env_duration("SHUTDOWN_TIMEOUT", Duration::from_secs(30))?,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: env_log_format()?,
        })
    }
}

fn env_parsed<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => raw.parse::<T>().map_err(|e| ConfigError::Invalid { key, value: raw, reason: e.to_string() }),
    }
}

/// Go-style duration strings (`10s`, `5m`, `1h`) via `humantime` (spec
/// §6/§10.3).
fn env_duration(key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => humantime::parse_duration(&raw)
            .map_err(|e| ConfigError::Invalid { key, value: raw, reason: e.to_string() }),
    }
}

fn env_duration_opt(key: &'static str) -> Result<Option<Duration>, ConfigError> {
    match std::env::var(key) {
        Err(_) => Ok(None),
        Ok(raw) if raw.is_empty() => Ok(None),
        Ok(raw) => humantime::parse_duration(&raw)
            .map(Some)
            .map_err(|e| ConfigError::Invalid { key, value: raw, reason: e.to_string() }),
    }
}

fn env_log_format() -> Result<LogFormat, ConfigError> {
    let structured = std::env::var("LOG_STRUCTURED").map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    match std::env::var("LOG_FORMAT") {
        Err(_) => Ok(if structured { LogFormat::Json } else { LogFormat::Human }),
        Ok(raw) => match raw.as_str() {
            "json" => Ok(LogFormat::Json),
            "human" | "pretty" | "compact" => Ok(LogFormat::Human),
            other => Err(ConfigError::Invalid {
                key: "LOG_FORMAT",
                value: other.to_string(),
                reason: "expected \"json\" or \"human\"".to_string(),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_apply_when_env_is_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        for key in ["PORT", "DB_PATH", "READ_TIMEOUT", "LOG_FORMAT", "LOG_STRUCTURED"] {
            std::env::remove_var(key);
        }
        let config = Config::from_env().unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.read_timeout, Duration::from_secs(10));
        assert_eq!(config.log_format, LogFormat::Human);
    }

    #[test]
    fn go_style_durations_parse_via_humantime() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("SHUTDOWN_TIMEOUT", "45s");
        let config = Config::from_env().unwrap();
        assert_eq!(config.shutdown_timeout, Duration::from_secs(45));
        std::env::remove_var("SHUTDOWN_TIMEOUT");
    }

    #[test]
    fn invalid_duration_is_a_startup_error_not_a_silent_default() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("READ_TIMEOUT", "not-a-duration");
        let result = Config::from_env();
        assert!(result.is_err());
        std::env::remove_var("READ_TIMEOUT");
    }
}
