use serde::Deserialize;
use std::env;
use std::str::FromStr;

// Главная структура конфигурации, собирается из переменных окружения
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub reservation: ReservationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub acquire_timeout_seconds: u64,
}

// Настройки Redis (только кеш поиска); без URL кеш выключен
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Option<String>,
    pub search_ttl_seconds: u64,
}

// Настройки блокировок и повторов при бронировании
#[derive(Debug, Clone, Deserialize)]
pub struct ReservationConfig {
    pub lock_timeout_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 2000,
            max_retries: 3,
            retry_backoff_ms: 25,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

fn parse_value<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

fn var_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    parse_value(key, env::var(key).ok(), default)
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = ReservationConfig::default();
        Ok(Config {
            app: AppConfig {
                host: var_or("HOST", "0.0.0.0".to_string())?,
                port: var_or("PORT", 8000)?,
                environment: var_or("ENVIRONMENT", "development".to_string())?,
                rust_log: var_or(
                    "RUST_LOG",
                    "city_events=debug,tower_http=debug".to_string(),
                )?,
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                pool_size: var_or("DB_POOL_SIZE", 20)?,
                acquire_timeout_seconds: var_or("DB_ACQUIRE_TIMEOUT_SECONDS", 5)?,
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty()),
                search_ttl_seconds: var_or("SEARCH_CACHE_TTL_SECONDS", 60)?,
            },
            reservation: ReservationConfig {
                lock_timeout_ms: var_or("RESERVATION_LOCK_TIMEOUT_MS", defaults.lock_timeout_ms)?,
                max_retries: var_or("RESERVATION_MAX_RETRIES", defaults.max_retries)?,
                retry_backoff_ms: var_or(
                    "RESERVATION_RETRY_BACKOFF_MS",
                    defaults.retry_backoff_ms,
                )?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_value_falls_back_to_default() {
        let port: u16 = parse_value("PORT", None, 8000).unwrap();
        assert_eq!(port, 8000);
    }

    #[test]
    fn present_value_is_parsed() {
        let retries: u32 = parse_value("RESERVATION_MAX_RETRIES", Some(" 7 ".to_string()), 3).unwrap();
        assert_eq!(retries, 7);
    }

    #[test]
    fn garbage_is_reported_with_its_key() {
        let err = parse_value::<u16>("PORT", Some("eighty".to_string()), 8000).unwrap_err();
        assert_eq!(err.to_string(), "PORT has an invalid value \"eighty\"");
    }
}
