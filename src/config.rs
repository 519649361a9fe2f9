//! Runtime configuration, read from the environment after `.env` is loaded.

use crate::{
    coordinator::{CoordinatorConfig, Exclusivity},
    error::AppError,
};
use axum::http::{HeaderValue, Method};
use std::{env, str::FromStr, time::Duration};
use tower_http::cors::{Any, CorsLayer};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// `tracing` env-filter directive.
    pub log_filter: String,
    pub exclusivity: Exclusivity,
    pub lock_timeout: Duration,
    pub max_attempts: u32,
    pub seed_sample_data: bool,
    /// Allowed browser origin, or `*`.
    pub cors_origin: String,
}

impl Default for Config {
    fn default() -> Self {
        let coordinator = CoordinatorConfig::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            log_filter: "info".to_string(),
            exclusivity: coordinator.exclusivity,
            lock_timeout: coordinator.lock_timeout,
            max_attempts: coordinator.max_attempts,
            seed_sample_data: true,
            cors_origin: "http://localhost:4200".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();
        Ok(Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT")?.unwrap_or(defaults.port),
            log_filter: env::var("RUST_LOG").unwrap_or(defaults.log_filter),
            exclusivity: parse_var("BOOKING_EXCLUSIVITY")?.unwrap_or(defaults.exclusivity),
            lock_timeout: parse_var("BOOKING_LOCK_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.lock_timeout),
            max_attempts: parse_var("BOOKING_MAX_ATTEMPTS")?.unwrap_or(defaults.max_attempts),
            seed_sample_data: parse_var("SEED_SAMPLE_DATA")?.unwrap_or(defaults.seed_sample_data),
            cors_origin: env::var("CORS_ORIGIN").unwrap_or(defaults.cors_origin),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn coordinator(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            exclusivity: self.exclusivity,
            lock_timeout: self.lock_timeout,
            max_attempts: self.max_attempts,
        }
    }

    pub fn cors_layer(&self) -> Result<CorsLayer, AppError> {
        let layer = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any);
        if self.cors_origin == "*" {
            return Ok(layer.allow_origin(Any));
        }
        let origin = HeaderValue::from_str(&self.cors_origin)
            .map_err(|e| AppError::Config(format!("CORS_ORIGIN: {e}")))?;
        Ok(layer.allow_origin(origin))
    }
}

fn parse_var<T>(key: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| AppError::Config(format!("{key}={raw}: {e}"))),
        Err(_) => Ok(None),
    }
}
