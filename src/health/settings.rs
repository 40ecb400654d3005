//! Validated health check settings.

use std::num::NonZeroUsize;
use std::time::Duration;

use thiserror::Error;

use crate::config::HealthCheckConfig;
use crate::health::probe::HttpMethod;

/// Errors that prevent an adjuster from being constructed.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("http_method only supports: {supported}, got {0:?}", supported = HttpMethod::SUPPORTED.join(", "))]
    UnsupportedMethod(String),

    #[error("{name} must be at least 1")]
    ZeroThreshold { name: &'static str },

    #[error("{name} must be a positive number of seconds, got {value}")]
    NonPositiveDuration { name: &'static str, value: f64 },

    #[error("{name} of {value} seconds is out of range")]
    DurationOutOfRange { name: &'static str, value: f64 },

    #[error("route must start with '/', got {0:?}")]
    InvalidRoute(String),
}

/// Settings an adjuster runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckSettings {
    pub route: String,
    pub interval: Duration,
    pub timeout: Duration,
    pub healthy_threshold: NonZeroUsize,
    pub unhealthy_threshold: NonZeroUsize,
    pub port_name: Option<String>,
    pub http_method: HttpMethod,
}

impl TryFrom<&HealthCheckConfig> for CheckSettings {
    type Error = ConfigError;

    fn try_from(config: &HealthCheckConfig) -> Result<Self, Self::Error> {
        let http_method = config
            .http_method
            .parse::<HttpMethod>()
            .map_err(ConfigError::UnsupportedMethod)?;

        if !config.route.starts_with('/') {
            return Err(ConfigError::InvalidRoute(config.route.clone()));
        }

        if config.interval_secs == 0 {
            return Err(ConfigError::NonPositiveDuration {
                name: "interval_secs",
                value: 0.0,
            });
        }

        // Also rejects NaN.
        if !(config.timeout_secs > 0.0 && config.timeout_secs.is_finite()) {
            return Err(ConfigError::NonPositiveDuration {
                name: "timeout_secs",
                value: config.timeout_secs,
            });
        }

        let timeout = Duration::try_from_secs_f64(config.timeout_secs).map_err(|_| {
            ConfigError::DurationOutOfRange {
                name: "timeout_secs",
                value: config.timeout_secs,
            }
        })?;

        let healthy_threshold = NonZeroUsize::new(config.healthy_threshold as usize)
            .ok_or(ConfigError::ZeroThreshold { name: "healthy_threshold" })?;
        let unhealthy_threshold = NonZeroUsize::new(config.unhealthy_threshold as usize)
            .ok_or(ConfigError::ZeroThreshold { name: "unhealthy_threshold" })?;

        Ok(Self {
            route: config.route.clone(),
            interval: Duration::from_secs(config.interval_secs),
            timeout,
            healthy_threshold,
            unhealthy_threshold,
            port_name: config.port_name.clone(),
            http_method,
        })
    }
}
