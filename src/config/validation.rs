//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds >= 1, durations > 0, ports valid)
//! - Detect duplicate endpoints
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: CheckerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use tracing::Level;

use crate::config::schema::CheckerConfig;
use crate::health::settings::{CheckSettings, ConfigError};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("{scope}: {error}")]
    HealthCheck {
        scope: String,
        #[source]
        error: ConfigError,
    },

    #[error("endpoint #{index}: host must not be empty")]
    EmptyHost { index: usize },

    #[error("endpoint {endpoint}: port must be non-zero")]
    ZeroPort { endpoint: String },

    #[error("endpoint {0} is listed more than once")]
    DuplicateEndpoint(String),

    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),

    #[error("invalid log level {0:?}")]
    LogLevel(String),
}

/// Check the whole configuration, collecting every problem.
pub fn validate_config(config: &CheckerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let global_error = CheckSettings::try_from(&config.health_check).err();
    if let Some(error) = &global_error {
        errors.push(ValidationError::HealthCheck {
            scope: "health_check".to_string(),
            error: error.clone(),
        });
    }

    let mut seen = HashSet::new();
    for (index, endpoint) in config.endpoints.iter().enumerate() {
        let key = format!("{}:{}", endpoint.host, endpoint.port);

        if endpoint.host.trim().is_empty() {
            errors.push(ValidationError::EmptyHost { index });
        }
        if endpoint.port == 0 {
            errors.push(ValidationError::ZeroPort { endpoint: key.clone() });
        }
        if !seen.insert(key.clone()) {
            errors.push(ValidationError::DuplicateEndpoint(key.clone()));
        }

        let effective = endpoint.health_check(&config.health_check);
        if let Err(error) = CheckSettings::try_from(&effective) {
            // Inherited problems are already reported once above.
            if global_error.as_ref() != Some(&error) {
                errors.push(ValidationError::HealthCheck {
                    scope: format!("endpoint {}", key),
                    error,
                });
            }
        }

        if let Some(name) = &effective.port_name {
            if !endpoint.port_map.contains_key(name) {
                tracing::warn!(
                    endpoint = %key,
                    port_name = %name,
                    "Named port not in port_map, checks will use the endpoint port"
                );
            }
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.observability.log_level.parse::<Level>().is_err() {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{EndpointConfig, HealthCheckOverride};

    fn endpoint(host: &str, port: u16) -> EndpointConfig {
        EndpointConfig {
            host: host.to_string(),
            port,
            source: None,
            job: None,
            port_map: Default::default(),
            health_check: HealthCheckOverride::default(),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&CheckerConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = CheckerConfig::default();
        config.health_check.http_method = "POST".into();
        config.endpoints.push(endpoint("", 0));
        config.endpoints.push(endpoint("a", 80));
        config.endpoints.push(endpoint("a", 80));
        config.observability.metrics_address = "not-an-address".into();
        config.observability.log_level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::HealthCheck {
            scope: "health_check".into(),
            error: ConfigError::UnsupportedMethod("POST".into()),
        }));
        assert!(errors.contains(&ValidationError::EmptyHost { index: 0 }));
        assert!(errors.contains(&ValidationError::ZeroPort { endpoint: ":0".into() }));
        assert!(errors.contains(&ValidationError::DuplicateEndpoint("a:80".into())));
        assert!(errors.contains(&ValidationError::MetricsAddress("not-an-address".into())));
        assert!(errors.contains(&ValidationError::LogLevel("loud".into())));
        // The bad default method is reported once, not per endpoint.
        let method_errors = errors
            .iter()
            .filter(|e| matches!(e, ValidationError::HealthCheck { .. }))
            .count();
        assert_eq!(method_errors, 1);
    }

    #[test]
    fn test_endpoint_override_validated() {
        let mut config = CheckerConfig::default();
        let mut ep = endpoint("b", 8080);
        ep.health_check.unhealthy_threshold = Some(0);
        config.endpoints.push(ep);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::HealthCheck {
                scope: "endpoint b:8080".into(),
                error: ConfigError::ZeroThreshold { name: "unhealthy_threshold" },
            }]
        );
    }

    #[test]
    fn test_inherited_error_reported_once_despite_override() {
        let mut config = CheckerConfig::default();
        config.health_check.http_method = "POST".into();
        let mut ep = endpoint("d", 8080);
        ep.health_check.route = Some("/ready".into());
        config.endpoints.push(ep);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::HealthCheck {
                scope: "health_check".into(),
                error: ConfigError::UnsupportedMethod("POST".into()),
            }]
        );
    }

    #[test]
    fn test_missing_port_name_is_not_an_error() {
        let mut config = CheckerConfig::default();
        config.health_check.port_name = Some("health".into());
        config.endpoints.push(endpoint("c", 8080));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_metrics_address_ignored_when_disabled() {
        let mut config = CheckerConfig::default();
        config.observability.metrics_enabled = false;
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());
    }
}
