//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses (bind, metrics, admin, backends)
//! - Validate value ranges (timeouts and intervals > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BalancerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::BalancerConfig;
use crate::load_balancer::backend::parse_backend_url;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("no backends configured")]
    NoBackends,

    #[error("backend #{index} has invalid address {address:?}: {reason}")]
    InvalidBackend {
        index: usize,
        address: String,
        reason: String,
    },

    #[error("{field} is not a valid socket address: {value:?}")]
    InvalidSocketAddr { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("health_check.path must start with '/': {0:?}")]
    InvalidHealthPath(String),

    #[error("admin.api_key must be set when the admin API is enabled")]
    MissingAdminKey,

    #[error("admin.bind_address must differ from listener.bind_address")]
    AdminSharesListener,
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_bind_addr(
        &mut errors,
        "listener.bind_address",
        &config.listener.bind_address,
    );

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }
    for (index, backend) in config.backends.iter().enumerate() {
        if let Err(e) = parse_backend_url(&backend.address) {
            errors.push(ValidationError::InvalidBackend {
                index,
                address: backend.address.clone(),
                reason: e.to_string(),
            });
        }
    }

    let hc = &config.health_check;
    if hc.enabled {
        if hc.interval_ms == 0 {
            errors.push(ValidationError::Zero { field: "health_check.interval_ms" });
        }
        if hc.timeout_ms == 0 {
            errors.push(ValidationError::Zero { field: "health_check.timeout_ms" });
        }
        if !hc.path.starts_with('/') {
            errors.push(ValidationError::InvalidHealthPath(hc.path.clone()));
        }
    }

    if config.timeouts.connect_ms == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.connect_ms" });
    }
    if config.timeouts.request_ms == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.request_ms" });
    }

    if config.retries.enabled {
        if config.retries.max_retries == 0 {
            errors.push(ValidationError::Zero { field: "retries.max_retries" });
        }
        if config.retries.max_buffered_body_bytes == 0 {
            errors.push(ValidationError::Zero { field: "retries.max_buffered_body_bytes" });
        }
    }

    if config.observability.metrics_enabled {
        check_socket_addr(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.admin.enabled {
        check_bind_addr(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::MissingAdminKey);
        }
        if config.admin.bind_address == config.listener.bind_address {
            errors.push(ValidationError::AdminSharesListener);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Listener addresses are handed to `TcpListener::bind`, which resolves
/// hostnames, so `host:port` is accepted as well as `ip:port`.
fn check_bind_addr(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    let valid = value.parse::<SocketAddr>().is_ok()
        || matches!(
            value.rsplit_once(':'),
            Some((host, port)) if !host.is_empty() && !host.contains(':') && port.parse::<u16>().is_ok()
        );
    if !valid {
        errors.push(ValidationError::InvalidSocketAddr {
            field,
            value: value.to_string(),
        });
    }
}

/// The metrics exporter takes a literal `ip:port`.
fn check_socket_addr(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidSocketAddr {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::BackendConfig;

    fn valid() -> BalancerConfig {
        let mut config = BalancerConfig::default();
        config.backends.push(BackendConfig::new("http://127.0.0.1:8001"));
        config
    }

    #[test]
    fn test_valid_config() {
        assert_eq!(validate_config(&valid()), Ok(()));
    }

    #[test]
    fn test_empty_pool_rejected() {
        let config = BalancerConfig::default();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::NoBackends]);
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid();
        config.listener.bind_address = "not-an-addr".into();
        config.backends.push(BackendConfig::new("https://127.0.0.1:8443"));
        config.health_check.interval_ms = 0;
        config.timeouts.request_ms = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(matches!(errors[0], ValidationError::InvalidSocketAddr { field: "listener.bind_address", .. }));
        assert!(matches!(errors[1], ValidationError::InvalidBackend { index: 1, .. }));
        assert!(errors.contains(&ValidationError::Zero { field: "health_check.interval_ms" }));
        assert!(errors.contains(&ValidationError::Zero { field: "timeouts.request_ms" }));
    }

    #[test]
    fn test_disabled_health_check_skips_checks() {
        let mut config = valid();
        config.health_check.enabled = false;
        config.health_check.interval_ms = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_admin_requires_key() {
        let mut config = valid();
        config.admin.enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingAdminKey]);

        config.admin.api_key = "secret".into();
        config.admin.bind_address = config.listener.bind_address.clone();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::AdminSharesListener]);
    }

    #[test]
    fn test_bind_address_accepts_hostname() {
        let mut config = valid();
        config.listener.bind_address = "localhost:8000".into();
        config.admin.enabled = true;
        config.admin.api_key = "secret".into();
        config.admin.bind_address = "localhost:8081".into();
        assert_eq!(validate_config(&config), Ok(()));

        for bad in ["localhost", ":8000", "localhost:http", "localhost:70000"] {
            config.listener.bind_address = bad.into();
            let errors = validate_config(&config).unwrap_err();
            assert!(
                matches!(errors[0], ValidationError::InvalidSocketAddr { field: "listener.bind_address", .. }),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_metrics_address_must_be_ip() {
        let mut config = valid();
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "localhost:9090".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            errors[0],
            ValidationError::InvalidSocketAddr { field: "observability.metrics_address", .. }
        ));
    }

    #[test]
    fn test_retry_needs_budget() {
        let mut config = valid();
        config.retries.enabled = true;
        config.retries.max_retries = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::Zero { field: "retries.max_retries" }]);
    }
}
