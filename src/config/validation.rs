//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Check mapping prefixes and backend URLs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Overlapping prefixes are allowed; table order decides

use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, SelectionStrategy};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener port must not be 0")]
    ZeroPort,

    #[error("index path `{0}` must start with '/'")]
    IndexPath(String),

    #[error("timeouts.{0} must be greater than 0")]
    ZeroTimeout(&'static str),

    #[error("mapping #{index}: prefix `{prefix}` must start with '/'")]
    Prefix { index: usize, prefix: String },

    #[error("mapping #{index}: duplicate prefix `{prefix}`")]
    DuplicatePrefix { index: usize, prefix: String },

    #[error("mapping #{index}: invalid service url `{url}`: {reason}")]
    ServiceUrl {
        index: usize,
        url: String,
        reason: String,
    },

    #[error("mapping #{index}: sticky strategy requires `sticky_header`")]
    StickyHeader { index: usize },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }
    if !config.index.path.starts_with('/') {
        errors.push(ValidationError::IndexPath(config.index.path.clone()));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }

    for (index, mapping) in config.mappings.iter().enumerate() {
        if !mapping.prefix.starts_with('/') {
            errors.push(ValidationError::Prefix {
                index,
                prefix: mapping.prefix.clone(),
            });
        }
        if config.mappings[..index]
            .iter()
            .any(|earlier| earlier.prefix == mapping.prefix)
        {
            errors.push(ValidationError::DuplicatePrefix {
                index,
                prefix: mapping.prefix.clone(),
            });
        }
        for url in &mapping.urls {
            if let Err(reason) = check_service_url(url) {
                errors.push(ValidationError::ServiceUrl {
                    index,
                    url: url.clone(),
                    reason,
                });
            }
        }
        if mapping.strategy == SelectionStrategy::Sticky && mapping.sticky_header.is_none() {
            errors.push(ValidationError::StickyHeader { index });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_service_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme `{}`", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::MappingConfig;

    fn mapping(prefix: &str, urls: &[&str]) -> MappingConfig {
        MappingConfig {
            prefix: prefix.into(),
            container_id: String::new(),
            version: String::new(),
            service_id: String::new(),
            urls: urls.iter().map(|u| u.to_string()).collect(),
            rewrite_headers: false,
            strategy: SelectionStrategy::RoundRobin,
            sticky_header: None,
            discovery: None,
            policies: Vec::new(),
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = GatewayConfig::default();
        config.listener.port = 0;
        config.index.path = "index".into();
        config.mappings.push(mapping("api", &["ftp://h/x", "not a url"]));
        config.mappings.push(mapping("/a/", &["http://h:1"]));
        config.mappings.push(mapping("/a/", &[]));

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::ZeroPort));
        assert!(errors.contains(&ValidationError::IndexPath("index".into())));
        assert!(errors.contains(&ValidationError::Prefix {
            index: 0,
            prefix: "api".into()
        }));
        assert!(errors.contains(&ValidationError::DuplicatePrefix {
            index: 2,
            prefix: "/a/".into()
        }));
        let bad_urls = errors
            .iter()
            .filter(|e| matches!(e, ValidationError::ServiceUrl { .. }))
            .count();
        assert_eq!(bad_urls, 2);
    }

    #[test]
    fn overlapping_prefixes_are_allowed() {
        let mut config = GatewayConfig::default();
        config.mappings.push(mapping("/api", &["http://h1:1"]));
        config.mappings.push(mapping("/api/v2/", &["http://h2:2"]));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn sticky_requires_header() {
        let mut config = GatewayConfig::default();
        let mut m = mapping("/s/", &["http://h:1"]);
        m.strategy = SelectionStrategy::Sticky;
        config.mappings.push(m);
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::StickyHeader { index: 0 }]
        );
    }
}
