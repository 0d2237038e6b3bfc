//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (storage routes reference declared stores)
//! - Validate value ranges (TTLs > 0, known log levels)
//! - Detect conflicting route settings
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SiteConfig → Result<(), Vec<ValidationError>>
//! - Route list structure (default route, duplicates) is left to the route
//!   compiler, which owns those rules

use std::collections::HashSet;
use std::fmt;

use crate::config::schema::{RouteTargetConfig, SiteConfig};
use crate::routing::policy::{MAX_AGE_LIMIT_SECS, SECONDS_PER_DAY};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// One semantic problem, located by field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn is_valid_site_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub fn validate_config(config: &SiteConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !is_valid_site_name(&config.name) {
        errors.push(ValidationError::new(
            "name",
            "must be non-empty and contain only letters, digits, '-' and '_'",
        ));
    }

    if let Some(auth) = &config.basic_auth {
        if auth.username.is_empty() || auth.username.contains(':') {
            errors.push(ValidationError::new(
                "basic_auth.username",
                "must be non-empty and must not contain ':'",
            ));
        }
        if auth.password.is_empty() {
            errors.push(ValidationError::new("basic_auth.password", "must be non-empty"));
        }
    }

    if config.caching.object_ttl_secs == 0 {
        errors.push(ValidationError::new("caching.object_ttl_secs", "must be greater than 0"));
    }
    let max_age_days = MAX_AGE_LIMIT_SECS / SECONDS_PER_DAY;
    if config.caching.immutable_max_age_days == 0 {
        errors.push(ValidationError::new(
            "caching.immutable_max_age_days",
            "must be greater than 0",
        ));
    } else if config.caching.immutable_max_age_days > max_age_days {
        errors.push(ValidationError::new(
            "caching.immutable_max_age_days",
            format!("must be at most {max_age_days}"),
        ));
    }

    let mut store_names = HashSet::new();
    for (i, store) in config.stores.iter().enumerate() {
        if store.name.is_empty() {
            errors.push(ValidationError::new(format!("stores[{i}].name"), "must be non-empty"));
        } else if !store_names.insert(store.name.as_str()) {
            errors.push(ValidationError::new(
                format!("stores[{i}].name"),
                format!("duplicate store '{}'", store.name),
            ));
        }
        if store.bucket.is_empty() {
            errors.push(ValidationError::new(format!("stores[{i}].bucket"), "must be non-empty"));
        }
    }

    if config.routes.is_empty() {
        errors.push(ValidationError::new("routes", "at least one route is required"));
    }

    for (i, route) in config.routes.iter().enumerate() {
        let field = |name: &str| format!("routes[{i}].{name}");

        if route.path_pattern.is_empty() {
            errors.push(ValidationError::new(field("path_pattern"), "must be non-empty"));
        }

        if route.viewer_request_function_arn.is_some() && !route.handlers.is_empty() {
            errors.push(ValidationError::new(
                field("handlers"),
                "cannot be combined with viewer_request_function_arn",
            ));
        }

        match &route.target {
            RouteTargetConfig::ObjectStorage {
                s3_folder: Some(folder),
                ..
            } => {
                if !store_names.contains(folder.store.as_str()) {
                    errors.push(ValidationError::new(
                        field("s3_folder.store"),
                        format!("unknown store '{}'", folder.store),
                    ));
                }
                if folder.artifact.is_empty() || folder.version.is_empty() {
                    errors.push(ValidationError::new(
                        field("s3_folder"),
                        "artifact and version must be non-empty",
                    ));
                }
            }
            RouteTargetConfig::Custom { origin_domain, .. } if origin_domain.is_empty() => {
                errors.push(ValidationError::new(field("origin_domain"), "must be non-empty"));
            }
            RouteTargetConfig::SingleAsset { content_type, .. } if content_type.is_empty() => {
                errors.push(ValidationError::new(field("content_type"), "must be non-empty"));
            }
            _ => {}
        }
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("expected one of {}", LOG_LEVELS.join(", ")),
        ));
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
    use crate::config::schema::{
        BasicAuthConfig, FolderConfig, RouteConfig, RouteTargetConfig, StoreConfig,
    };

    fn route(path_pattern: &str, target: RouteTargetConfig) -> RouteConfig {
        RouteConfig {
            path_pattern: path_pattern.to_string(),
            target,
            viewer_request_function_arn: None,
            handlers: Vec::new(),
            response_handlers: Vec::new(),
        }
    }

    fn custom(domain: &str) -> RouteTargetConfig {
        RouteTargetConfig::Custom {
            origin_domain: domain.to_string(),
            cache_policy_id: None,
        }
    }

    #[test]
    fn test_valid_config() {
        let config = SiteConfig {
            routes: vec![route("/", custom("app.example.com"))],
            ..SiteConfig::default()
        };
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = SiteConfig {
            name: "my site".to_string(),
            basic_auth: Some(BasicAuthConfig {
                username: "a:b".to_string(),
                password: String::new(),
            }),
            ..SiteConfig::default()
        };
        config.caching.object_ttl_secs = 0;
        config.observability.log_level = "verbose".to_string();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "name",
                "basic_auth.username",
                "basic_auth.password",
                "caching.object_ttl_secs",
                "routes",
                "observability.log_level",
            ]
        );
    }

    #[test]
    fn test_immutable_age_bounds() {
        let mut config = SiteConfig {
            routes: vec![route("/", custom("app.example.com"))],
            ..SiteConfig::default()
        };
        config.caching.immutable_max_age_days = 24_855;
        assert!(validate_config(&config).is_ok());

        config.caching.immutable_max_age_days = 300_000_000_000_000;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::new(
                "caching.immutable_max_age_days",
                "must be at most 24855"
            )]
        );
    }

    #[test]
    fn test_store_references() {
        let config = SiteConfig {
            stores: vec![
                StoreConfig {
                    name: "artifacts".into(),
                    bucket: "a".into(),
                    region: None,
                },
                StoreConfig {
                    name: "artifacts".into(),
                    bucket: "b".into(),
                    region: None,
                },
            ],
            routes: vec![route(
                "/",
                RouteTargetConfig::ObjectStorage {
                    s3_folder: Some(FolderConfig {
                        store: "missing".into(),
                        artifact: "web".into(),
                        version: "1".into(),
                    }),
                    s3_location: None,
                    immutable: false,
                    trailing_slash: false,
                    cache_policy_id: None,
                    response_headers_policy_id: None,
                },
            )],
            ..SiteConfig::default()
        };

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].to_string(), "stores[1].name: duplicate store 'artifacts'");
        assert_eq!(errors[1].field, "routes[0].s3_folder.store");
    }

    #[test]
    fn test_arn_and_handlers_conflict() {
        let mut entry = route("/", custom("app.example.com"));
        entry.viewer_request_function_arn = Some("arn:aws:cloudfront::1:function/x".into());
        entry.handlers = vec![crate::pipeline::HandlerRef::path_to("/x")];
        let config = SiteConfig {
            routes: vec![entry],
            ..SiteConfig::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "routes[0].handlers");
    }
}
