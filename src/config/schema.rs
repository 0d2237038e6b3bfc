//! Configuration schema definitions.
//!
//! This module defines the site configuration file. All types derive Serde
//! traits for deserialization from TOML.

use serde::{Deserialize, Serialize};

use crate::pipeline::HandlerRef;

/// Root configuration for one site.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Site name; prefixes every generated function name.
    pub name: String,

    /// Domain names served by the distribution.
    pub aliases: Vec<String>,

    /// Optionally gates every route with HTTP basic auth.
    pub basic_auth: Option<BasicAuthConfig>,

    /// Cache freshness settings.
    pub caching: CachingConfig,

    /// Managed artifact stores routes may reference.
    pub stores: Vec<StoreConfig>,

    /// Routes in precedence order; the last one must use `/`.
    pub routes: Vec<RouteConfig>,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "site".to_string(),
            aliases: Vec::new(),
            basic_auth: None,
            caching: CachingConfig::default(),
            stores: Vec::new(),
            routes: Vec::new(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicAuthConfig {
    pub username: String,
    pub password: String,
}

/// Cache freshness settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CachingConfig {
    /// TTL of the fixed-TTL policy used by storage and single-asset routes.
    pub object_ttl_secs: u64,

    /// How long immutable storage content is considered fresh.
    pub immutable_max_age_days: u64,
}

impl Default for CachingConfig {
    fn default() -> Self {
        Self {
            object_ttl_secs: 60,
            immutable_max_age_days: 30,
        }
    }
}

/// A managed artifact store.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    pub name: String,
    pub bucket: String,
    #[serde(default)]
    pub region: Option<String>,
}

/// A folder inside a managed artifact store: `<artifact>/<version>`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FolderConfig {
    pub store: String,
    pub artifact: String,
    pub version: String,
}

/// Legacy bucket location.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocationConfig {
    pub bucket: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub region: Option<String>,
}

/// One route entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Glob pattern, e.g. `/api/*`.
    pub path_pattern: String,

    #[serde(flatten)]
    pub target: RouteTargetConfig,

    /// Existing viewer-request function to attach instead of a generated one.
    #[serde(default)]
    pub viewer_request_function_arn: Option<String>,

    /// Viewer-request handlers compiled for this route.
    #[serde(default)]
    pub handlers: Vec<HandlerRef>,

    /// Viewer-response handlers compiled for this route.
    #[serde(default)]
    pub response_handlers: Vec<HandlerRef>,
}

/// Kind-specific route settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteTargetConfig {
    Custom {
        origin_domain: String,
        #[serde(default)]
        cache_policy_id: Option<String>,
    },
    Function {
        function_name: String,
        function_url: String,
        #[serde(default = "default_true")]
        use_origin_access_control: bool,
    },
    ObjectStorage {
        /// Folder inside a managed artifact store.
        #[serde(default)]
        s3_folder: Option<FolderConfig>,
        /// Legacy bucket location.
        #[serde(default)]
        s3_location: Option<LocationConfig>,
        #[serde(default)]
        immutable: bool,
        #[serde(default)]
        trailing_slash: bool,
        #[serde(default)]
        cache_policy_id: Option<String>,
        #[serde(default)]
        response_headers_policy_id: Option<String>,
    },
    SingleAsset {
        content: String,
        #[serde(default = "default_content_type")]
        content_type: String,
    },
}

fn default_true() -> bool {
    true
}

fn default_content_type() -> String {
    "text/plain".to_string()
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when `RUST_LOG` is not set.
    pub log_level: String,

    /// Emit logs as JSON.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let config: SiteConfig = toml::from_str(
            r#"
            name = "docs"

            [[routes]]
            kind = "custom"
            path_pattern = "/"
            origin_domain = "app.example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.caching.object_ttl_secs, 60);
        assert_eq!(config.observability.log_level, "info");
        assert!(matches!(
            config.routes[0].target,
            RouteTargetConfig::Custom { .. }
        ));
    }

    #[test]
    fn test_route_kinds() {
        let config: SiteConfig = toml::from_str(
            r#"
            [[routes]]
            kind = "function"
            path_pattern = "/api/*"
            function_name = "api"
            function_url = "https://abc.lambda-url.eu-central-1.on.aws/"

            [[routes]]
            kind = "single_asset"
            path_pattern = "/robots.txt"
            content = "User-agent: *"

            [[routes]]
            kind = "object_storage"
            path_pattern = "/"
            trailing_slash = true
            s3_folder = { store = "artifacts", artifact = "web", version = "42" }
            handlers = [{ name = "rewrite-path-element", parameters = { index = 1, replacement = "0" } }]
            "#,
        )
        .unwrap();

        match &config.routes[0].target {
            RouteTargetConfig::Function {
                use_origin_access_control,
                ..
            } => assert!(use_origin_access_control),
            other => panic!("unexpected target {other:?}"),
        }
        match &config.routes[1].target {
            RouteTargetConfig::SingleAsset { content_type, .. } => {
                assert_eq!(content_type, "text/plain")
            }
            other => panic!("unexpected target {other:?}"),
        }
        assert_eq!(config.routes[2].handlers[0].parameters["index"], 1);
    }
}
