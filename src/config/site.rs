//! Conversion from the configuration file to the route model.

use crate::config::schema::{ObservabilityConfig, RouteConfig, RouteTargetConfig, SiteConfig};
use crate::error::{CompileResult, ConfigurationError};
use crate::rewrite::auth::encode_credentials;
use crate::routing::{
    CompilerOptions, DispatchTable, PipelineBinding, Route, RouteCompiler, RouteTarget,
    StorageRoute,
};
use crate::storage::{ArtifactStore, BucketRef, StorageLocation};

/// A site ready to compile: options, routes and the stores they use.
#[derive(Debug)]
pub struct Site {
    pub options: CompilerOptions,
    pub routes: Vec<Route>,
    pub stores: Vec<ArtifactStore>,
    pub observability: ObservabilityConfig,
}

impl Site {
    pub fn from_config(config: &SiteConfig) -> CompileResult<Self> {
        let stores: Vec<ArtifactStore> = config
            .stores
            .iter()
            .map(|store| {
                let bucket = BucketRef {
                    name: store.bucket.clone(),
                    region: store.region.clone(),
                };
                ArtifactStore::new(store.name.as_str(), bucket)
            })
            .collect();

        let routes = config
            .routes
            .iter()
            .map(|route| convert_route(route, &stores))
            .collect::<CompileResult<Vec<_>>>()?;

        let options = CompilerOptions {
            site_name: config.name.clone(),
            aliases: config.aliases.clone(),
            basic_auth: config
                .basic_auth
                .as_ref()
                .map(|auth| encode_credentials(&auth.username, &auth.password)),
            object_ttl_secs: config.caching.object_ttl_secs,
            immutable_max_age_days: config.caching.immutable_max_age_days,
        };

        Ok(Self {
            options,
            routes,
            stores,
            observability: config.observability.clone(),
        })
    }

    pub fn compile(&self) -> CompileResult<DispatchTable> {
        RouteCompiler::new(self.options.clone()).compile(&self.routes)
    }
}

fn storage_location(
    route: &RouteConfig,
    stores: &[ArtifactStore],
) -> CompileResult<StorageLocation> {
    let RouteTargetConfig::ObjectStorage {
        s3_folder,
        s3_location,
        ..
    } = &route.target
    else {
        return Err(ConfigurationError::MissingStorageLocation {
            pattern: route.path_pattern.clone(),
        });
    };

    match (s3_folder, s3_location) {
        (Some(_), Some(_)) => Err(ConfigurationError::AmbiguousStorageLocation {
            pattern: route.path_pattern.clone(),
        }),
        (None, None) => Err(ConfigurationError::MissingStorageLocation {
            pattern: route.path_pattern.clone(),
        }),
        (Some(folder), None) => stores
            .iter()
            .find(|store| store.name() == folder.store)
            .map(|store| store.get_artifact(&folder.artifact, &folder.version))
            .ok_or_else(|| ConfigurationError::UnknownStore {
                store: folder.store.clone(),
            }),
        (None, Some(location)) => Ok(StorageLocation::Bucket {
            bucket: BucketRef {
                name: location.bucket.clone(),
                region: location.region.clone(),
            },
            path: location.path.clone(),
        }),
    }
}

fn convert_route(route: &RouteConfig, stores: &[ArtifactStore]) -> CompileResult<Route> {
    let target = match &route.target {
        RouteTargetConfig::Custom {
            origin_domain,
            cache_policy_id,
        } => RouteTarget::Custom {
            origin_domain: origin_domain.clone(),
            cache_policy_id: cache_policy_id.clone(),
        },
        RouteTargetConfig::Function {
            function_name,
            function_url,
            use_origin_access_control,
        } => RouteTarget::Function {
            function_name: function_name.clone(),
            function_url: function_url.clone(),
            use_origin_access_control: *use_origin_access_control,
        },
        RouteTargetConfig::ObjectStorage {
            immutable,
            trailing_slash,
            cache_policy_id,
            response_headers_policy_id,
            ..
        } => RouteTarget::ObjectStorage(StorageRoute {
            location: storage_location(route, stores)?,
            immutable: *immutable,
            trailing_slash: *trailing_slash,
            cache_policy_id: cache_policy_id.clone(),
            response_headers_policy_id: response_headers_policy_id.clone(),
        }),
        RouteTargetConfig::SingleAsset {
            content,
            content_type,
        } => RouteTarget::SingleAsset {
            content: content.clone(),
            content_type: content_type.clone(),
        },
    };

    let pipeline = match (&route.viewer_request_function_arn, route.handlers.is_empty()) {
        (Some(arn), _) => Some(PipelineBinding::External(arn.clone())),
        (None, false) => Some(PipelineBinding::Inline(route.handlers.clone())),
        (None, true) => None,
    };

    Ok(Route {
        path_pattern: route.path_pattern.clone(),
        target,
        pipeline,
        response_handlers: route.response_handlers.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{FolderConfig, LocationConfig, StoreConfig};

    fn storage_route(
        s3_folder: Option<FolderConfig>,
        s3_location: Option<LocationConfig>,
    ) -> RouteConfig {
        RouteConfig {
            path_pattern: "/".into(),
            target: RouteTargetConfig::ObjectStorage {
                s3_folder,
                s3_location,
                immutable: false,
                trailing_slash: false,
                cache_policy_id: None,
                response_headers_policy_id: None,
            },
            viewer_request_function_arn: None,
            handlers: Vec::new(),
            response_handlers: Vec::new(),
        }
    }

    fn folder() -> FolderConfig {
        FolderConfig {
            store: "artifacts".into(),
            artifact: "web".into(),
            version: "7".into(),
        }
    }

    fn location() -> LocationConfig {
        LocationConfig {
            bucket: "legacy".into(),
            path: "www".into(),
            region: None,
        }
    }

    fn config(route: RouteConfig) -> SiteConfig {
        SiteConfig {
            stores: vec![StoreConfig {
                name: "artifacts".into(),
                bucket: "acme-artifacts".into(),
                region: Some("eu-central-1".into()),
            }],
            routes: vec![route],
            ..SiteConfig::default()
        }
    }

    #[test]
    fn test_folder_resolves_through_store() {
        let site = Site::from_config(&config(storage_route(Some(folder()), None))).unwrap();
        match &site.routes[0].target {
            RouteTarget::ObjectStorage(storage) => {
                assert_eq!(storage.location.path(), "web/7");
                assert_eq!(storage.location.bucket().name, "acme-artifacts");
            }
            other => panic!("unexpected target {other:?}"),
        }
    }

    #[test]
    fn test_exactly_one_location() {
        let both = Site::from_config(&config(storage_route(Some(folder()), Some(location()))));
        assert_eq!(
            both.unwrap_err(),
            ConfigurationError::AmbiguousStorageLocation { pattern: "/".into() }
        );

        let neither = Site::from_config(&config(storage_route(None, None)));
        assert_eq!(
            neither.unwrap_err(),
            ConfigurationError::MissingStorageLocation { pattern: "/".into() }
        );

        let legacy = Site::from_config(&config(storage_route(None, Some(location())))).unwrap();
        assert!(matches!(
            &legacy.routes[0].target,
            RouteTarget::ObjectStorage(StorageRoute {
                location: StorageLocation::Bucket { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_basic_auth_is_encoded() {
        let mut site_config = config(storage_route(None, Some(location())));
        site_config.basic_auth = Some(crate::config::schema::BasicAuthConfig {
            username: "user".into(),
            password: "pass".into(),
        });
        let site = Site::from_config(&site_config).unwrap();
        assert_eq!(site.options.basic_auth.as_deref(), Some("dXNlcjpwYXNz"));
    }
}
