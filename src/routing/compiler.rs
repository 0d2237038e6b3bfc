//! Route compilation.
//!
//! Turns the ordered route list into a `DispatchTable`: validates the list,
//! selects behavior policy per route kind, binds origins, attaches rewrite
//! pipelines and collects the grants the provisioning step must apply.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use crate::error::{CompileResult, ConfigurationError};
use crate::observability::metrics;
use crate::pipeline::{self, ChainBuilder, CodeArtifact, CompiledFunction, HandlerRef, Pipeline};
use crate::rewrite::{EventType, WebpageRewriteStrategy};
use crate::routing::matcher::{PathPattern, DEFAULT_PATTERN};
use crate::routing::policy::{
    CachePolicy, OriginRequestPolicy, ResponseHeadersPolicy, ResponseHeadersPolicyDef,
    ViewerProtocolPolicy, ALL_METHODS, READ_METHODS,
};
use crate::routing::route::{PipelineBinding, Route, RouteTarget};
use crate::routing::table::{
    Behavior, CustomErrorResponse, DispatchTable, FunctionAssociation, FunctionRef, InvokeGrant,
    Origin, OriginAccessControl, OriginTarget, SingleAsset,
};
use crate::storage::ReadGrant;

/// Site-wide compilation settings.
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Prefix for generated function names.
    pub site_name: String,
    pub aliases: Vec<String>,
    /// Pre-encoded basic-auth credentials gating every route.
    pub basic_auth: Option<String>,
    /// TTL of the short fixed-TTL cache policy.
    pub object_ttl_secs: u64,
    /// Freshness of immutable storage content.
    pub immutable_max_age_days: u64,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            site_name: "site".to_string(),
            aliases: Vec::new(),
            basic_auth: None,
            object_ttl_secs: 60,
            immutable_max_age_days: 30,
        }
    }
}

/// Compiles route lists. One compiler may be reused for many lists.
#[derive(Debug, Clone, Default)]
pub struct RouteCompiler {
    options: CompilerOptions,
}

/// Target origin id of a route.
pub fn origin_id(path_pattern: &str) -> String {
    format!("route-{path_pattern}")
}

/// Function-name fragment for a path pattern: runs of non-alphanumerics become `_`.
pub fn route_slug(path_pattern: &str) -> String {
    let mut slug = String::with_capacity(path_pattern.len());
    let mut in_run = false;
    for c in path_pattern.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            in_run = false;
        } else if !in_run {
            slug.push('_');
            in_run = true;
        }
    }
    slug
}

/// Functions compiled so far, in first-use order.
#[derive(Default)]
struct FunctionSet {
    artifacts: Vec<CodeArtifact>,
}

impl FunctionSet {
    fn add(&mut self, compiled: &CompiledFunction) -> CompileResult<()> {
        match self.artifacts.iter().find(|a| a.name == compiled.artifact.name) {
            Some(existing) if existing.digest == compiled.artifact.digest => Ok(()),
            Some(_) => Err(ConfigurationError::FunctionNameCollision {
                name: compiled.artifact.name.clone(),
            }),
            None => {
                self.artifacts.push(compiled.artifact.clone());
                Ok(())
            }
        }
    }
}

/// Per-compilation state.
struct Compilation<'a> {
    options: &'a CompilerOptions,
    functions: FunctionSet,
    standard: Option<Option<CompiledFunction>>,
}

impl<'a> Compilation<'a> {
    fn new(options: &'a CompilerOptions) -> Self {
        Self {
            options,
            functions: FunctionSet::default(),
            standard: None,
        }
    }

    fn route_function_name(&self, path_pattern: &str) -> String {
        format!("{}-route-{}", self.options.site_name, route_slug(path_pattern))
    }

    /// Shared chain holding only the basic-auth gate; compiled on first use.
    fn standard_chain(&mut self) -> CompileResult<Option<CompiledFunction>> {
        if let Some(standard) = &self.standard {
            return Ok(standard.clone());
        }
        let mut chain =
            ChainBuilder::viewer_request(format!("{}-std-viewer-request", self.options.site_name));
        if let Some(credentials) = &self.options.basic_auth {
            chain.handler(HandlerRef::basic_auth(credentials.as_str()))?;
        }
        let compiled = chain.compile()?;
        self.standard = Some(compiled.clone());
        Ok(compiled)
    }

    /// Viewer-request attachment for one route.
    fn request_function(
        &mut self,
        route: &Route,
    ) -> CompileResult<(Option<FunctionRef>, Option<Arc<Pipeline>>)> {
        let compiled = match (&route.pipeline, &route.target) {
            (Some(binding), _) => {
                if self.options.basic_auth.is_some() {
                    warn!(
                        path_pattern = %route.path_pattern,
                        "Route binds its own viewer-request function, basic auth is not applied"
                    );
                }
                match binding {
                    PipelineBinding::External(arn) => {
                        return Ok((Some(FunctionRef::External { arn: arn.clone() }), None));
                    }
                    PipelineBinding::Inline(handlers) => pipeline::build(
                        &self.route_function_name(&route.path_pattern),
                        EventType::ViewerRequest,
                        handlers,
                    )?,
                }
            }
            (None, RouteTarget::ObjectStorage(storage)) => {
                let mut chain =
                    ChainBuilder::viewer_request(self.route_function_name(&route.path_pattern));
                if let Some(credentials) = &self.options.basic_auth {
                    chain.handler(HandlerRef::basic_auth(credentials.as_str()))?;
                }
                chain.rewrite_webpage_path(WebpageRewriteStrategy::for_trailing_slash(
                    storage.trailing_slash,
                ))?;
                chain.compile()?
            }
            (None, _) => self.standard_chain()?,
        };
        self.attach(compiled)
    }

    fn response_function(
        &mut self,
        route: &Route,
    ) -> CompileResult<(Option<FunctionRef>, Option<Arc<Pipeline>>)> {
        let name = format!(
            "{}-viewer-response",
            self.route_function_name(&route.path_pattern)
        );
        let compiled = pipeline::build(&name, EventType::ViewerResponse, &route.response_handlers)?;
        self.attach(compiled)
    }

    fn attach(
        &mut self,
        compiled: Option<CompiledFunction>,
    ) -> CompileResult<(Option<FunctionRef>, Option<Arc<Pipeline>>)> {
        match compiled {
            Some(compiled) => {
                self.functions.add(&compiled)?;
                Ok((
                    Some(FunctionRef::Compiled {
                        name: compiled.name().to_string(),
                    }),
                    Some(compiled.pipeline),
                ))
            }
            None => Ok((None, None)),
        }
    }

    fn behavior(&mut self, route: &Route) -> CompileResult<Behavior> {
        let options = self.options;
        let fixed_ttl = CachePolicy::FixedTtl {
            ttl_secs: options.object_ttl_secs,
        };

        let (allowed, cache_policy, origin_request_policy, response_headers_policy) =
            match &route.target {
                RouteTarget::Custom {
                    cache_policy_id, ..
                } => (
                    ALL_METHODS.to_vec(),
                    cache_policy_id
                        .as_ref()
                        .map_or(CachePolicy::Disabled, |id| CachePolicy::Custom { id: id.clone() }),
                    OriginRequestPolicy::AllViewer,
                    ResponseHeadersPolicy::Default,
                ),
                RouteTarget::Function { .. } => (
                    ALL_METHODS.to_vec(),
                    CachePolicy::Disabled,
                    OriginRequestPolicy::AllViewerExceptHost,
                    ResponseHeadersPolicy::Default,
                ),
                RouteTarget::ObjectStorage(storage) => {
                    let headers = match (&storage.response_headers_policy_id, storage.immutable) {
                        (Some(id), _) => ResponseHeadersPolicy::Custom { id: id.clone() },
                        (None, true) => {
                            ResponseHeadersPolicy::immutable_for_days(options.immutable_max_age_days)
                                .ok_or_else(|| ConfigurationError::InvalidOption {
                                    option: "immutable_max_age_days".to_string(),
                                    reason: format!(
                                        "{} days overflows max-age in seconds",
                                        options.immutable_max_age_days
                                    ),
                                })?
                        }
                        (None, false) => ResponseHeadersPolicy::Default,
                    };
                    (
                        READ_METHODS.to_vec(),
                        storage
                            .cache_policy_id
                            .as_ref()
                            .map_or(fixed_ttl, |id| CachePolicy::Custom { id: id.clone() }),
                        OriginRequestPolicy::CacheKeyOnly,
                        headers,
                    )
                }
                RouteTarget::SingleAsset { .. } => (
                    READ_METHODS.to_vec(),
                    fixed_ttl,
                    OriginRequestPolicy::CacheKeyOnly,
                    ResponseHeadersPolicy::Default,
                ),
            };

        let mut function_associations = Vec::new();
        let (request_ref, request_pipeline) = self.request_function(route)?;
        if let Some(function) = request_ref {
            function_associations.push(FunctionAssociation {
                event_type: EventType::ViewerRequest,
                function,
            });
        }
        let (response_ref, response_pipeline) = self.response_function(route)?;
        if let Some(function) = response_ref {
            function_associations.push(FunctionAssociation {
                event_type: EventType::ViewerResponse,
                function,
            });
        }

        Ok(Behavior {
            path_pattern: PathPattern::new(route.path_pattern.as_str()),
            kind: route.kind(),
            target_origin_id: origin_id(&route.path_pattern),
            allowed_methods: allowed,
            cached_methods: READ_METHODS.to_vec(),
            cache_policy,
            origin_request_policy,
            response_headers_policy,
            compress: true,
            viewer_protocol_policy: ViewerProtocolPolicy::RedirectToHttps,
            function_associations,
            request_pipeline,
            response_pipeline,
        })
    }
}

fn function_host(origin: &str) -> CompileResult<String> {
    let invalid = |reason: &str| ConfigurationError::InvalidOrigin {
        origin: origin.to_string(),
        reason: reason.to_string(),
    };
    let url = Url::parse(origin).map_err(|e| invalid(&e.to_string()))?;
    url.host_str()
        .map(str::to_string)
        .ok_or_else(|| invalid("function URL has no host"))
}

fn origin_for(route: &Route) -> CompileResult<Origin> {
    let id = origin_id(&route.path_pattern);
    let origin = match &route.target {
        RouteTarget::Custom { origin_domain, .. } => {
            if origin_domain.is_empty() || origin_domain.contains(['/', ' ']) {
                return Err(ConfigurationError::InvalidOrigin {
                    origin: origin_domain.clone(),
                    reason: "expected a bare domain name".to_string(),
                });
            }
            Origin {
                id,
                target: OriginTarget::Custom {
                    domain_name: origin_domain.clone(),
                },
                access_control: None,
                https_only: true,
            }
        }
        RouteTarget::Function {
            function_name,
            function_url,
            use_origin_access_control,
        } => Origin {
            id,
            target: OriginTarget::Function {
                domain_name: function_host(function_url)?,
                function_name: function_name.clone(),
            },
            access_control: use_origin_access_control.then_some(OriginAccessControl::Function),
            https_only: true,
        },
        RouteTarget::ObjectStorage(storage) => {
            storage.location.validate()?;
            let bucket = storage.location.bucket().clone();
            Origin {
                id,
                target: OriginTarget::Storage {
                    domain_name: bucket.domain_name(),
                    bucket,
                    origin_path: storage.location.origin_path(),
                },
                access_control: Some(OriginAccessControl::ObjectStorage),
                https_only: false,
            }
        }
        RouteTarget::SingleAsset { .. } => Origin {
            id,
            target: OriginTarget::SingleAssetStore,
            access_control: Some(OriginAccessControl::ObjectStorage),
            https_only: false,
        },
    };
    Ok(origin)
}

fn validate_routes(routes: &[Route]) -> CompileResult<()> {
    let last = routes.last().ok_or(ConfigurationError::EmptyRoutes)?;
    if last.path_pattern != DEFAULT_PATTERN {
        return Err(ConfigurationError::MissingDefaultRoute {
            found: last.path_pattern.clone(),
        });
    }

    let mut seen = HashSet::new();
    for (index, route) in routes.iter().enumerate() {
        if route.path_pattern == DEFAULT_PATTERN && index + 1 != routes.len() {
            return Err(ConfigurationError::DefaultRouteNotLast { index });
        }
        if !seen.insert(route.path_pattern.as_str()) {
            return Err(ConfigurationError::DuplicatePathPattern {
                pattern: route.path_pattern.clone(),
            });
        }
        if let RouteTarget::SingleAsset { .. } = route.target {
            let pattern = PathPattern::new(route.path_pattern.as_str());
            if !route.path_pattern.starts_with('/') || pattern.has_wildcard() {
                return Err(ConfigurationError::InvalidPathPattern {
                    pattern: route.path_pattern.clone(),
                    reason: "single assets need an absolute path without wildcards".to_string(),
                });
            }
        }
    }
    Ok(())
}

impl RouteCompiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compile an ordered route list. The first error aborts compilation.
    pub fn compile(&self, routes: &[Route]) -> CompileResult<DispatchTable> {
        self.compile_inner(routes)
            .inspect_err(|_| metrics::record_compile_error("routes"))
    }

    fn compile_inner(&self, routes: &[Route]) -> CompileResult<DispatchTable> {
        validate_routes(routes)?;

        let mut compilation = Compilation::new(&self.options);
        let mut behaviors = Vec::with_capacity(routes.len());
        let mut origins = Vec::with_capacity(routes.len());
        let mut read_grants = Vec::new();
        let mut invoke_grants = Vec::new();
        let mut single_assets = Vec::new();

        for route in routes {
            origins.push(origin_for(route)?);
            let behavior = compilation.behavior(route)?;

            match &route.target {
                RouteTarget::ObjectStorage(storage) => {
                    read_grants.push(ReadGrant::for_location(&route.path_pattern, &storage.location));
                }
                RouteTarget::Function { function_name, .. } => invoke_grants.push(InvokeGrant {
                    path_pattern: route.path_pattern.clone(),
                    function_name: function_name.clone(),
                }),
                RouteTarget::SingleAsset {
                    content,
                    content_type,
                } => single_assets.push(SingleAsset {
                    path: route.path_pattern.clone(),
                    content: content.clone(),
                    content_type: content_type.clone(),
                }),
                RouteTarget::Custom { .. } => {}
            }

            debug!(
                path_pattern = %route.path_pattern,
                kind = %route.kind(),
                functions = behavior.function_associations.len(),
                "Behavior compiled"
            );
            metrics::record_route_compiled(route.kind().as_str());
            behaviors.push(behavior);
        }

        let mut response_headers_policies = Vec::new();
        for behavior in &behaviors {
            if let Some(def) = behavior.response_headers_policy.definition() {
                if !response_headers_policies
                    .iter()
                    .any(|existing: &ResponseHeadersPolicyDef| existing.id == def.id)
                {
                    response_headers_policies.push(def);
                }
            }
        }

        let default_behavior = behaviors
            .pop()
            .ok_or(ConfigurationError::EmptyRoutes)?;

        let table = DispatchTable {
            name: self.options.site_name.clone(),
            aliases: self.options.aliases.clone(),
            ordered_behaviors: behaviors,
            default_behavior,
            origins,
            functions: compilation.functions.artifacts,
            read_grants,
            invoke_grants,
            single_assets,
            response_headers_policies,
            custom_error_responses: vec![CustomErrorResponse::not_found_page()],
        };

        info!(
            site = %table.name,
            behaviors = table.ordered_behaviors.len() + 1,
            functions = table.functions.len(),
            read_grants = table.read_grants.len(),
            "Dispatch table compiled"
        );

        Ok(table)
    }
}

/// Compile with default options.
pub fn compile(routes: &[Route]) -> CompileResult<DispatchTable> {
    RouteCompiler::default().compile(routes)
}
