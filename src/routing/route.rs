//! Route declarations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pipeline::HandlerRef;
use crate::storage::StorageLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    Custom,
    Function,
    ObjectStorage,
    SingleAsset,
}

impl RouteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteKind::Custom => "custom",
            RouteKind::Function => "function",
            RouteKind::ObjectStorage => "object_storage",
            RouteKind::SingleAsset => "single_asset",
        }
    }
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit viewer-request function for a route.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineBinding {
    /// A function deployed outside this site, referenced by ARN.
    External(String),
    /// Handlers compiled into a function for this route.
    Inline(Vec<HandlerRef>),
}

/// Object storage payload.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageRoute {
    pub location: StorageLocation,
    /// Content never changes once published.
    pub immutable: bool,
    /// Pages live at `<name>/index.html` instead of `<name>.html`.
    pub trailing_slash: bool,
    pub cache_policy_id: Option<String>,
    pub response_headers_policy_id: Option<String>,
}

impl StorageRoute {
    pub fn new(location: StorageLocation) -> Self {
        Self {
            location,
            immutable: false,
            trailing_slash: false,
            cache_policy_id: None,
            response_headers_policy_id: None,
        }
    }

    pub fn immutable(mut self, immutable: bool) -> Self {
        self.immutable = immutable;
        self
    }

    pub fn trailing_slash(mut self, trailing_slash: bool) -> Self {
        self.trailing_slash = trailing_slash;
        self
    }

    pub fn cache_policy(mut self, id: impl Into<String>) -> Self {
        self.cache_policy_id = Some(id.into());
        self
    }

    pub fn response_headers_policy(mut self, id: impl Into<String>) -> Self {
        self.response_headers_policy_id = Some(id.into());
        self
    }
}

/// The backend a route dispatches to.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteTarget {
    /// Any HTTPS server reachable by domain name.
    Custom {
        origin_domain: String,
        cache_policy_id: Option<String>,
    },
    /// A function behind a function URL.
    Function {
        function_name: String,
        function_url: String,
        /// Sign origin requests; can be switched off for the first deployment.
        use_origin_access_control: bool,
    },
    ObjectStorage(StorageRoute),
    /// Inline content served from the site's asset store.
    SingleAsset {
        content: String,
        content_type: String,
    },
}

impl RouteTarget {
    pub fn kind(&self) -> RouteKind {
        match self {
            RouteTarget::Custom { .. } => RouteKind::Custom,
            RouteTarget::Function { .. } => RouteKind::Function,
            RouteTarget::ObjectStorage(_) => RouteKind::ObjectStorage,
            RouteTarget::SingleAsset { .. } => RouteKind::SingleAsset,
        }
    }
}

/// One entry of the ordered route list.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub path_pattern: String,
    pub target: RouteTarget,
    /// Viewer-request function; replaces the synthesized one.
    pub pipeline: Option<PipelineBinding>,
    /// Viewer-response handlers.
    pub response_handlers: Vec<HandlerRef>,
}

impl Route {
    pub fn new(path_pattern: impl Into<String>, target: RouteTarget) -> Self {
        Self {
            path_pattern: path_pattern.into(),
            target,
            pipeline: None,
            response_handlers: Vec::new(),
        }
    }

    pub fn custom(path_pattern: impl Into<String>, origin_domain: impl Into<String>) -> Self {
        Self::new(
            path_pattern,
            RouteTarget::Custom {
                origin_domain: origin_domain.into(),
                cache_policy_id: None,
            },
        )
    }

    pub fn function(
        path_pattern: impl Into<String>,
        function_name: impl Into<String>,
        function_url: impl Into<String>,
    ) -> Self {
        Self::new(
            path_pattern,
            RouteTarget::Function {
                function_name: function_name.into(),
                function_url: function_url.into(),
                use_origin_access_control: true,
            },
        )
    }

    pub fn object_storage(path_pattern: impl Into<String>, storage: StorageRoute) -> Self {
        Self::new(path_pattern, RouteTarget::ObjectStorage(storage))
    }

    pub fn single_asset(
        path_pattern: impl Into<String>,
        content: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self::new(
            path_pattern,
            RouteTarget::SingleAsset {
                content: content.into(),
                content_type: content_type.into(),
            },
        )
    }

    pub fn kind(&self) -> RouteKind {
        self.target.kind()
    }

    pub fn with_function_arn(mut self, arn: impl Into<String>) -> Self {
        self.pipeline = Some(PipelineBinding::External(arn.into()));
        self
    }

    pub fn with_handlers(mut self, handlers: Vec<HandlerRef>) -> Self {
        self.pipeline = Some(PipelineBinding::Inline(handlers));
        self
    }

    pub fn with_response_handlers(mut self, handlers: Vec<HandlerRef>) -> Self {
        self.response_handlers = handlers;
        self
    }
}
