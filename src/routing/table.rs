//! The compiled dispatch table.
//!
//! # Responsibilities
//! - Hold behaviors in precedence order plus the default behavior
//! - Carry everything the provisioning collaborator must create
//! - Answer "which behavior serves this path" the way the edge would
//!
//! # Design Decisions
//! - Immutable after compilation
//! - Compiled pipelines are shared via `Arc` and not serialized; the
//!   deployable form is the `CodeArtifact` in `functions`

use std::sync::Arc;

use serde::Serialize;

use crate::pipeline::{CodeArtifact, Pipeline};
use crate::rewrite::{EdgeRequest, EdgeResponse, EventType, Message};
use crate::routing::matcher::PathPattern;
use crate::routing::policy::{
    CachePolicy, Method, OriginRequestPolicy, ResponseHeadersPolicy, ResponseHeadersPolicyDef,
    ViewerProtocolPolicy,
};
use crate::routing::route::RouteKind;
use crate::storage::{BucketRef, ReadGrant};

/// Reference from a behavior to an edge function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FunctionRef {
    /// Compiled from handlers; listed in `DispatchTable::functions`.
    Compiled { name: String },
    External { arn: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionAssociation {
    pub event_type: EventType,
    pub function: FunctionRef,
}

/// Cache behavior for one route.
#[derive(Debug, Clone, Serialize)]
pub struct Behavior {
    pub path_pattern: PathPattern,
    pub kind: RouteKind,
    pub target_origin_id: String,
    pub allowed_methods: Vec<Method>,
    pub cached_methods: Vec<Method>,
    pub cache_policy: CachePolicy,
    pub origin_request_policy: OriginRequestPolicy,
    pub response_headers_policy: ResponseHeadersPolicy,
    pub compress: bool,
    pub viewer_protocol_policy: ViewerProtocolPolicy,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub function_associations: Vec<FunctionAssociation>,
    #[serde(skip)]
    pub request_pipeline: Option<Arc<Pipeline>>,
    #[serde(skip)]
    pub response_pipeline: Option<Arc<Pipeline>>,
}

impl Behavior {
    pub fn function_for(&self, event_type: EventType) -> Option<&FunctionRef> {
        self.function_associations
            .iter()
            .find(|association| association.event_type == event_type)
            .map(|association| &association.function)
    }
}

/// Access control the edge uses when signing origin requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginAccessControl {
    ObjectStorage,
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OriginTarget {
    Custom {
        domain_name: String,
    },
    Function {
        domain_name: String,
        function_name: String,
    },
    Storage {
        bucket: BucketRef,
        domain_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        origin_path: Option<String>,
    },
    /// The site's own bucket holding single assets.
    SingleAssetStore,
}

/// Where a behavior sends cache misses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Origin {
    pub id: String,
    #[serde(flatten)]
    pub target: OriginTarget,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_control: Option<OriginAccessControl>,
    /// Custom and function origins are only reached over TLS 1.2+.
    pub https_only: bool,
}

/// Permission for the distribution to invoke a function URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvokeGrant {
    pub path_pattern: String,
    pub function_name: String,
}

/// Inline content the provisioning collaborator uploads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SingleAsset {
    pub path: String,
    pub content: String,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomErrorResponse {
    pub error_code: u16,
    pub response_code: u16,
    pub response_page_path: String,
}

impl CustomErrorResponse {
    pub fn not_found_page() -> Self {
        Self {
            error_code: 404,
            response_code: 404,
            response_page_path: "/404.html".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchTable {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    pub ordered_behaviors: Vec<Behavior>,
    pub default_behavior: Behavior,
    pub origins: Vec<Origin>,
    pub functions: Vec<CodeArtifact>,
    pub read_grants: Vec<ReadGrant>,
    pub invoke_grants: Vec<InvokeGrant>,
    pub single_assets: Vec<SingleAsset>,
    pub response_headers_policies: Vec<ResponseHeadersPolicyDef>,
    pub custom_error_responses: Vec<CustomErrorResponse>,
}

impl DispatchTable {
    /// Behavior the edge selects for `path`: first match wins, else the default.
    pub fn resolve(&self, path: &str) -> &Behavior {
        self.ordered_behaviors
            .iter()
            .find(|behavior| behavior.path_pattern.matches(path))
            .unwrap_or(&self.default_behavior)
    }

    /// All behaviors, default last.
    pub fn behaviors(&self) -> impl Iterator<Item = &Behavior> {
        self.ordered_behaviors
            .iter()
            .chain(std::iter::once(&self.default_behavior))
    }

    pub fn origin(&self, id: &str) -> Option<&Origin> {
        self.origins.iter().find(|origin| origin.id == id)
    }

    pub fn function(&self, name: &str) -> Option<&CodeArtifact> {
        self.functions.iter().find(|function| function.name == name)
    }

    /// Run the viewer-request pipeline the edge would run for `request`.
    ///
    /// Returns the request forwarded to the origin, or the response a handler
    /// answered with.
    pub fn simulate(&self, request: EdgeRequest) -> Message {
        let behavior = self.resolve(&request.uri);
        match &behavior.request_pipeline {
            Some(pipeline) => pipeline.run(Message::Request(request)),
            None => Message::Request(request),
        }
    }

    /// Run the viewer-response pipeline of the behavior serving `path`.
    pub fn simulate_response(&self, path: &str, response: EdgeResponse) -> Message {
        let behavior = self.resolve(path);
        match &behavior.response_pipeline {
            Some(pipeline) => pipeline.run(Message::Response(response)),
            None => Message::Response(response),
        }
    }
}
