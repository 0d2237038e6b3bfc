//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;

use edge_dispatch::pipeline::{build, CodeArtifact, CompiledFunction, HandlerRef};
use edge_dispatch::provision::{
    DistributionId, EdgeCompute, FunctionReference, ProvisionError, Provisioner,
};
use edge_dispatch::rewrite::{EdgeRequest, EventType, Message};
use edge_dispatch::routing::{DispatchTable, Route, StorageRoute};
use edge_dispatch::storage::{ArtifactStore, BucketRef, StorageLocation};

pub const DISTRIBUTION_ARN: &str = "arn:aws:cloudfront::123456789012:distribution/E2TEST";

/// Compile a request-phase chain and run it over a `GET` for `uri`.
pub fn run_request_chain(handlers: &[HandlerRef], uri: &str) -> Message {
    let compiled = compile_request_chain(handlers);
    compiled.pipeline.run(EdgeRequest::new(uri).into())
}

pub fn compile_request_chain(handlers: &[HandlerRef]) -> CompiledFunction {
    build("test-chain", EventType::ViewerRequest, handlers)
        .expect("chain compiles")
        .expect("chain is not empty")
}

pub fn artifact_store() -> ArtifactStore {
    ArtifactStore::new(
        "artifacts",
        BucketRef::new("acme-artifacts").in_region("eu-central-1"),
    )
}

pub fn legacy_storage(path: &str) -> StorageRoute {
    StorageRoute::new(StorageLocation::Bucket {
        bucket: BucketRef::new("legacy-www"),
        path: path.to_string(),
    })
}

/// A representative site: API, function, asset, docs folder and a default storage route.
pub fn sample_routes(store: &ArtifactStore) -> Vec<Route> {
    vec![
        Route::custom("/api/*", "api.example.com"),
        Route::function(
            "/render/*",
            "renderer",
            "https://abc123.lambda-url.eu-central-1.on.aws/",
        ),
        Route::single_asset("/robots.txt", "User-agent: *\nDisallow:\n", "text/plain"),
        Route::object_storage(
            "/docs/*",
            StorageRoute::new(store.get_artifact("docs", "3.1.0")).trailing_slash(true),
        ),
        Route::object_storage(
            "/",
            StorageRoute::new(store.get_artifact("web", "abcd1234")).immutable(true),
        ),
    ]
}

/// Edge-compute double that records what it was asked to publish.
#[derive(Default)]
pub struct RecordingEdge {
    pub published: RefCell<Vec<String>>,
}

impl EdgeCompute for RecordingEdge {
    fn publish(&self, artifact: &CodeArtifact) -> Result<FunctionReference, ProvisionError> {
        self.published.borrow_mut().push(artifact.name.clone());
        Ok(FunctionReference {
            name: artifact.name.clone(),
            arn: format!("arn:aws:cloudfront::123456789012:function/{}", artifact.name),
            event_type: artifact.event_type,
        })
    }
}

/// Provisioner double returning a fixed distribution.
#[derive(Default)]
pub struct FixedProvisioner {
    pub calls: RefCell<usize>,
    pub seen_functions: RefCell<Vec<String>>,
}

impl Provisioner for FixedProvisioner {
    fn provision(
        &self,
        _table: &DispatchTable,
        functions: &[FunctionReference],
    ) -> Result<DistributionId, ProvisionError> {
        *self.calls.borrow_mut() += 1;
        self.seen_functions
            .borrow_mut()
            .extend(functions.iter().map(|f| f.name.clone()));
        Ok(DistributionId {
            id: "E2TEST".to_string(),
            arn: DISTRIBUTION_ARN.to_string(),
        })
    }
}

/// Provisioner double that always fails.
pub struct RejectingProvisioner;

impl Provisioner for RejectingProvisioner {
    fn provision(
        &self,
        _table: &DispatchTable,
        _functions: &[FunctionReference],
    ) -> Result<DistributionId, ProvisionError> {
        Err(ProvisionError::Rejected {
            reason: "quota exceeded".to_string(),
        })
    }
}
