//! Publish, provision and finalize against collaborator doubles.

mod common;

use common::{
    artifact_store, legacy_storage, sample_routes, FixedProvisioner, RecordingEdge,
    RejectingProvisioner, DISTRIBUTION_ARN,
};
use edge_dispatch::provision::{deploy, DryRun, ProvisionError};
use edge_dispatch::routing::{compile, Route};
use edge_dispatch::storage::{ArtifactStore, BucketRef, PolicyError, ReadAccessRequest};

#[test]
fn test_deploy_publishes_then_finalizes() {
    let mut stores = vec![artifact_store()];
    let table = compile(&sample_routes(&stores[0])).unwrap();
    let edge = RecordingEdge::default();
    let provisioner = FixedProvisioner::default();

    let outcome = deploy(&table, &mut stores, &edge, &provisioner).unwrap();

    assert_eq!(
        *edge.published.borrow(),
        vec!["site-route-_docs_".to_string(), "site-route-_".to_string()]
    );
    assert_eq!(*provisioner.calls.borrow(), 1);
    assert_eq!(*provisioner.seen_functions.borrow(), *edge.published.borrow());
    assert_eq!(outcome.distribution.arn, DISTRIBUTION_ARN);
    assert_eq!(outcome.functions.len(), 2);

    let policy = &outcome.bucket_policies["artifacts"];
    assert_eq!(policy.version, "2012-10-17");
    assert_eq!(policy.statement.len(), 2);
    assert_eq!(
        policy.statement[0].resource,
        vec![
            "arn:aws:s3:::acme-artifacts".to_string(),
            "arn:aws:s3:::acme-artifacts/docs/3.1.0/*".to_string()
        ]
    );
    assert_eq!(
        policy.statement[1].condition.string_equals.source_arn,
        DISTRIBUTION_ARN
    );
    assert!(outcome.direct_grants.is_empty());
    assert_eq!(outcome.handles.len(), 2);
    assert!(stores[0].is_finalized());
}

#[test]
fn test_every_store_finalized_exactly_once() {
    let used = artifact_store();
    let table = compile(&sample_routes(&used)).unwrap();
    let mut stores = vec![
        used,
        ArtifactStore::new("unused", BucketRef::new("acme-unused")),
    ];

    let outcome = deploy(
        &table,
        &mut stores,
        &RecordingEdge::default(),
        &FixedProvisioner::default(),
    )
    .unwrap();

    assert!(stores.iter().all(ArtifactStore::is_finalized));
    assert!(!outcome.bucket_policies.contains_key("unused"));

    // a second deployment against the same stores is a protocol error
    let err = deploy(
        &table,
        &mut stores,
        &RecordingEdge::default(),
        &FixedProvisioner::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ProvisionError::Policy(PolicyError::RegisterAfterFinalize { .. })
    ));
    assert_eq!(
        stores[0].register(ReadAccessRequest::new("late/*")),
        Err(PolicyError::RegisterAfterFinalize {
            store: "artifacts".into()
        })
    );
}

#[test]
fn test_legacy_bucket_grants_are_direct() {
    let table = compile(&[
        Route::object_storage("/old/*", legacy_storage("archive")),
        Route::custom("/", "app.example.com"),
    ])
    .unwrap();
    let mut stores: Vec<ArtifactStore> = Vec::new();

    let outcome = deploy(
        &table,
        &mut stores,
        &RecordingEdge::default(),
        &FixedProvisioner::default(),
    )
    .unwrap();

    assert!(outcome.bucket_policies.is_empty());
    assert_eq!(outcome.direct_grants.len(), 1);
    assert_eq!(
        outcome.direct_grants[0].resource[1],
        "arn:aws:s3:::legacy-www/archive/*"
    );
    assert!(outcome.handles.is_empty());
}

#[test]
fn test_unknown_store_fails_before_publishing() {
    let table = compile(&sample_routes(&artifact_store())).unwrap();
    let edge = RecordingEdge::default();
    let provisioner = FixedProvisioner::default();
    let mut stores = vec![ArtifactStore::new("other", BucketRef::new("acme-other"))];

    let err = deploy(&table, &mut stores, &edge, &provisioner).unwrap_err();
    match err {
        ProvisionError::UnknownStore {
            store,
            path_pattern,
        } => {
            assert_eq!(store, "artifacts");
            assert_eq!(path_pattern, "/docs/*");
        }
        other => panic!("unexpected error {other}"),
    }
    assert!(edge.published.borrow().is_empty());
    assert_eq!(*provisioner.calls.borrow(), 0);
    assert!(!stores[0].is_finalized());
}

#[test]
fn test_rejected_provisioning_leaves_stores_open() {
    let mut stores = vec![artifact_store()];
    let table = compile(&sample_routes(&stores[0])).unwrap();

    let err = deploy(
        &table,
        &mut stores,
        &RecordingEdge::default(),
        &RejectingProvisioner,
    )
    .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Collaborator rejected the request: quota exceeded"
    );
    assert!(!stores[0].is_finalized());
    assert!(stores[0].pending().is_empty());
}

#[test]
fn test_dry_run_writes_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let mut stores = vec![artifact_store()];
    let table = compile(&[
        Route::object_storage("/old/*", legacy_storage("archive")),
        Route::object_storage(
            "/",
            edge_dispatch::routing::StorageRoute::new(stores[0].get_artifact("web", "1")),
        ),
    ])
    .unwrap();

    let dry_run = DryRun::new(dir.path()).with_distribution_arn(DISTRIBUTION_ARN);
    let outcome = dry_run.deploy(&table, &mut stores).unwrap();
    assert_eq!(outcome.distribution.id, "E2TEST");

    let out = dry_run.out_dir();
    let code = std::fs::read_to_string(out.join("functions/site-route-_.js")).unwrap();
    assert!(code.contains("function handler(event)"));
    assert!(out.join("functions/site-route-_old_.js").exists());

    let dispatch: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("dispatch.json")).unwrap()).unwrap();
    assert_eq!(dispatch["distribution"]["arn"], DISTRIBUTION_ARN);
    assert_eq!(dispatch["table"]["default_behavior"]["path_pattern"], "/");
    assert_eq!(dispatch["table"]["read_grants"][0]["mode"], "direct");
    // generated code is published separately, not embedded in the table
    assert!(dispatch["table"]["functions"][0].get("code").is_none());

    let policy: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(out.join("policies/artifacts.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(policy["Version"], "2012-10-17");
    assert_eq!(
        policy["Statement"][0]["Principal"]["Service"],
        "cloudfront.amazonaws.com"
    );
    assert_eq!(
        policy["Statement"][0]["Condition"]["StringEquals"]["AWS:SourceArn"],
        DISTRIBUTION_ARN
    );

    let direct: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(out.join("policies/direct-grants.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(direct.as_array().map(Vec::len), Some(1));
}
