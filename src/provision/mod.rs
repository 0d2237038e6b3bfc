//! Provisioning collaborator surface.
//!
//! # Data Flow
//! ```text
//! DispatchTable
//!     → EdgeCompute::publish (one call per CodeArtifact)
//!     → Provisioner::provision (table + function references)
//!     → DistributionId
//!     → ArtifactStore::register (aggregated read grants)
//!     → ArtifactStore::finalize (every store, exactly once)
//!     → DeploymentOutcome
//! ```
//!
//! # Design Decisions
//! - Collaborators are traits; the crate ships only the dry-run backend
//! - Grants that name an unknown store fail before anything is published
//! - Legacy bucket grants are returned as statements for the bucket owner

pub mod dry_run;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::observability::metrics;
use crate::pipeline::CodeArtifact;
use crate::rewrite::EventType;
use crate::routing::DispatchTable;
use crate::storage::{
    ArtifactStore, BucketPolicy, GrantMode, PolicyError, PolicyStatement, ReadAccessRequest,
    StatementHandle,
};

pub use dry_run::DryRun;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("Read grant for '{path_pattern}' references unknown store '{store}'")]
    UnknownStore { store: String, path_pattern: String },

    #[error("Collaborator rejected the request: {reason}")]
    Rejected { reason: String },
}

/// Identity of the provisioned distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionId {
    pub id: String,
    pub arn: String,
}

/// A published edge function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionReference {
    pub name: String,
    pub arn: String,
    pub event_type: EventType,
}

/// Turns a dispatch table into a live distribution.
pub trait Provisioner {
    fn provision(
        &self,
        table: &DispatchTable,
        functions: &[FunctionReference],
    ) -> Result<DistributionId, ProvisionError>;
}

/// Accepts generated edge programs.
pub trait EdgeCompute {
    fn publish(&self, artifact: &CodeArtifact) -> Result<FunctionReference, ProvisionError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentOutcome {
    pub distribution: DistributionId,
    pub functions: Vec<FunctionReference>,
    /// Finalized policies keyed by store name; stores without grants are absent.
    pub bucket_policies: BTreeMap<String, BucketPolicy>,
    /// Statements the owners of legacy buckets must apply themselves.
    pub direct_grants: Vec<PolicyStatement>,
    #[serde(skip)]
    pub handles: Vec<StatementHandle>,
}

fn check_stores(table: &DispatchTable, stores: &[ArtifactStore]) -> Result<(), ProvisionError> {
    for grant in &table.read_grants {
        if let GrantMode::Aggregated { store } = &grant.mode {
            if !stores.iter().any(|s| s.name() == store) {
                return Err(ProvisionError::UnknownStore {
                    store: store.clone(),
                    path_pattern: grant.path_pattern.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Publish, provision, then apply read grants once the distribution is known.
pub fn deploy<E, P>(
    table: &DispatchTable,
    stores: &mut [ArtifactStore],
    edge: &E,
    provisioner: &P,
) -> Result<DeploymentOutcome, ProvisionError>
where
    E: EdgeCompute + ?Sized,
    P: Provisioner + ?Sized,
{
    deploy_inner(table, stores, edge, provisioner)
        .inspect_err(|_| metrics::record_compile_error("deploy"))
}

fn deploy_inner<E, P>(
    table: &DispatchTable,
    stores: &mut [ArtifactStore],
    edge: &E,
    provisioner: &P,
) -> Result<DeploymentOutcome, ProvisionError>
where
    E: EdgeCompute + ?Sized,
    P: Provisioner + ?Sized,
{
    check_stores(table, stores)?;

    let functions = table
        .functions
        .iter()
        .map(|artifact| edge.publish(artifact))
        .collect::<Result<Vec<_>, _>>()?;

    let distribution = provisioner.provision(table, &functions)?;
    info!(
        site = %table.name,
        distribution = %distribution.arn,
        functions = functions.len(),
        "Distribution provisioned"
    );

    let mut handles = Vec::new();
    let mut direct_grants = Vec::new();
    for grant in &table.read_grants {
        match &grant.mode {
            GrantMode::Aggregated { store } => {
                if let Some(store) = stores.iter_mut().find(|s| s.name() == store) {
                    handles.push(store.register(ReadAccessRequest::new(grant.key_pattern.as_str()))?);
                }
            }
            GrantMode::Direct => direct_grants.push(PolicyStatement::read_access(
                &grant.bucket.arn(),
                &grant.key_pattern,
                &distribution.arn,
            )),
        }
    }

    let mut bucket_policies = BTreeMap::new();
    for store in stores.iter_mut() {
        if let Some(policy) = store.finalize(&distribution.arn)? {
            bucket_policies.insert(store.name().to_string(), policy);
        }
    }

    Ok(DeploymentOutcome {
        distribution,
        functions,
        bucket_policies,
        direct_grants,
        handles,
    })
}
