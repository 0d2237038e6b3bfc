//! Dry-run backend: writes what would be provisioned to a directory.
//!
//! Layout:
//! ```text
//! <out>/dispatch.json
//! <out>/functions/<name>.js
//! <out>/policies/<store>.json
//! <out>/policies/direct-grants.json   (only when legacy buckets are used)
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::pipeline::CodeArtifact;
use crate::provision::{
    deploy, DeploymentOutcome, DistributionId, EdgeCompute, FunctionReference, ProvisionError,
    Provisioner,
};
use crate::routing::DispatchTable;
use crate::storage::ArtifactStore;

/// Distribution ARN used when none is supplied.
pub const DRY_RUN_DISTRIBUTION_ARN: &str = "arn:aws:cloudfront::000000000000:distribution/DRYRUN";

#[derive(Debug, Clone)]
pub struct DryRun {
    out_dir: PathBuf,
    distribution_arn: String,
}

#[derive(Serialize)]
struct DispatchDocument<'a> {
    distribution: &'a DistributionId,
    functions: &'a [FunctionReference],
    table: &'a DispatchTable,
}

impl DryRun {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            distribution_arn: DRY_RUN_DISTRIBUTION_ARN.to_string(),
        }
    }

    pub fn with_distribution_arn(mut self, arn: impl Into<String>) -> Self {
        self.distribution_arn = arn.into();
        self
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    fn distribution(&self) -> DistributionId {
        let id = self
            .distribution_arn
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        DistributionId {
            id,
            arn: self.distribution_arn.clone(),
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, relative: &str, value: &T) -> Result<(), ProvisionError> {
        let path = self.out_dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut json = serde_json::to_string_pretty(value)?;
        json.push('\n');
        fs::write(&path, json)?;
        debug!(path = %path.display(), "Wrote");
        Ok(())
    }

    /// Run the full deployment flow against this directory.
    pub fn deploy(
        &self,
        table: &DispatchTable,
        stores: &mut [ArtifactStore],
    ) -> Result<DeploymentOutcome, ProvisionError> {
        let outcome = deploy(table, stores, self, self)?;
        for (store, policy) in &outcome.bucket_policies {
            self.write_json(&format!("policies/{store}.json"), policy)?;
        }
        if !outcome.direct_grants.is_empty() {
            self.write_json("policies/direct-grants.json", &outcome.direct_grants)?;
        }
        Ok(outcome)
    }
}

impl EdgeCompute for DryRun {
    fn publish(&self, artifact: &CodeArtifact) -> Result<FunctionReference, ProvisionError> {
        let dir = self.out_dir.join("functions");
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.js", artifact.name));
        fs::write(&path, &artifact.code)?;
        debug!(function = %artifact.name, digest = %artifact.digest, "Published");

        Ok(FunctionReference {
            name: artifact.name.clone(),
            arn: format!("arn:aws:cloudfront::000000000000:function/{}", artifact.name),
            event_type: artifact.event_type,
        })
    }
}

impl Provisioner for DryRun {
    fn provision(
        &self,
        table: &DispatchTable,
        functions: &[FunctionReference],
    ) -> Result<DistributionId, ProvisionError> {
        let distribution = self.distribution();
        self.write_json(
            "dispatch.json",
            &DispatchDocument {
                distribution: &distribution,
                functions,
                table,
            },
        )?;
        Ok(distribution)
    }
}
