//! Managed artifact store with deferred bucket policy aggregation.
//!
//! Read grants depend on the distribution identifier, which only exists after
//! provisioning. The store therefore collects access requests first and turns
//! them into one bucket policy when `finalize` is called with that identifier.

use tracing::{debug, info};

use crate::storage::location::{BucketRef, StorageLocation};
use crate::storage::policy::{BucketPolicy, PolicyError, PolicyStatement};

/// Read access waiting for the distribution identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadAccessRequest {
    pub key_pattern: String,
}

impl ReadAccessRequest {
    pub fn new(key_pattern: impl Into<String>) -> Self {
        Self {
            key_pattern: key_pattern.into(),
        }
    }
}

/// Identifies a registered request within its store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatementHandle {
    pub store: String,
    pub index: usize,
}

#[derive(Debug)]
pub struct ArtifactStore {
    name: String,
    bucket: BucketRef,
    pending: Vec<ReadAccessRequest>,
    finalized: bool,
}

impl ArtifactStore {
    pub fn new(name: impl Into<String>, bucket: BucketRef) -> Self {
        Self {
            name: name.into(),
            bucket,
            pending: Vec::new(),
            finalized: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bucket(&self) -> &BucketRef {
        &self.bucket
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn pending(&self) -> &[ReadAccessRequest] {
        &self.pending
    }

    /// Location of one build artifact: `<name>/<version>`.
    pub fn get_artifact(&self, name: &str, version: &str) -> StorageLocation {
        StorageLocation::Artifact {
            store: self.name.clone(),
            bucket: self.bucket.clone(),
            path: format!("{name}/{version}"),
        }
    }

    pub fn register(&mut self, request: ReadAccessRequest) -> Result<StatementHandle, PolicyError> {
        if self.finalized {
            return Err(PolicyError::RegisterAfterFinalize {
                store: self.name.clone(),
            });
        }
        debug!(store = %self.name, key_pattern = %request.key_pattern, "Read access registered");
        self.pending.push(request);
        Ok(StatementHandle {
            store: self.name.clone(),
            index: self.pending.len() - 1,
        })
    }

    /// Close registration and build the policy. `None` when nothing was registered.
    pub fn finalize(&mut self, distribution_arn: &str) -> Result<Option<BucketPolicy>, PolicyError> {
        if self.finalized {
            return Err(PolicyError::AlreadyFinalized {
                store: self.name.clone(),
            });
        }
        self.finalized = true;

        if self.pending.is_empty() {
            debug!(store = %self.name, "No read access registered, skipping bucket policy");
            return Ok(None);
        }

        let bucket_arn = self.bucket.arn();
        let statements = self
            .pending
            .iter()
            .map(|request| {
                PolicyStatement::read_access(&bucket_arn, &request.key_pattern, distribution_arn)
            })
            .collect::<Vec<_>>();

        info!(
            store = %self.name,
            statements = statements.len(),
            "Bucket policy finalized"
        );
        Ok(Some(BucketPolicy::new(statements)))
    }
}
