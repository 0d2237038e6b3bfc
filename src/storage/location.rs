//! Where a storage route's content lives.

use serde::{Deserialize, Serialize};

use crate::error::{CompileResult, ConfigurationError};

/// A bucket as the dispatch table needs to see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl BucketRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: None,
        }
    }

    pub fn in_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn arn(&self) -> String {
        format!("arn:aws:s3:::{}", self.name)
    }

    /// Regional endpoint the edge uses to reach the bucket.
    pub fn domain_name(&self) -> String {
        match &self.region {
            Some(region) => format!("{}.s3.{}.amazonaws.com", self.name, region),
            None => format!("{}.s3.amazonaws.com", self.name),
        }
    }
}

/// How a read grant reaches the bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GrantMode {
    /// Aggregated into the named artifact store's bucket policy.
    Aggregated { store: String },
    /// Applied by the bucket owner; the location has no policy aggregation.
    Direct,
}

/// A folder of content in object storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageLocation {
    /// Folder inside a managed artifact store.
    Artifact {
        store: String,
        bucket: BucketRef,
        path: String,
    },
    /// Legacy bucket reference.
    Bucket { bucket: BucketRef, path: String },
}

impl StorageLocation {
    pub fn bucket(&self) -> &BucketRef {
        match self {
            StorageLocation::Artifact { bucket, .. } | StorageLocation::Bucket { bucket, .. } => {
                bucket
            }
        }
    }

    /// Key prefix without leading or trailing slash; may be empty.
    pub fn path(&self) -> &str {
        match self {
            StorageLocation::Artifact { path, .. } | StorageLocation::Bucket { path, .. } => path,
        }
    }

    pub fn grant_mode(&self) -> GrantMode {
        match self {
            StorageLocation::Artifact { store, .. } => GrantMode::Aggregated {
                store: store.clone(),
            },
            StorageLocation::Bucket { .. } => GrantMode::Direct,
        }
    }

    pub fn validate(&self) -> CompileResult<()> {
        let path = self.path();
        if path.starts_with('/') || path.ends_with('/') {
            return Err(ConfigurationError::InvalidStoragePath {
                path: path.to_string(),
            });
        }
        Ok(())
    }

    /// Object keys the edge must be able to read.
    pub fn key_pattern(&self) -> String {
        match self.path() {
            "" => "*".to_string(),
            path => format!("{path}/*"),
        }
    }

    /// Origin path prepended to every request, if any.
    pub fn origin_path(&self) -> Option<String> {
        match self.path() {
            "" => None,
            path => Some(format!("/{path}")),
        }
    }
}

/// Read access a storage route needs once the distribution exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadGrant {
    pub path_pattern: String,
    pub bucket: BucketRef,
    pub key_pattern: String,
    #[serde(flatten)]
    pub mode: GrantMode,
}

impl ReadGrant {
    pub fn for_location(path_pattern: &str, location: &StorageLocation) -> Self {
        Self {
            path_pattern: path_pattern.to_string(),
            bucket: location.bucket().clone(),
            key_pattern: location.key_pattern(),
            mode: location.grant_mode(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(path: &str) -> StorageLocation {
        StorageLocation::Artifact {
            store: "artifacts".into(),
            bucket: BucketRef::new("site-artifacts").in_region("eu-central-1"),
            path: path.into(),
        }
    }

    #[test]
    fn test_path_validation() {
        assert!(folder("frontend/abcd1234").validate().is_ok());
        assert!(folder("").validate().is_ok());
        assert_eq!(
            folder("/frontend").validate(),
            Err(ConfigurationError::InvalidStoragePath {
                path: "/frontend".into()
            })
        );
        assert!(folder("frontend/").validate().is_err());
    }

    #[test]
    fn test_key_pattern_and_origin_path() {
        assert_eq!(folder("frontend/v1").key_pattern(), "frontend/v1/*");
        assert_eq!(folder("frontend/v1").origin_path().as_deref(), Some("/frontend/v1"));
        assert_eq!(folder("").key_pattern(), "*");
        assert_eq!(folder("").origin_path(), None);
    }

    #[test]
    fn test_bucket_endpoints() {
        let bucket = BucketRef::new("assets").in_region("eu-west-1");
        assert_eq!(bucket.arn(), "arn:aws:s3:::assets");
        assert_eq!(bucket.domain_name(), "assets.s3.eu-west-1.amazonaws.com");
        assert_eq!(BucketRef::new("assets").domain_name(), "assets.s3.amazonaws.com");
    }

    #[test]
    fn test_grant_mode() {
        assert_eq!(
            folder("x").grant_mode(),
            GrantMode::Aggregated {
                store: "artifacts".into()
            }
        );
        let legacy = StorageLocation::Bucket {
            bucket: BucketRef::new("legacy"),
            path: "www".into(),
        };
        let grant = ReadGrant::for_location("/docs/*", &legacy);
        assert_eq!(grant.mode, GrantMode::Direct);
        assert_eq!(grant.key_pattern, "www/*");
    }
}
