//! Bucket policy documents.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Principal the edge service signs origin requests as.
pub const EDGE_SERVICE_PRINCIPAL: &str = "cloudfront.amazonaws.com";

pub const POLICY_VERSION: &str = "2012-10-17";

/// Misuse of the register / finalize protocol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("Store '{store}' has already been finalized")]
    AlreadyFinalized { store: String },

    #[error("Cannot register statements on store '{store}': policy already finalized")]
    RegisterAfterFinalize { store: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    #[serde(rename = "Service")]
    pub service: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCondition {
    #[serde(rename = "AWS:SourceArn")]
    pub source_arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "StringEquals")]
    pub string_equals: SourceCondition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub effect: String,
    pub principal: Principal,
    pub action: Vec<String>,
    pub resource: Vec<String>,
    pub condition: Condition,
}

impl PolicyStatement {
    /// Allow one distribution to list the bucket and read keys matching `key_pattern`.
    pub fn read_access(bucket_arn: &str, key_pattern: &str, distribution_arn: &str) -> Self {
        Self {
            effect: "Allow".to_string(),
            principal: Principal {
                service: EDGE_SERVICE_PRINCIPAL.to_string(),
            },
            action: vec!["s3:ListBucket".to_string(), "s3:GetObject".to_string()],
            resource: vec![bucket_arn.to_string(), format!("{bucket_arn}/{key_pattern}")],
            condition: Condition {
                string_equals: SourceCondition {
                    source_arn: distribution_arn.to_string(),
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BucketPolicy {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

impl BucketPolicy {
    pub fn new(statement: Vec<PolicyStatement>) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_access_document_shape() {
        let statement = PolicyStatement::read_access(
            "arn:aws:s3:::artifacts",
            "frontend/v1/*",
            "arn:aws:cloudfront::123:distribution/E1",
        );
        let json = serde_json::to_value(BucketPolicy::new(vec![statement])).unwrap();

        assert_eq!(json["Version"], "2012-10-17");
        let first = &json["Statement"][0];
        assert_eq!(first["Principal"]["Service"], "cloudfront.amazonaws.com");
        assert_eq!(first["Resource"][1], "arn:aws:s3:::artifacts/frontend/v1/*");
        assert_eq!(
            first["Condition"]["StringEquals"]["AWS:SourceArn"],
            "arn:aws:cloudfront::123:distribution/E1"
        );
    }
}
