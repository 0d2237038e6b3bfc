//! Per-behavior caching and header policies.

use serde::{Deserialize, Serialize};

use crate::rewrite::response::SECURITY_HEADERS;

pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Largest `max-age` caches honor; larger delta-seconds are capped to it.
pub const MAX_AGE_LIMIT_SECS: u64 = 1 << 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Options,
    Put,
    Post,
    Patch,
    Delete,
}

/// Every standard verb; used by dynamic origins.
pub const ALL_METHODS: [Method; 7] = [
    Method::Get,
    Method::Head,
    Method::Options,
    Method::Put,
    Method::Post,
    Method::Patch,
    Method::Delete,
];

pub const READ_METHODS: [Method; 2] = [Method::Get, Method::Head];

/// How long the edge keeps responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CachePolicy {
    /// Every request goes to the origin.
    Disabled,
    /// Fixed freshness window; nothing from the viewer is part of the cache key.
    FixedTtl { ttl_secs: u64 },
    /// Policy managed outside this site, referenced by id.
    Custom { id: String },
}

/// Which viewer input is forwarded to the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginRequestPolicy {
    /// Headers, cookies and query strings.
    AllViewer,
    /// Everything except `Host`, so the origin sees its own host name.
    AllViewerExceptHost,
    /// Only what the cache key contains.
    CacheKeyOnly,
}

/// Response headers the edge adds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseHeadersPolicy {
    /// Security headers and `cache-control: no-cache`.
    Default,
    /// Security headers and a long-lived immutable `cache-control`.
    Immutable { max_age_secs: u64 },
    Custom { id: String },
}

impl ResponseHeadersPolicy {
    /// `None` when the age in seconds overflows.
    pub fn immutable_for_days(days: u64) -> Option<Self> {
        days.checked_mul(SECONDS_PER_DAY)
            .map(|max_age_secs| ResponseHeadersPolicy::Immutable { max_age_secs })
    }

    pub fn id(&self) -> String {
        match self {
            ResponseHeadersPolicy::Default => "default".to_string(),
            ResponseHeadersPolicy::Immutable { max_age_secs } => format!("immutable-{max_age_secs}"),
            ResponseHeadersPolicy::Custom { id } => id.clone(),
        }
    }

    /// Definition to provision; `None` for externally managed policies.
    pub fn definition(&self) -> Option<ResponseHeadersPolicyDef> {
        let (cache_control, override_origin) = match self {
            ResponseHeadersPolicy::Default => ("no-cache".to_string(), false),
            ResponseHeadersPolicy::Immutable { max_age_secs } => {
                (format!("public, max-age={max_age_secs}, immutable"), true)
            }
            ResponseHeadersPolicy::Custom { .. } => return None,
        };
        Some(ResponseHeadersPolicyDef {
            id: self.id(),
            cache_control,
            override_origin,
            security_headers: SECURITY_HEADERS
                .iter()
                .map(|(name, value)| HeaderEntry {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
}

/// A response headers policy the provisioning collaborator must create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeadersPolicyDef {
    pub id: String,
    pub cache_control: String,
    /// Whether `cache-control` replaces a value sent by the origin.
    pub override_origin: bool,
    pub security_headers: Vec<HeaderEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewerProtocolPolicy {
    RedirectToHttps,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immutable_policy() {
        let policy = ResponseHeadersPolicy::immutable_for_days(30).unwrap();
        assert_eq!(
            policy,
            ResponseHeadersPolicy::Immutable {
                max_age_secs: 2_592_000
            }
        );
        let def = policy.definition().unwrap();
        assert_eq!(def.cache_control, "public, max-age=2592000, immutable");
        assert!(def.override_origin);
        assert_eq!(def.security_headers.len(), 3);
    }

    #[test]
    fn test_immutable_age_overflow() {
        assert!(ResponseHeadersPolicy::immutable_for_days(u64::MAX / SECONDS_PER_DAY + 1).is_none());
        assert_eq!(
            ResponseHeadersPolicy::immutable_for_days(MAX_AGE_LIMIT_SECS / SECONDS_PER_DAY)
                .map(|p| p.id()),
            Some("immutable-2147472000".to_string())
        );
    }

    #[test]
    fn test_default_policy_revalidates() {
        let def = ResponseHeadersPolicy::Default.definition().unwrap();
        assert_eq!(def.id, "default");
        assert_eq!(def.cache_control, "no-cache");
        assert!(!def.override_origin);
    }

    #[test]
    fn test_custom_policy_has_no_definition() {
        let policy = ResponseHeadersPolicy::Custom { id: "abc".into() };
        assert_eq!(policy.id(), "abc");
        assert!(policy.definition().is_none());
    }

    #[test]
    fn test_method_serialization() {
        assert_eq!(serde_json::to_string(&Method::Options).unwrap(), r#""OPTIONS""#);
    }
}
