//! Path pattern matching.
//!
//! # Responsibilities
//! - Normalize declared patterns (leading `/` is implied)
//! - Match request paths against edge glob patterns
//!
//! # Design Decisions
//! - `*` matches any run of characters, including `/`
//! - `?` matches exactly one character
//! - Matching is case-sensitive and anchored to the whole path
//! - No regex: a linear scan with single-star backtracking

use std::fmt;

use serde::{Serialize, Serializer};

/// Pattern of the catch-all route.
pub const DEFAULT_PATTERN: &str = "/";

/// A compiled edge path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    normalized: Vec<char>,
}

impl PathPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        let raw = pattern.into();
        let normalized = if raw.starts_with('/') {
            raw.chars().collect()
        } else {
            std::iter::once('/').chain(raw.chars()).collect()
        };
        Self { raw, normalized }
    }

    /// The pattern as declared.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_default(&self) -> bool {
        self.raw == DEFAULT_PATTERN
    }

    pub fn has_wildcard(&self) -> bool {
        self.raw.contains(['*', '?'])
    }

    pub fn matches(&self, path: &str) -> bool {
        let pattern = &self.normalized;
        let path: Vec<char> = path.chars().collect();

        let (mut p, mut s) = (0usize, 0usize);
        let mut star: Option<usize> = None;
        let mut resume = 0usize;

        while s < path.len() {
            if p < pattern.len() && (pattern[p] == '?' || pattern[p] == path[s]) {
                p += 1;
                s += 1;
            } else if p < pattern.len() && pattern[p] == '*' {
                star = Some(p);
                resume = s;
                p += 1;
            } else if let Some(star_at) = star {
                p = star_at + 1;
                resume += 1;
                s = resume;
            } else {
                return false;
            }
        }

        pattern[p..].iter().all(|&c| c == '*')
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for PathPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}
