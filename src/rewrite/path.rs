//! Path substitution handlers.
//!
//! All three rewrites are internal: they change the URI forwarded to the
//! origin and never answer the viewer directly. Inputs that do not match are
//! passed through untouched.

use regex::Regex;

use crate::error::{CompileResult, ConfigurationError};
use crate::rewrite::handler::{on_request, EventType, Handler, PathRewrite};
use crate::rewrite::message::{Message, Outcome};
use crate::rewrite::pattern::EdgeRegex;

/// Replace the path element at `index` (0-based, counted after the leading slash).
///
/// Returns `None` when the path has no such element.
pub fn replace_path_element(uri: &str, index: usize, replacement: &str) -> Option<String> {
    let mut elements: Vec<&str> = uri.split('/').collect();
    let slot = index.checked_add(1)?;
    if slot >= elements.len() {
        return None;
    }
    elements[slot] = replacement;
    Some(elements.join("/"))
}

/// Replaces a single path element with a fixed string.
#[derive(Debug, Clone)]
pub struct PathElement {
    index: usize,
    replacement: String,
}

impl PathElement {
    pub const NAME: &'static str = "rewrite-path-element";

    pub fn new(index: usize, replacement: impl Into<String>) -> Self {
        Self {
            index,
            replacement: replacement.into(),
        }
    }
}

impl Handler for PathElement {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn event_type(&self) -> EventType {
        EventType::ViewerRequest
    }

    fn handle(&self, input: Message) -> Outcome {
        on_request(input, |request| {
            match replace_path_element(&request.uri, self.index, &self.replacement) {
                Some(uri) => PathRewrite::Rewrite(uri),
                None => PathRewrite::Unchanged,
            }
            .apply(request)
        })
    }
}

/// Replaces the span of every capture group with a fixed string.
#[derive(Debug, Clone)]
pub struct PathRegex {
    edge: EdgeRegex,
    pattern: Regex,
    replacements: Vec<String>,
}

impl PathRegex {
    pub const NAME: &'static str = "rewrite-path-regex";

    /// Compile the pattern and check it has exactly one group per replacement.
    ///
    /// Only syntax the edge runtime reads the same way is accepted.
    pub fn new(pattern: &str, replacements: Vec<String>) -> CompileResult<Self> {
        let invalid = |reason: String| ConfigurationError::InvalidParameter {
            handler: Self::NAME.to_string(),
            parameter: "pattern".to_string(),
            reason,
        };
        let edge = EdgeRegex::parse(pattern).map_err(invalid)?;
        let regex = edge.compile_local().map_err(|e| invalid(e.to_string()))?;

        let groups = edge.groups().len();
        if groups != replacements.len() {
            return Err(ConfigurationError::ReplacementCountMismatch {
                pattern: pattern.to_string(),
                groups,
                replacements: replacements.len(),
            });
        }

        Ok(Self {
            edge,
            pattern: regex,
            replacements,
        })
    }

    pub fn edge(&self) -> &EdgeRegex {
        &self.edge
    }

    pub fn replacements(&self) -> &[String] {
        &self.replacements
    }

    /// Rebuild `uri` with each group's span replaced.
    ///
    /// Groups that did not participate in the match, or that start inside
    /// text already consumed by an earlier group, contribute nothing.
    pub fn rewrite(&self, uri: &str) -> Option<String> {
        let captures = self.pattern.captures(uri)?;

        let mut result = String::with_capacity(uri.len());
        let mut cursor = 0;
        for (i, replacement) in self.replacements.iter().enumerate() {
            let Some(group) = captures.get(i + 1) else {
                continue;
            };
            if group.start() < cursor {
                continue;
            }
            result.push_str(&uri[cursor..group.start()]);
            result.push_str(replacement);
            cursor = group.end();
        }
        result.push_str(&uri[cursor..]);

        Some(result)
    }
}

impl Handler for PathRegex {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn event_type(&self) -> EventType {
        EventType::ViewerRequest
    }

    fn handle(&self, input: Message) -> Outcome {
        on_request(input, |request| {
            match self.rewrite(&request.uri) {
                Some(uri) => PathRewrite::Rewrite(uri),
                None => PathRewrite::Unchanged,
            }
            .apply(request)
        })
    }
}

/// Unconditionally rewrites the URI to a fixed path.
#[derive(Debug, Clone)]
pub struct PathTo {
    path: String,
}

impl PathTo {
    pub const NAME: &'static str = "rewrite-path-to";

    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Handler for PathTo {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn event_type(&self) -> EventType {
        EventType::ViewerRequest
    }

    fn handle(&self, input: Message) -> Outcome {
        on_request(input, |request| {
            PathRewrite::Rewrite(self.path.clone()).apply(request)
        })
    }
}
