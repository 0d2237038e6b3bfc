//! Handler catalog.
//!
//! # Responsibilities
//! - Map catalog names to handler templates and parameter lists
//! - Resolve untyped `HandlerRef`s (as written in config) into typed `HandlerSpec`s
//! - Instantiate the in-memory handler for a spec
//!
//! # Design Decisions
//! - The catalog is static; adding a handler means adding an entry and a template
//! - Parameter problems surface here, at compile time, never at request time
//! - `code` overrides bypass the catalog and run as opaque pass-through in memory

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{CompileResult, ConfigurationError};
use crate::pipeline::template;
use crate::rewrite::auth::BasicAuth;
use crate::rewrite::path::{PathElement, PathRegex, PathTo};
use crate::rewrite::pattern::EdgeRegex;
use crate::rewrite::redirect::Redirect;
use crate::rewrite::response::{CacheControl, SecurityHeaders, StatusCode};
use crate::rewrite::webpage::{WebpageRewriteStrategy, WebpageToFile, WebpageToSubdir};
use crate::rewrite::{EventType, Handler, Message, Outcome};

/// Static description of a catalog handler.
#[derive(Debug)]
pub struct CatalogEntry {
    pub name: &'static str,
    /// Function identifier declared by the template.
    pub function: &'static str,
    pub event_type: EventType,
    /// Parameters a reference may (and must) supply.
    pub parameters: &'static [&'static str],
    pub template: &'static str,
}

pub static CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        name: Redirect::NAME,
        function: "redirectHandler",
        event_type: EventType::ViewerRequest,
        parameters: &["target"],
        template: include_str!("../../resources/handlers/viewer-request/redirect.js"),
    },
    CatalogEntry {
        name: WebpageToFile::NAME,
        function: "rewriteWebpageToFileHandler",
        event_type: EventType::ViewerRequest,
        parameters: &[],
        template: include_str!("../../resources/handlers/viewer-request/rewrite-webpage-to-file.js"),
    },
    CatalogEntry {
        name: WebpageToSubdir::NAME,
        function: "rewriteWebpageToSubdirHandler",
        event_type: EventType::ViewerRequest,
        parameters: &[],
        template: include_str!("../../resources/handlers/viewer-request/rewrite-webpage-to-subdir.js"),
    },
    CatalogEntry {
        name: PathElement::NAME,
        function: "rewritePathElementHandler",
        event_type: EventType::ViewerRequest,
        parameters: &["index", "replacement"],
        template: include_str!("../../resources/handlers/viewer-request/rewrite-path-element.js"),
    },
    CatalogEntry {
        name: PathRegex::NAME,
        function: "rewritePathRegexHandler",
        event_type: EventType::ViewerRequest,
        parameters: &["pattern", "replacements"],
        template: include_str!("../../resources/handlers/viewer-request/rewrite-path-regex.js"),
    },
    CatalogEntry {
        name: PathTo::NAME,
        function: "rewritePathToHandler",
        event_type: EventType::ViewerRequest,
        parameters: &["path"],
        template: include_str!("../../resources/handlers/viewer-request/rewrite-path-to.js"),
    },
    CatalogEntry {
        name: BasicAuth::NAME,
        function: "basicAuthHandler",
        event_type: EventType::ViewerRequest,
        parameters: &["credentials"],
        template: include_str!("../../resources/handlers/viewer-request/basic-auth.js"),
    },
    CatalogEntry {
        name: StatusCode::NAME,
        function: "statusCodeHandler",
        event_type: EventType::ViewerResponse,
        parameters: &["status_code"],
        template: include_str!("../../resources/handlers/viewer-response/status-code.js"),
    },
    CatalogEntry {
        name: CacheControl::NAME,
        function: "cacheControlHandler",
        event_type: EventType::ViewerResponse,
        parameters: &["immutable"],
        template: include_str!("../../resources/handlers/viewer-response/cache-control.js"),
    },
    CatalogEntry {
        name: SecurityHeaders::NAME,
        function: "securityHeadersHandler",
        event_type: EventType::ViewerResponse,
        parameters: &[],
        template: include_str!("../../resources/handlers/viewer-response/security-headers.js"),
    },
];

/// Find a catalog entry by name.
pub fn lookup(name: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|entry| entry.name == name)
}

/// A handler as declared in configuration: a catalog name plus literal
/// parameters, or a custom code override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerRef {
    pub name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, Value>,

    /// Literal handler source; bypasses the catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl HandlerRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: BTreeMap::new(),
            code: None,
        }
    }

    /// Custom handler; `name` must be the function declared by `code`.
    pub fn custom(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            ..Self::new(name)
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn redirect(target: impl Into<String>) -> Self {
        Self::new(Redirect::NAME).with_parameter("target", target.into())
    }

    pub fn webpage(strategy: WebpageRewriteStrategy) -> Self {
        Self::new(strategy.handler_name())
    }

    pub fn path_element(index: usize, replacement: impl Into<String>) -> Self {
        Self::new(PathElement::NAME)
            .with_parameter("index", index)
            .with_parameter("replacement", replacement.into())
    }

    pub fn path_regex<S: AsRef<str>>(pattern: impl Into<String>, replacements: &[S]) -> Self {
        let replacements: Vec<Value> = replacements
            .iter()
            .map(|r| Value::String(r.as_ref().to_string()))
            .collect();
        Self::new(PathRegex::NAME)
            .with_parameter("pattern", pattern.into())
            .with_parameter("replacements", replacements)
    }

    pub fn path_to(path: impl Into<String>) -> Self {
        Self::new(PathTo::NAME).with_parameter("path", path.into())
    }

    /// Basic-auth gate for pre-encoded credentials.
    pub fn basic_auth(credentials: impl Into<String>) -> Self {
        Self::new(BasicAuth::NAME).with_parameter("credentials", credentials.into())
    }

    pub fn status_code(status_code: u16) -> Self {
        Self::new(StatusCode::NAME).with_parameter("status_code", status_code)
    }

    pub fn cache_control(immutable: bool) -> Self {
        Self::new(CacheControl::NAME).with_parameter("immutable", immutable)
    }

    pub fn security_headers() -> Self {
        Self::new(SecurityHeaders::NAME)
    }
}

/// A resolved handler with typed configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerSpec {
    Redirect { target: String },
    WebpageToFile,
    WebpageToSubdir,
    PathElement { index: usize, replacement: String },
    PathRegex {
        pattern: EdgeRegex,
        replacements: Vec<String>,
    },
    PathTo { path: String },
    BasicAuth { credentials: String },
    StatusCode { status_code: u16 },
    CacheControl { immutable: bool },
    SecurityHeaders,
    Custom {
        name: String,
        code: String,
        parameters: BTreeMap<String, Value>,
    },
}

impl HandlerSpec {
    /// Catalog name, or the function name of a custom handler.
    pub fn name(&self) -> &str {
        match self {
            HandlerSpec::Redirect { .. } => Redirect::NAME,
            HandlerSpec::WebpageToFile => WebpageToFile::NAME,
            HandlerSpec::WebpageToSubdir => WebpageToSubdir::NAME,
            HandlerSpec::PathElement { .. } => PathElement::NAME,
            HandlerSpec::PathRegex { .. } => PathRegex::NAME,
            HandlerSpec::PathTo { .. } => PathTo::NAME,
            HandlerSpec::BasicAuth { .. } => BasicAuth::NAME,
            HandlerSpec::StatusCode { .. } => StatusCode::NAME,
            HandlerSpec::CacheControl { .. } => CacheControl::NAME,
            HandlerSpec::SecurityHeaders => SecurityHeaders::NAME,
            HandlerSpec::Custom { name, .. } => name,
        }
    }

    /// Catalog entry backing this spec; `None` for custom code.
    pub fn entry(&self) -> Option<&'static CatalogEntry> {
        match self {
            HandlerSpec::Custom { .. } => None,
            other => lookup(other.name()),
        }
    }

    /// Event type the handler requires; custom code adapts to its chain.
    pub fn event_type(&self) -> Option<EventType> {
        self.entry().map(|entry| entry.event_type)
    }

    /// JS function identifier the generated chain calls.
    pub fn function_name(&self) -> &str {
        match self.entry() {
            Some(entry) => entry.function,
            None => self.name(),
        }
    }

    /// Handler source before substitution.
    pub fn template(&self) -> &str {
        match (self, self.entry()) {
            (HandlerSpec::Custom { code, .. }, _) => code,
            (_, Some(entry)) => entry.template,
            (_, None) => "",
        }
    }

    /// Literal values for each sentinel key of the template.
    pub fn template_values(&self) -> BTreeMap<String, Value> {
        let pairs: Vec<(&str, Value)> = match self {
            HandlerSpec::Redirect { target } => vec![("TARGET", target.as_str().into())],
            HandlerSpec::PathElement { index, replacement } => vec![
                ("INDEX", (*index).into()),
                ("REPLACEMENT", replacement.as_str().into()),
            ],
            HandlerSpec::PathRegex {
                pattern,
                replacements,
            } => vec![
                ("PATTERN", pattern.edge().into()),
                ("GROUPS", json!(pattern.groups())),
                ("REPLACEMENTS", replacements.clone().into()),
            ],
            HandlerSpec::PathTo { path } => vec![("PATH", path.as_str().into())],
            HandlerSpec::BasicAuth { credentials } => {
                vec![("CREDENTIALS", credentials.as_str().into())]
            }
            HandlerSpec::StatusCode { status_code } => {
                let handler = StatusCode::new(*status_code);
                vec![
                    ("STATUS_CODE", (*status_code).into()),
                    ("STATUS_DESCRIPTION", handler.description().into()),
                ]
            }
            HandlerSpec::CacheControl { immutable } => {
                vec![("CACHE_CONTROL", CacheControl::new(*immutable).value().into())]
            }
            HandlerSpec::Custom { parameters, .. } => {
                return parameters
                    .iter()
                    .map(|(k, v)| (k.to_ascii_uppercase(), v.clone()))
                    .collect();
            }
            HandlerSpec::WebpageToFile
            | HandlerSpec::WebpageToSubdir
            | HandlerSpec::SecurityHeaders => Vec::new(),
        };
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    /// Build the in-memory handler. `event_type` is the chain's event type.
    pub fn instantiate(&self, event_type: EventType) -> CompileResult<Box<dyn Handler>> {
        let handler: Box<dyn Handler> = match self {
            HandlerSpec::Redirect { target } => Box::new(Redirect::new(target.as_str())),
            HandlerSpec::WebpageToFile => Box::new(WebpageToFile),
            HandlerSpec::WebpageToSubdir => Box::new(WebpageToSubdir),
            HandlerSpec::PathElement { index, replacement } => {
                Box::new(PathElement::new(*index, replacement.as_str()))
            }
            HandlerSpec::PathRegex {
                pattern,
                replacements,
            } => Box::new(PathRegex::new(pattern.source(), replacements.clone())?),
            HandlerSpec::PathTo { path } => Box::new(PathTo::new(path.as_str())),
            HandlerSpec::BasicAuth { credentials } => Box::new(BasicAuth::new(credentials.as_str())),
            HandlerSpec::StatusCode { status_code } => Box::new(StatusCode::new(*status_code)),
            HandlerSpec::CacheControl { immutable } => Box::new(CacheControl::new(*immutable)),
            HandlerSpec::SecurityHeaders => Box::new(SecurityHeaders),
            HandlerSpec::Custom { name, .. } => Box::new(Opaque {
                name: name.clone(),
                event_type,
            }),
        };
        Ok(handler)
    }
}

/// In-memory stand-in for custom code, which only runs at the edge.
#[derive(Debug)]
struct Opaque {
    name: String,
    event_type: EventType,
}

impl Handler for Opaque {
    fn name(&self) -> &str {
        &self.name
    }

    fn event_type(&self) -> EventType {
        self.event_type
    }

    fn handle(&self, input: Message) -> Outcome {
        tracing::trace!(handler = %self.name, "Custom handler passes through in memory");
        Outcome::Continue(input)
    }
}

/// Typed access to a reference's parameters.
struct Params<'a> {
    handler: &'a str,
    values: &'a BTreeMap<String, Value>,
}

impl<'a> Params<'a> {
    fn get(&self, key: &str) -> CompileResult<&'a Value> {
        self.values
            .get(key)
            .ok_or_else(|| ConfigurationError::MissingParameter {
                handler: self.handler.to_string(),
                parameter: key.to_string(),
            })
    }

    fn invalid(&self, key: &str, reason: impl Into<String>) -> ConfigurationError {
        ConfigurationError::InvalidParameter {
            handler: self.handler.to_string(),
            parameter: key.to_string(),
            reason: reason.into(),
        }
    }

    fn string(&self, key: &str) -> CompileResult<String> {
        match self.get(key)? {
            Value::String(s) => Ok(s.clone()),
            _ => Err(self.invalid(key, "expected a string")),
        }
    }

    fn strings(&self, key: &str) -> CompileResult<Vec<String>> {
        match self.get(key)? {
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    _ => Err(self.invalid(key, "expected a list of strings")),
                })
                .collect(),
            _ => Err(self.invalid(key, "expected a list of strings")),
        }
    }

    /// Non-negative integer, given as a number or a numeric string.
    fn index(&self, key: &str) -> CompileResult<usize> {
        let parsed = match self.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };
        parsed
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| self.invalid(key, "expected a non-negative integer"))
    }

    fn flag(&self, key: &str) -> CompileResult<bool> {
        match self.get(key)? {
            Value::Bool(b) => Ok(*b),
            _ => Err(self.invalid(key, "expected a boolean")),
        }
    }

    fn status(&self, key: &str) -> CompileResult<u16> {
        match self.get(key)?.as_u64() {
            Some(code @ 100..=599) => Ok(code as u16),
            _ => Err(self.invalid(key, "expected an HTTP status code")),
        }
    }
}

fn is_js_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Resolve a reference against the catalog.
pub fn resolve(reference: &HandlerRef) -> CompileResult<HandlerSpec> {
    let name = reference.name.as_str();

    if let Some(code) = &reference.code {
        if !is_js_identifier(name) {
            return Err(ConfigurationError::InvalidParameter {
                handler: name.to_string(),
                parameter: "name".to_string(),
                reason: "custom handler names must be valid function identifiers".to_string(),
            });
        }
        if let Some(key) = reference.parameters.keys().find(|k| !template::is_valid_key(k)) {
            return Err(ConfigurationError::InvalidParameter {
                handler: name.to_string(),
                parameter: key.clone(),
                reason: "parameter keys may only contain letters, digits and single underscores"
                    .to_string(),
            });
        }
        return Ok(HandlerSpec::Custom {
            name: name.to_string(),
            code: code.clone(),
            parameters: reference.parameters.clone(),
        });
    }

    let entry = lookup(name).ok_or_else(|| ConfigurationError::UnknownHandler {
        name: name.to_string(),
    })?;

    if let Some(key) = reference
        .parameters
        .keys()
        .find(|k| !entry.parameters.contains(&k.as_str()))
    {
        return Err(ConfigurationError::UnexpectedParameter {
            handler: name.to_string(),
            parameter: key.clone(),
        });
    }

    let params = Params {
        handler: entry.name,
        values: &reference.parameters,
    };

    let spec = match entry.name {
        Redirect::NAME => HandlerSpec::Redirect {
            target: params.string("target")?,
        },
        WebpageToFile::NAME => HandlerSpec::WebpageToFile,
        WebpageToSubdir::NAME => HandlerSpec::WebpageToSubdir,
        PathElement::NAME => HandlerSpec::PathElement {
            index: params.index("index")?,
            replacement: params.string("replacement")?,
        },
        PathRegex::NAME => {
            let handler = PathRegex::new(&params.string("pattern")?, params.strings("replacements")?)?;
            HandlerSpec::PathRegex {
                pattern: handler.edge().clone(),
                replacements: handler.replacements().to_vec(),
            }
        }
        PathTo::NAME => HandlerSpec::PathTo {
            path: params.string("path")?,
        },
        BasicAuth::NAME => HandlerSpec::BasicAuth {
            credentials: params.string("credentials")?,
        },
        StatusCode::NAME => HandlerSpec::StatusCode {
            status_code: params.status("status_code")?,
        },
        CacheControl::NAME => HandlerSpec::CacheControl {
            immutable: params.flag("immutable")?,
        },
        SecurityHeaders::NAME => HandlerSpec::SecurityHeaders,
        other => {
            return Err(ConfigurationError::UnknownHandler {
                name: other.to_string(),
            })
        }
    };

    Ok(spec)
}
