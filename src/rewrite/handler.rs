//! The handler abstraction shared by every rewrite.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rewrite::message::{EdgeRequest, EdgeResponse, Message, Outcome};

/// Which edge event a chain is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    ViewerRequest,
    ViewerResponse,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ViewerRequest => "viewer-request",
            EventType::ViewerResponse => "viewer-response",
        }
    }

    /// Field of the edge event that holds this phase's value.
    pub fn event_field(&self) -> &'static str {
        match self {
            EventType::ViewerRequest => "request",
            EventType::ViewerResponse => "response",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stateless transform over one edge message.
///
/// Implementations must be total: every input yields an outcome, and inputs
/// the handler does not care about are returned unchanged via `Continue`.
pub trait Handler: Send + Sync + fmt::Debug {
    /// Catalog name of the handler.
    fn name(&self) -> &str;

    /// Event type the handler is written for.
    fn event_type(&self) -> EventType;

    fn handle(&self, input: Message) -> Outcome;
}

/// Helper for handlers that only look at requests.
pub(crate) fn on_request(input: Message, f: impl FnOnce(EdgeRequest) -> Outcome) -> Outcome {
    match input {
        Message::Request(request) => f(request),
        other => Outcome::Continue(other),
    }
}

/// Helper for handlers that only look at responses.
pub(crate) fn on_response(input: Message, f: impl FnOnce(EdgeResponse) -> Outcome) -> Outcome {
    match input {
        Message::Response(response) => f(response),
        other => Outcome::Continue(other),
    }
}

/// Result of a pure path computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathRewrite {
    /// Leave the request as it is.
    Unchanged,
    /// Internally rewrite the URI.
    Rewrite(String),
    /// Answer with a permanent redirect to the given location.
    Redirect(String),
}

impl PathRewrite {
    /// Apply the rewrite to a request.
    pub(crate) fn apply(self, mut request: EdgeRequest) -> Outcome {
        match self {
            PathRewrite::Unchanged => Outcome::Continue(Message::Request(request)),
            PathRewrite::Rewrite(uri) => {
                request.uri = uri;
                Outcome::Continue(Message::Request(request))
            }
            PathRewrite::Redirect(location) => {
                Outcome::Stop(Message::Response(moved_permanently(location)))
            }
        }
    }
}

/// 301 response pointing at `location`.
pub fn moved_permanently(location: impl Into<String>) -> EdgeResponse {
    EdgeResponse::new(301).with_header("location", location)
}
