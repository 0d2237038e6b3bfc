//! Runtime values that flow through a handler chain.
//!
//! The shapes mirror the edge runtime's event objects: header names are
//! lower-case and each header carries a `{ value }` object.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single header value as seen by the edge runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderValue {
    pub value: String,
}

impl HeaderValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// Ordered header map keyed by lower-case header name.
pub type Headers = BTreeMap<String, HeaderValue>;

/// A viewer request entering the edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRequest {
    pub method: String,
    pub uri: String,
    #[serde(default)]
    pub querystring: String,
    #[serde(default)]
    pub headers: Headers,
}

impl EdgeRequest {
    /// Create a `GET` request for the given URI.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            uri: uri.into(),
            querystring: String::new(),
            headers: Headers::new(),
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), HeaderValue::new(value));
        self
    }

    /// Look up a header by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|h| h.value.as_str())
    }
}

/// A response produced by the edge, either by a handler or by the origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeResponse {
    pub status_code: u16,
    #[serde(default)]
    pub status_description: String,
    #[serde(default)]
    pub headers: Headers,
}

impl EdgeResponse {
    /// Create a response with the standard reason phrase for `status_code`.
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            status_description: reason_phrase(status_code).unwrap_or_default().to_string(),
            headers: Headers::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers
            .insert(name.to_ascii_lowercase(), HeaderValue::new(value));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|h| h.value.as_str())
    }
}

/// The value passed from one handler to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Request(EdgeRequest),
    Response(EdgeResponse),
}

impl Message {
    pub fn as_request(&self) -> Option<&EdgeRequest> {
        match self {
            Message::Request(r) => Some(r),
            Message::Response(_) => None,
        }
    }

    pub fn as_response(&self) -> Option<&EdgeResponse> {
        match self {
            Message::Response(r) => Some(r),
            Message::Request(_) => None,
        }
    }

    /// URI of a request message.
    pub fn uri(&self) -> Option<&str> {
        self.as_request().map(|r| r.uri.as_str())
    }

    /// Status code of a response message.
    pub fn status_code(&self) -> Option<u16> {
        self.as_response().map(|r| r.status_code)
    }
}

impl From<EdgeRequest> for Message {
    fn from(request: EdgeRequest) -> Self {
        Message::Request(request)
    }
}

impl From<EdgeResponse> for Message {
    fn from(response: EdgeResponse) -> Self {
        Message::Response(response)
    }
}

/// Result of a single handler invocation.
///
/// `Stop` short-circuits the chain: no later handler observes the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue(Message),
    Stop(Message),
}

impl Outcome {
    pub fn is_stop(&self) -> bool {
        matches!(self, Outcome::Stop(_))
    }

    pub fn message(&self) -> &Message {
        match self {
            Outcome::Continue(m) | Outcome::Stop(m) => m,
        }
    }

    pub fn into_message(self) -> Message {
        match self {
            Outcome::Continue(m) | Outcome::Stop(m) => m,
        }
    }
}

/// Reason phrase for the status codes handlers emit.
pub fn reason_phrase(status_code: u16) -> Option<&'static str> {
    let phrase = match status_code {
        200 => "OK",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        410 => "Gone",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => return None,
    };
    Some(phrase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = EdgeRequest::new("/").with_header("Authorization", "Basic abc");
        assert_eq!(req.header("authorization"), Some("Basic abc"));
        assert_eq!(req.header("AUTHORIZATION"), Some("Basic abc"));
        assert!(req.headers.contains_key("authorization"));
    }

    #[test]
    fn test_response_reason_phrase() {
        assert_eq!(EdgeResponse::new(301).status_description, "Moved Permanently");
        assert_eq!(EdgeResponse::new(599).status_description, "");
    }

    #[test]
    fn test_request_serializes_like_edge_event() {
        let req = EdgeRequest::new("/a").with_header("Host", "example.com");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["uri"], "/a");
        assert_eq!(json["headers"]["host"]["value"], "example.com");
    }
}
