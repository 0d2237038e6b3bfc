//! Viewer-response handlers.

use crate::rewrite::handler::{on_response, EventType, Handler};
use crate::rewrite::message::{reason_phrase, Message, Outcome};

/// `cache-control` value for content that never changes once published.
pub const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// `cache-control` value forcing revalidation before each reuse.
pub const REVALIDATE_CACHE_CONTROL: &str = "no-cache";

/// Security headers added to every response.
pub const SECURITY_HEADERS: [(&str, &str); 3] = [
    (
        "strict-transport-security",
        "max-age=31536000; includeSubDomains; preload",
    ),
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
];

/// Overrides the response status.
#[derive(Debug, Clone)]
pub struct StatusCode {
    status_code: u16,
}

impl StatusCode {
    pub const NAME: &'static str = "status-code";

    pub fn new(status_code: u16) -> Self {
        Self { status_code }
    }

    /// Reason phrase sent along with the overridden status.
    pub fn description(&self) -> &'static str {
        reason_phrase(self.status_code).unwrap_or_default()
    }
}

impl Handler for StatusCode {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn event_type(&self) -> EventType {
        EventType::ViewerResponse
    }

    fn handle(&self, input: Message) -> Outcome {
        on_response(input, |mut response| {
            response.status_code = self.status_code;
            response.status_description = self.description().to_string();
            Outcome::Continue(Message::Response(response))
        })
    }
}

/// Sets browser caching headers.
#[derive(Debug, Clone)]
pub struct CacheControl {
    immutable: bool,
}

impl CacheControl {
    pub const NAME: &'static str = "cache-control";

    pub fn new(immutable: bool) -> Self {
        Self { immutable }
    }

    pub fn value(&self) -> &'static str {
        if self.immutable {
            IMMUTABLE_CACHE_CONTROL
        } else {
            REVALIDATE_CACHE_CONTROL
        }
    }
}

impl Handler for CacheControl {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn event_type(&self) -> EventType {
        EventType::ViewerResponse
    }

    fn handle(&self, input: Message) -> Outcome {
        on_response(input, |mut response| {
            response.set_header("cache-control", self.value());
            Outcome::Continue(Message::Response(response))
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SecurityHeaders;

impl SecurityHeaders {
    pub const NAME: &'static str = "security-headers";
}

impl Handler for SecurityHeaders {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn event_type(&self) -> EventType {
        EventType::ViewerResponse
    }

    fn handle(&self, input: Message) -> Outcome {
        on_response(input, |mut response| {
            for (name, value) in SECURITY_HEADERS {
                response.set_header(name, value);
            }
            Outcome::Continue(Message::Response(response))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::message::{EdgeRequest, EdgeResponse};

    #[test]
    fn test_status_code_override() {
        let outcome = StatusCode::new(404).handle(EdgeResponse::new(200).into());
        let response = outcome.message().as_response().unwrap();
        assert_eq!(response.status_code, 404);
        assert_eq!(response.status_description, "Not Found");
    }

    #[test]
    fn test_cache_control() {
        let outcome = CacheControl::new(true).handle(EdgeResponse::new(200).into());
        assert_eq!(
            outcome.message().as_response().unwrap().header("cache-control"),
            Some(IMMUTABLE_CACHE_CONTROL)
        );

        let outcome = CacheControl::new(false).handle(EdgeResponse::new(200).into());
        assert_eq!(
            outcome.message().as_response().unwrap().header("cache-control"),
            Some("no-cache")
        );
    }

    #[test]
    fn test_security_headers() {
        let outcome = SecurityHeaders.handle(EdgeResponse::new(200).into());
        let response = outcome.message().as_response().unwrap();
        assert_eq!(response.header("x-content-type-options"), Some("nosniff"));
        assert_eq!(response.headers.len(), 3);
    }

    #[test]
    fn test_requests_pass_through() {
        let request = EdgeRequest::new("/a");
        let outcome = SecurityHeaders.handle(request.clone().into());
        assert_eq!(outcome, Outcome::Continue(Message::Request(request)));
    }
}
