//! HTTP basic auth gate.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::rewrite::handler::{on_request, EventType, Handler};
use crate::rewrite::message::{EdgeResponse, Message, Outcome};

/// Encode `username:password` the way browsers send it.
pub fn encode_credentials(username: &str, password: &str) -> String {
    STANDARD.encode(format!("{username}:{password}"))
}

/// Stops the chain with a 401 challenge unless the request carries the
/// expected `Authorization` header.
#[derive(Clone)]
pub struct BasicAuth {
    credentials: String,
    expected_header: String,
}

impl BasicAuth {
    pub const NAME: &'static str = "basic-auth";

    /// Gate for pre-encoded credentials.
    pub fn new(credentials: impl Into<String>) -> Self {
        let credentials = credentials.into();
        let expected_header = format!("Basic {credentials}");
        Self {
            credentials,
            expected_header,
        }
    }

    pub fn from_user_password(username: &str, password: &str) -> Self {
        Self::new(encode_credentials(username, password))
    }

    pub fn credentials(&self) -> &str {
        &self.credentials
    }

    fn challenge() -> EdgeResponse {
        EdgeResponse::new(401).with_header("www-authenticate", "Basic")
    }
}

// Credentials stay out of logs.
impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth").finish_non_exhaustive()
    }
}

impl Handler for BasicAuth {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn event_type(&self) -> EventType {
        EventType::ViewerRequest
    }

    fn handle(&self, input: Message) -> Outcome {
        on_request(input, |request| {
            if request.header("authorization") == Some(self.expected_header.as_str()) {
                Outcome::Continue(Message::Request(request))
            } else {
                Outcome::Stop(Message::Response(Self::challenge()))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::message::EdgeRequest;

    #[test]
    fn test_encode_credentials() {
        assert_eq!(encode_credentials("user", "pass"), "dXNlcjpwYXNz");
    }

    #[test]
    fn test_valid_credentials_pass_through() {
        let gate = BasicAuth::from_user_password("user", "pass");
        let request = EdgeRequest::new("/secret").with_header("Authorization", "Basic dXNlcjpwYXNz");
        let outcome = gate.handle(request.clone().into());
        assert_eq!(outcome, Outcome::Continue(Message::Request(request)));
    }

    #[test]
    fn test_missing_or_wrong_credentials_challenge() {
        let gate = BasicAuth::from_user_password("user", "pass");

        let missing = gate.handle(EdgeRequest::new("/").into());
        assert!(missing.is_stop());
        assert_eq!(missing.message().status_code(), Some(401));

        let wrong = gate.handle(
            EdgeRequest::new("/")
                .with_header("authorization", "Basic d3Jvbmc6d3Jvbmc=")
                .into(),
        );
        assert!(wrong.is_stop());
        let response = wrong.message().as_response().unwrap();
        assert_eq!(response.status_description, "Unauthorized");
        assert_eq!(response.header("www-authenticate"), Some("Basic"));
    }

    #[test]
    fn test_debug_hides_credentials() {
        let gate = BasicAuth::from_user_password("user", "pass");
        assert!(!format!("{gate:?}").contains("dXNlcjpwYXNz"));
    }
}
