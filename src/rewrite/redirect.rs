//! Permanent redirect handler.

use crate::rewrite::handler::{moved_permanently, on_request, EventType, Handler};
use crate::rewrite::message::{Message, Outcome};

/// Answers every request with `301 Moved Permanently` to a fixed target.
#[derive(Debug, Clone)]
pub struct Redirect {
    target: String,
}

impl Redirect {
    pub const NAME: &'static str = "redirect";

    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl Handler for Redirect {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn event_type(&self) -> EventType {
        EventType::ViewerRequest
    }

    fn handle(&self, input: Message) -> Outcome {
        on_request(input, |_| {
            Outcome::Stop(Message::Response(moved_permanently(self.target.clone())))
        })
    }
}
