//! Rewrite handler library.
//!
//! # Data Flow
//! ```text
//! Viewer request (uri, headers, method, querystring)
//!     → handler.rs (Handler trait, Continue / Stop outcome)
//!     → redirect.rs, auth.rs (answer the viewer and stop)
//!     → webpage.rs, path.rs (rewrite the uri and continue)
//!       pattern.rs (path regexes both engines read the same way)
//!
//! Origin response (status, headers)
//!     → response.rs (status override, cache-control, security headers)
//! ```
//!
//! # Design Decisions
//! - Handlers are pure: same input + configuration yields the same outcome
//! - Every branch is total; non-matching input passes through unchanged
//! - Configuration is fixed when the handler is constructed, never looked up per request

pub mod auth;
pub mod handler;
pub mod message;
pub mod path;
pub mod pattern;
pub mod redirect;
pub mod response;
pub mod webpage;

pub use handler::{EventType, Handler, PathRewrite};
pub use message::{EdgeRequest, EdgeResponse, HeaderValue, Headers, Message, Outcome};
pub use webpage::WebpageRewriteStrategy;
