//! Webpage path normalization.
//!
//! Maps "pretty" page URLs onto the HTML files an object store actually holds.
//!
//! # Strategies
//! - `File`: `/about` → `/about.html`, `/about/` redirects to `/about`
//! - `SubDir`: `/about` and `/about/` → `/about/index.html`
//!
//! A final path segment containing a `.` is treated as a file with an
//! extension and is never touched.

use serde::{Deserialize, Serialize};

use crate::rewrite::handler::{on_request, EventType, Handler, PathRewrite};
use crate::rewrite::message::{Message, Outcome};

/// How page URLs map onto stored files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebpageRewriteStrategy {
    /// Pages are stored as `<name>.html`; trailing slashes are not used.
    File,
    /// Pages are stored as `<name>/index.html`.
    SubDir,
}

impl WebpageRewriteStrategy {
    /// Strategy selected by a route's trailing-slash convention.
    pub fn for_trailing_slash(trailing_slash: bool) -> Self {
        if trailing_slash {
            WebpageRewriteStrategy::SubDir
        } else {
            WebpageRewriteStrategy::File
        }
    }

    /// Catalog name of the handler implementing this strategy.
    pub fn handler_name(&self) -> &'static str {
        match self {
            WebpageRewriteStrategy::File => WebpageToFile::NAME,
            WebpageRewriteStrategy::SubDir => WebpageToSubdir::NAME,
        }
    }
}

fn last_segment(uri: &str) -> &str {
    uri.rsplit_once('/').map_or(uri, |(_, last)| last)
}

/// `File` strategy as a pure function of the URI.
pub fn webpage_to_file(uri: &str) -> PathRewrite {
    if uri == "/" {
        return PathRewrite::Rewrite("/index.html".to_string());
    }

    if let Some(stripped) = uri.strip_suffix('/') {
        return PathRewrite::Redirect(stripped.to_string());
    }

    if last_segment(uri).contains('.') {
        PathRewrite::Unchanged
    } else {
        PathRewrite::Rewrite(format!("{uri}.html"))
    }
}

/// `SubDir` strategy as a pure function of the URI.
pub fn webpage_to_subdir(uri: &str) -> PathRewrite {
    if uri.ends_with('/') {
        PathRewrite::Rewrite(format!("{uri}index.html"))
    } else if !last_segment(uri).contains('.') {
        PathRewrite::Rewrite(format!("{uri}/index.html"))
    } else {
        PathRewrite::Unchanged
    }
}

#[derive(Debug, Clone, Default)]
pub struct WebpageToFile;

impl WebpageToFile {
    pub const NAME: &'static str = "rewrite-webpage-to-file";
}

impl Handler for WebpageToFile {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn event_type(&self) -> EventType {
        EventType::ViewerRequest
    }

    fn handle(&self, input: Message) -> Outcome {
        on_request(input, |request| webpage_to_file(&request.uri).apply(request))
    }
}

#[derive(Debug, Clone, Default)]
pub struct WebpageToSubdir;

impl WebpageToSubdir {
    pub const NAME: &'static str = "rewrite-webpage-to-subdir";
}

impl Handler for WebpageToSubdir {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn event_type(&self) -> EventType {
        EventType::ViewerRequest
    }

    fn handle(&self, input: Message) -> Outcome {
        on_request(input, |request| webpage_to_subdir(&request.uri).apply(request))
    }
}
