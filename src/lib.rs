//! Edge dispatch compiler library

pub mod config;
pub mod error;
pub mod observability;
pub mod pipeline;
pub mod provision;
pub mod rewrite;
pub mod routing;
pub mod storage;

pub use config::{Site, SiteConfig};
pub use error::{CompileResult, ConfigurationError};
pub use pipeline::{ChainBuilder, CodeArtifact, HandlerRef, Pipeline};
pub use provision::{deploy, DeploymentOutcome, DryRun};
pub use routing::{DispatchTable, Route, RouteCompiler};
