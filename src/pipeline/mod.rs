//! Handler chain compiler.
//!
//! # Data Flow
//! ```text
//! [HandlerRef] (name + literal parameters, or custom code)
//!     → catalog.rs (resolve into typed HandlerSpec, parameter checks)
//!     → chain.rs (phase / duplicate checks, in-memory Pipeline)
//!     → codegen.rs (one edge program, sentinels substituted via template.rs)
//!     → CompiledFunction { pipeline, artifact }
//! ```
//!
//! # Design Decisions
//! - An empty handler list compiles to no pipeline at all
//! - The in-memory pipeline and the generated code come from the same specs
//! - Code generation only happens at the edge-compute boundary; evaluation
//!   and tests run the Rust handlers directly

pub mod catalog;
pub mod chain;
pub mod codegen;
pub mod template;

pub use catalog::{HandlerRef, HandlerSpec};
pub use chain::{build, ChainBuilder, CompiledFunction, Pipeline};
pub use codegen::{CodeArtifact, RUNTIME};
