//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation:
//!     Route[] (declaration order, `/` last)
//!     → compiler.rs (validate, per-kind policy, origins, grants)
//!     → pipeline (synthesized or inline viewer-request chains)
//!     → table.rs DispatchTable (immutable)
//!
//! Evaluation (tests, CLI `resolve`):
//!     path → table.rs resolve() → matcher.rs (glob, first match wins)
//!          → Behavior (+ attached pipeline)
//! ```
//!
//! # Design Decisions
//! - Routes compiled once, immutable afterwards
//! - First match wins; the `/` route is the fallback and must be last
//! - Deterministic: same route list always yields the same table and code
//! - No regex in path matching

pub mod compiler;
pub mod matcher;
pub mod policy;
pub mod route;
pub mod table;

pub use compiler::{compile, origin_id, CompilerOptions, RouteCompiler};
pub use matcher::PathPattern;
pub use route::{PipelineBinding, Route, RouteKind, RouteTarget, StorageRoute};
pub use table::{Behavior, DispatchTable, FunctionRef, Origin};
