//! Object storage collaborator surface.
//!
//! # Data Flow
//! ```text
//! ArtifactStore::get_artifact(name, version)
//!     → StorageLocation::Artifact (bucket + `<name>/<version>` prefix)
//!     → routing (origin path, ReadGrant per storage route)
//!
//! After provisioning:
//!     ReadGrant (aggregated) → store.rs register() → finalize(distribution)
//!     → policy.rs BucketPolicy
//! ```
//!
//! # Design Decisions
//! - Legacy bucket references and artifact folders are one tagged union
//! - Grants are collected first and applied once; the borrow checker
//!   serializes access to a store

pub mod location;
pub mod policy;
pub mod store;

pub use location::{BucketRef, GrantMode, ReadGrant, StorageLocation};
pub use policy::{BucketPolicy, PolicyError, PolicyStatement};
pub use store::{ArtifactStore, ReadAccessRequest, StatementHandle};
