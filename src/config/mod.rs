//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! site config file (TOML)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks, all errors collected)
//!     → site.rs (stores + routes in the routing model)
//!     → Site::compile() → DispatchTable
//! ```
//!
//! # Design Decisions
//! - All sections have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - `s3_folder` / `s3_location` stay two optional fields in the file; the
//!   model only ever holds one `StorageLocation`

pub mod loader;
pub mod schema;
pub mod site;
pub mod validation;

pub use loader::{load_config, load_site, parse_config, ConfigError};
pub use schema::{ObservabilityConfig, RouteConfig, RouteTargetConfig, SiteConfig};
pub use site::Site;
