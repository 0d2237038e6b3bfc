//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::config::schema::SiteConfig;
use crate::config::site::Site;
use crate::config::validation::{validate_config, ValidationError};
use crate::error::ConfigurationError;
use crate::observability::metrics;

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
    Configuration(ConfigurationError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
            ConfigError::Configuration(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Configuration(e) => Some(e),
            ConfigError::Validation(_) => None,
        }
    }
}

impl From<ConfigurationError> for ConfigError {
    fn from(e: ConfigurationError) -> Self {
        ConfigError::Configuration(e)
    }
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<SiteConfig, ConfigError> {
    let config: SiteConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content).inspect_err(|_| metrics::record_compile_error("config"))
}

/// Load a configuration file and convert it into the route model.
pub fn load_site(path: &Path) -> Result<Site, ConfigError> {
    let config = load_config(path)?;
    let site = Site::from_config(&config).inspect_err(|_| metrics::record_compile_error("config"))?;
    info!(
        path = %path.display(),
        site = %site.options.site_name,
        routes = site.routes.len(),
        stores = site.stores.len(),
        "Configuration loaded"
    );
    Ok(site)
}
