//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! optional TOML files plus `PLUGGI__*` environment variables. Each
//! sub-module represents a logical configuration section.

pub mod host;
pub mod logging;
pub mod plugin;
pub mod resolver;

use serde::{Deserialize, Serialize};

pub use self::host::HostConfig;
pub use self::logging::LoggingConfig;
pub use self::plugin::PluginConfig;
pub use self::resolver::ResolverConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// configuration (default file + environment overlay + environment variables).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Host phase settings.
    #[serde(default)]
    pub host: HostConfig,
    /// Plugin name resolution policy.
    #[serde(default)]
    pub resolver: ResolverConfig,
    /// Plugins to register at startup and their global options.
    #[serde(default)]
    pub plugins: PluginConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// Merges `config/default` with an environment-specific overlay
    /// `config/{env}` (both optional) and environment variables prefixed
    /// with `PLUGGI`, using `__` as the nesting separator.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("PLUGGI")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Parse configuration from a TOML string, applying the same defaults as [`AppConfig::load`].
    pub fn from_toml(source: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
