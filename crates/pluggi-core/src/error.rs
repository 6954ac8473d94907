//! Unified error types for Pluggi.
//!
//! Registration, resolution and dispatch all report failures as
//! [`AppError`], so callers handle a single error type with `?`.

use std::fmt;
use thiserror::Error;

/// Error kind categorization used across the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// A malformed argument (options that are not an object, an empty name,
    /// an unknown phase). Always detected before any plugin code runs.
    InvalidArgument,
    /// A plugin unit could not be normalized into a record.
    InvalidPlugin,
    /// A plugin with the same name is already registered.
    DuplicateName,
    /// A bare plugin name could not be resolved to a loadable reference.
    PluginNotFound,
    /// An error raised by plugin code itself.
    PluginExecution,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An I/O error occurred.
    Io,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "INVALID_ARGUMENT"),
            Self::InvalidPlugin => write!(f, "INVALID_PLUGIN"),
            Self::DuplicateName => write!(f, "DUPLICATE_NAME"),
            Self::PluginNotFound => write!(f, "PLUGIN_NOT_FOUND"),
            Self::PluginExecution => write!(f, "PLUGIN_EXECUTION"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Io => write!(f, "IO"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout Pluggi.
///
/// Plugin code that fails with its own error type should wrap it with
/// [`AppError::execution_from`]; the original error stays reachable through
/// [`std::error::Error::source`] and can be downcast by the caller.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Create an invalid-plugin error.
    pub fn invalid_plugin(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidPlugin, message)
    }

    /// Create a duplicate-name error.
    pub fn duplicate_name(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateName, message)
    }

    /// Create a plugin-not-found error.
    pub fn plugin_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PluginNotFound, message)
    }

    /// Create a plugin execution error from a message.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PluginExecution, message)
    }

    /// Create a plugin execution error carrying the plugin's own error as source.
    pub fn execution_from(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        let message = err.to_string();
        Self::with_source(ErrorKind::PluginExecution, message, err)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Returns `true` if this error has the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Io, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug, thiserror::Error)]
    #[error("disk on fire")]
    struct DiskOnFire;

    #[test]
    fn test_display_includes_kind() {
        let err = AppError::duplicate_name("plugin 'a' is already registered");
        assert_eq!(
            err.to_string(),
            "DUPLICATE_NAME: plugin 'a' is already registered"
        );
    }

    #[test]
    fn test_execution_from_keeps_source() {
        let err = AppError::execution_from(DiskOnFire);
        assert!(err.is(ErrorKind::PluginExecution));
        assert_eq!(err.message, "disk on fire");
        let source = err.source().unwrap();
        assert!(source.downcast_ref::<DiskOnFire>().is_some());
    }

    #[test]
    fn test_clone_drops_source() {
        let err = AppError::execution_from(DiskOnFire);
        let cloned = err.clone();
        assert_eq!(cloned.kind, ErrorKind::PluginExecution);
        assert!(cloned.source.is_none());
    }

    #[test]
    fn test_json_error_maps_to_serialization() {
        let err: AppError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.kind, ErrorKind::Serialization);
    }
}
