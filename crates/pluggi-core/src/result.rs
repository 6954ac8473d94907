//! Convenience result type alias for Pluggi.

use crate::error::AppError;

/// A specialized `Result` type for Pluggi operations.
pub type AppResult<T> = Result<T, AppError>;
