//! # pluggi-core
//!
//! Core crate for Pluggi. Contains the configuration schema and the
//! unified error system shared by the runtime and the runner binary.
//!
//! This crate has **no** internal dependencies on other Pluggi crates.

pub mod config;
pub mod error;
pub mod result;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
