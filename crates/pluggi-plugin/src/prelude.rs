//! Prelude for convenient imports.

pub use async_trait::async_trait;

pub use pluggi_core::error::{AppError, ErrorKind};
pub use pluggi_core::result::AppResult;

pub use crate::dispatcher::{Next, PhaseCall};
pub use crate::host::Host;
pub use crate::method::{Awaitable, CoroutineStep, Flow, Method, Resume};
pub use crate::options::Options;
pub use crate::unit::{Plugin, PluginDefinition, PluginUnit};
