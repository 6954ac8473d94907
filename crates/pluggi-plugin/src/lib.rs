//! # pluggi-plugin
//!
//! Plugin composition runtime. Provides:
//!
//! - A [`Host`] holding global options and an insertion-ordered plugin map
//! - Registration of plain definitions, init functions, classes, instances
//!   or bare names resolved through a [`Resolver`]
//! - Wrapping of sync, async and coroutine phase methods into one callable form
//! - Cascade dispatch of lifecycle phases with onion-style continuations
//! - Optional dynamic loading via `libloading` (feature `dynamic`)

pub mod builtin;
pub mod dispatcher;
pub mod host;
pub mod loader;
pub mod method;
pub mod normalizer;
pub mod options;
pub mod prelude;
pub mod registration;
pub mod registry;
pub mod resolver;
pub mod unit;

pub use dispatcher::{Next, PhaseCall};
pub use host::{Host, HostBuilder};
pub use loader::{Catalog, Load, Sources};
pub use method::{Flow, Method, PhaseFuture};
pub use options::Options;
pub use registration::Registration;
pub use registry::{PluginRecord, PluginRegistry};
pub use resolver::{FsProbe, Probe, Reference, Resolve, Resolver};
pub use unit::{Plugin, PluginClass, PluginDefinition, PluginUnit};

#[cfg(feature = "dynamic")]
pub use loader::DynamicLoader;
