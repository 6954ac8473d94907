//! Plugin loading: resolved reference → [`PluginUnit`].
//!
//! [`Catalog`] is the in-memory source (built-in plugins, tests). With the
//! `dynamic` feature, [`DynamicLoader`] loads shared libraries found on disk.
//! [`Sources`] layers several sources behind one probe/load pair.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use pluggi_core::config::ResolverConfig;
use pluggi_core::error::AppError;
use pluggi_core::result::AppResult;

use crate::builtin::Timing;
use crate::resolver::{Probe, Reference};
use crate::unit::PluginUnit;

/// Loads a resolved reference.
pub trait Load: Send + Sync {
    fn load(&self, reference: &Reference) -> AppResult<PluginUnit>;
}

/// Builds a fresh unit each time a catalog entry is loaded.
pub type UnitFactory = Arc<dyn Fn() -> PluginUnit + Send + Sync>;

/// In-memory plugin source keyed by local path and module name.
#[derive(Clone, Default)]
pub struct Catalog {
    local: HashMap<PathBuf, UnitFactory>,
    modules: HashMap<String, UnitFactory>,
}

impl Catalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog of the plugins shipped with this crate.
    pub fn builtin() -> Self {
        Self::new().with_module("timing", || PluginUnit::class::<Timing>())
    }

    /// Adds a module entry.
    pub fn with_module<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> PluginUnit + Send + Sync + 'static,
    {
        self.modules.insert(name.into(), Arc::new(factory));
        self
    }

    /// Adds a local path entry.
    pub fn with_local<F>(mut self, path: impl Into<PathBuf>, factory: F) -> Self
    where
        F: Fn() -> PluginUnit + Send + Sync + 'static,
    {
        self.local.insert(path.into(), Arc::new(factory));
        self
    }

    /// Module names in the catalog, sorted.
    pub fn modules(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn factory(&self, reference: &Reference) -> Option<&UnitFactory> {
        match reference {
            Reference::Local(path) => self.local.get(path),
            Reference::Module(name) => self.modules.get(name),
        }
    }
}

impl Probe for Catalog {
    fn probe(&self, candidate: &Reference) -> bool {
        self.factory(candidate).is_some()
    }
}

impl Load for Catalog {
    fn load(&self, reference: &Reference) -> AppResult<PluginUnit> {
        let factory = self.factory(reference).ok_or_else(|| {
            AppError::invalid_plugin(format!("No catalog entry for '{reference}'"))
        })?;
        Ok(factory())
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("local", &self.local.keys().collect::<Vec<_>>())
            .field("modules", &self.modules())
            .finish()
    }
}

/// A source that can both probe and load.
pub trait Source: Probe + Load {}

impl<T: Probe + Load> Source for T {}

/// Ordered list of sources; the first source whose probe accepts a reference
/// is the one that loads it.
#[derive(Default)]
pub struct Sources {
    entries: Vec<Box<dyn Source>>,
}

impl Sources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a source.
    pub fn with(mut self, source: impl Source + 'static) -> Self {
        self.entries.push(Box::new(source));
        self
    }

    /// Sources for a host built from configuration: the built-in catalog,
    /// then (with the `dynamic` feature) shared libraries on disk.
    pub fn from_config(config: &ResolverConfig) -> Self {
        let sources = Self::new().with(Catalog::builtin());
        #[cfg(feature = "dynamic")]
        let sources = sources.with(DynamicLoader::new(crate::resolver::FsProbe::from_config(
            config,
        )));
        #[cfg(not(feature = "dynamic"))]
        let _ = config;
        sources
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Probe for Sources {
    fn probe(&self, candidate: &Reference) -> bool {
        self.entries.iter().any(|source| source.probe(candidate))
    }
}

impl Load for Sources {
    fn load(&self, reference: &Reference) -> AppResult<PluginUnit> {
        let (index, source) = self
            .entries
            .iter()
            .enumerate()
            .find(|(_, source)| source.probe(reference))
            .ok_or_else(|| {
                AppError::invalid_plugin(format!("No source can load '{reference}'"))
            })?;
        debug!(reference = %reference, source = index, "Loading plugin");
        source.load(reference)
    }
}

impl std::fmt::Debug for Sources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sources")
            .field("count", &self.entries.len())
            .finish()
    }
}

#[cfg(feature = "dynamic")]
mod dynamic {
    use std::sync::Mutex;

    use tracing::info;

    use pluggi_core::error::AppError;
    use pluggi_core::result::AppResult;

    use super::Load;
    use crate::resolver::{FsProbe, Probe, Reference};
    use crate::unit::PluginUnit;

    /// Name of the constructor every plugin library must export.
    pub const ENTRY_SYMBOL: &[u8] = b"pluggi_plugin_unit";

    /// Signature of the exported constructor.
    ///
    /// The library must return a pointer obtained from
    /// `Box::into_raw(Box::new(unit))` and be built with the same compiler
    /// and `pluggi-plugin` version as the host.
    pub type UnitConstructor = unsafe extern "C" fn() -> *mut PluginUnit;

    /// Loads plugins from shared libraries (.so / .dll / .dylib).
    ///
    /// Libraries stay loaded for the lifetime of the loader.
    pub struct DynamicLoader {
        probe: FsProbe,
        libraries: Mutex<Vec<libloading::Library>>,
    }

    impl DynamicLoader {
        pub fn new(probe: FsProbe) -> Self {
            Self {
                probe,
                libraries: Mutex::new(Vec::new()),
            }
        }

        /// Number of libraries loaded so far.
        pub fn loaded(&self) -> usize {
            self.libraries.lock().map(|libs| libs.len()).unwrap_or(0)
        }
    }

    impl Probe for DynamicLoader {
        fn probe(&self, candidate: &Reference) -> bool {
            self.probe.probe(candidate)
        }
    }

    impl Load for DynamicLoader {
        fn load(&self, reference: &Reference) -> AppResult<PluginUnit> {
            let path = self.probe.locate(reference).ok_or_else(|| {
                AppError::invalid_plugin(format!("No plugin library for '{reference}'"))
            })?;

            // SAFETY: loading a library runs its initialisers; only trusted
            // plugin directories may be configured.
            let library = unsafe { libloading::Library::new(&path) }.map_err(|e| {
                AppError::invalid_plugin(format!(
                    "Failed to load plugin library '{}': {e}",
                    path.display()
                ))
            })?;

            // SAFETY: the symbol type matches the documented export.
            let unit = unsafe {
                let construct = library.get::<UnitConstructor>(ENTRY_SYMBOL).map_err(|e| {
                    AppError::invalid_plugin(format!(
                        "Plugin library '{}' does not export 'pluggi_plugin_unit': {e}",
                        path.display()
                    ))
                })?;
                let raw = construct();
                if raw.is_null() {
                    return Err(AppError::invalid_plugin(format!(
                        "Plugin library '{}' returned no unit",
                        path.display()
                    )));
                }
                *Box::from_raw(raw)
            };

            info!(path = %path.display(), "Dynamic plugin loaded");

            self.libraries
                .lock()
                .map_err(|_| AppError::internal("plugin library list poisoned"))?
                .push(library);

            Ok(unit)
        }
    }

    impl std::fmt::Debug for DynamicLoader {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("DynamicLoader")
                .field("probe", &self.probe)
                .field("loaded", &self.loaded())
                .finish()
        }
    }
}

#[cfg(feature = "dynamic")]
pub use dynamic::{DynamicLoader, ENTRY_SYMBOL, UnitConstructor};
