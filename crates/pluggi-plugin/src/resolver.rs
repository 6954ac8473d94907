//! Name resolution: bare plugin name → loadable reference.
//!
//! Two strategies are tried in a fixed order. The local strategy joins each
//! search root with the name; the module strategy tries each `prefix-name`
//! form and then, unless `prefixed_only` is set, the bare name. Local runs
//! first unless `module_first` is set. Whether a candidate actually exists is
//! decided by a [`Probe`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::trace;

use pluggi_core::config::ResolverConfig;

/// A reference the loader knows how to load.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reference {
    /// A path under one of the local search roots.
    Local(PathBuf),
    /// A module name, possibly prefixed.
    Module(String),
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Module(name) => f.write_str(name),
        }
    }
}

/// Resolves a bare plugin name.
pub trait Resolve: Send + Sync {
    /// Returns the first resolvable reference for `name`, or `None`.
    fn resolve(&self, name: &str) -> Option<Reference>;
}

/// Decides whether a candidate reference can be loaded.
pub trait Probe: Send + Sync {
    fn probe(&self, candidate: &Reference) -> bool;
}

/// Search policy plus the probe that checks candidates.
#[derive(Clone)]
pub struct Resolver {
    paths: Vec<PathBuf>,
    prefixes: Vec<String>,
    module_first: bool,
    prefixed_only: bool,
    probe: Arc<dyn Probe>,
}

impl Resolver {
    /// Creates a resolver with no search roots and no prefixes.
    pub fn new(probe: Arc<dyn Probe>) -> Self {
        Self {
            paths: Vec::new(),
            prefixes: Vec::new(),
            module_first: false,
            prefixed_only: false,
            probe,
        }
    }

    /// Creates a resolver from the `[resolver]` configuration section.
    pub fn from_config(config: &ResolverConfig, probe: Arc<dyn Probe>) -> Self {
        Self {
            paths: config.paths.clone(),
            prefixes: config.prefixes.clone(),
            module_first: config.module_first,
            prefixed_only: config.prefixed_only,
            probe,
        }
    }

    /// Appends a local search root.
    pub fn add_path(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.paths.push(path.into());
        self
    }

    /// Appends a module name prefix.
    pub fn add_prefix(&mut self, prefix: impl Into<String>) -> &mut Self {
        self.prefixes.push(prefix.into());
        self
    }

    /// Tries modules before local paths when set.
    pub fn set_module_first(&mut self, enabled: bool) -> &mut Self {
        self.module_first = enabled;
        self
    }

    /// Never tries the bare module name when set.
    pub fn set_prefixed_only(&mut self, enabled: bool) -> &mut Self {
        self.prefixed_only = enabled;
        self
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn module_first(&self) -> bool {
        self.module_first
    }

    pub fn prefixed_only(&self) -> bool {
        self.prefixed_only
    }

    /// Local strategy: first search root under which `name` is resolvable.
    pub fn resolve_local(&self, name: &str) -> Option<Reference> {
        self.paths
            .iter()
            .map(|root| Reference::Local(root.join(name)))
            .find(|candidate| self.check(candidate))
    }

    /// Module strategy: each `prefix-name`, then the bare name.
    pub fn resolve_module(&self, name: &str) -> Option<Reference> {
        let prefixed = self
            .prefixes
            .iter()
            .map(|prefix| Reference::Module(format!("{prefix}-{name}")));
        let bare = (!self.prefixed_only).then(|| Reference::Module(name.to_string()));

        prefixed.chain(bare).find(|candidate| self.check(candidate))
    }

    fn check(&self, candidate: &Reference) -> bool {
        let found = self.probe.probe(candidate);
        trace!(candidate = %candidate, found, "Probed plugin candidate");
        found
    }
}

impl Resolve for Resolver {
    fn resolve(&self, name: &str) -> Option<Reference> {
        if self.module_first {
            self.resolve_module(name).or_else(|| self.resolve_local(name))
        } else {
            self.resolve_local(name).or_else(|| self.resolve_module(name))
        }
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("paths", &self.paths)
            .field("prefixes", &self.prefixes)
            .field("module_first", &self.module_first)
            .field("prefixed_only", &self.prefixed_only)
            .finish()
    }
}

/// Platform shared library file name for a plugin name (`my-thing` →
/// `libmy_thing.so` on Linux).
pub fn library_file_name(name: &str) -> String {
    format!(
        "{}{}{}",
        std::env::consts::DLL_PREFIX,
        name.replace('-', "_"),
        std::env::consts::DLL_SUFFIX
    )
}

/// Probes the filesystem.
///
/// A local candidate resolves if the path exists, or if the shared library
/// file for its last component exists next to it. A module candidate
/// resolves if its shared library file exists in one of the module
/// directories.
#[derive(Debug, Clone, Default)]
pub struct FsProbe {
    module_dirs: Vec<PathBuf>,
}

impl FsProbe {
    pub fn new(module_dirs: Vec<PathBuf>) -> Self {
        Self { module_dirs }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(vec![config.directory.clone()])
    }

    /// The file a candidate resolves to, if any.
    pub fn locate(&self, candidate: &Reference) -> Option<PathBuf> {
        match candidate {
            Reference::Local(path) => locate_local(path),
            Reference::Module(name) => self
                .module_dirs
                .iter()
                .map(|dir| dir.join(library_file_name(name)))
                .find(|file| file.is_file()),
        }
    }
}

impl Probe for FsProbe {
    fn probe(&self, candidate: &Reference) -> bool {
        self.locate(candidate).is_some()
    }
}

fn locate_local(path: &Path) -> Option<PathBuf> {
    if path.exists() {
        return Some(path.to_path_buf());
    }
    let stem = path.file_name()?.to_str()?;
    let library = path.with_file_name(library_file_name(stem));
    library.is_file().then_some(library)
}
