//! Plugin name resolution configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Resolver search policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Local search roots, probed in order.
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    /// Module name prefixes; `prefix` turns `name` into `prefix-name`.
    #[serde(default)]
    pub prefixes: Vec<String>,
    /// Probe modules before local paths.
    #[serde(default)]
    pub module_first: bool,
    /// Never probe the bare, unprefixed module name.
    #[serde(default)]
    pub prefixed_only: bool,
    /// Directory searched for module shared libraries.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            prefixes: Vec::new(),
            module_first: false,
            prefixed_only: false,
            directory: default_directory(),
        }
    }
}

fn default_directory() -> PathBuf {
    PathBuf::from("./plugins")
}
