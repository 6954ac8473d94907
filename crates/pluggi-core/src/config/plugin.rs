//! Plugin registration configuration.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Plugin configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Plugin names registered by name at startup, in order.
    #[serde(default = "default_load")]
    pub load: Vec<String>,
    /// Global options keyed by plugin name.
    #[serde(default)]
    pub options: Map<String, Value>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            load: default_load(),
            options: Map::new(),
        }
    }
}

fn default_load() -> Vec<String> {
    vec!["timing".to_string()]
}
