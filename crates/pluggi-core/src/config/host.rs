//! Host phase configuration.

use serde::{Deserialize, Serialize};

/// Lifecycle phases dispatched by a host when none are configured.
pub const DEFAULT_PHASES: [&str; 5] = ["prepare", "start", "stop", "build", "test"];

/// Host configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Ordered phase names the host dispatches.
    #[serde(default = "default_phases")]
    pub phases: Vec<String>,
    /// Phases the runner invokes, in order, after registration.
    #[serde(default = "default_run")]
    pub run: Vec<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            phases: default_phases(),
            run: default_run(),
        }
    }
}

fn default_phases() -> Vec<String> {
    DEFAULT_PHASES.iter().map(|p| p.to_string()).collect()
}

fn default_run() -> Vec<String> {
    vec!["prepare".to_string(), "start".to_string()]
}
