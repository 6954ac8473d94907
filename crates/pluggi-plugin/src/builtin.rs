//! Plugins shipped with the runtime.

use std::time::Instant;

use async_trait::async_trait;
use tracing::info;

use pluggi_core::result::AppResult;

use crate::dispatcher::{Next, PhaseCall};
use crate::unit::Plugin;

/// Logs how long each phase took downstream of this plugin.
///
/// Register it first to time the whole chain. An optional `label` option is
/// included in the log event.
#[derive(Debug, Default)]
pub struct Timing;

#[async_trait]
impl Plugin for Timing {
    fn name(&self) -> Option<&str> {
        Some("timing")
    }

    fn implements(&self, _phase: &str) -> bool {
        true
    }

    async fn run(&self, phase: &str, call: PhaseCall, next: Next) -> AppResult<()> {
        let label = call
            .config()
            .get("label")
            .and_then(|v| v.as_str())
            .unwrap_or(phase)
            .to_string();
        let start = Instant::now();

        let result = next.run().await;

        info!(
            phase = %phase,
            label = %label,
            plugins = call.position() + 1 + next.remaining(),
            duration_ms = %start.elapsed().as_millis(),
            ok = result.is_ok(),
            "Phase timed"
        );

        result
    }
}
