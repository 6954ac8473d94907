//! Cascade dispatcher: runs one phase through every implementing plugin.
//!
//! Plugins are chained by continuation: each one receives a [`Next`] that,
//! when run, invokes the following plugin and resolves once the rest of the
//! chain has settled. A plugin can therefore do work before and after all
//! downstream plugins, or stop the chain by never running its continuation.
//!
//! The chain is strictly sequential and ordered by registration. A rejection
//! at any position settles the whole invocation with that same error;
//! nothing further down the chain runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use futures::future;
use serde_json::Value;
use tracing::{Instrument, debug, debug_span, trace, warn};
use uuid::Uuid;

use crate::method::{Awaitable, PhaseFuture, PhaseMethod};
use crate::options::Options;

/// Arguments a plugin receives for one phase invocation.
#[derive(Debug, Clone)]
pub struct PhaseCall {
    phase: Arc<str>,
    plugin: Arc<str>,
    position: usize,
    options: Arc<Options>,
    config: Arc<Options>,
}

impl PhaseCall {
    /// Name of the phase being dispatched.
    pub fn phase(&self) -> &str {
        &self.phase
    }

    /// Name of the plugin being called.
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Position of this plugin in the chain for this invocation.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Options passed to the phase invocation.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The plugin's merged configuration.
    pub fn config(&self) -> &Options {
        &self.config
    }
}

/// One plugin's place in a chain.
#[derive(Clone)]
pub(crate) struct Link {
    plugin: Arc<str>,
    config: Arc<Options>,
    method: PhaseMethod,
}

impl Link {
    pub(crate) fn new(plugin: &str, config: Arc<Options>, method: PhaseMethod) -> Self {
        Self {
            plugin: Arc::from(plugin),
            config,
            method,
        }
    }
}

struct Chain {
    phase: Arc<str>,
    options: Arc<Options>,
    links: Vec<Link>,
}

/// Continuation handed to a plugin: runs the rest of the chain.
///
/// `Next` is cheap to clone so it can be moved into closures or routines.
/// All clones share one trigger: the first [`Next::run`] advances the chain,
/// every later call resolves immediately without invoking anything and logs
/// a warning.
#[derive(Clone)]
pub struct Next {
    chain: Arc<Chain>,
    index: usize,
    fired: Arc<AtomicBool>,
}

impl Next {
    fn new(chain: Arc<Chain>, index: usize) -> Self {
        Self {
            chain,
            index,
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Runs the remainder of the chain.
    pub fn run(&self) -> PhaseFuture {
        if self.fired.swap(true, Ordering::SeqCst) {
            warn!(
                phase = %self.chain.phase,
                position = self.index,
                "Continuation called more than once, ignoring repeat call"
            );
            return future::ok(()).boxed();
        }
        step(Arc::clone(&self.chain), self.index)
    }

    /// Runs the remainder of the chain as a value a coroutine can yield.
    ///
    /// Resolves to `null`.
    pub fn awaitable(&self) -> Awaitable {
        self.run().map(|r| r.map(|()| Value::Null)).boxed()
    }

    /// Number of plugins still to run after this continuation is taken.
    pub fn remaining(&self) -> usize {
        self.chain.links.len().saturating_sub(self.index)
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("phase", &self.chain.phase)
            .field("index", &self.index)
            .field("fired", &self.fired.load(Ordering::SeqCst))
            .finish()
    }
}

fn step(chain: Arc<Chain>, index: usize) -> PhaseFuture {
    let Some(link) = chain.links.get(index) else {
        trace!(phase = %chain.phase, "Cascade reached end of chain");
        return future::ok(()).boxed();
    };

    debug!(
        phase = %chain.phase,
        plugin = %link.plugin,
        position = index,
        "Invoking plugin"
    );

    let call = PhaseCall {
        phase: Arc::clone(&chain.phase),
        plugin: Arc::clone(&link.plugin),
        position: index,
        options: Arc::clone(&chain.options),
        config: Arc::clone(&link.config),
    };
    let method = Arc::clone(&link.method);
    let next = Next::new(Arc::clone(&chain), index + 1);

    method(call, next)
}

/// Builds and starts the chain for one phase invocation.
///
/// The first plugin is invoked when the returned future is first polled.
pub(crate) fn cascade(phase: &str, options: Options, links: Vec<Link>) -> PhaseFuture {
    let invocation = Uuid::new_v4();
    let span = debug_span!(
        "phase",
        phase = %phase,
        invocation = %invocation,
        plugins = links.len()
    );

    let chain = Arc::new(Chain {
        phase: Arc::from(phase),
        options: Arc::new(options),
        links,
    });

    async move {
        let phase = Arc::clone(&chain.phase);
        let result = step(chain, 0).await;
        match &result {
            Ok(()) => debug!(phase = %phase, "Phase completed"),
            Err(err) => warn!(phase = %phase, error = %err, "Phase rejected"),
        }
        result
    }
    .instrument(span)
    .boxed()
}
