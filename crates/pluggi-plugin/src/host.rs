//! The host: composition root for plugins and lifecycle phases.
//!
//! Registration goes through [`Host::plugin`]; dispatch through
//! [`Host::invoke`] or the per-phase shortcuts. Registration needs `&mut Host`
//! and dispatch only `&Host`, so the two cannot interleave on one host.

use std::sync::Arc;

use futures::FutureExt;
use futures::future;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use pluggi_core::config::AppConfig;
use pluggi_core::config::ResolverConfig;
use pluggi_core::config::host::DEFAULT_PHASES;
use pluggi_core::error::AppError;
use pluggi_core::result::AppResult;

use crate::dispatcher::{Link, cascade};
use crate::loader::{Catalog, Load, Sources};
use crate::method::{MethodSlot, PhaseFuture};
use crate::normalizer::normalize;
use crate::options::{Options, conform, merge};
use crate::registration::Registration;
use crate::registry::{PluginRecord, PluginRegistry};
use crate::resolver::{Probe, Resolve, Resolver};

/// Host-level names that can be neither phases nor plugin methods.
pub const RESERVED_NAMES: &[&str] = &[
    "id", "options", "phases", "plugins", "plugin", "get", "contains", "len", "is_empty",
    "invoke", "resolver", "loader", "registry", "builder", "new",
];

/// Returns whether `name` is a reserved host name.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

/// Composition root: global options, registered plugins, phase names.
pub struct Host {
    id: Uuid,
    options: Options,
    registry: PluginRegistry,
    phases: Vec<String>,
    resolver: Arc<dyn Resolve>,
    loader: Arc<dyn Load>,
}

impl Host {
    /// Creates a host with the default phases and the built-in catalog.
    ///
    /// `options` holds global options keyed by plugin name; it must be an
    /// object or `null`.
    pub fn new(options: Option<Value>) -> AppResult<Self> {
        let builder = Self::builder();
        match options {
            Some(options) => builder.options(options).build(),
            None => builder.build(),
        }
    }

    pub fn builder() -> HostBuilder {
        HostBuilder::default()
    }

    /// Registers a plugin.
    ///
    /// Accepts any [`Registration`] shape. On failure the plugin map is left
    /// exactly as it was, including plugins a failing `init` registered.
    pub fn plugin(&mut self, registration: impl Into<Registration>) -> AppResult<&mut Self> {
        let checkpoint = self.registry.len();
        match self.register(registration.into()) {
            Ok(()) => Ok(self),
            Err(err) => {
                self.registry.truncate(checkpoint);
                warn!(host = %self.id, error = %err, "Plugin registration failed");
                Err(err)
            }
        }
    }

    fn register(&mut self, registration: Registration) -> AppResult<()> {
        let local = conform(registration.options().cloned(), "plugin options")?;
        let draft = normalize(
            registration,
            &self.phases,
            self.resolver.as_ref(),
            self.loader.as_ref(),
        )?;
        let name = draft.name;

        self.registry.ensure_vacant(&name)?;
        let mut config = merge(&name, self.options.get(&name), local)?;

        let mut methods = draft.methods;
        let mut coroutines = draft.coroutines;
        if let Some(init) = draft.init {
            debug!(plugin = %name, "Running init hook");
            if let Some(extra) = init(&mut *self, &mut config)? {
                methods.extend(extra.methods);
                if let Some(flag) = extra.coroutines {
                    coroutines = flag;
                }
            }
        }

        let slots = methods
            .into_iter()
            .map(|(phase, method)| -> AppResult<(String, MethodSlot)> {
                self.check_method(&name, &phase)?;
                Ok((phase, MethodSlot::new(method, coroutines)))
            })
            .collect::<AppResult<IndexMap<_, _>>>()?;

        let phases: Vec<String> = slots.keys().cloned().collect();
        self.registry
            .insert(PluginRecord::new(name.clone(), config, slots, coroutines, self.id))?;

        info!(host = %self.id, plugin = %name, phases = ?phases, "Plugin registered");
        Ok(())
    }

    fn check_method(&self, plugin: &str, method: &str) -> AppResult<()> {
        if self.phases.iter().any(|p| p == method) {
            return Ok(());
        }
        if is_reserved(method) {
            return Err(AppError::invalid_plugin(format!(
                "Plugin '{plugin}' cannot define method '{method}': the name is reserved"
            )));
        }
        Err(AppError::invalid_plugin(format!(
            "Plugin '{plugin}' defines method '{method}', which is not a phase of this host"
        )))
    }

    /// Dispatches `phase` through every plugin implementing it, in
    /// registration order.
    ///
    /// Arguments are checked before anything runs: an unknown phase or
    /// non-object options give a future that rejects with `InvalidArgument`
    /// without invoking any plugin. The returned future does not borrow the
    /// host.
    pub fn invoke(&self, phase: &str, options: Option<Value>) -> PhaseFuture {
        if !self.phases.iter().any(|p| p == phase) {
            return future::err(AppError::invalid_argument(format!(
                "Unknown phase '{phase}'"
            )))
            .boxed();
        }
        let options = match conform(options, "phase options") {
            Ok(options) => options,
            Err(err) => return future::err(err).boxed(),
        };

        let links = self
            .registry
            .iter()
            .filter_map(|record| {
                record.method(phase).map(|slot| {
                    Link::new(
                        record.name(),
                        Arc::clone(record.config()),
                        Arc::clone(slot.callable()),
                    )
                })
            })
            .collect();

        cascade(phase, options, links)
    }

    pub fn prepare(&self, options: Option<Value>) -> PhaseFuture {
        self.invoke("prepare", options)
    }

    pub fn start(&self, options: Option<Value>) -> PhaseFuture {
        self.invoke("start", options)
    }

    pub fn stop(&self, options: Option<Value>) -> PhaseFuture {
        self.invoke("stop", options)
    }

    pub fn build(&self, options: Option<Value>) -> PhaseFuture {
        self.invoke("build", options)
    }

    pub fn test(&self, options: Option<Value>) -> PhaseFuture {
        self.invoke("test", options)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Global options, keyed by plugin name.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Phases this host dispatches, in configured order.
    pub fn phases(&self) -> &[String] {
        &self.phases
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn get(&self, name: &str) -> Option<&PluginRecord> {
        self.registry.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("id", &self.id)
            .field("phases", &self.phases)
            .field("plugins", &self.registry.names().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`Host`].
pub struct HostBuilder {
    options: Option<Value>,
    phases: Vec<String>,
    policy: ResolverConfig,
    source: Option<(Arc<dyn Probe>, Arc<dyn Load>)>,
    resolver: Option<Arc<dyn Resolve>>,
    loader: Option<Arc<dyn Load>>,
}

impl Default for HostBuilder {
    fn default() -> Self {
        Self {
            options: None,
            phases: DEFAULT_PHASES.iter().map(|p| p.to_string()).collect(),
            policy: ResolverConfig::default(),
            source: None,
            resolver: None,
            loader: None,
        }
    }
}

impl HostBuilder {
    /// Builder preconfigured from application configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::default()
            .options(Value::Object(config.plugins.options.clone()))
            .phases(config.host.phases.iter().cloned())
            .resolver_policy(config.resolver.clone())
            .source(Sources::from_config(&config.resolver))
    }

    /// Global options keyed by plugin name.
    pub fn options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }

    /// Replaces the phase names.
    pub fn phases<I, S>(mut self, phases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.phases = phases.into_iter().map(Into::into).collect();
        self
    }

    /// Search policy for the default resolver.
    pub fn resolver_policy(mut self, policy: ResolverConfig) -> Self {
        self.policy = policy;
        self
    }

    /// Uses `source` both to probe candidates and to load them.
    pub fn source<S>(mut self, source: S) -> Self
    where
        S: Probe + Load + 'static,
    {
        let source = Arc::new(source);
        let probe: Arc<dyn Probe> = source.clone();
        let loader: Arc<dyn Load> = source;
        self.source = Some((probe, loader));
        self
    }

    /// Uses an in-memory catalog as the plugin source.
    pub fn catalog(self, catalog: Catalog) -> Self {
        self.source(catalog)
    }

    /// Replaces the resolver; the search policy is then ignored.
    pub fn resolver(mut self, resolver: impl Resolve + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Replaces the loader.
    pub fn loader(mut self, loader: impl Load + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Validates the configuration and creates the host.
    pub fn build(self) -> AppResult<Host> {
        let options = conform(self.options, "host options")?;
        let phases = validate_phases(self.phases)?;

        let (probe, source_loader) = match self.source {
            Some(source) => source,
            None => {
                let catalog = Arc::new(Catalog::builtin());
                let probe: Arc<dyn Probe> = catalog.clone();
                let loader: Arc<dyn Load> = catalog;
                (probe, loader)
            }
        };
        let policy = self.policy;
        let resolver = self.resolver.unwrap_or_else(|| -> Arc<dyn Resolve> {
            Arc::new(Resolver::from_config(&policy, probe))
        });
        let loader = self.loader.unwrap_or(source_loader);

        let host = Host {
            id: Uuid::new_v4(),
            options,
            registry: PluginRegistry::new(),
            phases,
            resolver,
            loader,
        };
        debug!(host = %host.id, phases = ?host.phases, "Host created");
        Ok(host)
    }
}

impl std::fmt::Debug for HostBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostBuilder")
            .field("options", &self.options)
            .field("phases", &self.phases)
            .field("policy", &self.policy)
            .finish()
    }
}

fn validate_phases(phases: Vec<String>) -> AppResult<Vec<String>> {
    let mut seen: Vec<String> = Vec::with_capacity(phases.len());
    for phase in phases {
        if phase.is_empty() {
            return Err(AppError::invalid_argument("Phase names must not be empty"));
        }
        if is_reserved(&phase) {
            return Err(AppError::invalid_argument(format!(
                "'{phase}' is reserved and cannot be a phase name"
            )));
        }
        if !seen.contains(&phase) {
            seen.push(phase);
        }
    }
    Ok(seen)
}
