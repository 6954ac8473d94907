//! Plugin units, the raw values callers hand to [`Host::plugin`].
//!
//! A unit is one of four shapes: a plain definition object, a bare init
//! function, a class (a zero-argument constructor) or an already built
//! instance of a [`Plugin`] implementation. The normalizer turns every shape
//! into the same record.
//!
//! [`Host::plugin`]: crate::host::Host::plugin

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;

use pluggi_core::result::AppResult;

use crate::dispatcher::{Next, PhaseCall};
use crate::host::Host;
use crate::method::Method;
use crate::options::Options;

/// Init hook: called once, right after the plugin's options are merged.
///
/// Receives the owning host (for registering child plugins) and the merged
/// options. A returned definition contributes further phase methods and the
/// `coroutines` flag to the plugin.
pub type InitFn =
    Arc<dyn Fn(&mut Host, &mut Options) -> AppResult<Option<PluginDefinition>> + Send + Sync>;

/// Trait implemented by class-style plugins.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Declared plugin name, if the plugin names itself.
    fn name(&self) -> Option<&str> {
        None
    }

    /// Whether this plugin implements the given phase.
    fn implements(&self, phase: &str) -> bool;

    /// Called once after registration options are merged.
    fn init(&self, _host: &mut Host, _config: &mut Options) -> AppResult<()> {
        Ok(())
    }

    /// Runs one phase. Call `next.run()` to pass control down the chain.
    async fn run(&self, phase: &str, call: PhaseCall, next: Next) -> AppResult<()>;
}

/// A plain plugin definition: named fields copied onto the record.
#[derive(Clone, Default)]
pub struct PluginDefinition {
    /// Declared plugin name.
    pub name: Option<String>,
    /// Optional init hook.
    pub init: Option<InitFn>,
    /// Phase name → implementation, in declaration order.
    pub methods: IndexMap<String, Method>,
    /// Whether coroutine methods are driven; defaults to `true` when unset.
    pub coroutines: Option<bool>,
}

impl PluginDefinition {
    /// Creates an empty definition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the declared name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the init hook.
    pub fn with_init<F>(mut self, init: F) -> Self
    where
        F: Fn(&mut Host, &mut Options) -> AppResult<Option<PluginDefinition>>
            + Send
            + Sync
            + 'static,
    {
        self.init = Some(Arc::new(init));
        self
    }

    /// Adds the implementation of a phase.
    pub fn on(mut self, phase: impl Into<String>, method: Method) -> Self {
        self.methods.insert(phase.into(), method);
        self
    }

    /// Sets whether coroutine methods are driven.
    pub fn coroutines(mut self, enabled: bool) -> Self {
        self.coroutines = Some(enabled);
        self
    }
}

impl std::fmt::Debug for PluginDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginDefinition")
            .field("name", &self.name)
            .field("init", &self.init.as_ref().map(|_| "<fn>"))
            .field("methods", &self.methods)
            .field("coroutines", &self.coroutines)
            .finish()
    }
}

/// A class-style plugin: a constructor taking no arguments.
#[derive(Clone)]
pub struct PluginClass {
    name: String,
    construct: Arc<dyn Fn() -> Arc<dyn Plugin> + Send + Sync>,
}

impl PluginClass {
    /// Creates a class from a type identifier and a constructor.
    pub fn new<F>(name: impl Into<String>, construct: F) -> Self
    where
        F: Fn() -> Arc<dyn Plugin> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            construct: Arc::new(construct),
        }
    }

    /// Creates a class for `T`, named after the type.
    pub fn of<T: Plugin + Default>() -> Self {
        let path = std::any::type_name::<T>();
        let ident = path.rsplit("::").next().unwrap_or(path);
        Self::new(ident, || Arc::new(T::default()) as Arc<dyn Plugin>)
    }

    /// The class identifier.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Builds an instance.
    pub fn instantiate(&self) -> Arc<dyn Plugin> {
        (self.construct)()
    }
}

impl std::fmt::Debug for PluginClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginClass")
            .field("name", &self.name)
            .finish()
    }
}

/// The raw value supplied at registration.
#[derive(Clone)]
pub enum PluginUnit {
    /// A plain definition.
    Object(PluginDefinition),
    /// A bare function used as the init hook.
    Function {
        /// The function's identifier, if any.
        name: Option<String>,
        /// The hook itself.
        init: InitFn,
    },
    /// A class, instantiated with no arguments.
    Class(PluginClass),
    /// An instance of a class-style plugin.
    Instance(Arc<dyn Plugin>),
}

impl PluginUnit {
    /// Wraps a definition.
    pub fn object(definition: PluginDefinition) -> Self {
        Self::Object(definition)
    }

    /// Wraps an anonymous init function.
    pub fn function<F>(init: F) -> Self
    where
        F: Fn(&mut Host, &mut Options) -> AppResult<Option<PluginDefinition>>
            + Send
            + Sync
            + 'static,
    {
        Self::Function {
            name: None,
            init: Arc::new(init),
        }
    }

    /// Wraps an init function carrying an identifier.
    pub fn named_function<F>(name: impl Into<String>, init: F) -> Self
    where
        F: Fn(&mut Host, &mut Options) -> AppResult<Option<PluginDefinition>>
            + Send
            + Sync
            + 'static,
    {
        Self::Function {
            name: Some(name.into()),
            init: Arc::new(init),
        }
    }

    /// Wraps the class of `T`.
    pub fn class<T: Plugin + Default>() -> Self {
        Self::Class(PluginClass::of::<T>())
    }

    /// Wraps an instance.
    pub fn instance(plugin: impl Plugin) -> Self {
        Self::Instance(Arc::new(plugin))
    }

    /// Shape name, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Object(_) => "object",
            Self::Function { .. } => "function",
            Self::Class(_) => "class",
            Self::Instance(_) => "instance",
        }
    }
}

impl std::fmt::Debug for PluginUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Object(definition) => f.debug_tuple("Object").field(definition).finish(),
            Self::Function { name, .. } => f.debug_struct("Function").field("name", name).finish(),
            Self::Class(class) => f.debug_tuple("Class").field(class).finish(),
            Self::Instance(plugin) => f
                .debug_tuple("Instance")
                .field(&plugin.name().unwrap_or("<anonymous>"))
                .finish(),
        }
    }
}

impl From<PluginDefinition> for PluginUnit {
    fn from(definition: PluginDefinition) -> Self {
        Self::Object(definition)
    }
}

impl From<PluginClass> for PluginUnit {
    fn from(class: PluginClass) -> Self {
        Self::Class(class)
    }
}
